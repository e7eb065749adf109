pub mod auth;
pub mod chat;
pub mod convert;
pub mod courses;
pub mod error;
pub mod media;
pub mod middleware;
pub mod profile;
pub mod reply;
pub mod reviews;
pub mod rooms;
pub mod routes;
pub mod state;
pub mod teachers;
pub mod tokens;
pub mod validate;

pub use media::MediaStorage;
pub use routes::router;
pub use state::{AppState, AppStateInner};
pub use tokens::TokenConfig;
