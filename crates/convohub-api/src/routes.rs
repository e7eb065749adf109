use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
};
use tower_http::services::ServeDir;

use crate::error::ApiError;
use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, chat, courses, profile, reviews, rooms, teachers};

/// The complete HTTP surface. Transport layers (CORS, tracing) are added by
/// the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/signup/", post(auth::signup))
        .route("/auth/login/", post(auth::login))
        .route("/auth/token/refresh/", post(auth::refresh))
        .route("/ws/chat/{room_id}/", get(chat::chat_socket));

    let protected_routes = Router::new()
        .route("/auth/logout/", post(auth::logout))
        .route("/rooms/", get(rooms::list_rooms))
        .route("/rooms/create/", post(rooms::create_room))
        .route("/rooms/search/", get(rooms::search_rooms))
        .route("/rooms/recent/", get(rooms::recent_activity))
        .route(
            "/rooms/{room_id}/",
            get(rooms::get_room)
                .put(rooms::update_room)
                .patch(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route("/rooms/{room_id}/join/", post(rooms::join_room))
        .nest("/review", review_routes())
        .route(
            "/profile/",
            get(profile::get_profile)
                .put(profile::update_profile)
                .layer(DefaultBodyLimit::max(profile::MAX_UPLOAD_BYTES)),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let media = ServeDir::new(state.media.dir());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/media", media)
        .fallback(|| async { ApiError::not_found("Not found.") })
        .with_state(state)
}

/// Course, teacher and teacher-review catalogue, mounted under `/review`.
fn review_routes() -> Router<AppState> {
    Router::new()
        .route("/courses/", get(courses::list_courses).post(courses::create_course))
        .route(
            "/courses/{course_id}/",
            get(courses::get_course)
                .put(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/teachers/", get(teachers::list_teachers).post(teachers::create_teacher))
        .route(
            "/teachers/{teacher_id}/",
            get(teachers::get_teacher)
                .put(teachers::update_teacher)
                .delete(teachers::delete_teacher),
        )
        .route(
            "/teacher-reviews/",
            get(reviews::list_reviews).post(reviews::create_review),
        )
        .route("/teacher-reviews/{review_id}/", delete(reviews::delete_review))
}
