use serde::{Deserialize, Serialize};

/// The account behind an authenticated request or chat connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_superuser: bool,
}
