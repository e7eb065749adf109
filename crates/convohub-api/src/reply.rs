use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use convohub_types::api::Envelope;

/// Successful response wrapped in the standard envelope.
pub struct Reply<T> {
    status: StatusCode,
    message: String,
    data: T,
}

impl<T: Serialize> Reply<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: message.into(),
            data,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            message: message.into(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(Envelope::new(self.data, self.message, self.status.as_u16())),
        )
            .into_response()
    }
}
