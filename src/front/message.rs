use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{StoreError, ValidationError};

/// Error reply of the API: a status code and a `{"detail": ...}` body.
#[derive(Debug)]
pub struct AppMessage {
    status: StatusCode,
    detail: String,
}

impl AppMessage {
    pub fn new_validation_error(err: ValidationError) -> AppMessage {
        log::info!("rejected request: {err}");
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: err.to_string(),
        }
    }

    pub fn new_error(err: StoreError) -> AppMessage {
        log::error!("store failure: {err:?}");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: "internal server error".to_string(),
        }
    }
}

impl From<ValidationError> for AppMessage {
    fn from(err: ValidationError) -> Self {
        Self::new_validation_error(err)
    }
}

impl From<StoreError> for AppMessage {
    fn from(err: StoreError) -> Self {
        Self::new_error(err)
    }
}

impl IntoResponse for AppMessage {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Ctx {
            detail: String,
        }

        (self.status, Json(Ctx { detail: self.detail })).into_response()
    }
}
