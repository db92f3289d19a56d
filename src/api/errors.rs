use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::order::ValidationError;
use crate::messaging::PublishError;

/// Body returned for every publish failure. Bus details stay in the logs.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to process order";

/// Why an order was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Client-caused; the message is returned as-is.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Serialization defect or bus failure; the client sees a generic message.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl IngestError {
    /// Metrics label for the request outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "rejected",
            IngestError::Publish(_) => "failed",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for IngestError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestError::Validation(ValidationError::BodyTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Validation(_) => StatusCode::BAD_REQUEST,
            IngestError::Publish(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            IngestError::Validation(err) => err.to_string(),
            IngestError::Publish(_) => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorBody { error })
    }
}
