use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::api::ErrorBody;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required config entry: {0}")]
    ConfigMissing(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid relay ID: {0}")]
    InvalidRelay(u32),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("GPIO error: {0}")]
    Gpio(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRelay(_) | AppError::InvalidValue(_) => StatusCode::BAD_REQUEST,
            AppError::ConfigMissing(_)
            | AppError::Config(_)
            | AppError::Gpio(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

#[derive(Debug, Error)]
#[error(transparent)]
pub struct CommandError(pub AppError);

impl From<AppError> for CommandError {
    fn from(err: AppError) -> Self {
        CommandError(err)
    }
}

impl ResponseError for CommandError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody::new(self.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_errors_are_client_errors() {
        assert_eq!(
            AppError::InvalidRelay(9).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Gpio("line busy".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn command_errors_are_always_bad_request() {
        let err = CommandError(AppError::Gpio("line busy".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "GPIO error: line busy");
    }
}
