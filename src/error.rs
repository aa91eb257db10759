use actix_web::{HttpResponse, ResponseError};
use reqwest::StatusCode;
use serde_json::json;

use crate::config::ConfigError;
use crate::selection::SelectionError;
use crate::transit::error::{AuthError, ClientError};

#[derive(thiserror::Error, Debug)]
pub enum DashError {
    #[error("Transit error: {0}")]
    Client(#[from] ClientError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No route selected")]
    NoSelection,
}

impl ResponseError for DashError {
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        match self {
            DashError::Client(ClientError::Validation(message)) => {
                HttpResponse::build(self.status_code()).json(json!({ "error": message }))
            }
            DashError::Selection(_) | DashError::InvalidInput(_) | DashError::NoSelection => {
                HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
            }
            other => {
                log::error!("{}", other);
                HttpResponse::build(self.status_code()).finish()
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            DashError::Client(ClientError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            DashError::Client(ClientError::Transport(..) | ClientError::Http(_)) => {
                StatusCode::BAD_GATEWAY
            }
            DashError::Selection(SelectionError::UnknownRoute(_)) => StatusCode::NOT_FOUND,
            DashError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DashError::NoSelection => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DashError> for std::io::Error {
    fn from(e: DashError) -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::Other, e)
    }
}

pub type DashResult<T> = Result<T, DashError>;
