#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("Init error: {0}")]
    Init(String),

    #[error("Transport error: {0} from {1}")]
    Transport(u16, String),

    #[error("No route mapping available for {0}")]
    NoMapping(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Deserialize error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Login failed: {0}")]
    Rejected(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Client(e.into())
    }
}

impl From<url::ParseError> for AuthError {
    fn from(e: url::ParseError) -> Self {
        AuthError::Client(e.into())
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
