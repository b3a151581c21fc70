use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use escrow_engine::{DisputeApiError, OrderFlowError, QuoteApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("No authenticated profile identity was supplied with the request")]
    MissingIdentity,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingIdentity => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderFlowError> for ServerError {
    fn from(e: OrderFlowError) -> Self {
        match e {
            OrderFlowError::OrderNotFound(_) => Self::NoRecordFound(e.to_string()),
            OrderFlowError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            OrderFlowError::InvalidTransition { .. } => Self::BadRequest(e.to_string()),
            OrderFlowError::InvalidState(s) => Self::BadRequest(s),
            OrderFlowError::ConfigurationError(s) => Self::ConfigurationError(s),
            OrderFlowError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<DisputeApiError> for ServerError {
    fn from(e: DisputeApiError) -> Self {
        match e {
            DisputeApiError::OrderNotFound(_) | DisputeApiError::DisputeNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            DisputeApiError::Forbidden | DisputeApiError::ArbitratorRequired => {
                Self::InsufficientPermissions(e.to_string())
            },
            DisputeApiError::AlreadyDisputed => Self::Conflict(e.to_string()),
            DisputeApiError::InvalidState(s) => Self::BadRequest(s),
            DisputeApiError::InvalidSubmission(_) => Self::BadRequest(e.to_string()),
            DisputeApiError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}

impl From<QuoteApiError> for ServerError {
    fn from(e: QuoteApiError) -> Self {
        match e {
            QuoteApiError::RequestNotFound(_) | QuoteApiError::QuoteNotFound(_) => Self::NoRecordFound(e.to_string()),
            QuoteApiError::Forbidden => Self::InsufficientPermissions(e.to_string()),
            QuoteApiError::DuplicateQuote => Self::Conflict(e.to_string()),
            QuoteApiError::InvalidState(s) => Self::BadRequest(s),
            QuoteApiError::InvalidSubmission(_) => Self::BadRequest(e.to_string()),
            QuoteApiError::Store(e) => Self::BackendError(e.to_string()),
        }
    }
}
