use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::model::PaymentStatus;

/// Errors from the hosted backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication required, run `gst-desk login`")]
    Unauthorized,

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backend error ({status}): {body}")]
    Backend { status: u16, body: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, PartialEq)]
pub enum CalcError {
    #[error("{field} must be a finite number, got {value}")]
    NotFinite { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} exceeds maximum allowed ({max}), got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("discount cannot exceed 100%, got {0}")]
    DiscountTooLarge(f64),

    #[error("amount overflow while computing {0}")]
    Overflow(&'static str),
}

/// Step of the document create sequence that runs after the booking exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStep {
    AddItems,
    WriteMeta,
}

impl fmt::Display for CreateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreateStep::AddItems => write!(f, "adding line items"),
            CreateStep::WriteMeta => write!(f, "writing document metadata"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error("booking {0} carries no document metadata")]
    MissingMeta(i64),

    #[error("booking {booking_id} has unreadable document metadata")]
    InvalidMeta {
        booking_id: i64,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode document metadata")]
    Encode(#[source] serde_json::Error),

    #[error("a document needs at least one line item")]
    Empty,

    #[error("{0} is not an estimate")]
    NotAnEstimate(String),

    #[error("{0} is not an invoice")]
    NotAnInvoice(String),

    #[error("{number} is {from}, cannot mark it {to}")]
    InvalidTransition {
        number: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// The booking exists on the backend but a later step failed. Nothing is
    /// rolled back.
    #[error("booking {booking_id} was created but {step} failed")]
    Partial {
        booking_id: i64,
        step: CreateStep,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error(transparent)]
    Calc(#[from] CalcError),

    #[error("File I/O error: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'typst' is not installed, install it to produce PDFs")]
    TypstMissing,

    #[error("typst failed to compile {0}")]
    CompileFailed(PathBuf),
}

impl RenderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
