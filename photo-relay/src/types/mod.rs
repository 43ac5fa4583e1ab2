mod environment;
mod error;

pub use environment::{Environment, DEFAULT_MAX_UPLOAD_BYTES};
pub use error::{ApiErrorResponse, AppError};
