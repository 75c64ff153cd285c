//! # Tastelog Core
//!
//! Types shared by every layer of the Tastelog API pipeline:
//!
//! - [`envelope`]: the uniform success/error response shape
//! - [`errors`]: [`AppError`], stable [`ErrorCode`]s and their status mapping
//! - [`telemetry`]: the error-tracking sink interface and its implementations
//!
//! # Example
//!
//! ```ignore
//! use tastelog_core::{AppError, Reply};
//!
//! async fn handler() -> Result<Reply<&'static str>, AppError> {
//!     Ok(Reply::ok("pong"))
//! }
//! ```

pub mod envelope;
pub mod errors;
pub mod telemetry;

pub use envelope::{ApiResponse, ErrorBody, FieldError, Reply};
pub use errors::{AppError, ErrorCode, InternalFailure, field_errors};
pub use telemetry::{ErrorReport, HttpSink, MemorySink, ReportContext, TelemetrySink, TracingSink};
