//! Domain models - envelope protocol, error taxonomy, backend records
//!
//! - `envelope` - the `{code, message, data}` wrapper and its reserved codes
//! - `error` - `ApiError`, the three ways a call can fail
//! - `types` - point types, user balances, leaderboard rows, rewards

pub mod envelope;
pub mod error;
pub mod types;

pub use envelope::{Envelope, EnvelopeStatus, ErrorBody, FORBIDDEN_CODE, SUCCESS_CODE};
pub use error::{ApiError, ApiResult};
