//! # thinkchain-error
//!
//! One error type shared by the gateway, the chain and the CLI.
//!
//! - **ErrorKind**: what went wrong (e.g. `NetworkFailed`, `AuthenticationFailed`)
//! - **ErrorStatus**: whether it is worth trying again (Permanent, Temporary)
//! - **Context**: key/value pairs and the operation that produced the error
//! - **Source**: the underlying error, wrapped so raw transport types don't leak
//!
//! ## Usage
//!
//! ```rust
//! use thinkchain_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ApiFailed, "upstream returned 500")
//!         .with_operation("gateway::complete")
//!         .with_context("status", "500")
//!         .with_context("model", "glm-4-plus"))
//! }
//! ```
//!
//! External errors are wrapped with `set_source(err)`; later layers only append context.

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using thinkchain Error
pub type Result<T> = std::result::Result<T, Error>;
