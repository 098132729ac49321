//! Utility types for the s-rep library.
//!
//! - [`Error`] / [`Result`] - Error handling

mod error;

pub use error::*;
