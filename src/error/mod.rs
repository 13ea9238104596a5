//! Error handling module.
//!
//! Provides the crate-wide error taxonomy and result alias.

mod notify_error;

pub use notify_error::{NotifyError, NotifyResult};
