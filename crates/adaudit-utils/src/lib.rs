//! Foundation crate for adaudit.
//!
//! Holds the domain vocabulary shared by every other crate: identifiers,
//! lifecycle enums, the error taxonomy and the tracing setup.

pub mod error;
pub mod ids;
pub mod logging;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
