//! Process exit codes for the `adaudit` binary.

use adaudit_utils::error::AuditError;

/// Exit code returned from [`crate::cli::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    pub const SUCCESS: Self = Self(0);
    /// Unexpected failure, including server errors after startup
    pub const INTERNAL: Self = Self(1);
    /// Invalid configuration or command-line arguments
    pub const CONFIG: Self = Self(2);
    /// The listen address could not be bound
    pub const BIND: Self = Self(3);

    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }
}

impl From<&AuditError> for ExitCode {
    fn from(err: &AuditError) -> Self {
        match err {
            AuditError::InvalidArgument(_) | AuditError::Config(_) => Self::CONFIG,
            AuditError::Internal(detail) if detail.starts_with("failed to bind") => Self::BIND,
            _ => Self::INTERNAL,
        }
    }
}
