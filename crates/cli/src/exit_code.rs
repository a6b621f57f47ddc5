//! Process exit codes
//!
//! Every command returns one of these; scripts can rely on the values.

use omni_core::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    /// Bad arguments, invalid query, invalid path or configuration
    UsageError = 2,
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
    UnsupportedFeature = 6,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Exit code for a core error
    pub fn from_error(error: &Error) -> Self {
        match error.exit_code() {
            0 => ExitCode::Success,
            2 => ExitCode::UsageError,
            3 => ExitCode::NetworkError,
            4 => ExitCode::AuthError,
            5 => ExitCode::NotFound,
            6 => ExitCode::UnsupportedFeature,
            _ => ExitCode::GeneralError,
        }
    }
}
