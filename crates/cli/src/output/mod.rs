//! Output handling
//!
//! Human-readable output with optional colors, or strict JSON on stdout.

mod formatter;

pub use formatter::{Formatter, Role};

/// Output settings resolved from global flags and config defaults
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub no_color: bool,
    pub quiet: bool,
}
