//! Flags, logging and terminal helpers shared by quarry binaries.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod backtrace;

mod error;
pub use error::{CliError, CliResult};

mod log;
pub use log::{LogArgs, LogConfig, LogFormat};

mod styles;
pub use styles::cli_styles;
