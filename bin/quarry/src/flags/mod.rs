//! Flags shared by every subcommand.

mod globals;
pub use globals::GlobalArgs;

mod output;
pub use output::OutputFormat;
