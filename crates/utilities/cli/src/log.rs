//! Logging flags and the tracing subscriber they configure.

use crate::CliResult;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// The output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one event per line with all fields.
    #[default]
    Full,
    /// Human readable, abbreviated.
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging arguments shared by every command.
#[derive(Parser, Default, Clone, Debug, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level. Repeat to log more: `-v` info, `-vv` debug,
    /// `-vvv` trace. Only warnings and errors are logged by default.
    #[arg(long = "verbosity", short = 'v', global = true, action = ArgAction::Count)]
    pub verbosity: u8,
    /// The format of log lines.
    #[arg(id = "log.format", long = "log.format", global = true, value_enum, default_value_t = LogFormat::Full)]
    pub format: LogFormat,
}

impl LogArgs {
    /// The level enabled by the verbosity count.
    pub const fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Configures the global tracing subscriber from [`LogArgs`].
#[derive(Debug, Clone)]
pub struct LogConfig {
    args: LogArgs,
}

impl LogConfig {
    /// Creates a new [`LogConfig`].
    pub const fn new(args: LogArgs) -> Self {
        Self { args }
    }

    /// Builds the filter: the verbosity level as the default directive,
    /// refined by `RUST_LOG` when it is set.
    pub fn env_filter(&self) -> CliResult<EnvFilter> {
        Ok(EnvFilter::builder().with_default_directive(self.args.level().into()).from_env()?)
    }

    /// Installs the global tracing subscriber, writing to stderr.
    ///
    /// `filter` replaces the filter built by [`Self::env_filter`].
    pub fn init_tracing_subscriber(&self, filter: Option<EnvFilter>) -> CliResult<()> {
        let filter = match filter {
            Some(filter) => filter,
            None => self.env_filter()?,
        };
        let registry = tracing_subscriber::registry().with(filter);
        let layer = fmt::layer().with_writer(std::io::stderr);
        match self.args.format {
            LogFormat::Full => registry.with(layer).try_init()?,
            LogFormat::Compact => registry.with(layer.compact()).try_init()?,
            LogFormat::Json => registry.with(layer.json()).try_init()?,
        }
        Ok(())
    }
}
