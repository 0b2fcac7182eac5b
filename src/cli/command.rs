use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use esframe::process::adts::DEFAULT_ADTS_WINDOW;
use esframe::process::annexb::DEFAULT_ANNEXB_WINDOW;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ngit:      ",
    env!("VERGEN_GIT_DESCRIBE"),
    "\nesframe:  ",
    env!("ESFRAME_VERSION"),
    "\nbuilt:    ",
    env!("BUILD_TIMESTAMP"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for inspecting H.264 Annex-B and AAC ADTS elementary streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show a progress spinner while scanning.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the NAL units of an H.264 Annex-B stream.
    Annexb(AnnexbArgs),

    /// List the frames of an AAC ADTS stream.
    Adts(AdtsArgs),
}

#[derive(Debug, Args)]
pub struct AnnexbArgs {
    /// Input Annex-B stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Scan window capacity in bytes (at least 4).
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_ANNEXB_WINDOW)]
    pub window_size: usize,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Show SPS, PPS, slice header and delimiter fields.
    #[arg(long)]
    pub details: bool,
}

#[derive(Debug, Args)]
pub struct AdtsArgs {
    /// Input ADTS stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Scan window capacity in bytes (at least 9).
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_ADTS_WINDOW)]
    pub window_size: usize,

    /// Report format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Show every header field.
    #[arg(long)]
    pub details: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    /// Fixed-width table followed by a summary.
    Table,
    /// One YAML document with every unit.
    Yaml,
}

impl Cli {
    pub fn fail_level(&self) -> log::Level {
        if self.strict {
            log::Level::Warn
        } else {
            log::Level::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["esinspect", "--strict", "annexb", "in.h264"]).unwrap();
        assert_eq!(cli.fail_level(), log::Level::Warn);
        let Commands::Annexb(args) = cli.command else {
            panic!("expected annexb");
        };
        assert_eq!(args.window_size, DEFAULT_ANNEXB_WINDOW);
        assert_eq!(args.output, OutputFormat::Table);

        let cli = Cli::try_parse_from([
            "esinspect",
            "adts",
            "-",
            "--window-size",
            "64",
            "--output",
            "yaml",
        ])
        .unwrap();
        assert_eq!(cli.fail_level(), log::Level::Error);
        let Commands::Adts(args) = cli.command else {
            panic!("expected adts");
        };
        assert_eq!(args.input, PathBuf::from("-"));
        assert_eq!(args.window_size, 64);
        assert_eq!(args.output, OutputFormat::Yaml);
    }
}
