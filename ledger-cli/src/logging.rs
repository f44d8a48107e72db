//! Log output for the `treasury-ledger` binary.
//!
//! Stdout carries command results, so log events go to stderr as short
//! `LEVEL crate: message fields` lines. When `[logging] file` is set, the
//! same events are appended there with a local timestamp and full target.

use std::fmt;
use std::fs::File;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Event layout for one log destination.
#[derive(Debug, Clone, Copy)]
struct LedgerFormat {
    /// File lines are read later, so they carry time and the full module path.
    detailed: bool,
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

/// `ledger_core::treasury::poster` -> `ledger_core`
fn crate_of(target: &str) -> &str {
    target.split("::").next().unwrap_or(target)
}

impl<S, N> FormatEvent<S, N> for LedgerFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();

        if self.detailed {
            write!(writer, "{} ", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))?;
        }

        if writer.has_ansi_escapes() {
            write!(writer, "{}{:>5}\x1b[0m ", level_color(meta.level()), meta.level())?;
        } else {
            write!(writer, "{:>5} ", meta.level())?;
        }

        let target = if self.detailed {
            meta.target()
        } else {
            crate_of(meta.target())
        };
        write!(writer, "{target}: ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `logging.level` when configured, else `RUST_LOG`, else `info`.
fn build_filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid logging.level '{directive}'")),
        None => Ok(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))),
    }
}

/// Install the global subscriber. Call once, after the config is loaded.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(config.level.as_deref())?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = File::options()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file '{}'", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .event_format(LedgerFormat { detailed: true })
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(LedgerFormat { detailed: false })
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("logging already initialized")
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use tracing::{info, warn};

    use super::*;

    fn temp_log(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ledger-{name}-{}.log", std::process::id()))
    }

    /// Runs `emit` under a subscriber that writes `format` lines to a file
    /// and returns what was written.
    fn capture(name: &str, format: LedgerFormat, emit: impl FnOnce()) -> String {
        let path = temp_log(name);
        let file = File::create(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(format)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        );

        tracing::subscriber::with_default(subscriber, emit);

        let written = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        written
    }

    #[test]
    fn crate_of_keeps_first_path_segment() {
        assert_eq!(crate_of("ledger_core::treasury::poster"), "ledger_core");
        assert_eq!(crate_of("treasury_ledger"), "treasury_ledger");
    }

    #[test]
    fn console_lines_are_short() {
        let out = capture("console", LedgerFormat { detailed: false }, || {
            warn!(target: "ledger_core::calculations::rates", class_code = "5A", "falling back");
        });

        assert_eq!(out, " WARN ledger_core: falling back class_code=\"5A\"\n");
    }

    #[test]
    fn file_lines_carry_time_and_full_target() {
        let out = capture("detailed", LedgerFormat { detailed: true }, || {
            info!(target: "ledger_core::treasury::poster", amount = 50, "tax posted");
        });

        let (stamp, rest) = out.split_at(out.find("  INFO").unwrap());
        assert!(stamp.starts_with(&Local::now().format("%Y-%m-%d").to_string()));
        assert_eq!(rest, "  INFO ledger_core::treasury::poster: tax posted amount=50\n");
    }

    #[test]
    fn configured_level_must_be_a_valid_filter() {
        assert!(build_filter(Some("ledger_core=debug,warn")).is_ok());
        assert!(build_filter(Some("[not a filter")).is_err());
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let config = LoggingConfig {
            level: Some("info".to_string()),
            file: Some(PathBuf::from("/nonexistent/dir/ledger.log")),
        };

        let err = init(&config).unwrap_err();

        assert!(err.to_string().contains("/nonexistent/dir/ledger.log"));
    }
}
