//! Console stream selection, shared by tracer sinks and crate diagnostics.

use serde::Deserialize;
use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use tracing::Subscriber;
use tracing_subscriber::fmt::{self as tracing_fmt, format, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

/// `fmt` layer carrying crate diagnostics.
pub type DiagnosticsLayer<S> =
    tracing_fmt::Layer<S, format::DefaultFields, format::Format<format::Full>, BoxMakeWriter>;

/// Console stream a tracer writes its lines to, or where diagnostics go.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    /// Discard console output; a log file may still receive lines.
    None,
}

impl ConsoleOutput {
    /// Writer for one tracer sink.
    pub fn writer(self) -> Box<dyn Write + Send> {
        match self {
            ConsoleOutput::Stdout => Box::new(io::stdout()),
            ConsoleOutput::Stderr => Box::new(io::stderr()),
            ConsoleOutput::None => Box::new(io::sink()),
        }
    }

    fn make_writer(self) -> BoxMakeWriter {
        match self {
            ConsoleOutput::Stdout => BoxMakeWriter::new(io::stdout),
            ConsoleOutput::Stderr => BoxMakeWriter::new(io::stderr),
            ConsoleOutput::None => BoxMakeWriter::new(io::sink),
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ConsoleOutput::Stdout => "stdout",
            ConsoleOutput::Stderr => "stderr",
            ConsoleOutput::None => "none",
        }
    }
}

impl fmt::Display for ConsoleOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleOutput {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        [ConsoleOutput::Stdout, ConsoleOutput::Stderr, ConsoleOutput::None]
            .into_iter()
            .find(|output| output.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "invalid console output '{}'; expected stdout, stderr or none",
                    value
                )
            })
    }
}

/// Diagnostics layer writing to the `output` console stream.
pub fn console_layer<S>(output: ConsoleOutput) -> DiagnosticsLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    diagnostics_layer(output.make_writer())
}

/// Diagnostics layer writing through `make_writer`. Lines carry level and
/// message only: no colors, targets or thread labels.
pub fn diagnostics_layer<S>(make_writer: BoxMakeWriter) -> DiagnosticsLayer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_fmt::layer()
        .with_writer(make_writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
}
