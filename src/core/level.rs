use std::fmt;

/// Kind of event written by the tracer; selects the bracketed tag of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    /// Invocation of a recorded function.
    FuncCall,
    /// Field read through a proxy.
    Read,
    /// Field write through a proxy.
    Write,
    /// Method resolved through a proxy.
    Call,
}

impl LogLevel {
    /// Bracketed tag printed in every log line.
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Warn => "[WARN]",
            LogLevel::Error => "[ERROR]",
            LogLevel::FuncCall => "[FUNC]",
            LogLevel::Read => "[READ]",
            LogLevel::Write => "[WRITE]",
            LogLevel::Call => "[CALL]",
        }
    }

    /// Returns `true` for levels produced by proxied member access.
    pub fn is_access(self) -> bool {
        matches!(self, LogLevel::Read | LogLevel::Write | LogLevel::Call)
    }

    /// Level used when entries are mirrored into `tracing`.
    pub fn tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::FuncCall | LogLevel::Call => tracing::Level::DEBUG,
            LogLevel::Read | LogLevel::Write => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
