use crate::core::context::CallerContext;
use crate::core::level::LogLevel;
use chrono::{DateTime, Local};
use std::fmt;

/// Timestamp layout shared by every line: local time with microseconds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// What a log line reports after its caller section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Free text from `info`/`warn`/`error`.
    Message(&'a str),
    /// Name of a recorded function being invoked.
    Function(&'a str),
    /// Member of a proxied target, qualified by the wrapper type name.
    Access { wrapper: &'a str, member: &'a str },
}

/// One formatted event. Built, rendered once, then dropped.
#[derive(Debug, Clone)]
pub struct LogEntry<'a> {
    timestamp: DateTime<Local>,
    level: LogLevel,
    module: &'a str,
    caller: &'a str,
    payload: Payload<'a>,
}

impl<'a> LogEntry<'a> {
    pub fn new(level: LogLevel, context: &'a CallerContext, payload: Payload<'a>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            module: context.module(),
            caller: context.function(),
            payload,
        }
    }

    /// Entry for a recorded function: the module is where the function was
    /// defined, the caller is whoever invoked it.
    pub fn function(module: &'a str, caller: &'a CallerContext, name: &'a str) -> Self {
        Self {
            timestamp: Local::now(),
            level: LogLevel::FuncCall,
            module,
            caller: caller.function(),
            payload: Payload::Function(name),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn module(&self) -> &str {
        self.module
    }

    pub fn caller(&self) -> &str {
        self.caller
    }

    pub fn payload(&self) -> Payload<'a> {
        self.payload
    }
}

impl fmt::Display for LogEntry<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] << {} >> ",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level.tag(),
            self.module,
            self.caller
        )?;
        match self.payload {
            Payload::Message(message) => write!(f, ": {}", message),
            Payload::Function(name) => write!(f, "[ {} >> {}() ]", self.caller, name),
            Payload::Access { wrapper, member } => {
                write!(f, "{}.{}", wrapper, member)?;
                if self.level == LogLevel::Call {
                    f.write_str("()")?;
                }
                Ok(())
            }
        }
    }
}
