//! The tracer: leveled logging, call recording and proxy ownership.

mod record;

pub use record::{Append, CallArgs, Invoke, Recorded};

use crate::core::context::CallerContext;
use crate::core::dump;
use crate::core::entry::{LogEntry, Payload};
use crate::core::level::LogLevel;
use crate::core::lock::{WriteGuard, WriteLock};
use crate::core::sink::Sink;
use crate::logging::{ConsoleOutput, TracerConfig};
use crate::proxy::registry::ProxyRegistry;
use crate::proxy::{Instrumented, Proxy, Shared};
use crate::Result;
use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide instrumentation context.
///
/// Construct one at startup and hand `Arc<Tracer>` to whatever needs to log,
/// record or wrap. Lines go to the console sink and, once [`save_log`] has
/// been called, to an append-mode file as well. Writes are unbuffered, so
/// nothing needs flushing at shutdown.
///
/// [`save_log`]: Tracer::save_log
pub struct Tracer {
    lock: WriteLock,
    sink: Mutex<Sink>,
    registry: ProxyRegistry,
    forward_to_tracing: bool,
}

impl Default for Tracer {
    /// Tracer writing to stdout, not yet shared.
    fn default() -> Self {
        Self::from_sink(Sink::new(ConsoleOutput::Stdout), false)
    }
}

impl Tracer {
    /// Shared tracer writing to stdout.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_console(output: ConsoleOutput) -> Arc<Self> {
        Arc::new(Self::from_sink(Sink::new(output), false))
    }

    /// Tracer writing its console lines into `writer`.
    pub fn with_writer<W>(writer: W) -> Arc<Self>
    where
        W: Write + Send + 'static,
    {
        Arc::new(Self::from_sink(Sink::with_writer(Box::new(writer)), false))
    }

    /// Tracer built from resolved configuration; attaches `log_file` when set.
    pub fn from_config(config: &TracerConfig) -> Result<Arc<Self>> {
        let mut sink = Sink::new(config.console_output);
        if let Some(path) = &config.log_file {
            sink.attach(path)?;
        }
        Ok(Arc::new(Self::from_sink(sink, config.forward_to_tracing)))
    }

    fn from_sink(sink: Sink, forward_to_tracing: bool) -> Self {
        Self {
            lock: WriteLock::new(),
            sink: Mutex::new(sink),
            registry: ProxyRegistry::new(),
            forward_to_tracing,
        }
    }

    /// Attach `path`, opened for appending, as secondary sink for every later
    /// line. A file attached earlier is closed; the last call wins.
    pub fn save_log(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let _guard = self.lock.acquire();
        self.sink().attach(path)?;
        tracing::debug!("log file attached at {}", path.display());
        Ok(())
    }

    /// Path of the currently attached log file.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        self.sink().log_file_path().map(Path::to_path_buf)
    }

    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Info, &CallerContext::caller(), message.as_ref());
    }

    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Warn, &CallerContext::caller(), message.as_ref());
    }

    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::Error, &CallerContext::caller(), message.as_ref());
    }

    /// Write one message line for `context`. The [`info!`](crate::info),
    /// [`warn!`](crate::warn) and [`error!`](crate::error) macros land here.
    pub fn log(&self, level: LogLevel, context: &CallerContext, message: &str) {
        let _guard = self.lock.acquire();
        self.emit(&LogEntry::new(level, context, Payload::Message(message)));
    }

    /// Wrap `func` so every call through the returned [`Recorded`] is traced.
    ///
    /// The defining module is taken from the caller's source file; use
    /// [`record!`](crate::record) to get the module path instead.
    #[track_caller]
    pub fn record<F>(self: &Arc<Self>, name: &'static str, func: F) -> Recorded<F> {
        let module = CallerContext::caller().module().to_string();
        Recorded::new(Arc::clone(self), Cow::Owned(module), Cow::Borrowed(name), func)
    }

    /// Like [`record`](Tracer::record) with an explicit defining module.
    pub fn record_in<F>(
        self: &Arc<Self>,
        module: impl Into<Cow<'static, str>>,
        name: impl Into<Cow<'static, str>>,
        func: F,
    ) -> Recorded<F> {
        Recorded::new(Arc::clone(self), module.into(), name.into(), func)
    }

    /// Return the proxy for `target`, creating and registering it on first use.
    ///
    /// Handles are keyed by the identity of the shared cell, so wrapping the
    /// same cell again (including `proxy.target()`) returns the same handle.
    pub fn wrap<T: Instrumented>(self: &Arc<Self>, target: &Shared<T>) -> Proxy<T> {
        self.registry
            .lookup_or_create(target, || Proxy::new(Arc::clone(target), Arc::downgrade(self)))
    }

    /// `true` once `target` has a proxy registered with this tracer.
    pub fn is_wrapped<T>(&self, target: &Shared<T>) -> bool {
        self.registry.contains(target)
    }

    /// Number of distinct targets wrapped by this tracer.
    pub fn proxy_count(&self) -> usize {
        self.registry.len()
    }

    pub(crate) fn acquire(&self) -> WriteGuard<'_> {
        self.lock.acquire()
    }

    /// Write an access line (`READ`, `WRITE`, `CALL`) for a proxied member.
    pub(crate) fn log_access(
        &self,
        level: LogLevel,
        context: &CallerContext,
        wrapper: &str,
        member: &str,
    ) {
        let _guard = self.lock.acquire();
        self.emit(&LogEntry::new(
            level,
            context,
            Payload::Access { wrapper, member },
        ));
    }

    /// Header plus indented dump. Callers hold the write lock.
    pub(crate) fn emit_block(&self, header: &str, rendered: &str) {
        let mut sink = self.sink();
        for line in dump::block(header, rendered) {
            sink.write_line(&line);
        }
    }

    /// Write one formatted entry. Callers hold the write lock.
    pub(crate) fn emit(&self, entry: &LogEntry<'_>) {
        let line = entry.to_string();
        if self.forward_to_tracing {
            forward(entry.level(), &line);
        }
        self.sink().write_line(&line);
    }

    fn sink(&self) -> MutexGuard<'_, Sink> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn forward(level: LogLevel, line: &str) {
    match level {
        LogLevel::Error => tracing::error!(target: "seshat::trace", "{}", line),
        LogLevel::Warn => tracing::warn!(target: "seshat::trace", "{}", line),
        LogLevel::Info => tracing::info!(target: "seshat::trace", "{}", line),
        LogLevel::FuncCall | LogLevel::Call => {
            tracing::debug!(target: "seshat::trace", "{}", line)
        }
        LogLevel::Read | LogLevel::Write => tracing::trace!(target: "seshat::trace", "{}", line),
    }
}

/// Log an `[INFO]` line with the context of the enclosing function.
///
/// ```
/// let tracer = seshat::Tracer::with_console(seshat::logging::ConsoleOutput::None);
/// seshat::info!(tracer, "loaded {} rows", 3);
/// ```
#[macro_export]
macro_rules! info {
    ($tracer:expr, $($arg:tt)+) => {
        $tracer.log(
            $crate::core::level::LogLevel::Info,
            &$crate::here!(),
            &::std::format!($($arg)+),
        )
    };
}

/// Log a `[WARN]` line with the context of the enclosing function.
#[macro_export]
macro_rules! warn {
    ($tracer:expr, $($arg:tt)+) => {
        $tracer.log(
            $crate::core::level::LogLevel::Warn,
            &$crate::here!(),
            &::std::format!($($arg)+),
        )
    };
}

/// Log an `[ERROR]` line with the context of the enclosing function.
#[macro_export]
macro_rules! error {
    ($tracer:expr, $($arg:tt)+) => {
        $tracer.log(
            $crate::core::level::LogLevel::Error,
            &$crate::here!(),
            &::std::format!($($arg)+),
        )
    };
}

/// Record a named function, using the calling module as defining module.
///
/// ```
/// fn add(a: i32, b: i32) -> i32 {
///     a + b
/// }
/// let tracer = seshat::Tracer::with_console(seshat::logging::ConsoleOutput::None);
/// let add = seshat::record!(tracer, add);
/// assert_eq!(add.call((2, 3)), 5);
/// ```
#[macro_export]
macro_rules! record {
    ($tracer:expr, $func:path) => {
        $tracer.record_in(
            ::std::module_path!(),
            ::std::stringify!($func),
            $func,
        )
    };
}
