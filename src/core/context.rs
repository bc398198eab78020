//! Resolution of the calling context attached to every log line.
//!
//! Rust has no runtime stack introspection that is reliable in optimized
//! builds, so the context is captured at the call site instead. `here!()`
//! records the enclosing module path and function name at compile time;
//! APIs that do not receive a context fall back to the `#[track_caller]`
//! source location of their caller. Nothing outside this module knows how a
//! context is obtained.

use std::borrow::Cow;
use std::fmt;
use std::panic::Location;

/// Label used when no caller function or module can be determined.
pub const UNKNOWN: &str = "<unknown>";

/// Module and function of the code that triggered a log line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerContext {
    module: Cow<'static, str>,
    function: Cow<'static, str>,
}

impl CallerContext {
    /// Build a context from explicit labels. Empty labels degrade to `<unknown>`.
    pub fn new(
        module: impl Into<Cow<'static, str>>,
        function: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            module: non_empty(module.into()),
            function: non_empty(function.into()),
        }
    }

    /// Placeholder context for code whose caller cannot be resolved.
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }

    /// Context of the nearest caller that is not itself `#[track_caller]`.
    ///
    /// The module is derived from the caller's source file and the function
    /// label carries the line number, since function names are not
    /// available from a source location.
    #[track_caller]
    pub fn caller() -> Self {
        Self::from_location(Location::caller())
    }

    /// Context derived from a source location.
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(
            module_from_file(location.file()),
            format!("line {}", location.line()),
        )
    }

    /// Context from a `module_path!()` and the type name of a function item
    /// nested in the caller. Used by [`here!`](crate::here).
    #[doc(hidden)]
    pub fn from_type_path(module: &'static str, marker_path: &'static str) -> Self {
        let mut path = marker_path.strip_suffix("::__here").unwrap_or(marker_path);
        while let Some(outer) = path.strip_suffix("::{{closure}}") {
            path = outer;
        }
        let function = if path == module {
            UNKNOWN
        } else {
            path.rsplit("::").next().unwrap_or(UNKNOWN)
        };
        Self::new(module, function)
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn function(&self) -> &str {
        &self.function
    }
}

impl Default for CallerContext {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for CallerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.module, self.function)
    }
}

/// Capture the [`CallerContext`] of the enclosing function.
///
/// ```
/// fn checkout() -> seshat::CallerContext {
///     seshat::here!()
/// }
/// let context = checkout();
/// assert_eq!(context.function(), "checkout");
/// ```
#[macro_export]
macro_rules! here {
    () => {{
        fn __here() {}
        $crate::core::context::CallerContext::from_type_path(
            ::std::module_path!(),
            $crate::core::context::type_name_of(__here),
        )
    }};
}

#[doc(hidden)]
pub fn type_name_of<T>(_: T) -> &'static str {
    std::any::type_name::<T>()
}

fn non_empty(label: Cow<'static, str>) -> Cow<'static, str> {
    if label.trim().is_empty() {
        Cow::Borrowed(UNKNOWN)
    } else {
        label
    }
}

/// Turn `src/orders/cart.rs` into `orders::cart`; crate roots map to `crate`.
fn module_from_file(file: &str) -> String {
    let normalized = file.replace('\\', "/");
    let trimmed = normalized.strip_suffix(".rs").unwrap_or(&normalized);
    let trimmed = trimmed.strip_prefix("src/").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("/mod").unwrap_or(trimmed);
    match trimmed {
        "" | "lib" | "main" => "crate".to_string(),
        other => other.replace('/', "::"),
    }
}
