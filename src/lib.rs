pub mod core;
pub mod logging;
pub mod proxy;

pub use crate::core::context::CallerContext;
pub use crate::core::error::AccessError;
pub use crate::core::level::LogLevel;
pub use crate::core::logger::{Recorded, Tracer};
pub use crate::core::sink::SharedBuffer;
pub use crate::proxy::{share, Instrumented, Members, Proxy, Shape, Shared};

/// Current crate version string exposed for the helper binary and tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub type Result<T> = std::result::Result<T, anyhow::Error>;
