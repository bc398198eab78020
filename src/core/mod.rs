pub mod context;
pub mod dump;
pub mod entry;
pub mod error;
pub mod level;
pub mod lock;
pub mod logger;
pub mod sink;

pub use context::CallerContext;
pub use entry::{LogEntry, Payload};
pub use error::AccessError;
pub use level::LogLevel;
pub use logger::{Append, CallArgs, Invoke, Recorded, Tracer};
pub use sink::SharedBuffer;
