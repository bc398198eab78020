//! Access-logging proxies around shared values.
//!
//! A [`Proxy`] stands in for a [`Shared`] target. Reading a member through it
//! writes a `READ` line, assigning writes a `WRITE` line, and fetching a method
//! writes a `CALL` line before the method runs. Everything else (comparison,
//! hashing, arithmetic, indexing, formatting) forwards to the target without
//! logging; see [`protocol`].

mod protocol;
pub(crate) mod registry;
mod shape;

pub use shape::{Args, Attribute, Instrumented, Members, Shape};

use crate::core::context::CallerContext;
use crate::core::error::AccessError;
use crate::core::level::LogLevel;
use crate::core::logger::Tracer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// A value that proxies and plain code share.
pub type Shared<T> = Arc<RwLock<T>>;

/// Move `value` into a [`Shared`] cell.
pub fn share<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

/// Logging stand-in for a shared target.
///
/// Obtained from [`Tracer::wrap`]; clones are the same handle. The proxy
/// keeps only a weak reference to its tracer: once the tracer is dropped,
/// accesses still forward to the target but are no longer logged.
///
/// Member operations lock the target for the duration of the access, so a
/// method body must not reach back into the same proxy.
pub struct Proxy<T: Instrumented> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    target: Shared<T>,
    shape: Arc<Shape<T>>,
    tracer: Weak<Tracer>,
}

impl<T: Instrumented> Proxy<T> {
    pub(crate) fn new(target: Shared<T>, tracer: Weak<Tracer>) -> Self {
        Self {
            inner: Arc::new(Inner {
                target,
                shape: Shape::of(),
                tracer,
            }),
        }
    }

    /// The wrapped cell.
    pub fn target(&self) -> Shared<T> {
        Arc::clone(&self.inner.target)
    }

    /// `true` when both handles wrap the same target.
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner.target, &other.inner.target)
    }

    /// Composite name used in access lines, e.g. `Proxy<Person>`.
    pub fn wrapper_name(&self) -> &str {
        self.inner.shape.wrapper_name()
    }

    pub fn shape(&self) -> &Shape<T> {
        &self.inner.shape
    }

    /// Accessor that attributes its log lines to `context` instead of the
    /// source location of each call.
    ///
    /// ```
    /// # use seshat::{here, share, Instrumented, Shape, Tracer};
    /// # struct Counter { hits: u64 }
    /// # impl Instrumented for Counter {
    /// #     fn describe(shape: &mut Shape<Self>) {
    /// #         shape.field("hits", |c| &c.hits, |c, v| c.hits = v);
    /// #     }
    /// # }
    /// # let tracer = Tracer::with_console(seshat::logging::ConsoleOutput::None);
    /// let counter = tracer.wrap(&share(Counter { hits: 0 }));
    /// let access = counter.at(here!());
    /// access.set("hits", 1)?;
    /// assert_eq!(access.read_as::<u64>("hits")?, 1);
    /// # Ok::<(), seshat::AccessError>(())
    /// ```
    pub fn at(&self, context: CallerContext) -> Access<'_, T> {
        Access {
            proxy: self,
            context,
        }
    }

    /// Fetch member `name`, logging `READ` for a field or `CALL` for a method.
    /// Missing members fail without a line.
    #[track_caller]
    pub fn get(&self, name: &str) -> Result<Member<T>, AccessError> {
        self.at(CallerContext::caller()).get(name)
    }

    /// Value of field `name`.
    #[track_caller]
    pub fn read(&self, name: &str) -> Result<Value, AccessError> {
        self.at(CallerContext::caller()).read(name)
    }

    /// Value of field `name` converted to `V`.
    #[track_caller]
    pub fn read_as<V: DeserializeOwned>(&self, name: &str) -> Result<V, AccessError> {
        self.at(CallerContext::caller()).read_as(name)
    }

    /// Assign field `name`. The `WRITE` line is written once the member is
    /// known to be assignable and before the value is stored, so a value the
    /// field rejects still leaves its line.
    #[track_caller]
    pub fn set<V: Serialize>(&self, name: &str, value: V) -> Result<(), AccessError> {
        self.at(CallerContext::caller()).set(name, value)
    }

    /// Delete field `name`. Deletion is not logged.
    pub fn delete(&self, name: &str) -> Result<(), AccessError> {
        self.inner.shape.remove(&mut self.write_target(), name)
    }

    /// Fetch method `name` (one `CALL` line) and invoke it with `args`.
    #[track_caller]
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, AccessError> {
        self.at(CallerContext::caller()).call(name, args)
    }

    /// Clone of the current target value.
    pub fn snapshot(&self) -> T
    where
        T: Clone,
    {
        self.read_target().clone()
    }

    pub(crate) fn read_target(&self) -> RwLockReadGuard<'_, T> {
        self.inner
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_target(&self) -> RwLockWriteGuard<'_, T> {
        self.inner
            .target
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn log_access(&self, level: LogLevel, context: &CallerContext, member: &str) {
        if let Some(tracer) = self.inner.tracer.upgrade() {
            tracer.log_access(level, context, self.wrapper_name(), member);
        }
    }
}

impl<T: Instrumented> Clone for Proxy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Proxy operations attributed to a fixed caller context.
pub struct Access<'a, T: Instrumented> {
    proxy: &'a Proxy<T>,
    context: CallerContext,
}

impl<'a, T: Instrumented> Access<'a, T> {
    pub fn context(&self) -> &CallerContext {
        &self.context
    }

    pub fn get(&self, name: &str) -> Result<Member<T>, AccessError> {
        let attribute = self
            .proxy
            .inner
            .shape
            .resolve(&self.proxy.read_target(), name)?;
        match attribute {
            Attribute::Field(value) => {
                self.proxy.log_access(LogLevel::Read, &self.context, name);
                Ok(Member::Field(value))
            }
            Attribute::Method(method) => {
                self.proxy.log_access(LogLevel::Call, &self.context, method);
                Ok(Member::Method(BoundMethod {
                    target: self.proxy.target(),
                    shape: Arc::clone(&self.proxy.inner.shape),
                    tracer: Weak::clone(&self.proxy.inner.tracer),
                    name: method,
                }))
            }
        }
    }

    pub fn read(&self, name: &str) -> Result<Value, AccessError> {
        match self.get(name)? {
            Member::Field(value) => Ok(value),
            Member::Method(method) => Err(AccessError::NotAField {
                type_name: self.proxy.shape().type_name(),
                member: method.name().to_string(),
            }),
        }
    }

    pub fn read_as<V: DeserializeOwned>(&self, name: &str) -> Result<V, AccessError> {
        let value = self.read(name)?;
        serde_json::from_value(value).map_err(|err| AccessError::InvalidValue {
            type_name: self.proxy.shape().type_name(),
            member: name.to_string(),
            reason: err.to_string(),
        })
    }

    pub fn set<V: Serialize>(&self, name: &str, value: V) -> Result<(), AccessError> {
        let value = serde_json::to_value(value).map_err(|err| AccessError::InvalidValue {
            type_name: self.proxy.shape().type_name(),
            member: name.to_string(),
            reason: err.to_string(),
        })?;
        self.proxy.shape().check_assignable(name)?;
        self.proxy.log_access(LogLevel::Write, &self.context, name);
        self.proxy
            .inner
            .shape
            .assign(&mut self.proxy.write_target(), name, value)
    }

    pub fn delete(&self, name: &str) -> Result<(), AccessError> {
        self.proxy.delete(name)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, AccessError> {
        match self.get(name)? {
            Member::Method(method) => method.invoke(args),
            Member::Field(_) => Err(AccessError::NotCallable {
                type_name: self.proxy.shape().type_name(),
                member: name.to_string(),
            }),
        }
    }
}

/// A member fetched through a proxy.
pub enum Member<T> {
    Field(Value),
    Method(BoundMethod<T>),
}

impl<T: Instrumented> Member<T> {
    pub fn is_method(&self) -> bool {
        matches!(self, Member::Method(_))
    }

    /// The field value, or `None` for a method.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Member::Field(value) => Some(value),
            Member::Method(_) => None,
        }
    }

    pub fn into_method(self) -> Option<BoundMethod<T>> {
        match self {
            Member::Method(method) => Some(method),
            Member::Field(_) => None,
        }
    }
}

impl<T> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Field(value) => f.debug_tuple("Field").field(value).finish(),
            Member::Method(method) => f.debug_tuple("Method").field(&method.name).finish(),
        }
    }
}

/// Method fetched through a proxy, bound to its target.
///
/// The `CALL` line was written when the method was fetched; invoking it
/// writes nothing further.
///
/// Invocation holds the tracer's write lock before locking the target, the
/// same order a recorded function follows when its body touches a proxy.
pub struct BoundMethod<T> {
    target: Shared<T>,
    shape: Arc<Shape<T>>,
    tracer: Weak<Tracer>,
    name: &'static str,
}

impl<T: Instrumented> BoundMethod<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn invoke(&self, args: &[Value]) -> Result<Value, AccessError> {
        let tracer = self.tracer.upgrade();
        let _guard = tracer.as_deref().map(Tracer::acquire);
        self.shape.invoke_locked(&self.target, self.name, args)
    }

    /// Invoke and convert the result to `V`.
    pub fn invoke_as<V: DeserializeOwned>(&self, args: &[Value]) -> Result<V, AccessError> {
        let value = self.invoke(args)?;
        serde_json::from_value(value).map_err(|err| AccessError::InvalidValue {
            type_name: self.shape.type_name(),
            member: self.name.to_string(),
            reason: err.to_string(),
        })
    }
}

impl<T> Clone for BoundMethod<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            shape: Arc::clone(&self.shape),
            tracer: Weak::clone(&self.tracer),
            name: self.name,
        }
    }
}
