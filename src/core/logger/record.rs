//! Call recording: the decorator returned by [`Tracer::record`].
//!
//! Arguments travel as a tuple so one wrapper type covers every arity:
//! `recorded.call((2, 3))` invokes `fn add(a: i32, b: i32)`. Keyword
//! arguments, which Rust does not have, are modeled as one extra trailing
//! parameter (usually an options struct) passed through `call_kw`.

use super::Tracer;
use crate::core::context::CallerContext;
use crate::core::dump;
use crate::core::entry::LogEntry;
use std::borrow::Cow;
use std::fmt::{self, Debug};
use std::sync::Arc;

/// Functions callable with their arguments packed in a tuple.
pub trait Invoke<Args> {
    type Output;

    fn invoke(&self, args: Args) -> Self::Output;
}

/// Positional argument tuples that can be dumped.
pub trait CallArgs: Debug {
    /// `true` for the empty tuple: no `args:` block is written.
    fn is_empty(&self) -> bool;
}

/// Extend an argument tuple with a trailing value.
pub trait Append<K> {
    type Extended;

    fn append(self, value: K) -> Self::Extended;
}

macro_rules! tuple_impls {
    ($($name:ident)*) => {
        impl<Func, Out, $($name,)*> Invoke<($($name,)*)> for Func
        where
            Func: Fn($($name),*) -> Out,
        {
            type Output = Out;

            #[allow(non_snake_case)]
            fn invoke(&self, ($($name,)*): ($($name,)*)) -> Out {
                (self)($($name),*)
            }
        }

        impl<$($name: Debug,)*> CallArgs for ($($name,)*) {
            fn is_empty(&self) -> bool {
                let names: &[&str] = &[$(stringify!($name)),*];
                names.is_empty()
            }
        }

        impl<Kw, $($name,)*> Append<Kw> for ($($name,)*) {
            type Extended = ($($name,)* Kw,);

            #[allow(non_snake_case)]
            fn append(self, value: Kw) -> Self::Extended {
                let ($($name,)*) = self;
                ($($name,)* value,)
            }
        }
    };
}

tuple_impls!();
tuple_impls!(A);
tuple_impls!(A B);
tuple_impls!(A B C);
tuple_impls!(A B C D);
tuple_impls!(A B C D E);
tuple_impls!(A B C D E G);
tuple_impls!(A B C D E G H);
tuple_impls!(A B C D E G H J);

/// A function whose invocations are written to a [`Tracer`].
///
/// Each call holds the tracer's write lock from the `[FUNC]` line until the
/// `return:` dump, including the wrapped call itself, so the lines of one
/// invocation are never split by another thread. The price is that recorded
/// functions sharing a tracer run one at a time. The lock is reentrant, so a
/// recorded function may log or call other recorded functions.
pub struct Recorded<F> {
    tracer: Arc<Tracer>,
    module: Cow<'static, str>,
    name: Cow<'static, str>,
    func: F,
}

impl<F> Recorded<F> {
    pub(crate) fn new(
        tracer: Arc<Tracer>,
        module: Cow<'static, str>,
        name: Cow<'static, str>,
        func: F,
    ) -> Self {
        Self {
            tracer,
            module,
            name,
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module the function was defined in.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The wrapped function, for calls that should not be traced.
    pub fn inner(&self) -> &F {
        &self.func
    }

    /// Call with positional arguments; the caller is the source location.
    #[track_caller]
    pub fn call<A>(&self, args: A) -> <F as Invoke<A>>::Output
    where
        F: Invoke<A>,
        A: CallArgs,
        <F as Invoke<A>>::Output: Debug,
    {
        self.call_from(&CallerContext::caller(), args)
    }

    /// Call with positional arguments on behalf of `caller`.
    pub fn call_from<A>(&self, caller: &CallerContext, args: A) -> <F as Invoke<A>>::Output
    where
        F: Invoke<A>,
        A: CallArgs,
        <F as Invoke<A>>::Output: Debug,
    {
        let _guard = self.tracer.acquire();
        self.enter(caller, &args);
        let result = self.func.invoke(args);
        self.leave(result)
    }

    /// Call with positional arguments plus a trailing keyword argument value.
    #[track_caller]
    pub fn call_kw<A, K>(
        &self,
        args: A,
        kwargs: K,
    ) -> <F as Invoke<<A as Append<K>>::Extended>>::Output
    where
        A: CallArgs + Append<K>,
        K: Debug,
        F: Invoke<<A as Append<K>>::Extended>,
        <F as Invoke<<A as Append<K>>::Extended>>::Output: Debug,
    {
        self.call_kw_from(&CallerContext::caller(), args, kwargs)
    }

    /// Keyword-argument call on behalf of `caller`.
    pub fn call_kw_from<A, K>(
        &self,
        caller: &CallerContext,
        args: A,
        kwargs: K,
    ) -> <F as Invoke<<A as Append<K>>::Extended>>::Output
    where
        A: CallArgs + Append<K>,
        K: Debug,
        F: Invoke<<A as Append<K>>::Extended>,
        <F as Invoke<<A as Append<K>>::Extended>>::Output: Debug,
    {
        let _guard = self.tracer.acquire();
        self.enter(caller, &args);
        let rendered = dump::render(&kwargs);
        if !dump::is_absent::<K>(&rendered) {
            self.tracer.emit_block("kwargs", &rendered);
        }
        let result = self.func.invoke(args.append(kwargs));
        self.leave(result)
    }

    fn enter<A: CallArgs>(&self, caller: &CallerContext, args: &A) {
        self.tracer
            .emit(&LogEntry::function(&self.module, caller, &self.name));
        if !args.is_empty() {
            self.tracer.emit_block("args", &dump::render(args));
        }
    }

    fn leave<R: Debug>(&self, result: R) -> R {
        let rendered = dump::render(&result);
        if !dump::is_absent::<R>(&rendered) {
            self.tracer.emit_block("return", &rendered);
        }
        result
    }
}

impl<F: Clone> Clone for Recorded<F> {
    fn clone(&self) -> Self {
        Self {
            tracer: Arc::clone(&self.tracer),
            module: self.module.clone(),
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<F> Debug for Recorded<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorded")
            .field("module", &self.module)
            .field("name", &self.name)
            .finish()
    }
}
