use super::{Instrumented, Proxy, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Proxies owned by one tracer, keyed by target identity.
///
/// Each entry keeps its target alive, so an address is never reused while
/// it is a key.
pub(crate) struct ProxyRegistry {
    entries: Mutex<HashMap<usize, Box<dyn Any + Send + Sync>>>,
}

impl ProxyRegistry {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Existing proxy for `target`, or the one `create` builds, registered.
    pub(crate) fn lookup_or_create<T, F>(&self, target: &Shared<T>, create: F) -> Proxy<T>
    where
        T: Instrumented,
        F: FnOnce() -> Proxy<T>,
    {
        let key = identity(target);
        let mut entries = self.entries();
        if let Some(existing) = entries
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<Proxy<T>>())
        {
            return existing.clone();
        }

        let proxy = create();
        tracing::debug!(
            wrapper = proxy.wrapper_name(),
            registered = entries.len() + 1,
            "proxy registered"
        );
        entries.insert(key, Box::new(proxy.clone()));
        proxy
    }

    pub(crate) fn contains<T>(&self, target: &Shared<T>) -> bool {
        self.entries().contains_key(&identity(target))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries().len()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<usize, Box<dyn Any + Send + Sync>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn identity<T>(target: &Shared<T>) -> usize {
    Arc::as_ptr(target) as *const () as usize
}
