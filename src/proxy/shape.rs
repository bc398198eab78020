//! Per-type member tables.
//!
//! A [`Shape`] lists the fields and methods of one instrumented type together
//! with the functions that read, write, delete and invoke them. It is built
//! once per type by [`Instrumented::describe`] and memoized by `TypeId`, so
//! every proxy of that type shares one table.

use crate::core::error::AccessError;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Types whose members can be reached through a [`Proxy`](super::Proxy).
///
/// ```
/// use seshat::{Instrumented, Shape};
///
/// struct Person {
///     name: String,
///     age: u32,
/// }
///
/// impl Instrumented for Person {
///     fn describe(shape: &mut Shape<Self>) {
///         shape
///             .field("name", |p| &p.name, |p, v| p.name = v)
///             .field("age", |p| &p.age, |p, v| p.age = v)
///             .method("info", |p, _| Ok(format!("{} is {}", p.name, p.age)));
///     }
/// }
/// ```
pub trait Instrumented: Send + Sync + Sized + 'static {
    fn describe(shape: &mut Shape<Self>);
}

type Getter<T> = Box<dyn Fn(&T) -> Result<Option<Value>, String> + Send + Sync>;
type Setter<T> = Box<dyn Fn(&mut T, Value) -> Result<(), String> + Send + Sync>;
type Deleter<T> = Box<dyn Fn(&mut T) + Send + Sync>;
type SharedMethod<T> = Box<dyn Fn(&T, &Args<'_>) -> Result<Value, AccessError> + Send + Sync>;
type ExclusiveMethod<T> =
    Box<dyn Fn(&mut T, &Args<'_>) -> Result<Value, AccessError> + Send + Sync>;

struct Field<T> {
    get: Getter<T>,
    set: Option<Setter<T>>,
    delete: Option<Deleter<T>>,
}

enum Method<T> {
    /// Runs under a shared borrow of the target.
    Shared(SharedMethod<T>),
    /// Runs under an exclusive borrow of the target.
    Exclusive(ExclusiveMethod<T>),
}

/// Outcome of resolving a member name on a target.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Field(Value),
    Method(&'static str),
}

/// Member table of `T`.
pub struct Shape<T> {
    type_name: &'static str,
    wrapper_name: String,
    fields: IndexMap<&'static str, Field<T>>,
    methods: IndexMap<&'static str, Method<T>>,
}

static SHAPES: OnceLock<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> = OnceLock::new();

impl<T: Instrumented> Shape<T> {
    /// Cached table for `T`, described on first use.
    pub fn of() -> Arc<Self> {
        let cache = SHAPES.get_or_init(|| RwLock::new(HashMap::new()));
        let key = TypeId::of::<T>();
        let cached = cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();
        if let Some(shape) = cached.and_then(|entry| entry.downcast::<Self>().ok()) {
            return shape;
        }

        // Described outside the lock: `describe` may look up other shapes.
        let built: Arc<dyn Any + Send + Sync> = Arc::new(Self::build());
        let entry = cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(built)
            .clone();
        match entry.downcast::<Self>() {
            Ok(shape) => {
                tracing::debug!(type_name = shape.type_name, "member table cached");
                shape
            }
            Err(_) => Arc::new(Self::build()),
        }
    }

    fn build() -> Self {
        let mut shape = Shape {
            type_name: std::any::type_name::<T>(),
            wrapper_name: String::new(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
        };
        T::describe(&mut shape);
        shape.wrapper_name = format!("Proxy<{}>", short_type_name(shape.type_name));
        shape
    }
}

impl<T: 'static> Shape<T> {
    /// Override the type name reported in errors and log lines.
    pub fn named(&mut self, name: &'static str) -> &mut Self {
        self.type_name = name;
        self
    }

    /// Readable and writable field.
    pub fn field<V, G, S>(&mut self, name: &'static str, get: G, set: S) -> &mut Self
    where
        V: Serialize + DeserializeOwned + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        self.fields.insert(
            name,
            Field {
                get: Box::new(move |target| to_value(get(target)).map(Some)),
                set: Some(Box::new(move |target, value| {
                    let value = from_value::<V>(value)?;
                    set(target, value);
                    Ok(())
                })),
                delete: None,
            },
        );
        self
    }

    /// Field that can be read but not assigned.
    pub fn readonly<V, G>(&mut self, name: &'static str, get: G) -> &mut Self
    where
        V: Serialize + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
    {
        self.fields.insert(
            name,
            Field {
                get: Box::new(move |target| to_value(get(target)).map(Some)),
                set: None,
                delete: None,
            },
        );
        self
    }

    /// Field that may be absent. Deleting it sets it to `None`, and an absent
    /// field reads as a missing member.
    pub fn optional<V, G, M>(&mut self, name: &'static str, get: G, get_mut: M) -> &mut Self
    where
        V: Serialize + DeserializeOwned + 'static,
        G: Fn(&T) -> &Option<V> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<V> + Send + Sync + 'static,
    {
        let get_mut = Arc::new(get_mut);
        let clear = Arc::clone(&get_mut);
        self.fields.insert(
            name,
            Field {
                get: Box::new(move |target| get(target).as_ref().map(to_value).transpose()),
                set: Some(Box::new(move |target, value| {
                    *get_mut(target) = from_value::<Option<V>>(value)?;
                    Ok(())
                })),
                delete: Some(Box::new(move |target| {
                    *clear(target) = None;
                })),
            },
        );
        self
    }

    /// Method that only needs to read the target.
    pub fn method<V, M>(&mut self, name: &'static str, body: M) -> &mut Self
    where
        V: Serialize + 'static,
        M: Fn(&T, &Args<'_>) -> Result<V, AccessError> + Send + Sync + 'static,
    {
        self.methods.insert(
            name,
            Method::Shared(Box::new(move |target, args| {
                let result = body(target, args)?;
                result_value(args, result)
            })),
        );
        self
    }

    /// Method that mutates the target.
    pub fn method_mut<V, M>(&mut self, name: &'static str, body: M) -> &mut Self
    where
        V: Serialize + 'static,
        M: Fn(&mut T, &Args<'_>) -> Result<V, AccessError> + Send + Sync + 'static,
    {
        self.methods.insert(
            name,
            Method::Exclusive(Box::new(move |target, args| {
                let result = body(target, args)?;
                result_value(args, result)
            })),
        );
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Composite name used in access lines, e.g. `Proxy<Person>`.
    pub fn wrapper_name(&self) -> &str {
        &self.wrapper_name
    }

    pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.keys().copied()
    }

    pub fn method_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.methods.contains_key(name)
    }

    /// Resolve `name` on `target`: a field value or a method marker.
    pub fn resolve(&self, target: &T, name: &str) -> Result<Attribute, AccessError> {
        if let Some(field) = self.fields.get(name) {
            return match (field.get)(target) {
                Ok(Some(value)) => Ok(Attribute::Field(value)),
                Ok(None) => Err(self.missing(name)),
                Err(reason) => Err(self.invalid(name, reason)),
            };
        }
        match self.methods.get_key_value(name) {
            Some((key, _)) => Ok(Attribute::Method(key)),
            None => Err(self.missing(name)),
        }
    }

    /// Assign `value` to field `name` of `target`.
    pub fn assign(&self, target: &mut T, name: &str, value: Value) -> Result<(), AccessError> {
        let set = self.setter(name)?;
        set(target, value).map_err(|reason| self.invalid(name, reason))
    }

    /// Fails with the error [`assign`](Shape::assign) would raise when `name`
    /// cannot be assigned at all.
    pub fn check_assignable(&self, name: &str) -> Result<(), AccessError> {
        self.setter(name).map(|_| ())
    }

    fn setter(&self, name: &str) -> Result<&Setter<T>, AccessError> {
        match self.fields.get(name) {
            Some(Field { set: Some(set), .. }) => Ok(set),
            Some(_) => Err(AccessError::ReadOnly {
                type_name: self.type_name,
                member: name.to_string(),
            }),
            None if self.methods.contains_key(name) => Err(AccessError::ReadOnly {
                type_name: self.type_name,
                member: name.to_string(),
            }),
            None => Err(self.missing(name)),
        }
    }

    /// Delete field `name` of `target`.
    pub fn remove(&self, target: &mut T, name: &str) -> Result<(), AccessError> {
        match self.fields.get(name) {
            Some(field) => {
                if matches!((field.get)(target), Ok(None)) {
                    return Err(self.missing(name));
                }
                match &field.delete {
                    Some(delete) => {
                        delete(target);
                        Ok(())
                    }
                    None => Err(self.undeletable(name)),
                }
            }
            None if self.methods.contains_key(name) => Err(self.undeletable(name)),
            None => Err(self.missing(name)),
        }
    }

    /// Invoke method `name` on a shared target, taking the lock the method needs.
    pub(crate) fn invoke_locked(
        &self,
        target: &RwLock<T>,
        name: &str,
        values: &[Value],
    ) -> Result<Value, AccessError> {
        match self.methods.get_key_value(name) {
            Some((key, Method::Shared(body))) => {
                let guard = target.read().unwrap_or_else(PoisonError::into_inner);
                body(&guard, &Args::new(self.type_name, key, values))
            }
            Some((key, Method::Exclusive(body))) => {
                let mut guard = target.write().unwrap_or_else(PoisonError::into_inner);
                body(&mut guard, &Args::new(self.type_name, key, values))
            }
            None => Err(self.not_invocable(name)),
        }
    }

    /// Invoke method `name` on a target the caller already borrows mutably.
    pub fn invoke(&self, target: &mut T, name: &str, values: &[Value]) -> Result<Value, AccessError> {
        match self.methods.get_key_value(name) {
            Some((key, Method::Shared(body))) => body(target, &Args::new(self.type_name, key, values)),
            Some((key, Method::Exclusive(body))) => {
                body(target, &Args::new(self.type_name, key, values))
            }
            None => Err(self.not_invocable(name)),
        }
    }

    fn not_invocable(&self, name: &str) -> AccessError {
        if self.fields.contains_key(name) {
            AccessError::NotCallable {
                type_name: self.type_name,
                member: name.to_string(),
            }
        } else {
            self.missing(name)
        }
    }

    fn missing(&self, name: &str) -> AccessError {
        AccessError::MissingMember {
            type_name: self.type_name,
            member: name.to_string(),
        }
    }

    fn undeletable(&self, name: &str) -> AccessError {
        AccessError::Undeletable {
            type_name: self.type_name,
            member: name.to_string(),
        }
    }

    fn invalid(&self, name: &str, reason: String) -> AccessError {
        AccessError::InvalidValue {
            type_name: self.type_name,
            member: name.to_string(),
            reason,
        }
    }
}

/// Arguments handed to a method body.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    type_name: &'static str,
    method: &'a str,
    values: &'a [Value],
}

impl<'a> Args<'a> {
    pub fn new(type_name: &'static str, method: &'a str, values: &'a [Value]) -> Self {
        Self {
            type_name,
            method,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn method(&self) -> &str {
        self.method
    }

    /// Argument at `index` converted to `V`.
    pub fn get<V: DeserializeOwned>(&self, index: usize) -> Result<V, AccessError> {
        let raw = self
            .values
            .get(index)
            .ok_or_else(|| AccessError::MissingArgument {
                type_name: self.type_name,
                method: self.method.to_string(),
                index,
            })?;
        serde_json::from_value(raw.clone()).map_err(|err| AccessError::InvalidArgument {
            type_name: self.type_name,
            method: self.method.to_string(),
            index,
            reason: err.to_string(),
        })
    }

    /// Argument at `index`, or `default` when it was not supplied.
    pub fn get_or<V: DeserializeOwned>(&self, index: usize, default: V) -> Result<V, AccessError> {
        if index < self.values.len() {
            self.get(index)
        } else {
            Ok(default)
        }
    }
}

/// Reflective member access on an unwrapped value.
///
/// Goes through the same [`Shape`] as a proxy without logging, so both paths
/// report identical failures.
pub trait Members: Instrumented {
    fn attribute(&self, name: &str) -> Result<Attribute, AccessError> {
        Shape::<Self>::of().resolve(self, name)
    }

    /// Value of field `name`.
    fn member(&self, name: &str) -> Result<Value, AccessError> {
        let shape = Shape::<Self>::of();
        match shape.resolve(self, name)? {
            Attribute::Field(value) => Ok(value),
            Attribute::Method(method) => Err(AccessError::NotAField {
                type_name: shape.type_name(),
                member: method.to_string(),
            }),
        }
    }

    fn set_member<V: Serialize>(&mut self, name: &str, value: V) -> Result<(), AccessError> {
        let shape = Shape::<Self>::of();
        let value = serde_json::to_value(value).map_err(|err| AccessError::InvalidValue {
            type_name: shape.type_name(),
            member: name.to_string(),
            reason: err.to_string(),
        })?;
        shape.assign(self, name, value)
    }

    fn delete_member(&mut self, name: &str) -> Result<(), AccessError> {
        Shape::<Self>::of().remove(self, name)
    }

    fn call_member(&mut self, name: &str, args: &[Value]) -> Result<Value, AccessError> {
        Shape::<Self>::of().invoke(self, name, args)
    }
}

impl<T: Instrumented> Members for T {}

fn to_value<V: Serialize + ?Sized>(value: &V) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|err| err.to_string())
}

fn from_value<V: DeserializeOwned>(value: Value) -> Result<V, String> {
    serde_json::from_value(value).map_err(|err| err.to_string())
}

fn result_value<V: Serialize>(args: &Args<'_>, result: V) -> Result<Value, AccessError> {
    serde_json::to_value(result).map_err(|err| AccessError::InvalidValue {
        type_name: args.type_name,
        member: args.method.to_string(),
        reason: err.to_string(),
    })
}

/// Strip module paths: `alloc::vec::Vec<app::Person>` becomes `Vec<Person>`.
pub(crate) fn short_type_name(full: &str) -> String {
    let mut short = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            short.push_str(last_segment(&segment));
            segment.clear();
            short.push(ch);
        }
    }
    short.push_str(last_segment(&segment));
    short
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}
