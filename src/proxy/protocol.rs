//! Standard traits forwarded from a proxy to its target.
//!
//! None of these write log lines. Binary operators take `&Proxy<T>` and
//! produce a fresh `T::Output` from a clone of the target; compound
//! assignment mutates the target in place.

use super::{Instrumented, Proxy};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

impl<T: Instrumented> Proxy<T> {
    /// Run `f` with both targets read-locked, in address order.
    fn with_pair<R>(&self, other: &Self, f: impl FnOnce(&T, &T) -> R) -> R {
        if Proxy::ptr_eq(self, other) {
            let guard = self.read_target();
            return f(&guard, &guard);
        }
        let (first, second) = if self.target_addr() < other.target_addr() {
            (self, other)
        } else {
            (other, self)
        };
        let first_guard = first.read_target();
        let second_guard = second.read_target();
        if std::ptr::eq(first, self) {
            f(&first_guard, &second_guard)
        } else {
            f(&second_guard, &first_guard)
        }
    }

    fn target_addr(&self) -> usize {
        std::sync::Arc::as_ptr(&self.inner.target) as *const () as usize
    }

    /// Owned copy of `target[index]`.
    pub fn item<I>(&self, index: I) -> <<T as Index<I>>::Output as ToOwned>::Owned
    where
        T: Index<I>,
        <T as Index<I>>::Output: ToOwned,
    {
        self.read_target()[index].to_owned()
    }

    /// Replace `target[index]` with `value`.
    pub fn set_item<I, V>(&self, index: I, value: V)
    where
        T: std::ops::IndexMut<I, Output = V>,
    {
        self.write_target()[index] = value;
    }

    pub fn len(&self) -> usize
    where
        for<'a> &'a T: IntoIterator,
        for<'a> <&'a T as IntoIterator>::IntoIter: ExactSizeIterator,
    {
        (&*self.read_target()).into_iter().len()
    }

    pub fn is_empty(&self) -> bool
    where
        for<'a> &'a T: IntoIterator,
        for<'a> <&'a T as IntoIterator>::IntoIter: ExactSizeIterator,
    {
        self.len() == 0
    }

    /// Membership test over the target's elements.
    pub fn contains<E>(&self, element: &E) -> bool
    where
        E: PartialEq + 'static,
        for<'a> &'a T: IntoIterator<Item = &'a E>,
    {
        (&*self.read_target()).into_iter().any(|item| item == element)
    }

    /// Elements of the target, cloned in iteration order.
    pub fn to_vec<E>(&self) -> Vec<E>
    where
        E: Clone + 'static,
        for<'a> &'a T: IntoIterator<Item = &'a E>,
    {
        (&*self.read_target()).into_iter().cloned().collect()
    }

    /// Convert a copy of the target, e.g. to a number or a string.
    pub fn convert<N>(&self) -> N
    where
        T: Clone + Into<N>,
    {
        self.snapshot().into()
    }
}

impl<T: Instrumented + PartialEq> PartialEq for Proxy<T> {
    fn eq(&self, other: &Self) -> bool {
        self.with_pair(other, |a, b| a == b)
    }
}

impl<T: Instrumented + Eq> Eq for Proxy<T> {}

impl<T: Instrumented + PartialEq> PartialEq<T> for Proxy<T> {
    fn eq(&self, other: &T) -> bool {
        *self.read_target() == *other
    }
}

impl<T: Instrumented + PartialOrd> PartialOrd for Proxy<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.with_pair(other, |a, b| a.partial_cmp(b))
    }
}

impl<T: Instrumented + PartialOrd> PartialOrd<T> for Proxy<T> {
    fn partial_cmp(&self, other: &T) -> Option<Ordering> {
        self.read_target().partial_cmp(other)
    }
}

impl<T: Instrumented + Ord> Ord for Proxy<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.with_pair(other, |a, b| a.cmp(b))
    }
}

impl<T: Instrumented + Hash> Hash for Proxy<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.read_target().hash(state);
    }
}

impl<T: Instrumented + fmt::Display> fmt::Display for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.read_target(), f)
    }
}

impl<T: Instrumented + fmt::Debug> fmt::Debug for Proxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.read_target(), f)
    }
}

macro_rules! forward_binary_ops {
    ($($trait:ident $method:ident),* $(,)?) => {
        $(
            impl<T, Rhs> std::ops::$trait<Rhs> for &Proxy<T>
            where
                T: Instrumented + Clone + std::ops::$trait<Rhs>,
            {
                type Output = <T as std::ops::$trait<Rhs>>::Output;

                fn $method(self, rhs: Rhs) -> Self::Output {
                    std::ops::$trait::$method(self.snapshot(), rhs)
                }
            }
        )*
    };
}

macro_rules! forward_assign_ops {
    ($($trait:ident $method:ident),* $(,)?) => {
        $(
            impl<T, Rhs> std::ops::$trait<Rhs> for Proxy<T>
            where
                T: Instrumented + std::ops::$trait<Rhs>,
            {
                fn $method(&mut self, rhs: Rhs) {
                    std::ops::$trait::$method(&mut *self.write_target(), rhs);
                }
            }
        )*
    };
}

macro_rules! forward_unary_ops {
    ($($trait:ident $method:ident),* $(,)?) => {
        $(
            impl<T> std::ops::$trait for &Proxy<T>
            where
                T: Instrumented + Clone + std::ops::$trait,
            {
                type Output = <T as std::ops::$trait>::Output;

                fn $method(self) -> Self::Output {
                    std::ops::$trait::$method(self.snapshot())
                }
            }
        )*
    };
}

forward_binary_ops!(
    Add add,
    Sub sub,
    Mul mul,
    Div div,
    Rem rem,
    BitAnd bitand,
    BitOr bitor,
    BitXor bitxor,
    Shl shl,
    Shr shr,
);

forward_assign_ops!(
    AddAssign add_assign,
    SubAssign sub_assign,
    MulAssign mul_assign,
    DivAssign div_assign,
    RemAssign rem_assign,
    BitAndAssign bitand_assign,
    BitOrAssign bitor_assign,
    BitXorAssign bitxor_assign,
    ShlAssign shl_assign,
    ShrAssign shr_assign,
);

forward_unary_ops!(Neg neg, Not not);
