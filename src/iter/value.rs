//! The type-erased resume channel.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::rc::Rc;

use crate::Fault;

/// A cheaply cloneable, type-erased value passed into [`Suspension::resume`].
///
/// Every interpreter answers a suspension with a `Value`; the suspended
/// primitive recovers the concrete type with [`Value::take`]. Wrapping a
/// `Value` in a `Value` is a no-op, so forwarding layers never nest.
///
/// [`Suspension::resume`]: super::Suspension::resume
///
/// # Examples
///
/// ```rust
/// use nano_effect::Value;
///
/// let value = Value::new(String::from("hello"));
/// let again = Value::new(value.clone());
///
/// assert_eq!(again.take::<String>(), Ok(String::from("hello")));
/// assert!(value.take::<i32>().is_err());
/// ```
#[derive(Clone)]
pub struct Value(Rc<dyn Any>);

impl Value {
    /// Erases `value`, returning it unchanged if it is already a `Value`.
    pub fn new<T: Any>(value: T) -> Self {
        let boxed: Box<dyn Any> = Box::new(value);
        match boxed.downcast::<Self>() {
            Ok(value) => *value,
            Err(boxed) => Self(Rc::from(boxed)),
        }
    }

    /// The value resumed into a computation that does not care about its input.
    #[inline]
    pub fn unit() -> Self {
        Self::new(())
    }

    /// Returns `true` if the erased value has type `T`.
    ///
    /// Every value is a `Value`, so `is::<Value>()` is always `true`.
    pub fn is<T: Any>(&self) -> bool {
        TypeId::of::<T>() == TypeId::of::<Self>() || self.0.is::<T>()
    }

    /// Borrows the erased value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Recovers the concrete value, cloning only when other handles share it.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::ResumeMismatch`] when the erased value is not a `T`.
    pub fn take<T: Any + Clone>(self) -> Result<T, Fault> {
        if TypeId::of::<T>() == TypeId::of::<Self>() {
            let boxed: Box<dyn Any> = Box::new(self);
            return boxed
                .downcast::<T>()
                .map(|value| *value)
                .map_err(|_| mismatch::<T>());
        }
        Rc::downcast::<T>(self.0)
            .map(Rc::unwrap_or_clone)
            .map_err(|_| mismatch::<T>())
    }
}

fn mismatch<T>() -> Fault {
    Fault::ResumeMismatch {
        expected: type_name::<T>(),
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::unit()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is::<()>() {
            formatter.write_str("Value(())")
        } else {
            formatter.write_str("Value(..)")
        }
    }
}
