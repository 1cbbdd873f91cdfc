//! Leaf suspensions: the only places where values enter the protocol.
//!
//! Every primitive ignores the input of its first `resume` and keeps
//! answering with the same completion once it has completed.

use std::any::Any;
use std::marker::PhantomData;

use super::{Resumed, Step, Suspension, Value};
use crate::Fault;

// =============================================================================
// Once
// =============================================================================

/// Yields a single value, then completes with the value it was resumed with.
///
/// Created by [`once`].
#[derive(Debug, Clone)]
pub struct Once<Y, R> {
    pending: Option<Y>,
    completed: Option<R>,
}

/// Suspends once on `value` and completes with the resume answer, typed as `R`.
///
/// The first completion is frozen: later resumptions return it again no
/// matter what they supply.
///
/// # Examples
///
/// ```rust
/// use nano_effect::iter::{Step, Suspension, once};
/// use nano_effect::Value;
///
/// let mut ask = once::<u8, _>("how many?");
/// assert_eq!(ask.resume(Value::unit()), Ok(Step::Yield("how many?")));
/// assert_eq!(ask.resume(Value::new(3_u8)), Ok(Step::Done(3)));
/// assert_eq!(ask.resume(Value::new(9_u8)), Ok(Step::Done(3)));
/// ```
#[inline]
pub const fn once<R, Y>(value: Y) -> Once<Y, R> {
    Once {
        pending: Some(value),
        completed: None,
    }
}

impl<Y, R> Suspension for Once<Y, R>
where
    R: Any + Clone,
{
    type Yield = Y;
    type Output = R;

    fn resume(&mut self, input: Value) -> Resumed<Y, R> {
        if let Some(value) = self.pending.take() {
            return Ok(Step::Yield(value));
        }
        if let Some(completed) = &self.completed {
            return Ok(Step::Done(completed.clone()));
        }
        let answer = input.take::<R>()?;
        self.completed = Some(answer.clone());
        Ok(Step::Done(answer))
    }

    fn cancel(&mut self, value: R) -> Resumed<Y, R> {
        self.pending = None;
        self.completed = Some(value.clone());
        Ok(Step::Done(value))
    }
}

// =============================================================================
// Success
// =============================================================================

/// Completes immediately with a stored value.
///
/// Created by [`success`].
#[derive(Debug, Clone)]
pub struct Success<Y, A> {
    value: A,
    _yield: PhantomData<fn() -> Y>,
}

/// Completes with `value` without ever suspending.
///
/// # Examples
///
/// ```rust
/// use nano_effect::iter::{Step, Suspension, success};
/// use nano_effect::Value;
///
/// let mut pure = success::<(), _>(5);
/// assert_eq!(pure.resume(Value::unit()), Ok(Step::Done(5)));
/// assert_eq!(pure.resume(Value::unit()), Ok(Step::Done(5)));
/// ```
#[inline]
pub const fn success<Y, A>(value: A) -> Success<Y, A> {
    Success {
        value,
        _yield: PhantomData,
    }
}

impl<Y, A: Clone> Suspension for Success<Y, A> {
    type Yield = Y;
    type Output = A;

    #[inline]
    fn resume(&mut self, _input: Value) -> Resumed<Y, A> {
        Ok(Step::Done(self.value.clone()))
    }
}

// =============================================================================
// Thunk
// =============================================================================

/// Completes immediately with the result of a thunk.
///
/// Created by [`sync`].
pub struct Thunk<Y, F> {
    thunk: F,
    _yield: PhantomData<fn() -> Y>,
}

/// Completes with `thunk()` without ever suspending.
///
/// The thunk runs on every `resume`, never at construction.
///
/// # Examples
///
/// ```rust
/// use nano_effect::iter::{Step, Suspension, sync};
/// use nano_effect::Value;
///
/// let mut now = sync::<(), _, _>(|| 2 + 2);
/// assert_eq!(now.resume(Value::unit()), Ok(Step::Done(4)));
/// ```
#[inline]
pub const fn sync<Y, A, F>(thunk: F) -> Thunk<Y, F>
where
    F: FnMut() -> A,
{
    Thunk {
        thunk,
        _yield: PhantomData,
    }
}

impl<Y, A, F> Suspension for Thunk<Y, F>
where
    F: FnMut() -> A,
{
    type Yield = Y;
    type Output = A;

    #[inline]
    fn resume(&mut self, _input: Value) -> Resumed<Y, A> {
        Ok(Step::Done((self.thunk)()))
    }
}

// =============================================================================
// FromResult / Raise
// =============================================================================

/// Completes with the `Ok` value or raises the `Err` fault.
///
/// Created by [`from_result`].
#[derive(Debug, Clone)]
pub struct FromResult<Y, A> {
    result: Result<A, Fault>,
    _yield: PhantomData<fn() -> Y>,
}

/// Lifts a fallible value into a suspension that never yields.
#[inline]
pub const fn from_result<Y, A>(result: Result<A, Fault>) -> FromResult<Y, A> {
    FromResult {
        result,
        _yield: PhantomData,
    }
}

impl<Y, A: Clone> Suspension for FromResult<Y, A> {
    type Yield = Y;
    type Output = A;

    #[inline]
    fn resume(&mut self, _input: Value) -> Resumed<Y, A> {
        self.result.clone().map(Step::Done)
    }
}

/// Raises a fault on every resumption.
///
/// Created by [`raise`].
#[derive(Debug, Clone)]
pub struct Raise<Y, A> {
    fault: Fault,
    _marker: PhantomData<fn() -> (Y, A)>,
}

/// A suspension that fails with `fault` as soon as it is driven.
///
/// # Examples
///
/// ```rust
/// use nano_effect::iter::{Suspension, raise};
/// use nano_effect::{Fault, Value};
///
/// let mut broken = raise::<(), i32>(Fault::TagNotFound { name: "Db" });
/// assert_eq!(broken.resume(Value::unit()), Err(Fault::TagNotFound { name: "Db" }));
/// ```
#[inline]
pub const fn raise<Y, A>(fault: Fault) -> Raise<Y, A> {
    Raise {
        fault,
        _marker: PhantomData,
    }
}

impl<Y, A> Suspension for Raise<Y, A> {
    type Yield = Y;
    type Output = A;

    #[inline]
    fn resume(&mut self, _input: Value) -> Resumed<Y, A> {
        Err(self.fault.clone())
    }
}
