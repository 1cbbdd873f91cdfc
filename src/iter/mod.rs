//! The suspension protocol and its combinator algebra.
//!
//! A [`Suspension`] is a resumable computation: every call to
//! [`resume`](Suspension::resume) either suspends with an intermediate value
//! ([`Step::Yield`]) or completes with a result ([`Step::Done`]). The value
//! passed to the next `resume` call answers the last suspension.
//!
//! Instances are mutable and single-use; re-runnable computations are built
//! with [`Nano`](crate::nano::Nano), which produces a fresh instance per run.
//!
//! # Operations
//!
//! - [`Suspension::resume`]: supply a value for the last suspension and advance
//! - [`Suspension::throw`]: inject a [`Fault`] at the suspension point
//! - [`Suspension::cancel`]: request early completion with a given result
//! - [`Suspension::close`]: release registered cleanup without a result
//!
//! # Combinators
//!
//! - [`Suspension::map`]: transform the completion value
//! - [`Suspension::map_yield`]: transform every yielded value
//! - [`Suspension::map_both`]: transform both channels in one node
//! - [`Suspension::flat_map`]: splice a second instance after completion
//! - [`Suspension::flat_map_yield`]: answer every yield with a whole instance
//!
//! Adjacent single-channel maps fuse into one node (see [`Map`], [`MapYield`]
//! and [`MapBoth`]).
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::iter::{Step, Suspension, once};
//! use nano_effect::Value;
//!
//! let mut ask = once::<i32, _>("question").map(|answer| answer * 2);
//!
//! assert_eq!(ask.resume(Value::unit()), Ok(Step::Yield("question")));
//! assert_eq!(ask.resume(Value::new(21)), Ok(Step::Done(42)));
//! ```

mod flat_map;
mod guard;
mod map;
mod primitive;
mod value;

pub use flat_map::{FlatMap, FlatMapYield};
pub use guard::{Ensure, Rescue};
pub use map::{Map, MapBoth, MapYield};
pub use primitive::{FromResult, Once, Raise, Success, Thunk, from_result, once, raise, success, sync};
pub use value::Value;

use crate::Fault;

/// The observable state of a suspension after one step.
///
/// # Examples
///
/// ```rust
/// use nano_effect::Step;
///
/// let step: Step<&str, i32> = Step::Done(1);
/// assert!(step.is_done());
/// assert_eq!(step.map_done(|x| x + 1), Step::Done(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step<Y, R> {
    /// The computation is suspended on this value.
    Yield(Y),
    /// The computation has completed with this value.
    Done(R),
}

impl<Y, R> Step<Y, R> {
    /// Returns `true` if the step is `Yield`.
    #[inline]
    pub const fn is_yield(&self) -> bool {
        matches!(self, Self::Yield(_))
    }

    /// Returns `true` if the step is `Done`.
    #[inline]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// Transforms the yielded value, leaving a completion untouched.
    #[inline]
    pub fn map_yield<Y2, F>(self, f: F) -> Step<Y2, R>
    where
        F: FnOnce(Y) -> Y2,
    {
        match self {
            Self::Yield(value) => Step::Yield(f(value)),
            Self::Done(value) => Step::Done(value),
        }
    }

    /// Transforms the completion value, leaving a yield untouched.
    #[inline]
    pub fn map_done<R2, F>(self, f: F) -> Step<Y, R2>
    where
        F: FnOnce(R) -> R2,
    {
        match self {
            Self::Yield(value) => Step::Yield(value),
            Self::Done(value) => Step::Done(f(value)),
        }
    }

    /// Returns the yielded value, if any.
    #[inline]
    pub fn yielded(self) -> Option<Y> {
        match self {
            Self::Yield(value) => Some(value),
            Self::Done(_) => None,
        }
    }

    /// Returns the completion value, if any.
    #[inline]
    pub fn done(self) -> Option<R> {
        match self {
            Self::Yield(_) => None,
            Self::Done(value) => Some(value),
        }
    }
}

/// The result of driving a suspension one step.
///
/// `Err` carries a [`Fault`], the programmer-error channel.
pub type Resumed<Y, R> = Result<Step<Y, R>, Fault>;

/// A boxed, type-erased suspension.
pub type BoxSuspension<Y, R> = Box<dyn Suspension<Yield = Y, Output = R>>;

/// A resumable computation that yields `Yield` values and completes with `Output`.
///
/// Only [`resume`](Self::resume) is required. The other operations have
/// defaults that match a computation with no cleanup and no way to handle
/// injected faults: `throw` re-raises, `cancel` closes and completes with the
/// given value, `close` does nothing. Combinators forward each operation to
/// whichever inner instance is currently active.
///
/// # Examples
///
/// A hand-written state machine that asks for two numbers and adds them:
///
/// ```rust
/// use nano_effect::iter::{Resumed, Step, Suspension};
/// use nano_effect::Value;
///
/// #[derive(Default)]
/// struct Sum {
///     seen: Vec<i32>,
///     started: bool,
/// }
///
/// impl Suspension for Sum {
///     type Yield = &'static str;
///     type Output = i32;
///
///     fn resume(&mut self, input: Value) -> Resumed<&'static str, i32> {
///         if self.started {
///             self.seen.push(input.take::<i32>()?);
///         }
///         self.started = true;
///         if self.seen.len() == 2 {
///             Ok(Step::Done(self.seen.iter().sum()))
///         } else {
///             Ok(Step::Yield("number?"))
///         }
///     }
/// }
///
/// let mut sum = Sum::default();
/// assert_eq!(sum.resume(Value::unit()), Ok(Step::Yield("number?")));
/// assert_eq!(sum.resume(Value::new(2)), Ok(Step::Yield("number?")));
/// assert_eq!(sum.resume(Value::new(3)), Ok(Step::Done(5)));
/// ```
pub trait Suspension {
    /// The type of intermediate values.
    type Yield;
    /// The type of the completion value.
    type Output;

    /// Supplies a value for the last suspension and advances.
    ///
    /// The value passed to the very first call is ignored by every primitive.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] when the computation hits a programmer error.
    fn resume(&mut self, input: Value) -> Resumed<Self::Yield, Self::Output>;

    /// Injects a fault at the current suspension point.
    ///
    /// An instance may convert the fault into a normal step; the default
    /// re-raises it.
    ///
    /// # Errors
    ///
    /// Returns the fault (or a replacement) when it is not handled.
    fn throw(&mut self, fault: Fault) -> Resumed<Self::Yield, Self::Output> {
        Err(fault)
    }

    /// Requests early completion with `value`, running registered cleanup.
    ///
    /// # Errors
    ///
    /// Returns a [`Fault`] if cleanup itself fails.
    fn cancel(&mut self, value: Self::Output) -> Resumed<Self::Yield, Self::Output> {
        self.close();
        Ok(Step::Done(value))
    }

    /// Releases registered cleanup without producing a result.
    fn close(&mut self) {}

    /// Transforms the completion value.
    fn map<B, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Output) -> B,
    {
        Map::new(self, f)
    }

    /// Transforms every yielded value.
    fn map_yield<Y2, F>(self, f: F) -> MapYield<Self, F>
    where
        Self: Sized,
        F: FnMut(Self::Yield) -> Y2,
    {
        MapYield::new(self, f)
    }

    /// Transforms both channels with a single node.
    fn map_both<Y2, B, G, F>(self, on_yield: G, on_return: F) -> MapBoth<Self, G, F>
    where
        Self: Sized,
        G: FnMut(Self::Yield) -> Y2,
        F: FnMut(Self::Output) -> B,
    {
        MapBoth::new(self, on_yield, on_return)
    }

    /// Splices the instance built from the completion value after this one.
    fn flat_map<S2, F>(self, f: F) -> FlatMap<Self, F, S2>
    where
        Self: Sized,
        F: FnOnce(Self::Output) -> S2,
        S2: Suspension<Yield = Self::Yield>,
    {
        FlatMap::new(self, f)
    }

    /// Answers every yielded value with a whole instance whose result resumes this one.
    fn flat_map_yield<S2, F>(self, f: F) -> FlatMapYield<Self, F, S2>
    where
        Self: Sized,
        F: FnMut(Self::Yield) -> S2,
        S2: Suspension,
        S2::Output: 'static,
    {
        FlatMapYield::new(self, f)
    }

    /// Runs `cleanup` exactly once when this instance finishes in any way.
    fn ensure<F>(self, cleanup: F) -> Ensure<Self, F>
    where
        Self: Sized,
        F: FnOnce(),
    {
        Ensure::new(self, cleanup)
    }

    /// Converts an injected fault this instance re-raises into a normal completion.
    fn rescue<F>(self, handler: F) -> Rescue<Self, F>
    where
        Self: Sized,
        F: FnMut(Fault) -> Result<Self::Output, Fault>,
    {
        Rescue::new(self, handler)
    }

    /// Erases the concrete type.
    fn boxed(self) -> BoxSuspension<Self::Yield, Self::Output>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl<S: Suspension + ?Sized> Suspension for Box<S> {
    type Yield = S::Yield;
    type Output = S::Output;

    #[inline]
    fn resume(&mut self, input: Value) -> Resumed<Self::Yield, Self::Output> {
        (**self).resume(input)
    }

    #[inline]
    fn throw(&mut self, fault: Fault) -> Resumed<Self::Yield, Self::Output> {
        (**self).throw(fault)
    }

    #[inline]
    fn cancel(&mut self, value: Self::Output) -> Resumed<Self::Yield, Self::Output> {
        (**self).cancel(value)
    }

    #[inline]
    fn close(&mut self) {
        (**self).close();
    }
}
