//! Either type - one of two suspensions (or computations) chosen at runtime.
//!
//! Interpreters answer different effects with differently-typed suspensions:
//! a locally computed answer for the effects they own, a forwarding
//! suspension for everything else. `Either<L, R>` lets both branches flow
//! through a single handler closure. It implements [`Suspension`] when both
//! sides are suspensions with the same channels, and [`Nano`] when both
//! sides are computations with the same channels.
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::Either;
//! use nano_effect::iter::{Step, Suspension, once, success};
//! use nano_effect::Value;
//!
//! fn answer(local: bool) -> Either<impl Suspension<Yield = &'static str, Output = i32>, impl Suspension<Yield = &'static str, Output = i32>> {
//!     if local {
//!         Either::Left(success(1))
//!     } else {
//!         Either::Right(once::<i32, _>("ask upstream"))
//!     }
//! }
//!
//! assert_eq!(answer(true).resume(Value::unit()), Ok(Step::Done(1)));
//! assert_eq!(answer(false).resume(Value::unit()), Ok(Step::Yield("ask upstream")));
//! ```

use std::fmt;

use crate::Fault;
use crate::iter::{Resumed, Suspension, Value};
use crate::nano::Nano;

/// A value that is either a `Left(L)` or a `Right(R)`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Either<L, R> {
    /// The first alternative.
    Left(L),
    /// The second alternative.
    Right(R),
}

// =============================================================================
// Suspension / Nano
// =============================================================================

impl<L, R> Suspension for Either<L, R>
where
    L: Suspension,
    R: Suspension<Yield = L::Yield, Output = L::Output>,
{
    type Yield = L::Yield;
    type Output = L::Output;

    #[inline]
    fn resume(&mut self, input: Value) -> Resumed<L::Yield, L::Output> {
        match self {
            Self::Left(inner) => inner.resume(input),
            Self::Right(inner) => inner.resume(input),
        }
    }

    #[inline]
    fn throw(&mut self, fault: Fault) -> Resumed<L::Yield, L::Output> {
        match self {
            Self::Left(inner) => inner.throw(fault),
            Self::Right(inner) => inner.throw(fault),
        }
    }

    #[inline]
    fn cancel(&mut self, value: L::Output) -> Resumed<L::Yield, L::Output> {
        match self {
            Self::Left(inner) => inner.cancel(value),
            Self::Right(inner) => inner.cancel(value),
        }
    }

    #[inline]
    fn close(&mut self) {
        match self {
            Self::Left(inner) => inner.close(),
            Self::Right(inner) => inner.close(),
        }
    }
}

impl<L, R> Nano for Either<L, R>
where
    L: Nano,
    R: Nano<Yield = L::Yield, Output = L::Output>,
{
    type Yield = L::Yield;
    type Output = L::Output;
    type Iter = Either<L::Iter, R::Iter>;

    #[inline]
    fn iterate(&self) -> Self::Iter {
        match self {
            Self::Left(nano) => Either::Left(nano.iterate()),
            Self::Right(nano) => Either::Right(nano.iterate()),
        }
    }
}

// =============================================================================
// Debug
// =============================================================================

impl<L: fmt::Debug, R: fmt::Debug> fmt::Debug for Either<L, R> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left(value) => formatter.debug_tuple("Left").field(value).finish(),
            Self::Right(value) => formatter.debug_tuple("Right").field(value).finish(),
        }
    }
}
