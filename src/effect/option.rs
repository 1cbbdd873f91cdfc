//! Absence as an effect.
//!
//! [`from_option`] yields [`Nothing`] for `None`; [`optional`] stops the
//! computation at the first `Nothing` and completes with `None`.
//!
//! # Examples
//!
//! ```rust
//! use std::collections::HashMap;
//! use nano_effect::control::run;
//! use nano_effect::effect::{from_option, optional};
//! use nano_effect::nano::Nano;
//!
//! let ages = HashMap::from([("ada", 36), ("alan", 41)]);
//! let age = move |name: &'static str| from_option(ages.get(name).copied());
//! let total = move |a: &'static str, b: &'static str| {
//!     let age = age.clone();
//!     age(a).flat_map(move |x| age(b).map(move |y| x + y))
//! };
//!
//! assert_eq!(run(optional(total("ada", "alan"))), Ok(Some(77)));
//! assert_eq!(run(optional(total("ada", "grace"))), Ok(None));
//! ```

use std::convert::Infallible;

use super::outcome::{Diverge, diverge};
use super::{Effect, Variant};
use crate::Fault;
use crate::control::Either;
use crate::iter::{self, Resumed, Step, Suspension, Value};
use crate::nano::Nano;

/// The effect of a missing value. It never resumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Nothing;

impl Variant for Nothing {
    const TAG: &'static str = "None";
    type Resume = Infallible;
}

/// A computation that completes with a present value or yields [`Nothing`].
///
/// Created by [`from_option`] and [`nothing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FromOption<A> {
    value: Option<A>,
}

/// Completes with the value of `Some`, or yields [`Nothing`] for `None`.
pub const fn from_option<A>(value: Option<A>) -> FromOption<A> {
    FromOption { value }
}

/// Yields [`Nothing`]; typed as a computation of any output.
pub const fn nothing<A>() -> FromOption<A> {
    from_option(None)
}

impl<A: Clone> Nano for FromOption<A> {
    type Yield = Effect;
    type Output = A;
    type Iter = Either<iter::Success<Effect, A>, Diverge<A>>;

    fn iterate(&self) -> Self::Iter {
        match &self.value {
            Some(value) => Either::Left(iter::success(value.clone())),
            None => Either::Right(diverge(Effect::new(Nothing))),
        }
    }
}

/// Runs `nano`, completing with `None` at its first [`Nothing`] and with
/// `Some(output)` otherwise.
pub const fn optional<N>(nano: N) -> Optional<N>
where
    N: Nano<Yield = Effect>,
{
    Optional { nano }
}

/// A computation whose absence becomes its return value.
///
/// Created by [`optional`].
#[derive(Debug, Clone)]
pub struct Optional<N> {
    nano: N,
}

impl<N> Nano for Optional<N>
where
    N: Nano<Yield = Effect>,
{
    type Yield = Effect;
    type Output = Option<N::Output>;
    type Iter = OptionalIter<N::Iter>;

    fn iterate(&self) -> Self::Iter {
        OptionalIter {
            inner: self.nano.iterate(),
            missing: false,
        }
    }
}

/// The suspension built by [`Optional`].
///
/// After a short-circuit it keeps completing with `None`.
pub struct OptionalIter<S> {
    inner: S,
    missing: bool,
}

impl<S> OptionalIter<S>
where
    S: Suspension<Yield = Effect>,
{
    fn settle(&mut self, step: Step<Effect, S::Output>) -> Resumed<Effect, Option<S::Output>> {
        match step {
            Step::Done(value) => Ok(Step::Done(Some(value))),
            Step::Yield(effect) if effect.is::<Nothing>() => {
                tracing::debug!("value missing, short-circuiting");
                self.inner.close();
                self.missing = true;
                Ok(Step::Done(None))
            }
            Step::Yield(effect) => Ok(Step::Yield(effect)),
        }
    }
}

impl<S> Suspension for OptionalIter<S>
where
    S: Suspension<Yield = Effect>,
{
    type Yield = Effect;
    type Output = Option<S::Output>;

    fn resume(&mut self, input: Value) -> Resumed<Effect, Self::Output> {
        if self.missing {
            return Ok(Step::Done(None));
        }
        let step = self.inner.resume(input)?;
        self.settle(step)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<Effect, Self::Output> {
        if self.missing {
            return Ok(Step::Done(None));
        }
        let step = self.inner.throw(fault)?;
        self.settle(step)
    }

    fn cancel(&mut self, value: Self::Output) -> Resumed<Effect, Self::Output> {
        match value {
            Some(value) => {
                self.missing = false;
                let step = self.inner.cancel(value)?;
                self.settle(step)
            }
            None => {
                if !self.missing {
                    self.inner.close();
                }
                self.missing = true;
                Ok(Step::Done(None))
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}
