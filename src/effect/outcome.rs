//! Typed failure as an effect.
//!
//! [`fail`] yields a [`Failure`] that never resumes. [`result`] turns the
//! first failure of a computation into an [`Outcome::Failure`] return value;
//! [`catch_failure`] replaces the failing computation with one built from the
//! error. Neither touches [`Fault`]s, which stay fatal.
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::run;
//! use nano_effect::effect::{Outcome, catch_failure, fail, result};
//! use nano_effect::nano::{self, Nano};
//!
//! let parse = |input: &'static str| {
//!     nano::of(input).flat_map(|text| match text.parse::<i32>() {
//!         Ok(number) => Outcome::Success(number),
//!         Err(_) => Outcome::Failure(format!("not a number: {text}")),
//!     })
//! };
//!
//! assert_eq!(run(result::<_, String>(parse("12"))), Ok(Outcome::Success(12)));
//! assert_eq!(
//!     run(result::<_, String>(parse("x"))),
//!     Ok(Outcome::Failure(String::from("not a number: x")))
//! );
//!
//! let recovered = catch_failure(fail::<i32, _>(String::from("boom")), |error: String| nano::of(error.len() as i32));
//! assert_eq!(run(recovered), Ok(4));
//! ```

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::{Effect, Variant};
use crate::Fault;
use crate::control::Either;
use crate::iter::{self, Once, Resumed, Step, Suspension, Value};
use crate::nano::Nano;

fn absurd<A>(never: Infallible) -> A {
    match never {}
}

/// A suspension that yields one effect and never resumes normally.
pub(super) type Diverge<A> = iter::Map<Once<Effect, Infallible>, fn(Infallible) -> A>;

pub(super) fn diverge<A>(effect: Effect) -> Diverge<A> {
    let absurd: fn(Infallible) -> A = absurd::<A>;
    iter::Map::new(iter::once(effect), absurd)
}

// =============================================================================
// Outcome
// =============================================================================

/// The result of a computation that may fail with a modeled error.
///
/// An `Outcome` is also a computation: `Success` completes with its value and
/// `Failure` yields the [`Failure`] effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome<A, E> {
    /// Completed with a value.
    Success(A),
    /// Stopped with an error.
    Failure(E),
}

impl<A, E> Outcome<A, E> {
    /// Returns `true` if this is a `Success`.
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` if this is a `Failure`.
    #[inline]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// The success value, if any.
    #[inline]
    pub fn success(self) -> Option<A> {
        match self {
            Self::Success(value) => Some(value),
            Self::Failure(_) => None,
        }
    }

    /// The error, if any.
    #[inline]
    pub fn failure(self) -> Option<E> {
        match self {
            Self::Success(_) => None,
            Self::Failure(error) => Some(error),
        }
    }

    /// Transforms the success value.
    #[inline]
    pub fn map<B, F>(self, f: F) -> Outcome<B, E>
    where
        F: FnOnce(A) -> B,
    {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(error) => Outcome::Failure(error),
        }
    }

    /// Transforms the error.
    #[inline]
    pub fn map_failure<E2, F>(self, f: F) -> Outcome<A, E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Success(value) => Outcome::Success(value),
            Self::Failure(error) => Outcome::Failure(f(error)),
        }
    }

    /// Converts into a `Result`.
    #[inline]
    pub fn into_result(self) -> Result<A, E> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(error) => Err(error),
        }
    }
}

impl<A, E> From<Result<A, E>> for Outcome<A, E> {
    fn from(result: Result<A, E>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::Failure(error),
        }
    }
}

impl<A, E> From<Outcome<A, E>> for Result<A, E> {
    fn from(outcome: Outcome<A, E>) -> Self {
        outcome.into_result()
    }
}

impl<A, E> Nano for Outcome<A, E>
where
    A: Clone,
    E: Clone + fmt::Debug + 'static,
{
    type Yield = Effect;
    type Output = A;
    type Iter = Either<iter::Success<Effect, A>, Diverge<A>>;

    fn iterate(&self) -> Self::Iter {
        match self {
            Self::Success(value) => Either::Left(iter::success(value.clone())),
            Self::Failure(error) => Either::Right(diverge(Effect::new(Failure(error.clone())))),
        }
    }
}

// =============================================================================
// Failure
// =============================================================================

/// The effect of stopping with a modeled error.
///
/// It never resumes: an interpreter either abandons the computation or
/// replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Failure<E>(pub E);

impl<E> Variant for Failure<E>
where
    E: Clone + fmt::Debug + 'static,
{
    const TAG: &'static str = "Failure";
    type Resume = Infallible;
}

/// Stops with `error`; typed as a computation of any output.
pub fn fail<A, E>(error: E) -> Fail<A, E> {
    Fail {
        failure: Failure(error),
        _output: PhantomData,
    }
}

/// A computation that fails with a stored error.
///
/// Created by [`fail`].
pub struct Fail<A, E> {
    failure: Failure<E>,
    _output: PhantomData<fn() -> A>,
}

impl<A, E: Clone> Clone for Fail<A, E> {
    fn clone(&self) -> Self {
        Self {
            failure: self.failure.clone(),
            _output: PhantomData,
        }
    }
}

impl<A, E: fmt::Debug> fmt::Debug for Fail<A, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Fail").field(&self.failure.0).finish()
    }
}

impl<A, E> Nano for Fail<A, E>
where
    E: Clone + fmt::Debug + 'static,
{
    type Yield = Effect;
    type Output = A;
    type Iter = Diverge<A>;

    fn iterate(&self) -> Self::Iter {
        diverge(Effect::new(self.failure.clone()))
    }
}

// =============================================================================
// result
// =============================================================================

/// Runs `nano`, completing with [`Outcome::Failure`] on its first `Failure<E>`.
///
/// Every effect yielded before the failure reaches the caller unchanged. A
/// `"Failure"` effect whose error is not an `E` raises
/// [`Fault::PayloadMismatch`].
pub fn result<N, E>(nano: N) -> Attempt<N, E>
where
    N: Nano<Yield = Effect>,
    E: Clone + fmt::Debug + 'static,
{
    Attempt {
        nano,
        _error: PhantomData,
    }
}

/// A computation whose failures become its return value.
///
/// Created by [`result`].
pub struct Attempt<N, E> {
    nano: N,
    _error: PhantomData<fn() -> E>,
}

impl<N: Clone, E> Clone for Attempt<N, E> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            _error: PhantomData,
        }
    }
}

impl<N: fmt::Debug, E> fmt::Debug for Attempt<N, E> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Attempt").field("nano", &self.nano).finish()
    }
}

impl<N, E> Nano for Attempt<N, E>
where
    N: Nano<Yield = Effect>,
    E: Clone + fmt::Debug + 'static,
{
    type Yield = Effect;
    type Output = Outcome<N::Output, E>;
    type Iter = AttemptIter<N::Iter, E>;

    fn iterate(&self) -> Self::Iter {
        AttemptIter {
            inner: self.nano.iterate(),
            failed: None,
        }
    }
}

/// The suspension built by [`Attempt`].
///
/// After a failure it keeps completing with that failure.
pub struct AttemptIter<S, E> {
    inner: S,
    failed: Option<E>,
}

impl<S, E> AttemptIter<S, E>
where
    S: Suspension<Yield = Effect>,
    E: Clone + fmt::Debug + 'static,
{
    fn settle(&mut self, step: Step<Effect, S::Output>) -> Resumed<Effect, Outcome<S::Output, E>> {
        match step {
            Step::Done(value) => Ok(Step::Done(Outcome::Success(value))),
            Step::Yield(effect) if effect.is::<Failure<E>>() => {
                let Failure(error) = effect.into_variant::<Failure<E>>()?;
                tracing::debug!(?error, "computation failed, short-circuiting");
                self.inner.close();
                Ok(Step::Done(Outcome::Failure(self.failed.insert(error).clone())))
            }
            Step::Yield(effect) => Ok(Step::Yield(effect)),
        }
    }

    fn frozen(&self) -> Option<Resumed<Effect, Outcome<S::Output, E>>> {
        self.failed.clone().map(|error| Ok(Step::Done(Outcome::Failure(error))))
    }
}

impl<S, E> Suspension for AttemptIter<S, E>
where
    S: Suspension<Yield = Effect>,
    E: Clone + fmt::Debug + 'static,
{
    type Yield = Effect;
    type Output = Outcome<S::Output, E>;

    fn resume(&mut self, input: Value) -> Resumed<Effect, Self::Output> {
        if let Some(frozen) = self.frozen() {
            return frozen;
        }
        let step = self.inner.resume(input)?;
        self.settle(step)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<Effect, Self::Output> {
        if let Some(frozen) = self.frozen() {
            return frozen;
        }
        let step = self.inner.throw(fault)?;
        self.settle(step)
    }

    fn cancel(&mut self, value: Self::Output) -> Resumed<Effect, Self::Output> {
        match value {
            Outcome::Success(value) => {
                self.failed = None;
                let step = self.inner.cancel(value)?;
                self.settle(step)
            }
            Outcome::Failure(error) => {
                if self.failed.is_none() {
                    self.inner.close();
                }
                Ok(Step::Done(Outcome::Failure(self.failed.insert(error).clone())))
            }
        }
    }

    fn close(&mut self) {
        self.inner.close();
    }
}

// =============================================================================
// catch_failure
// =============================================================================

/// Replaces `nano` with `handler(error)` when it fails with a `Failure<E>`.
///
/// The failing computation is closed and the replacement's effects and
/// result become those of the whole. Failures raised by the replacement are
/// not caught again.
pub fn catch_failure<N, E, F, N2>(nano: N, handler: F) -> CatchFailure<N, F, E>
where
    N: Nano<Yield = Effect>,
    E: Clone + fmt::Debug + 'static,
    F: Fn(E) -> N2 + 'static,
    N2: Nano<Yield = Effect, Output = N::Output>,
{
    CatchFailure {
        nano,
        handler: Rc::new(handler),
        _error: PhantomData,
    }
}

/// A computation whose failures are recovered by a handler.
///
/// Created by [`catch_failure`].
pub struct CatchFailure<N, F, E> {
    nano: N,
    handler: Rc<F>,
    _error: PhantomData<fn() -> E>,
}

impl<N: Clone, F, E> Clone for CatchFailure<N, F, E> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            handler: Rc::clone(&self.handler),
            _error: PhantomData,
        }
    }
}

impl<N, F, E, N2> Nano for CatchFailure<N, F, E>
where
    N: Nano<Yield = Effect>,
    E: Clone + fmt::Debug + 'static,
    F: Fn(E) -> N2 + 'static,
    N2: Nano<Yield = Effect, Output = N::Output>,
{
    type Yield = Effect;
    type Output = N::Output;
    type Iter = CatchFailureIter<N::Iter, N2::Iter, E>;

    fn iterate(&self) -> Self::Iter {
        let handler = Rc::clone(&self.handler);
        CatchFailureIter {
            inner: self.nano.iterate(),
            recover: Box::new(move |error| handler(error).iterate()),
            replacement: None,
        }
    }
}

/// The suspension built by [`CatchFailure`].
pub struct CatchFailureIter<S, S2, E> {
    inner: S,
    recover: Box<dyn FnMut(E) -> S2>,
    replacement: Option<S2>,
}

impl<S, S2, E> CatchFailureIter<S, S2, E>
where
    S: Suspension<Yield = Effect>,
    S2: Suspension<Yield = Effect, Output = S::Output>,
    E: Clone + fmt::Debug + 'static,
{
    fn settle(&mut self, step: Step<Effect, S::Output>) -> Resumed<Effect, S::Output> {
        match step {
            Step::Yield(effect) if effect.is::<Failure<E>>() => {
                let Failure(error) = effect.into_variant::<Failure<E>>()?;
                tracing::debug!(?error, "recovering from failure");
                self.inner.close();
                let replacement = self.replacement.insert((self.recover)(error));
                replacement.resume(Value::unit())
            }
            step => Ok(step),
        }
    }
}

impl<S, S2, E> Suspension for CatchFailureIter<S, S2, E>
where
    S: Suspension<Yield = Effect>,
    S2: Suspension<Yield = Effect, Output = S::Output>,
    E: Clone + fmt::Debug + 'static,
{
    type Yield = Effect;
    type Output = S::Output;

    fn resume(&mut self, input: Value) -> Resumed<Effect, S::Output> {
        if let Some(replacement) = self.replacement.as_mut() {
            return replacement.resume(input);
        }
        let step = self.inner.resume(input)?;
        self.settle(step)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<Effect, S::Output> {
        if let Some(replacement) = self.replacement.as_mut() {
            return replacement.throw(fault);
        }
        let step = self.inner.throw(fault)?;
        self.settle(step)
    }

    fn cancel(&mut self, value: S::Output) -> Resumed<Effect, S::Output> {
        match self.replacement.as_mut() {
            Some(replacement) => replacement.cancel(value),
            None => self.inner.cancel(value),
        }
    }

    fn close(&mut self) {
        match self.replacement.as_mut() {
            Some(replacement) => replacement.close(),
            None => self.inner.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{run, run_with};
    use crate::define_variant;
    use crate::nano;
    use rstest::rstest;
    use std::cell::Cell;

    define_variant! { Log(pub &'static str) -> () }

    define_variant! { Count -> i32 }

    #[rstest]
    #[case(Ok(3), Outcome::Success(3))]
    #[case(Err("bad"), Outcome::Failure("bad"))]
    fn outcome_converts_from_result(#[case] input: Result<i32, &'static str>, #[case] expected: Outcome<i32, &'static str>) {
        let outcome = Outcome::from(input);
        assert_eq!(outcome, expected);
        assert_eq!(outcome.into_result(), input);
    }

    #[rstest]
    fn outcome_helpers() {
        let ok: Outcome<i32, String> = Outcome::Success(2);
        let err: Outcome<i32, String> = Outcome::Failure(String::from("e"));
        assert!(ok.is_success() && err.is_failure());
        assert_eq!(ok.clone().map(|x| x * 2).success(), Some(4));
        assert_eq!(err.clone().map_failure(|e| e.len()).failure(), Some(1));
        assert_eq!(ok.failure(), None);
        assert_eq!(err.success(), None);
    }

    #[rstest]
    fn result_wraps_normal_completion() {
        let program = result::<_, String>(nano::of(5));
        assert_eq!(run(program), Ok(Outcome::Success(5)));
    }

    #[rstest]
    fn result_short_circuits_and_closes() {
        let closed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&closed);
        let failing = nano::from_fn(move || {
            let flag = Rc::clone(&flag);
            fail::<i32, _>(7_u8).iterate().ensure(move || flag.set(true))
        });
        let program = failing.flat_map(|never| nano::of(never + 1));
        assert_eq!(run(result::<_, u8>(program)), Ok(Outcome::Failure(7)));
        assert!(closed.get());
    }

    #[rstest]
    fn result_forwards_effects_before_the_failure() {
        let program = Log("first").then(fail::<(), _>("stop")).then(Log("never"));
        let mut seen = Vec::new();
        let outcome = run_with(result::<_, &'static str>(program), |effect: Effect| {
            seen.push(effect.payload::<Log>().map(|log| log.0));
            Ok(Value::unit())
        });
        assert_eq!(outcome, Ok(Outcome::Failure("stop")));
        assert_eq!(seen, vec![Some("first")]);
    }

    #[rstest]
    fn result_keeps_completing_with_the_failure() {
        let mut attempt = result::<_, String>(fail::<i32, _>(String::from("x"))).iterate();
        let failed = Ok(Some(Outcome::Failure(String::from("x"))));
        assert_eq!(attempt.resume(Value::unit()).map(Step::done), failed);
        assert_eq!(attempt.resume(Value::new(1)).map(Step::done), failed);
        assert_eq!(attempt.resume(Value::unit()).map(Step::done), failed);
        assert_eq!(attempt.throw(Fault::injected("late")).map(Step::done), failed);
    }

    #[rstest]
    #[case(Outcome::Success(9))]
    #[case(Outcome::Failure(String::from("stopped")))]
    fn result_cancel_freezes_the_given_outcome(#[case] outcome: Outcome<i32, String>) {
        let mut attempt = result::<_, String>(Count).iterate();
        attempt.resume(Value::unit()).unwrap();
        assert_eq!(attempt.cancel(outcome.clone()).map(Step::done), Ok(Some(outcome.clone())));
        assert_eq!(attempt.resume(Value::unit()).map(Step::done), Ok(Some(outcome)));
    }

    #[rstest]
    fn result_with_the_wrong_error_type_is_a_fault() {
        let program = result::<_, String>(fail::<(), _>(1_u32));
        assert!(matches!(run(program), Err(Fault::PayloadMismatch { tag: "Failure", .. })));
    }

    #[rstest]
    fn outcome_is_a_computation() {
        let program = Outcome::<i32, &str>::Success(1).flat_map(|x| Outcome::<i32, &str>::Failure("no").map(move |y| x + y));
        assert_eq!(run(result::<_, &str>(program)), Ok(Outcome::Failure("no")));
    }

    #[rstest]
    fn catch_failure_uses_the_replacement_result() {
        let program = fail::<i32, _>(String::from("oops")).map(|x| x * 100);
        let recovered = catch_failure(program, |error: String| nano::of(i32::try_from(error.len()).unwrap_or_default()));
        assert_eq!(run(recovered), Ok(4));
    }

    #[rstest]
    fn catch_failure_passes_other_effects_and_success() {
        let program = Log("hello").then(nano::of(1));
        let recovered = catch_failure(program, |_: String| nano::of(0));
        let result = run_with(recovered, |_| Ok(Value::unit()));
        assert_eq!(result, Ok(1));
    }

    #[rstest]
    fn catch_failure_keeps_the_replacement_result() {
        let program = fail::<i32, _>(String::from("oops"));
        let mut recovered = catch_failure(program, |error: String| nano::of(i32::try_from(error.len()).unwrap_or_default())).iterate();
        for input in [Value::unit(), Value::new(8), Value::unit()] {
            assert_eq!(recovered.resume(input).map(Step::done), Ok(Some(4)));
        }
    }

    #[rstest]
    fn replacement_failures_escape() {
        let program = catch_failure(fail::<i32, _>(1_i64), |code: i64| fail::<i32, _>(code + 1));
        assert_eq!(run(result::<_, i64>(program)), Ok(Outcome::Failure(2)));
    }

    #[rstest]
    fn replacement_effects_reach_the_caller() {
        let program = catch_failure(fail::<(), _>('x'), |_: char| Log("recovering"));
        let mut seen = 0;
        let result = run_with(program, |effect: Effect| {
            seen += usize::from(effect.is::<Log>());
            Ok(Value::unit())
        });
        assert_eq!(result, Ok(()));
        assert_eq!(seen, 1);
    }
}
