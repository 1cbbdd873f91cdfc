//! Cooperative event streams.
//!
//! A computation publishes values with [`emit`]; an observer answers each
//! emission with a whole computation before the producer continues, so the
//! stream is pull-based and never buffers.
//!
//! # Examples
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use nano_effect::control::run;
//! use nano_effect::effect::{emit, filter_emit, map_emit, observe};
//! use nano_effect::nano::{self, Nano};
//!
//! let numbers = emit(1).then(emit(2)).then(emit(3)).then(nano::of("done"));
//! let odds = filter_emit(numbers, |n: &i32| n % 2 == 1);
//! let labelled = map_emit(odds, |n: i32| format!("#{n}"));
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&seen);
//! let observed = observe(labelled, move |label: String| {
//!     let sink = Rc::clone(&sink);
//!     nano::sync(move || sink.borrow_mut().push(label.clone()))
//! });
//!
//! assert_eq!(run(observed), Ok("done"));
//! assert_eq!(*seen.borrow(), vec![String::from("#1"), String::from("#3")]);
//! ```

use std::fmt;
use std::rc::Rc;

use super::{Answer, Effect, Handle, Variant, answer, forward, handle};
use crate::iter::{self, Success, Value};
use crate::nano::{self, Nano};

/// The effect of publishing a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Emit<A>(pub A);

impl<A> Variant for Emit<A>
where
    A: Clone + fmt::Debug + 'static,
{
    const TAG: &'static str = "Emit";
    type Resume = ();
}

/// Publishes `value` and continues once it has been observed.
pub const fn emit<A>(value: A) -> Emit<A> {
    Emit(value)
}

/// A computation whose emissions are answered by an observer.
///
/// Created by [`observe`].
pub type Observe<N, A, N2> = Handle<N, Emit<A>, Box<dyn Fn(Emit<A>) -> N2>>;

/// Answers every `Emit<A>` of `nano` with `on_emit(value)`.
///
/// Effects of the observer pass outward; an `"Emit"` effect whose value is
/// not an `A` raises [`Fault::PayloadMismatch`](crate::Fault::PayloadMismatch).
pub fn observe<N, A, F, N2>(nano: N, on_emit: F) -> Observe<N, A, N2>
where
    N: Nano<Yield = Effect>,
    A: Clone + fmt::Debug + 'static,
    F: Fn(A) -> N2 + 'static,
    N2: Nano<Yield = Effect, Output = ()> + 'static,
{
    let on_emit: Box<dyn Fn(Emit<A>) -> N2> = Box::new(move |Emit(value)| on_emit(value));
    handle(nano, on_emit)
}

/// A computation whose emissions are transformed.
///
/// Created by [`map_emit`].
pub type MapEmit<N> = nano::MapYield<N, Box<dyn Fn(Effect) -> Effect>>;

/// Transforms every `Emit<A>` of `nano` into an `Emit<B>`.
///
/// Other effects, including emissions of other types, pass through unchanged.
pub fn map_emit<N, A, B, F>(nano: N, f: F) -> MapEmit<N>
where
    N: Nano<Yield = Effect>,
    A: Clone + fmt::Debug + 'static,
    B: Clone + fmt::Debug + 'static,
    F: Fn(A) -> B + 'static,
{
    let relabel: Box<dyn Fn(Effect) -> Effect> = Box::new(move |effect: Effect| match effect.payload::<Emit<A>>() {
        Some(Emit(value)) => Effect::new(Emit(f(value.clone()))),
        None => effect,
    });
    nano.map_yield(relabel)
}

/// Drops every `Emit<A>` of `nano` that fails `predicate`.
///
/// Dropped emissions are answered on the spot and never reach an observer.
pub fn filter_emit<N, A, P>(nano: N, predicate: P) -> FilterEmit<N>
where
    N: Nano<Yield = Effect>,
    A: Clone + fmt::Debug + 'static,
    P: Fn(&A) -> bool + 'static,
{
    FilterEmit {
        nano,
        drops: Rc::new(move |effect: &Effect| effect.payload::<Emit<A>>().is_some_and(|Emit(value)| !predicate(value))),
    }
}

/// A computation with some emissions removed.
///
/// Created by [`filter_emit`].
pub struct FilterEmit<N> {
    nano: N,
    drops: Rc<dyn Fn(&Effect) -> bool>,
}

impl<N: Clone> Clone for FilterEmit<N> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            drops: Rc::clone(&self.drops),
        }
    }
}

type Sieve = Box<dyn FnMut(Effect) -> Answer<Success<Effect, Value>>>;

impl<N> Nano for FilterEmit<N>
where
    N: Nano<Yield = Effect>,
{
    type Yield = Effect;
    type Output = N::Output;
    type Iter = iter::FlatMapYield<N::Iter, Sieve, Answer<Success<Effect, Value>>>;

    fn iterate(&self) -> Self::Iter {
        let drops = Rc::clone(&self.drops);
        let sieve: Sieve = Box::new(move |effect: Effect| {
            if drops(&effect) {
                tracing::trace!("dropping filtered emission");
                answer(iter::success(Value::unit()))
            } else {
                forward(effect)
            }
        });
        iter::FlatMapYield::new(self.nano.iterate(), sieve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fault;
    use crate::control::{run, run_with};
    use rstest::rstest;
    use std::cell::RefCell;

    fn collect<N>(nano: N) -> (Result<N::Output, Fault>, Vec<i32>)
    where
        N: Nano<Yield = Effect>,
    {
        let mut seen = Vec::new();
        let result = run_with(nano, |effect: Effect| {
            let Emit(value) = effect.into_variant::<Emit<i32>>()?;
            seen.push(value);
            Ok(Value::unit())
        });
        (result, seen)
    }

    fn one_two_three() -> impl Nano<Yield = Effect, Output = &'static str> + Clone {
        emit(1).then(emit(2)).then(emit(3)).then(nano::of("end"))
    }

    #[rstest]
    fn emissions_reach_the_driver_in_order() {
        assert_eq!(collect(one_two_three()), (Ok("end"), vec![1, 2, 3]));
    }

    #[rstest]
    fn observe_runs_the_observer_before_continuing() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let observed = observe(one_two_three(), move |value: i32| {
            let sink = Rc::clone(&sink);
            nano::sync(move || sink.borrow_mut().push(value * 10))
        });
        assert_eq!(run(observed), Ok("end"));
        assert_eq!(*log.borrow(), vec![10, 20, 30]);
    }

    #[rstest]
    fn observer_may_emit_outward() {
        let observed = observe(one_two_three(), |value: i32| emit(-value));
        assert_eq!(collect(observed), (Ok("end"), vec![-1, -2, -3]));
    }

    #[rstest]
    fn observe_rejects_mismatched_payloads() {
        let observed = observe(emit("text"), |_: i32| nano::of(()));
        assert!(matches!(run(observed), Err(Fault::PayloadMismatch { tag: "Emit", .. })));
    }

    #[rstest]
    #[case(|n: &i32| *n > 1, vec![2, 3])]
    #[case(|_: &i32| false, vec![])]
    #[case(|_: &i32| true, vec![1, 2, 3])]
    fn filter_emit_keeps_matching_values(#[case] predicate: fn(&i32) -> bool, #[case] expected: Vec<i32>) {
        assert_eq!(collect(filter_emit(one_two_three(), predicate)), (Ok("end"), expected));
    }

    #[rstest]
    fn map_emit_transforms_values() {
        let doubled = map_emit(one_two_three(), |n: i32| n * 2);
        assert_eq!(collect(doubled), (Ok("end"), vec![2, 4, 6]));
    }

    #[rstest]
    fn map_emit_leaves_other_payloads_alone() {
        let mixed = emit(String::from("keep")).then(emit(5));
        let mapped = map_emit(mixed, |n: i32| n + 1);
        let mut seen = Vec::new();
        let result = run_with(mapped, |effect: Effect| {
            seen.push(format!("{effect:?}"));
            Ok(Value::unit())
        });
        assert_eq!(result, Ok(()));
        assert_eq!(
            seen,
            vec![
                String::from("Effect { tag: \"Emit\", payload: Emit(\"keep\") }"),
                String::from("Effect { tag: \"Emit\", payload: Emit(6) }"),
            ]
        );
    }
}
