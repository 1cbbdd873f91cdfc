//! Effects: tagged requests that a computation yields and an interpreter answers.
//!
//! A [`Variant`] is a plain data type with a string tag and a declared
//! resume type. Every variant is itself a [`Nano`] that yields its [`Effect`]
//! carrier once and completes with the answer. Interpreters built on
//! [`Nano::flat_map_yield`] match carriers by tag and either answer them or
//! forward them to the next interpreter out.
//!
//! Built-in interpreters:
//!
//! - [`provide`], [`provide_all`], [`with_tag`], [`isolate`]: dependency injection through [`Env`]
//! - [`result`], [`catch_failure`]: typed failure through [`Failure`]
//! - [`with_refs`] and [`Ref`]: scoped mutable state (feature `refs`)
//! - [`observe`], [`map_emit`], [`filter_emit`]: event streams (feature `emit`)
//! - [`optional`]: absence (feature `option`)
//! - [`handle`]: a generic single-variant interpreter
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::run;
//! use nano_effect::effect::{handle, Variant};
//! use nano_effect::nano::{self, Nano};
//! use nano_effect::define_variant;
//!
//! define_variant! {
//!     /// Asks for a random number below the bound.
//!     pub Roll(pub u32) -> u32
//! }
//!
//! let program = Roll(6).flat_map(|first| Roll(6).map(move |second| first + second));
//! let loaded = handle(program, |Roll(bound)| nano::of(bound - 1));
//!
//! assert_eq!(Roll::TAG, "Roll");
//! assert_eq!(run(loaded), Ok(10));
//! ```

mod env;
mod macros;
mod outcome;

#[cfg(feature = "emit")]
mod emit;
#[cfg(feature = "option")]
mod option;
#[cfg(feature = "refs")]
mod refs;

pub use env::{Env, GetEnv, Lookup, ProvideAll, Scope, Tag, isolate, provide, provide_all, with_env, with_tag};
pub use outcome::{Attempt, AttemptIter, CatchFailure, CatchFailureIter, Fail, Failure, Outcome, catch_failure, fail, result};

#[cfg(feature = "emit")]
pub use emit::{Emit, FilterEmit, MapEmit, Observe, emit, filter_emit, map_emit, observe};
#[cfg(feature = "option")]
pub use option::{FromOption, Nothing, Optional, OptionalIter, from_option, nothing, optional};
#[cfg(feature = "refs")]
pub use refs::{Ref, RefOp, RefStore, Refs, Versioned, with_refs};

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::Fault;
use crate::control::Either;
use crate::iter::{self, Once, Raise, Suspension, Value};
use crate::nano::Nano;

#[cfg(feature = "fxhash")]
type StoreMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fxhash"))]
type StoreMap<K, V> = std::collections::HashMap<K, V>;

// =============================================================================
// Variant
// =============================================================================

/// A kind of effect: a data type with a tag and the type it resumes with.
///
/// Matching is by [`TAG`](Self::TAG) alone, so two payload types that share a
/// tag are treated as the same effect; interpreters report a
/// [`Fault::PayloadMismatch`] if the payload then fails to downcast.
///
/// Use [`define_variant!`](crate::define_variant) for the common case.
pub trait Variant: Clone + fmt::Debug + 'static {
    /// The tag interpreters match on.
    const TAG: &'static str;

    /// The type of the answer this effect resumes with.
    type Resume: Clone + 'static;

    /// Wraps this value in a type-erased carrier.
    fn into_effect(self) -> Effect {
        Effect::new(self)
    }
}

impl<V: Variant> Nano for V {
    type Yield = Effect;
    type Output = V::Resume;
    type Iter = Once<Effect, V::Resume>;

    #[inline]
    fn iterate(&self) -> Self::Iter {
        iter::once(Effect::new(self.clone()))
    }
}

// =============================================================================
// Effect
// =============================================================================

/// The type-erased carrier of a yielded variant.
///
/// # Examples
///
/// ```rust
/// use nano_effect::effect::{Effect, Failure, GetEnv};
///
/// let effect = Effect::new(Failure(String::from("nope")));
/// assert_eq!(effect.tag(), "Failure");
/// assert!(effect.is::<Failure<String>>());
/// assert!(!effect.is::<GetEnv>());
/// assert_eq!(effect.payload::<Failure<String>>(), Some(&Failure(String::from("nope"))));
/// ```
#[derive(Clone)]
pub struct Effect {
    tag: &'static str,
    payload: Rc<dyn Any>,
    render: fn(&dyn Any, &mut fmt::Formatter<'_>) -> fmt::Result,
}

fn render<V: Variant>(payload: &dyn Any, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match payload.downcast_ref::<V>() {
        Some(variant) => fmt::Debug::fmt(variant, formatter),
        None => formatter.write_str(".."),
    }
}

impl Effect {
    /// Wraps a variant.
    pub fn new<V: Variant>(variant: V) -> Self {
        Self {
            tag: V::TAG,
            payload: Rc::new(variant),
            render: render::<V>,
        }
    }

    /// The tag of the wrapped variant.
    #[inline]
    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    /// Returns `true` if this effect carries the tag of `V`.
    #[inline]
    pub fn is<V: Variant>(&self) -> bool {
        self.tag == V::TAG
    }

    /// Borrows the payload if it is a `V`.
    pub fn payload<V: Variant>(&self) -> Option<&V> {
        self.payload.downcast_ref::<V>()
    }

    /// Extracts the payload as a `V`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::PayloadMismatch`] if the payload is not a `V`.
    pub fn into_variant<V: Variant>(self) -> Result<V, Fault> {
        let tag = self.tag;
        Rc::downcast::<V>(self.payload)
            .map(Rc::unwrap_or_clone)
            .map_err(|_| {
                tracing::debug!(tag, expected = type_name::<V>(), "effect payload has an unexpected type");
                Fault::PayloadMismatch {
                    tag,
                    expected: type_name::<V>(),
                }
            })
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Payload<'a>(&'a Effect);

        impl fmt::Debug for Payload<'_> {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                (self.0.render)(&*self.0.payload, formatter)
            }
        }

        formatter
            .debug_struct("Effect")
            .field("tag", &self.tag)
            .field("payload", &Payload(self))
            .finish()
    }
}

// =============================================================================
// Interpreter building blocks
// =============================================================================

/// What an interpreter splices in for one intercepted effect.
///
/// `Left` answers the effect locally; `Right` either forwards the effect
/// unchanged to the next interpreter out, or raises a fault.
pub type Answer<S> = Either<S, Either<Once<Effect, Value>, Raise<Effect, Value>>>;

/// Answers an intercepted effect with `reply`.
#[inline]
pub fn answer<S>(reply: S) -> Answer<S> {
    Either::Left(reply)
}

/// Re-yields `effect` and passes the outer answer back unchanged.
#[inline]
pub fn forward<S>(effect: Effect) -> Answer<S> {
    Either::Right(Either::Left(iter::once(effect)))
}

/// Fails the intercepted effect with `fault`.
#[inline]
pub fn reject<S>(fault: Fault) -> Answer<S> {
    Either::Right(Either::Right(iter::raise(fault)))
}

/// A handler suspension whose result is erased into the resume channel.
pub type Reply<S, R> = iter::Map<S, fn(R) -> Value>;

fn reply<S>(suspension: S) -> Reply<S, S::Output>
where
    S: Suspension,
    S::Output: 'static,
{
    let erase: fn(S::Output) -> Value = Value::new::<S::Output>;
    iter::Map::new(suspension, erase)
}

/// Interprets every `V` effect of `nano` with `handler`; other effects pass through.
///
/// The computation the handler returns may itself yield effects, which reach
/// the interpreters outside this one.
pub fn handle<V, N, F, N2>(nano: N, handler: F) -> Handle<N, V, F>
where
    V: Variant,
    N: Nano<Yield = Effect>,
    F: Fn(V) -> N2 + 'static,
    N2: Nano<Yield = Effect, Output = V::Resume>,
{
    Handle {
        nano,
        handler: Rc::new(handler),
        _variant: PhantomData,
    }
}

/// A computation whose `V` effects are answered by a handler.
///
/// Created by [`handle`].
pub struct Handle<N, V, F> {
    nano: N,
    handler: Rc<F>,
    _variant: PhantomData<fn() -> V>,
}

impl<N: Clone, V, F> Clone for Handle<N, V, F> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            handler: Rc::clone(&self.handler),
            _variant: PhantomData,
        }
    }
}

impl<N, V, F, N2> Nano for Handle<N, V, F>
where
    V: Variant,
    N: Nano<Yield = Effect>,
    F: Fn(V) -> N2 + 'static,
    N2: Nano<Yield = Effect, Output = V::Resume>,
{
    type Yield = Effect;
    type Output = N::Output;
    #[allow(clippy::type_complexity)]
    type Iter = iter::FlatMapYield<N::Iter, Box<dyn FnMut(Effect) -> Answer<Reply<N2::Iter, V::Resume>>>, Answer<Reply<N2::Iter, V::Resume>>>;

    fn iterate(&self) -> Self::Iter {
        let handler = Rc::clone(&self.handler);
        let respond: Box<dyn FnMut(Effect) -> Answer<Reply<N2::Iter, V::Resume>>> = Box::new(move |effect: Effect| {
            if !effect.is::<V>() {
                return forward(effect);
            }
            match effect.into_variant::<V>() {
                Ok(variant) => {
                    tracing::trace!(tag = V::TAG, "handling effect");
                    answer(reply(handler(variant).iterate()))
                }
                Err(fault) => reject(fault),
            }
        });
        iter::FlatMapYield::new(self.nano.iterate(), respond)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::run;
    use crate::define_variant;
    use crate::nano;
    use rstest::rstest;

    define_variant! {
        Ask(pub &'static str) -> i32
    }

    define_variant! {
        Tell(pub String) -> ()
    }

    #[rstest]
    fn variant_is_a_computation() {
        let mut iter = Ask("x").iterate();
        let step = iter.resume(Value::unit()).unwrap();
        let effect = step.yielded().unwrap();
        assert!(effect.is::<Ask>());
        assert_eq!(effect.tag(), "Ask");
        assert_eq!(iter.resume(Value::new(5)).unwrap().done(), Some(5));
    }

    #[rstest]
    fn effect_debug_shows_tag_and_payload() {
        let effect = Effect::new(Tell(String::from("hi")));
        assert_eq!(format!("{effect:?}"), "Effect { tag: \"Tell\", payload: Tell(\"hi\") }");
    }

    #[rstest]
    fn into_variant_checks_the_payload_type() {
        #[derive(Debug, Clone)]
        struct Impostor;
        impl Variant for Impostor {
            const TAG: &'static str = "Ask";
            type Resume = i32;
        }

        let effect = Effect::new(Impostor);
        assert!(effect.is::<Ask>());
        assert!(matches!(
            effect.into_variant::<Ask>(),
            Err(Fault::PayloadMismatch { tag: "Ask", .. })
        ));
    }

    #[rstest]
    fn handle_answers_matching_effects() {
        let program = Ask("a").flat_map(|a| Ask("bb").map(move |b| a + b));
        let handled = handle(program, |Ask(question)| nano::of(i32::try_from(question.len()).unwrap_or_default()));
        assert_eq!(run(handled), Ok(3));
    }

    #[rstest]
    fn handle_forwards_other_effects() {
        let program = Tell(String::from("log")).then(Ask("q"));
        let handled = handle(program, |Ask(_)| nano::of(1));
        assert!(matches!(run(handled), Err(Fault::Unhandled { .. })));
    }

    #[rstest]
    fn handler_may_yield_outward() {
        let program = Ask("inner");
        let relayed = handle(program, |Ask(question)| Tell(question.to_string()).map(|()| 42));
        let told = handle(relayed, |Tell(_)| nano::of(()));
        assert_eq!(run(told), Ok(42));
    }
}
