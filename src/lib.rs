//! # nano-effect
//!
//! A minimal algebraic effect runtime built on resumable computations.
//!
//! ## Overview
//!
//! A program is a re-runnable [`Nano`] value. Running it produces a
//! [`Suspension`] that yields typed effects and is resumed with their answers.
//! Interpreters are ordinary combinators that answer some effects and forward
//! the rest, so a program is assembled by wrapping it in the interpreters it
//! needs:
//!
//! - **Suspensions** ([`iter`]): the resume/throw/cancel/close protocol and its
//!   combinator algebra
//! - **Computations** ([`nano`]): re-runnable recipes, constructors and the
//!   [`nano!`] do-notation macro
//! - **Effects** ([`effect`]): tagged variants, dependency injection through
//!   [`Env`](effect::Env), typed failure, scoped refs, event streams and
//!   optional values
//! - **Drivers** ([`control`]): [`run`](control::run) and
//!   [`run_with`](control::run_with)
//!
//! Wiring errors (a missing dependency, a resume value of the wrong type, an
//! unhandled effect) are reported as [`Fault`]s, separate from the modeled
//! failures a program can recover from.
//!
//! ## Feature Flags
//!
//! - `refs`: scoped mutable references ([`Ref`](effect::Ref), [`with_refs`](effect::with_refs))
//! - `emit`: event streams ([`emit`](effect::emit), [`observe`](effect::observe))
//! - `option`: absence as an effect ([`optional`](effect::optional))
//! - `fxhash`: faster hashing for environment and ref stores
//! - `full`: enable all features
//!
//! ## Example
//!
//! ```rust
//! use nano_effect::prelude::*;
//! use nano_effect::{define_ref, define_tag};
//!
//! define_tag! { Multiplier: i32 }
//! define_ref! { Counter: i32 = 0 }
//!
//! let program = nano_effect::nano! {
//!     _ <= Counter::set(5);
//!     factor <= Multiplier;
//!     product <= Counter::modify(move |count| (count * factor, count + 1));
//!     count <= Counter::get();
//!     nano::of((count, product))
//! };
//!
//! let wired = with_env(with_refs(provide(program, Multiplier::env(3))));
//! assert_eq!(run(wired), Ok((6, 15)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types and traits.
///
/// # Usage
///
/// ```rust
/// use nano_effect::prelude::*;
/// ```
pub mod prelude {
    pub use crate::control::{Either, Runner, run, run_with};
    pub use crate::effect::*;
    pub use crate::error::Fault;
    pub use crate::iter::{Step, Suspension, Value};
    pub use crate::nano::{self, Nano};
}

pub mod control;
pub mod effect;
pub mod iter;
pub mod nano;

mod error;

pub use error::Fault;
pub use iter::{Step, Suspension, Value};
pub use nano::Nano;

static_assertions::assert_not_impl_any!(effect::Env: Send, Sync);
static_assertions::assert_not_impl_any!(iter::Value: Send, Sync);
#[cfg(feature = "refs")]
static_assertions::assert_not_impl_any!(effect::RefStore: Send, Sync);
