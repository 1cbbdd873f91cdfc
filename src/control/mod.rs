//! Control structures for driving computations.
//!
//! - [`Either`]: one of two suspensions or computations behind a single type
//! - [`run`], [`run_with`], [`Runner`]: step a computation to completion
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::{Either, run};
//! use nano_effect::nano::{self, Nano};
//!
//! let pick = |flag: bool| -> Either<nano::Of<(), i32>, nano::Of<(), i32>> {
//!     if flag { Either::Left(nano::of(1)) } else { Either::Right(nano::of(2)) }
//! };
//!
//! assert_eq!(run(pick(true)), Ok(1));
//! assert_eq!(run(pick(false).map(|n| n * 10)), Ok(20));
//! ```

mod driver;
mod either;

pub use driver::{Runner, run, run_with};
pub use either::Either;
