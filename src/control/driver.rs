//! Top-level drivers that step a computation to completion.
//!
//! A driver repeatedly resumes a fresh instance of a computation. Every value
//! the computation yields is handed to a responder whose answer becomes the
//! next resume value. [`run`] uses a responder that rejects everything, so any
//! effect still unhandled at the top surfaces as [`Fault::Unhandled`].
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::{run, run_with};
//! use nano_effect::nano::{self, Nano};
//! use nano_effect::Value;
//!
//! let pure = nano::of::<(), _>(42);
//! assert_eq!(run(pure), Ok(42));
//!
//! let ask = nano::suspend::<i32, _>("number?").map(|n| n + 1);
//! assert_eq!(run_with(ask, |_| Ok(Value::new(9))), Ok(10));
//! ```

use std::fmt;

use crate::Fault;
use crate::iter::{Step, Suspension, Value};
use crate::nano::Nano;

/// Runs a computation whose effects have all been interpreted.
///
/// # Errors
///
/// Returns [`Fault::Unhandled`] if the computation yields, or any fault the
/// computation raises.
pub fn run<N>(nano: N) -> Result<N::Output, Fault>
where
    N: Nano,
    N::Yield: fmt::Debug,
{
    Runner::new().run(nano)
}

/// Runs a computation, answering every yielded value with `responder`.
///
/// # Errors
///
/// Returns the first fault raised by the computation or the responder.
pub fn run_with<N, F>(nano: N, responder: F) -> Result<N::Output, Fault>
where
    N: Nano,
    F: FnMut(N::Yield) -> Result<Value, Fault>,
{
    Runner::new().run_with(nano, responder)
}

/// A configurable driver.
///
/// # Examples
///
/// ```rust
/// use nano_effect::control::Runner;
/// use nano_effect::nano::{self, Nano};
/// use nano_effect::{Fault, Value};
///
/// let chatty = nano::suspend::<(), _>(1).then(nano::suspend::<(), _>(2));
/// let result = Runner::new().max_steps(2).run_with(chatty, |_| Ok(Value::unit()));
/// assert_eq!(result, Err(Fault::StepLimit { limit: 2 }));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Runner {
    max_steps: Option<usize>,
}

impl Runner {
    /// Creates a driver with no step limit.
    #[must_use]
    pub const fn new() -> Self {
        Self { max_steps: None }
    }

    /// Stops with [`Fault::StepLimit`] after `limit` resumptions.
    #[must_use]
    pub const fn max_steps(mut self, limit: usize) -> Self {
        self.max_steps = Some(limit);
        self
    }

    /// Runs a computation whose effects have all been interpreted.
    ///
    /// # Errors
    ///
    /// See [`run`].
    pub fn run<N>(&self, nano: N) -> Result<N::Output, Fault>
    where
        N: Nano,
        N::Yield: fmt::Debug,
    {
        self.run_with(nano, |effect| {
            Err(Fault::Unhandled {
                effect: format!("{effect:?}"),
            })
        })
    }

    /// Runs a computation, answering every yielded value with `responder`.
    ///
    /// # Errors
    ///
    /// See [`run_with`].
    pub fn run_with<N, F>(&self, nano: N, responder: F) -> Result<N::Output, Fault>
    where
        N: Nano,
        F: FnMut(N::Yield) -> Result<Value, Fault>,
    {
        self.drive(nano.iterate(), responder)
    }

    /// Steps an existing suspension to completion.
    ///
    /// # Errors
    ///
    /// See [`run_with`].
    pub fn drive<S, F>(&self, mut suspension: S, mut responder: F) -> Result<S::Output, Fault>
    where
        S: Suspension,
        F: FnMut(S::Yield) -> Result<Value, Fault>,
    {
        let mut input = Value::unit();
        let mut steps = 0_usize;
        loop {
            if let Some(limit) = self.max_steps
                && steps >= limit
            {
                tracing::debug!(limit, "step limit reached, closing computation");
                suspension.close();
                return Err(Fault::StepLimit { limit });
            }
            steps += 1;
            let step = suspension.resume(input).inspect_err(|fault| {
                tracing::debug!(%fault, steps, "computation faulted");
            })?;
            match step {
                Step::Done(output) => {
                    tracing::trace!(steps, "computation completed");
                    return Ok(output);
                }
                Step::Yield(request) => match responder(request) {
                    Ok(answer) => input = answer,
                    Err(fault) => {
                        tracing::debug!(%fault, steps, "responder refused a yielded value");
                        suspension.close();
                        return Err(fault);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::nano;
    use rstest::rstest;

    #[rstest]
    fn run_pure_value() {
        assert_eq!(run(nano::of::<Effect, _>("done")), Ok("done"));
    }

    #[rstest]
    fn run_reports_stray_yields() {
        let stray = nano::suspend::<i32, _>("lost");
        assert_eq!(
            run(stray),
            Err(Fault::Unhandled {
                effect: String::from("\"lost\"")
            })
        );
    }

    #[rstest]
    fn run_with_answers_each_yield() {
        let program = nano::suspend::<i32, _>(1).flat_map(|a| nano::suspend::<i32, _>(2).map(move |b| a + b));
        let mut seen = Vec::new();
        let result = run_with(program, |request: i32| {
            seen.push(request);
            Ok(Value::new(request * 10))
        });
        assert_eq!(result, Ok(30));
        assert_eq!(seen, vec![1, 2]);
    }

    #[rstest]
    #[case(1, Err(Fault::StepLimit { limit: 1 }))]
    #[case(2, Err(Fault::StepLimit { limit: 2 }))]
    #[case(3, Ok(()))]
    fn runner_step_limit(#[case] limit: usize, #[case] expected: Result<(), Fault>) {
        let program = nano::suspend::<(), _>('a').then(nano::suspend::<(), _>('b'));
        let result = Runner::new().max_steps(limit).run_with(program, |_| Ok(Value::unit()));
        assert_eq!(result, expected);
    }

    #[rstest]
    fn runner_without_limit_is_default() {
        assert_eq!(Runner::default(), Runner::new());
    }
}
