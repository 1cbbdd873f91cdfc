//! Sequencing combinators.

use std::any::Any;

use super::{Resumed, Step, Suspension, Value};
use crate::Fault;

// =============================================================================
// FlatMap
// =============================================================================

/// Runs the outer instance, then splices the instance built from its result.
///
/// Yields of either instance pass through untouched. Once the spliced
/// instance exists, every operation is forwarded to it. Cancelling before the
/// splice freezes the given value as the completion.
///
/// Created by [`Suspension::flat_map`].
pub struct FlatMap<S, F, S2>
where
    S2: Suspension,
{
    outer: S,
    next: Option<F>,
    spliced: Option<S2>,
    cancelled: Option<S2::Output>,
}

impl<S, F, S2> FlatMap<S, F, S2>
where
    S2: Suspension,
{
    pub(crate) const fn new(outer: S, f: F) -> Self {
        Self {
            outer,
            next: Some(f),
            spliced: None,
            cancelled: None,
        }
    }
}

impl<S, F, S2> FlatMap<S, F, S2>
where
    S: Suspension,
    F: FnOnce(S::Output) -> S2,
    S2: Suspension<Yield = S::Yield>,
    S2::Output: Clone,
{
    fn advance(&mut self, step: Step<S::Yield, S::Output>, input: Value) -> Resumed<S::Yield, S2::Output> {
        match step {
            Step::Yield(value) => Ok(Step::Yield(value)),
            Step::Done(result) => match self.next.take() {
                Some(next) => self.spliced.insert(next(result)).resume(input),
                None => Err(Fault::injected("FlatMap resumed after its continuation was consumed")),
            },
        }
    }

    fn frozen(&self) -> Option<Resumed<S::Yield, S2::Output>> {
        self.cancelled.clone().map(|value| Ok(Step::Done(value)))
    }
}

impl<S, F, S2> Suspension for FlatMap<S, F, S2>
where
    S: Suspension,
    F: FnOnce(S::Output) -> S2,
    S2: Suspension<Yield = S::Yield>,
    S2::Output: Clone,
{
    type Yield = S::Yield;
    type Output = S2::Output;

    fn resume(&mut self, input: Value) -> Resumed<S::Yield, S2::Output> {
        if let Some(spliced) = self.spliced.as_mut() {
            return spliced.resume(input);
        }
        if let Some(frozen) = self.frozen() {
            return frozen;
        }
        let step = self.outer.resume(input.clone())?;
        self.advance(step, input)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<S::Yield, S2::Output> {
        if let Some(spliced) = self.spliced.as_mut() {
            return spliced.throw(fault);
        }
        if let Some(frozen) = self.frozen() {
            return frozen;
        }
        let step = self.outer.throw(fault)?;
        self.advance(step, Value::unit())
    }

    fn cancel(&mut self, value: S2::Output) -> Resumed<S::Yield, S2::Output> {
        if let Some(spliced) = self.spliced.as_mut() {
            return spliced.cancel(value);
        }
        if self.cancelled.is_none() {
            self.outer.close();
            self.next = None;
        }
        self.cancelled = Some(value.clone());
        Ok(Step::Done(value))
    }

    fn close(&mut self) {
        match self.spliced.as_mut() {
            Some(spliced) => spliced.close(),
            None if self.cancelled.is_none() => self.outer.close(),
            None => {}
        }
    }
}

// =============================================================================
// FlatMapYield
// =============================================================================

/// Answers every yield of the outer instance with a whole handler instance.
///
/// The handler instance runs to completion, passing its own yields outward,
/// and its result resumes the outer instance. Handler instances that complete
/// without yielding are never observable from outside.
///
/// A fault injected while a handler instance is active goes to that instance
/// first; if it re-raises, the fault is delivered to the outer instance at the
/// point where it yielded.
///
/// Created by [`Suspension::flat_map_yield`].
pub struct FlatMapYield<S, F, S2> {
    outer: S,
    handler: F,
    active: Option<S2>,
}

impl<S, F, S2> FlatMapYield<S, F, S2> {
    pub(crate) const fn new(outer: S, handler: F) -> Self {
        Self {
            outer,
            handler,
            active: None,
        }
    }
}

impl<S, F, S2> FlatMapYield<S, F, S2>
where
    S: Suspension,
    F: FnMut(S::Yield) -> S2,
    S2: Suspension,
    S2::Output: Any,
{
    /// Feeds outer yields to fresh handler instances until something is observable.
    fn drive(&mut self, mut step: Step<S::Yield, S::Output>) -> Resumed<S2::Yield, S::Output> {
        loop {
            let request = match step {
                Step::Done(result) => return Ok(Step::Done(result)),
                Step::Yield(request) => request,
            };
            let mut handler = (self.handler)(request);
            match handler.resume(Value::unit())? {
                Step::Yield(value) => {
                    self.active = Some(handler);
                    return Ok(Step::Yield(value));
                }
                Step::Done(answer) => step = self.outer.resume(Value::new(answer))?,
            }
        }
    }

    fn settle(&mut self, step: Step<S2::Yield, S2::Output>) -> Resumed<S2::Yield, S::Output> {
        match step {
            Step::Yield(value) => Ok(Step::Yield(value)),
            Step::Done(answer) => {
                self.active = None;
                let step = self.outer.resume(Value::new(answer))?;
                self.drive(step)
            }
        }
    }
}

impl<S, F, S2> Suspension for FlatMapYield<S, F, S2>
where
    S: Suspension,
    F: FnMut(S::Yield) -> S2,
    S2: Suspension,
    S2::Output: Any,
{
    type Yield = S2::Yield;
    type Output = S::Output;

    fn resume(&mut self, input: Value) -> Resumed<S2::Yield, S::Output> {
        if let Some(active) = self.active.as_mut() {
            let step = active.resume(input)?;
            return self.settle(step);
        }
        let step = self.outer.resume(input)?;
        self.drive(step)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<S2::Yield, S::Output> {
        let fault = match self.active.as_mut() {
            Some(active) => match active.throw(fault) {
                Ok(step) => return self.settle(step),
                Err(fault) => {
                    self.active = None;
                    fault
                }
            },
            None => fault,
        };
        let step = self.outer.throw(fault)?;
        self.drive(step)
    }

    fn cancel(&mut self, value: S::Output) -> Resumed<S2::Yield, S::Output> {
        if let Some(mut active) = self.active.take() {
            active.close();
        }
        let step = self.outer.cancel(value)?;
        self.drive(step)
    }

    fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.close();
        }
        self.outer.close();
    }
}
