//! Cleanup and fault-recovery wrappers.

use super::{Resumed, Step, Suspension, Value};
use crate::Fault;

/// Runs a cleanup action exactly once when the inner instance finishes.
///
/// Finishing means completing, raising a fault, being cancelled, or being
/// closed, whichever comes first.
///
/// Created by [`Suspension::ensure`].
pub struct Ensure<S, F> {
    inner: S,
    cleanup: Option<F>,
}

impl<S, F: FnOnce()> Ensure<S, F> {
    pub(crate) const fn new(inner: S, cleanup: F) -> Self {
        Self {
            inner,
            cleanup: Some(cleanup),
        }
    }

    fn finish(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }

    fn observe<Y, R>(&mut self, resumed: Resumed<Y, R>) -> Resumed<Y, R> {
        if !matches!(resumed, Ok(Step::Yield(_))) {
            self.finish();
        }
        resumed
    }
}

impl<S, F> Suspension for Ensure<S, F>
where
    S: Suspension,
    F: FnOnce(),
{
    type Yield = S::Yield;
    type Output = S::Output;

    fn resume(&mut self, input: Value) -> Resumed<S::Yield, S::Output> {
        let resumed = self.inner.resume(input);
        self.observe(resumed)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<S::Yield, S::Output> {
        let resumed = self.inner.throw(fault);
        self.observe(resumed)
    }

    fn cancel(&mut self, value: S::Output) -> Resumed<S::Yield, S::Output> {
        let resumed = self.inner.cancel(value);
        self.observe(resumed)
    }

    fn close(&mut self) {
        self.inner.close();
        self.finish();
    }
}

/// Lets a handler turn faults the inner instance re-raises into a completion.
///
/// Created by [`Suspension::rescue`].
pub struct Rescue<S, F> {
    inner: S,
    handler: F,
}

impl<S, F> Rescue<S, F> {
    pub(crate) const fn new(inner: S, handler: F) -> Self {
        Self { inner, handler }
    }
}

impl<S, F> Suspension for Rescue<S, F>
where
    S: Suspension,
    F: FnMut(Fault) -> Result<S::Output, Fault>,
{
    type Yield = S::Yield;
    type Output = S::Output;

    #[inline]
    fn resume(&mut self, input: Value) -> Resumed<S::Yield, S::Output> {
        self.inner.resume(input)
    }

    fn throw(&mut self, fault: Fault) -> Resumed<S::Yield, S::Output> {
        match self.inner.throw(fault) {
            Err(fault) => {
                tracing::debug!(%fault, "rescuing injected fault");
                let recovered = (self.handler)(fault)?;
                self.inner.close();
                Ok(Step::Done(recovered))
            }
            handled => handled,
        }
    }

    #[inline]
    fn cancel(&mut self, value: S::Output) -> Resumed<S::Yield, S::Output> {
        self.inner.cancel(value)
    }

    #[inline]
    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::super::{once, raise, success};
    use super::*;
    use rstest::rstest;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<u32>>, impl FnOnce()) {
        let count = Rc::new(Cell::new(0));
        let handle = Rc::clone(&count);
        (count, move || handle.set(handle.get() + 1))
    }

    #[rstest]
    fn ensure_runs_on_completion() {
        let (count, cleanup) = counter();
        let mut guarded = once::<i32, _>(()).ensure(cleanup);
        guarded.resume(Value::unit()).unwrap();
        assert_eq!(count.get(), 0);
        guarded.resume(Value::new(1)).unwrap();
        guarded.resume(Value::new(2)).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[rstest]
    fn ensure_runs_on_fault() {
        let (count, cleanup) = counter();
        let mut guarded = raise::<(), i32>(Fault::injected("x")).ensure(cleanup);
        assert!(guarded.resume(Value::unit()).is_err());
        assert_eq!(count.get(), 1);
    }

    #[rstest]
    fn ensure_runs_on_cancel_and_close_once() {
        let (count, cleanup) = counter();
        let mut guarded = once::<i32, _>(()).ensure(cleanup);
        guarded.resume(Value::unit()).unwrap();
        assert_eq!(guarded.cancel(3), Ok(Step::Done(3)));
        guarded.close();
        assert_eq!(count.get(), 1);
    }

    #[rstest]
    fn rescue_recovers_reraised_fault() {
        let mut rescued = once::<i32, _>("wait").rescue(|_| Ok(0));
        rescued.resume(Value::unit()).unwrap();
        assert_eq!(rescued.throw(Fault::injected("boom")), Ok(Step::Done(0)));
    }

    #[rstest]
    fn rescue_can_refuse() {
        let mut rescued = once::<i32, _>("wait").rescue(|fault| Err(Fault::injected(format!("wrapped: {fault}"))));
        rescued.resume(Value::unit()).unwrap();
        assert_eq!(
            rescued.throw(Fault::injected("boom")),
            Err(Fault::injected("wrapped: boom"))
        );
    }

    #[rstest]
    fn rescue_leaves_resume_faults_alone() {
        let mut rescued = success::<(), i32>(1).flat_map(|_| raise::<(), i32>(Fault::injected("x"))).rescue(|_| Ok(0));
        assert_eq!(rescued.resume(Value::unit()), Err(Fault::injected("x")));
    }
}
