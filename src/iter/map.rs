//! Channel transformers and their fusion rules.
//!
//! Chaining `map` on a [`Map`], `map_yield` on a [`MapYield`], or any of the
//! three on a [`MapBoth`] composes the functions instead of stacking nodes,
//! so the inner instance is never wrapped more than once. These fused forms
//! are inherent methods and take precedence over the [`Suspension`] defaults.

use super::{FlatMap, FlatMapYield, Resumed, Suspension, Value};
use crate::Fault;

// =============================================================================
// Map
// =============================================================================

/// Transforms the completion value of the inner instance.
///
/// Created by [`Suspension::map`].
#[derive(Debug, Clone)]
pub struct Map<S, F> {
    inner: S,
    f: F,
}

impl<S, F> Map<S, F> {
    pub(crate) const fn new(inner: S, f: F) -> Self {
        Self { inner, f }
    }

    /// Fuses a second completion transform into this node.
    pub fn map<B, C, G>(self, mut g: G) -> Map<S, impl FnMut(S::Output) -> C>
    where
        S: Suspension,
        F: FnMut(S::Output) -> B,
        G: FnMut(B) -> C,
    {
        let mut f = self.f;
        Map::new(self.inner, move |value| g(f(value)))
    }

    /// Absorbs this node into a [`MapBoth`].
    pub fn map_both<Y2, B, C, G, H>(
        self,
        on_yield: G,
        mut on_return: H,
    ) -> MapBoth<S, G, impl FnMut(S::Output) -> C>
    where
        S: Suspension,
        F: FnMut(S::Output) -> B,
        G: FnMut(S::Yield) -> Y2,
        H: FnMut(B) -> C,
    {
        let mut f = self.f;
        MapBoth::new(self.inner, on_yield, move |value| on_return(f(value)))
    }

    /// Fuses the completion transform into the splice function.
    pub fn flat_map<B, S2, G>(self, g: G) -> FlatMap<S, impl FnOnce(S::Output) -> S2, S2>
    where
        S: Suspension,
        F: FnMut(S::Output) -> B,
        G: FnOnce(B) -> S2,
        S2: Suspension<Yield = S::Yield>,
    {
        let mut f = self.f;
        FlatMap::new(self.inner, move |value| g(f(value)))
    }
}

impl<S, F, B> Suspension for Map<S, F>
where
    S: Suspension,
    F: FnMut(S::Output) -> B,
{
    type Yield = S::Yield;
    type Output = B;

    #[inline]
    fn resume(&mut self, input: Value) -> Resumed<S::Yield, B> {
        let step = self.inner.resume(input)?;
        Ok(step.map_done(&mut self.f))
    }

    #[inline]
    fn throw(&mut self, fault: Fault) -> Resumed<S::Yield, B> {
        let step = self.inner.throw(fault)?;
        Ok(step.map_done(&mut self.f))
    }

    fn cancel(&mut self, value: B) -> Resumed<S::Yield, B> {
        self.inner.close();
        Ok(super::Step::Done(value))
    }

    #[inline]
    fn close(&mut self) {
        self.inner.close();
    }
}

// =============================================================================
// MapYield
// =============================================================================

/// Transforms every value the inner instance yields.
///
/// Created by [`Suspension::map_yield`].
#[derive(Debug, Clone)]
pub struct MapYield<S, F> {
    inner: S,
    f: F,
}

impl<S, F> MapYield<S, F> {
    pub(crate) const fn new(inner: S, f: F) -> Self {
        Self { inner, f }
    }

    /// Fuses a second yield transform into this node.
    pub fn map_yield<Y2, Y3, G>(self, mut g: G) -> MapYield<S, impl FnMut(S::Yield) -> Y3>
    where
        S: Suspension,
        F: FnMut(S::Yield) -> Y2,
        G: FnMut(Y2) -> Y3,
    {
        let mut f = self.f;
        MapYield::new(self.inner, move |value| g(f(value)))
    }

    /// Absorbs this node into a [`MapBoth`].
    pub fn map_both<Y2, Y3, B, G, H>(
        self,
        mut on_yield: G,
        on_return: H,
    ) -> MapBoth<S, impl FnMut(S::Yield) -> Y3, H>
    where
        S: Suspension,
        F: FnMut(S::Yield) -> Y2,
        G: FnMut(Y2) -> Y3,
        H: FnMut(S::Output) -> B,
    {
        let mut f = self.f;
        MapBoth::new(self.inner, move |value| on_yield(f(value)), on_return)
    }

    /// Fuses the yield transform into the handler.
    pub fn flat_map_yield<Y2, S2, G>(
        self,
        mut g: G,
    ) -> FlatMapYield<S, impl FnMut(S::Yield) -> S2, S2>
    where
        S: Suspension,
        F: FnMut(S::Yield) -> Y2,
        G: FnMut(Y2) -> S2,
        S2: Suspension,
        S2::Output: 'static,
    {
        let mut f = self.f;
        FlatMapYield::new(self.inner, move |value| g(f(value)))
    }
}

impl<S, F, Y2> Suspension for MapYield<S, F>
where
    S: Suspension,
    F: FnMut(S::Yield) -> Y2,
{
    type Yield = Y2;
    type Output = S::Output;

    #[inline]
    fn resume(&mut self, input: Value) -> Resumed<Y2, S::Output> {
        let step = self.inner.resume(input)?;
        Ok(step.map_yield(&mut self.f))
    }

    #[inline]
    fn throw(&mut self, fault: Fault) -> Resumed<Y2, S::Output> {
        let step = self.inner.throw(fault)?;
        Ok(step.map_yield(&mut self.f))
    }

    #[inline]
    fn cancel(&mut self, value: S::Output) -> Resumed<Y2, S::Output> {
        let step = self.inner.cancel(value)?;
        Ok(step.map_yield(&mut self.f))
    }

    #[inline]
    fn close(&mut self) {
        self.inner.close();
    }
}

// =============================================================================
// MapBoth
// =============================================================================

/// Transforms both channels of the inner instance.
///
/// Created by [`Suspension::map_both`], or by fusing a [`Map`] or
/// [`MapYield`] with a transform on the other channel.
#[derive(Debug, Clone)]
pub struct MapBoth<S, G, F> {
    inner: S,
    on_yield: G,
    on_return: F,
}

impl<S, G, F> MapBoth<S, G, F> {
    pub(crate) const fn new(inner: S, on_yield: G, on_return: F) -> Self {
        Self {
            inner,
            on_yield,
            on_return,
        }
    }

    /// Fuses a completion transform.
    pub fn map<B, C, H>(self, mut h: H) -> MapBoth<S, G, impl FnMut(S::Output) -> C>
    where
        S: Suspension,
        F: FnMut(S::Output) -> B,
        H: FnMut(B) -> C,
    {
        let mut on_return = self.on_return;
        MapBoth::new(self.inner, self.on_yield, move |value| h(on_return(value)))
    }

    /// Fuses a yield transform.
    pub fn map_yield<Y2, Y3, H>(self, mut h: H) -> MapBoth<S, impl FnMut(S::Yield) -> Y3, F>
    where
        S: Suspension,
        G: FnMut(S::Yield) -> Y2,
        H: FnMut(Y2) -> Y3,
    {
        let mut on_yield = self.on_yield;
        MapBoth::new(self.inner, move |value| h(on_yield(value)), self.on_return)
    }

    /// Fuses transforms on both channels.
    pub fn map_both<Y2, Y3, B, C, H, K>(
        self,
        mut next_yield: H,
        mut next_return: K,
    ) -> MapBoth<S, impl FnMut(S::Yield) -> Y3, impl FnMut(S::Output) -> C>
    where
        S: Suspension,
        G: FnMut(S::Yield) -> Y2,
        F: FnMut(S::Output) -> B,
        H: FnMut(Y2) -> Y3,
        K: FnMut(B) -> C,
    {
        let mut on_yield = self.on_yield;
        let mut on_return = self.on_return;
        MapBoth::new(
            self.inner,
            move |value| next_yield(on_yield(value)),
            move |value| next_return(on_return(value)),
        )
    }
}

impl<S, G, F, Y2, B> Suspension for MapBoth<S, G, F>
where
    S: Suspension,
    G: FnMut(S::Yield) -> Y2,
    F: FnMut(S::Output) -> B,
{
    type Yield = Y2;
    type Output = B;

    #[inline]
    fn resume(&mut self, input: Value) -> Resumed<Y2, B> {
        let step = self.inner.resume(input)?;
        Ok(step.map_yield(&mut self.on_yield).map_done(&mut self.on_return))
    }

    #[inline]
    fn throw(&mut self, fault: Fault) -> Resumed<Y2, B> {
        let step = self.inner.throw(fault)?;
        Ok(step.map_yield(&mut self.on_yield).map_done(&mut self.on_return))
    }

    fn cancel(&mut self, value: B) -> Resumed<Y2, B> {
        self.inner.close();
        Ok(super::Step::Done(value))
    }

    #[inline]
    fn close(&mut self) {
        self.inner.close();
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Once, Step, once};
    use super::*;
    use rstest::rstest;

    fn drive<S: Suspension>(mut suspension: S, answer: Value) -> Vec<Step<S::Yield, S::Output>> {
        let first = suspension.resume(Value::unit()).unwrap();
        let second = suspension.resume(answer).unwrap();
        vec![first, second]
    }

    fn assert_single_map<Y, R, F>(_: &Map<Once<Y, R>, F>) {}
    fn assert_single_map_yield<Y, R, F>(_: &MapYield<Once<Y, R>, F>) {}
    fn assert_single_map_both<Y, R, G, F>(_: &MapBoth<Once<Y, R>, G, F>) {}

    #[rstest]
    fn map_transforms_only_completion() {
        let mapped = once::<i32, _>("y").map(|x| x + 1);
        assert_eq!(
            drive(mapped, Value::new(1)),
            vec![Step::Yield("y"), Step::Done(2)]
        );
    }

    #[rstest]
    fn map_yield_transforms_only_yields() {
        let mapped = once::<i32, _>(3_u8).map_yield(|y| u32::from(y) * 100);
        assert_eq!(
            drive(mapped, Value::new(7)),
            vec![Step::Yield(300_u32), Step::Done(7)]
        );
    }

    #[rstest]
    fn chained_maps_fuse_into_one_node() {
        let fused = once::<i32, _>(()).map(|x| x + 1).map(|x| x * 2).map(|x| x - 3);
        assert_single_map(&fused);
        assert_eq!(drive(fused, Value::new(4)), vec![Step::Yield(()), Step::Done(7)]);
    }

    #[rstest]
    fn chained_yield_maps_fuse_into_one_node() {
        let fused = once::<i32, _>(1).map_yield(|y| y + 1).map_yield(|y| y * 10);
        assert_single_map_yield(&fused);
        assert_eq!(drive(fused, Value::new(0)), vec![Step::Yield(20), Step::Done(0)]);
    }

    #[rstest]
    fn map_then_map_yield_absorbs_into_map_both() {
        let fused = once::<i32, _>(1)
            .map(|x| x + 1)
            .map_both(|y: i32| y * 5, |x| x * 2)
            .map_yield(|y| y - 1)
            .map(|x| x + 100);
        assert_single_map_both(&fused);
        assert_eq!(drive(fused, Value::new(3)), vec![Step::Yield(4), Step::Done(108)]);
    }

    #[rstest]
    fn map_yield_then_map_both_absorbs() {
        let fused = once::<i32, _>(2).map_yield(|y| y * 3).map_both(|y| y + 1, |x| -x);
        assert_single_map_both(&fused);
        assert_eq!(drive(fused, Value::new(9)), vec![Step::Yield(7), Step::Done(-9)]);
    }

    #[rstest]
    fn map_both_fuses_both_channels() {
        let fused = once::<i32, _>(1)
            .map_both(|y| y + 1, |x| x + 1)
            .map_both(|y| y * 2, |x| x * 2);
        assert_single_map_both(&fused);
        assert_eq!(drive(fused, Value::new(1)), vec![Step::Yield(4), Step::Done(4)]);
    }

    #[rstest]
    fn repeated_resume_after_completion_reapplies() {
        let mut mapped = once::<i32, _>(()).map(|x| x * 2);
        mapped.resume(Value::unit()).unwrap();
        assert_eq!(mapped.resume(Value::new(5)), Ok(Step::Done(10)));
        assert_eq!(mapped.resume(Value::new(6)), Ok(Step::Done(10)));
    }

    #[rstest]
    fn map_cancel_skips_the_transform() {
        let mut mapped = once::<i32, _>(()).map(|x: i32| x.to_string());
        mapped.resume(Value::unit()).unwrap();
        assert_eq!(mapped.cancel(String::from("early")), Ok(Step::Done(String::from("early"))));
    }

    #[rstest]
    fn map_forwards_throw() {
        let mut mapped = once::<i32, _>(()).map(|x| x + 1);
        mapped.resume(Value::unit()).unwrap();
        assert_eq!(mapped.throw(Fault::injected("stop")), Err(Fault::injected("stop")));
    }
}
