//! Computation-level combinators.
//!
//! Each node keeps its closure behind an `Rc` and hands every fresh
//! suspension a boxed handle to it, so a composed computation can be iterated
//! any number of times without cloning user closures.

use std::rc::Rc;

use super::Nano;
use crate::iter;

// =============================================================================
// Map
// =============================================================================

/// Transforms the completion value of a computation.
///
/// Created by [`Nano::map`].
pub struct Map<N, F> {
    nano: N,
    f: Rc<F>,
}

impl<N: Clone, F> Clone for Map<N, F> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            f: Rc::clone(&self.f),
        }
    }
}

impl<N, F> Map<N, F> {
    pub(crate) fn new(nano: N, f: F) -> Self {
        Self { nano, f: Rc::new(f) }
    }

    /// Fuses a second completion transform into this node.
    pub fn map<B, C, G>(self, g: G) -> Map<N, impl Fn(N::Output) -> C + 'static>
    where
        N: Nano,
        F: Fn(N::Output) -> B + 'static,
        G: Fn(B) -> C + 'static,
    {
        let f = self.f;
        Map::new(self.nano, move |value| g(f(value)))
    }
}

impl<N, F, B> Nano for Map<N, F>
where
    N: Nano,
    F: Fn(N::Output) -> B + 'static,
{
    type Yield = N::Yield;
    type Output = B;
    type Iter = iter::Map<N::Iter, Box<dyn FnMut(N::Output) -> B>>;

    fn iterate(&self) -> Self::Iter {
        let f = Rc::clone(&self.f);
        let f: Box<dyn FnMut(N::Output) -> B> = Box::new(move |value| f(value));
        iter::Map::new(self.nano.iterate(), f)
    }
}

// =============================================================================
// MapYield
// =============================================================================

/// Transforms every value a computation yields.
///
/// Created by [`Nano::map_yield`].
pub struct MapYield<N, F> {
    nano: N,
    f: Rc<F>,
}

impl<N: Clone, F> Clone for MapYield<N, F> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            f: Rc::clone(&self.f),
        }
    }
}

impl<N, F> MapYield<N, F> {
    pub(crate) fn new(nano: N, f: F) -> Self {
        Self { nano, f: Rc::new(f) }
    }

    /// Fuses a second yield transform into this node.
    pub fn map_yield<Y2, Y3, G>(self, g: G) -> MapYield<N, impl Fn(N::Yield) -> Y3 + 'static>
    where
        N: Nano,
        F: Fn(N::Yield) -> Y2 + 'static,
        G: Fn(Y2) -> Y3 + 'static,
    {
        let f = self.f;
        MapYield::new(self.nano, move |value| g(f(value)))
    }
}

impl<N, F, Y2> Nano for MapYield<N, F>
where
    N: Nano,
    F: Fn(N::Yield) -> Y2 + 'static,
{
    type Yield = Y2;
    type Output = N::Output;
    type Iter = iter::MapYield<N::Iter, Box<dyn FnMut(N::Yield) -> Y2>>;

    fn iterate(&self) -> Self::Iter {
        let f = Rc::clone(&self.f);
        let f: Box<dyn FnMut(N::Yield) -> Y2> = Box::new(move |value| f(value));
        iter::MapYield::new(self.nano.iterate(), f)
    }
}

// =============================================================================
// MapBoth
// =============================================================================

/// Transforms both channels of a computation.
///
/// Created by [`Nano::map_both`].
pub struct MapBoth<N, G, F> {
    nano: N,
    on_yield: Rc<G>,
    on_return: Rc<F>,
}

impl<N: Clone, G, F> Clone for MapBoth<N, G, F> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            on_yield: Rc::clone(&self.on_yield),
            on_return: Rc::clone(&self.on_return),
        }
    }
}

impl<N, G, F> MapBoth<N, G, F> {
    pub(crate) fn new(nano: N, on_yield: G, on_return: F) -> Self {
        Self {
            nano,
            on_yield: Rc::new(on_yield),
            on_return: Rc::new(on_return),
        }
    }
}

impl<N, G, F, Y2, B> Nano for MapBoth<N, G, F>
where
    N: Nano,
    G: Fn(N::Yield) -> Y2 + 'static,
    F: Fn(N::Output) -> B + 'static,
{
    type Yield = Y2;
    type Output = B;
    type Iter = iter::MapBoth<N::Iter, Box<dyn FnMut(N::Yield) -> Y2>, Box<dyn FnMut(N::Output) -> B>>;

    fn iterate(&self) -> Self::Iter {
        let on_yield = Rc::clone(&self.on_yield);
        let on_return = Rc::clone(&self.on_return);
        let on_yield: Box<dyn FnMut(N::Yield) -> Y2> = Box::new(move |value| on_yield(value));
        let on_return: Box<dyn FnMut(N::Output) -> B> = Box::new(move |value| on_return(value));
        iter::MapBoth::new(self.nano.iterate(), on_yield, on_return)
    }
}

// =============================================================================
// FlatMap
// =============================================================================

/// Sequences a computation with one built from its result.
///
/// Created by [`Nano::flat_map`].
pub struct FlatMap<N, F> {
    nano: N,
    f: Rc<F>,
}

impl<N: Clone, F> Clone for FlatMap<N, F> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            f: Rc::clone(&self.f),
        }
    }
}

impl<N, F> FlatMap<N, F> {
    pub(crate) fn new(nano: N, f: F) -> Self {
        Self { nano, f: Rc::new(f) }
    }
}

impl<N, F, N2> Nano for FlatMap<N, F>
where
    N: Nano,
    F: Fn(N::Output) -> N2 + 'static,
    N2: Nano<Yield = N::Yield>,
    N2::Output: Clone,
{
    type Yield = N::Yield;
    type Output = N2::Output;
    type Iter = iter::FlatMap<N::Iter, Box<dyn FnOnce(N::Output) -> N2::Iter>, N2::Iter>;

    fn iterate(&self) -> Self::Iter {
        let f = Rc::clone(&self.f);
        let f: Box<dyn FnOnce(N::Output) -> N2::Iter> = Box::new(move |value| f(value).iterate());
        iter::FlatMap::new(self.nano.iterate(), f)
    }
}

// =============================================================================
// FlatMapYield
// =============================================================================

/// Answers every yield of a computation with another computation.
///
/// Created by [`Nano::flat_map_yield`].
pub struct FlatMapYield<N, F> {
    nano: N,
    f: Rc<F>,
}

impl<N: Clone, F> Clone for FlatMapYield<N, F> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            f: Rc::clone(&self.f),
        }
    }
}

impl<N, F> FlatMapYield<N, F> {
    pub(crate) fn new(nano: N, f: F) -> Self {
        Self { nano, f: Rc::new(f) }
    }
}

impl<N, F, N2> Nano for FlatMapYield<N, F>
where
    N: Nano,
    F: Fn(N::Yield) -> N2 + 'static,
    N2: Nano,
    N2::Output: 'static,
{
    type Yield = N2::Yield;
    type Output = N::Output;
    type Iter = iter::FlatMapYield<N::Iter, Box<dyn FnMut(N::Yield) -> N2::Iter>, N2::Iter>;

    fn iterate(&self) -> Self::Iter {
        let f = Rc::clone(&self.f);
        let f: Box<dyn FnMut(N::Yield) -> N2::Iter> = Box::new(move |value| f(value).iterate());
        iter::FlatMapYield::new(self.nano.iterate(), f)
    }
}

// =============================================================================
// Then / Flatten
// =============================================================================

/// Runs one computation after another, keeping the second result.
///
/// Created by [`Nano::then`].
#[derive(Debug, Clone)]
pub struct Then<N, N2> {
    first: N,
    second: N2,
}

impl<N, N2> Then<N, N2> {
    pub(crate) const fn new(first: N, second: N2) -> Self {
        Self { first, second }
    }
}

impl<N, N2> Nano for Then<N, N2>
where
    N: Nano,
    N2: Nano<Yield = N::Yield>,
    N2::Output: Clone,
    N2::Iter: 'static,
{
    type Yield = N::Yield;
    type Output = N2::Output;
    type Iter = iter::FlatMap<N::Iter, Box<dyn FnOnce(N::Output) -> N2::Iter>, N2::Iter>;

    fn iterate(&self) -> Self::Iter {
        let second = self.second.iterate();
        let next: Box<dyn FnOnce(N::Output) -> N2::Iter> = Box::new(move |_| second);
        iter::FlatMap::new(self.first.iterate(), next)
    }
}

/// Runs the computation another computation completes with.
///
/// Created by [`flatten`](super::flatten).
#[derive(Debug, Clone)]
pub struct Flatten<N> {
    nano: N,
}

impl<N> Flatten<N> {
    pub(crate) const fn new(nano: N) -> Self {
        Self { nano }
    }
}

fn iterate_owned<M: Nano>(nano: M) -> M::Iter {
    nano.iterate()
}

impl<N> Nano for Flatten<N>
where
    N: Nano,
    N::Output: Nano<Yield = N::Yield>,
    <N::Output as Nano>::Output: Clone,
{
    type Yield = N::Yield;
    type Output = <N::Output as Nano>::Output;
    #[allow(clippy::type_complexity)]
    type Iter = iter::FlatMap<
        N::Iter,
        fn(N::Output) -> <N::Output as Nano>::Iter,
        <N::Output as Nano>::Iter,
    >;

    fn iterate(&self) -> Self::Iter {
        let next: fn(N::Output) -> <N::Output as Nano>::Iter = iterate_owned::<N::Output>;
        iter::FlatMap::new(self.nano.iterate(), next)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{of, suspend};
    use super::*;
    use crate::Value;
    use crate::control::{run, run_with};
    use crate::iter::{Step, Suspension};
    use rstest::rstest;

    fn assert_fused_map<N, F>(_: &Map<N, F>) {}

    #[rstest]
    fn map_chain_fuses_at_computation_level() {
        let fused = suspend::<i32, _>(()).map(|x| x + 1).map(|x| x * 2);
        assert_fused_map::<super::super::Suspend<(), i32>, _>(&fused);
        assert_eq!(run_with(fused, |()| Ok(Value::new(4))), Ok(10));
    }

    #[rstest]
    fn map_yield_fuses_at_computation_level() {
        let fused = suspend::<i32, _>(1_u8).map_yield(u32::from).map_yield(|y| y * 7);
        let mut iter = fused.iterate();
        assert_eq!(iter.resume(Value::unit()), Ok(Step::Yield(7_u32)));
    }

    #[rstest]
    fn map_both_transforms_each_channel() {
        let program = suspend::<i32, _>(2).map_both(|y: i32| y.to_string(), |x| x + 1);
        let mut iter = program.iterate();
        assert_eq!(iter.resume(Value::unit()), Ok(Step::Yield(String::from("2"))));
        assert_eq!(iter.resume(Value::new(4)), Ok(Step::Done(5)));
    }

    #[rstest]
    fn flat_map_reruns_closure_per_iteration() {
        let program = of::<(), _>(3).flat_map(|x| of(x * x));
        assert_eq!(run(program.clone()), Ok(9));
        assert_eq!(run(program), Ok(9));
    }

    #[rstest]
    fn flat_map_yield_interprets_requests() {
        let program = suspend::<i32, _>("double 5").flat_map(|x| suspend::<i32, _>("add 1").map(move |y| x + y));
        let handled = program.flat_map_yield(|request: &'static str| {
            let answer = if request == "double 5" { 10 } else { 1 };
            of::<(), i32>(answer)
        });
        assert_eq!(run(handled), Ok(11));
    }

    #[rstest]
    fn then_discards_the_first_result() {
        let program = suspend::<i32, _>('a').then(suspend::<i32, _>('b'));
        let mut seen = Vec::new();
        let result = run_with(program, |request| {
            seen.push(request);
            Ok(Value::new(if request == 'a' { 1 } else { 2 }))
        });
        assert_eq!(result, Ok(2));
        assert_eq!(seen, vec!['a', 'b']);
    }
}
