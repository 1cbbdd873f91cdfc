//! Re-runnable computations.
//!
//! A [`Nano`] is a recipe for a [`Suspension`]: every call to
//! [`Nano::iterate`] builds a fresh, independent instance, so the same value
//! can be run, nested, or interpreted any number of times. All composition
//! happens at this level; the suspension algebra in [`crate::iter`] is what
//! actually executes.
//!
//! # Constructors
//!
//! - [`of`]: complete with a value
//! - [`sync`]: complete with the result of a thunk, evaluated on every run
//! - [`suspend`]: yield a raw value once and complete with the answer
//! - [`from_fn`]: wrap a factory of hand-written suspensions
//! - [`flatten`]: run a computation that produces a computation
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::run_with;
//! use nano_effect::nano::{self, Nano};
//! use nano_effect::Value;
//!
//! let program = nano_effect::nano! {
//!     a <= nano::suspend::<i32, _>("first");
//!     b <= nano::suspend::<i32, _>("second");
//!     let sum = a + b;
//!     nano::of(sum * 2)
//! };
//!
//! let mut answers = vec![20, 1].into_iter();
//! let result = run_with(program, |_| Ok(Value::new(answers.next().unwrap_or_default())));
//! assert_eq!(result, Ok(42));
//! ```

mod combinator;
mod macros;

pub use combinator::{FlatMap, FlatMapYield, Flatten, Map, MapBoth, MapYield, Then};

use std::marker::PhantomData;
use std::rc::Rc;

use crate::iter::{self, BoxSuspension, Once, Success, Suspension, Thunk};

/// A re-runnable computation that yields `Yield` values and completes with `Output`.
///
/// Implementors only provide [`iterate`](Self::iterate). Combinators take
/// `Fn` closures, which are shared between every instance the resulting
/// computation produces.
///
/// # Laws
///
/// ## Left identity
///
/// ```text
/// of(a).flat_map(f) == f(a)
/// ```
///
/// ## Right identity
///
/// ```text
/// m.flat_map(of) == m
/// ```
///
/// ## Map fusion
///
/// ```text
/// m.map(f).map(g) == m.map(|x| g(f(x)))
/// ```
pub trait Nano {
    /// The type of intermediate values.
    type Yield;
    /// The type of the completion value.
    type Output;
    /// The suspension built for each run.
    type Iter: Suspension<Yield = Self::Yield, Output = Self::Output>;

    /// Builds a fresh suspension for one run.
    fn iterate(&self) -> Self::Iter;

    /// Transforms the completion value.
    fn map<B, F>(self, f: F) -> Map<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> B + 'static,
    {
        Map::new(self, f)
    }

    /// Transforms every yielded value.
    fn map_yield<Y2, F>(self, f: F) -> MapYield<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Yield) -> Y2 + 'static,
    {
        MapYield::new(self, f)
    }

    /// Transforms both channels.
    fn map_both<Y2, B, G, F>(self, on_yield: G, on_return: F) -> MapBoth<Self, G, F>
    where
        Self: Sized,
        G: Fn(Self::Yield) -> Y2 + 'static,
        F: Fn(Self::Output) -> B + 'static,
    {
        MapBoth::new(self, on_yield, on_return)
    }

    /// Continues with the computation built from the completion value.
    fn flat_map<N2, F>(self, f: F) -> FlatMap<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Output) -> N2 + 'static,
        N2: Nano<Yield = Self::Yield>,
    {
        FlatMap::new(self, f)
    }

    /// Answers every yielded value with a whole computation.
    ///
    /// This is the building block of every interpreter.
    fn flat_map_yield<N2, F>(self, f: F) -> FlatMapYield<Self, F>
    where
        Self: Sized,
        F: Fn(Self::Yield) -> N2 + 'static,
        N2: Nano,
    {
        FlatMapYield::new(self, f)
    }

    /// Runs `next` after this computation, discarding this result.
    fn then<N2>(self, next: N2) -> Then<Self, N2>
    where
        Self: Sized,
        N2: Nano<Yield = Self::Yield>,
    {
        Then::new(self, next)
    }

    /// Applies `f` to this computation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nano_effect::control::run;
    /// use nano_effect::nano::{self, Nano};
    ///
    /// let doubled = nano::of::<(), _>(21).pipe(|m| m.map(|x| x * 2));
    /// assert_eq!(run(doubled), Ok(42));
    /// ```
    fn pipe<T, F>(self, f: F) -> T
    where
        Self: Sized,
        F: FnOnce(Self) -> T,
    {
        f(self)
    }

    /// Erases the concrete type, e.g. to return different computations from branches.
    fn boxed(self) -> Boxed<Self::Yield, Self::Output>
    where
        Self: Sized + 'static,
    {
        Boxed {
            nano: Rc::new(self),
        }
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// A computation that completes with a stored value.
///
/// Created by [`of`].
#[derive(Debug, Clone)]
pub struct Of<Y, A> {
    value: A,
    _yield: PhantomData<fn() -> Y>,
}

/// Completes with `value` without yielding.
#[inline]
pub const fn of<Y, A: Clone>(value: A) -> Of<Y, A> {
    Of {
        value,
        _yield: PhantomData,
    }
}

impl<Y, A: Clone> Nano for Of<Y, A> {
    type Yield = Y;
    type Output = A;
    type Iter = Success<Y, A>;

    #[inline]
    fn iterate(&self) -> Self::Iter {
        iter::success(self.value.clone())
    }
}

/// A computation that completes with the result of a thunk.
///
/// Created by [`sync`].
pub struct Defer<Y, F> {
    thunk: Rc<F>,
    _yield: PhantomData<fn() -> Y>,
}

/// Completes with `thunk()` without yielding; the thunk runs once per run.
///
/// # Examples
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use nano_effect::control::run;
/// use nano_effect::nano;
///
/// let runs = Rc::new(Cell::new(0));
/// let counter = Rc::clone(&runs);
/// let tick = Rc::new(nano::sync::<(), _, _>(move || {
///     counter.set(counter.get() + 1);
///     counter.get()
/// }));
///
/// assert_eq!(runs.get(), 0);
/// assert_eq!(run(Rc::clone(&tick)), Ok(1));
/// assert_eq!(run(Rc::clone(&tick)), Ok(2));
/// ```
#[inline]
pub fn sync<Y, A, F>(thunk: F) -> Defer<Y, F>
where
    F: Fn() -> A + 'static,
{
    Defer {
        thunk: Rc::new(thunk),
        _yield: PhantomData,
    }
}

impl<Y, A, F> Nano for Defer<Y, F>
where
    F: Fn() -> A + 'static,
{
    type Yield = Y;
    type Output = A;
    type Iter = Thunk<Y, Box<dyn FnMut() -> A>>;

    fn iterate(&self) -> Self::Iter {
        let thunk = Rc::clone(&self.thunk);
        let thunk: Box<dyn FnMut() -> A> = Box::new(move || thunk());
        iter::sync(thunk)
    }
}

/// A computation that yields one raw value and completes with the answer.
///
/// Created by [`suspend`].
#[derive(Debug, Clone)]
pub struct Suspend<Y, R> {
    value: Y,
    _resume: PhantomData<fn() -> R>,
}

/// Yields `value` once and completes with the resume answer as `R`.
///
/// Effects built with [`Variant`](crate::effect::Variant) use this under the
/// hood; `suspend` is the untyped escape hatch for custom yield channels.
#[inline]
pub const fn suspend<R, Y: Clone>(value: Y) -> Suspend<Y, R> {
    Suspend {
        value,
        _resume: PhantomData,
    }
}

impl<Y, R> Nano for Suspend<Y, R>
where
    Y: Clone,
    R: Clone + 'static,
{
    type Yield = Y;
    type Output = R;
    type Iter = Once<Y, R>;

    #[inline]
    fn iterate(&self) -> Self::Iter {
        iter::once(self.value.clone())
    }
}

/// A computation backed by a factory of suspensions.
///
/// Created by [`from_fn`].
pub struct FromFn<F> {
    factory: F,
}

/// Builds a computation that calls `factory` for every run.
///
/// # Examples
///
/// ```rust
/// use nano_effect::control::run;
/// use nano_effect::iter;
/// use nano_effect::nano;
///
/// let custom = nano::from_fn(|| iter::success::<(), _>(7));
/// assert_eq!(run(custom), Ok(7));
/// ```
#[inline]
pub const fn from_fn<S, F>(factory: F) -> FromFn<F>
where
    F: Fn() -> S,
    S: Suspension,
{
    FromFn { factory }
}

impl<S, F> Nano for FromFn<F>
where
    F: Fn() -> S,
    S: Suspension,
{
    type Yield = S::Yield;
    type Output = S::Output;
    type Iter = S;

    #[inline]
    fn iterate(&self) -> S {
        (self.factory)()
    }
}

/// Runs the computation produced by `nano`.
#[inline]
pub const fn flatten<N>(nano: N) -> Flatten<N>
where
    N: Nano,
    N::Output: Nano<Yield = N::Yield>,
{
    Flatten::new(nano)
}

// =============================================================================
// References and boxing
// =============================================================================

impl<N: Nano + ?Sized> Nano for Rc<N> {
    type Yield = N::Yield;
    type Output = N::Output;
    type Iter = N::Iter;

    #[inline]
    fn iterate(&self) -> Self::Iter {
        (**self).iterate()
    }
}

trait ErasedNano<Y, R> {
    fn iterate_boxed(&self) -> BoxSuspension<Y, R>;
}

impl<N> ErasedNano<N::Yield, N::Output> for N
where
    N: Nano,
    N::Iter: 'static,
{
    fn iterate_boxed(&self) -> BoxSuspension<N::Yield, N::Output> {
        Box::new(self.iterate())
    }
}

/// A type-erased, cheaply cloneable computation.
///
/// Created by [`Nano::boxed`].
pub struct Boxed<Y, R> {
    nano: Rc<dyn ErasedNano<Y, R>>,
}

impl<Y, R> Clone for Boxed<Y, R> {
    fn clone(&self) -> Self {
        Self {
            nano: Rc::clone(&self.nano),
        }
    }
}

impl<Y, R> Nano for Boxed<Y, R> {
    type Yield = Y;
    type Output = R;
    type Iter = BoxSuspension<Y, R>;

    #[inline]
    fn iterate(&self) -> Self::Iter {
        self.nano.iterate_boxed()
    }
}
