//! Scoped mutable state.
//!
//! A [`Ref`] is a marker type naming one cell with a default value. Cells
//! live in a [`RefStore`], which is itself the service of the reserved
//! [`Refs`] tag, so every cell operation is an environment lookup followed by
//! an in-place update of the shared store.
//!
//! Scoping follows the environment:
//!
//! - [`with_refs`] installs a store; nested calls copy the store in scope
//! - [`Ref::locally`] runs a computation against a copy with one cell overridden
//! - [`isolate`](super::isolate) forks the store through each cell's [`Ref::FORK`] policy
//! - merging two stores applies each cell's [`Ref::MERGE`] policy
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::run;
//! use nano_effect::effect::{Ref, with_env, with_refs};
//! use nano_effect::nano::Nano;
//! use nano_effect::{define_ref, nano};
//!
//! define_ref! { pub Balance: i64 = 100 }
//!
//! let program = nano! {
//!     _ <= Balance::update(|b| b - 30);
//!     inner <= Balance::locally(0, Balance::update(|b| b + 1));
//!     outer <= Balance;
//!     nano::of((inner, outer))
//! };
//!
//! assert_eq!(run(with_env(with_refs(program))), Ok((1, 70)));
//! ```

use std::any::{Any, TypeId, type_name};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::env::Scope;
use super::{Effect, Env, Lookup, StoreMap, Tag};
use crate::iter;
use crate::nano::Nano;

// =============================================================================
// Ref
// =============================================================================

/// A value together with the number of writes that produced it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Versioned<V> {
    /// The stored value.
    pub value: V,
    /// Writes since the cell was installed; a freshly defaulted cell has version 0.
    pub version: u64,
}

/// A named mutable cell.
///
/// Every operation runs against the store of the [`Refs`] tag in scope and
/// installs [`initial`](Self::initial) the first time a cell is touched.
/// Declare cells with [`define_ref!`](crate::define_ref).
pub trait Ref: Sized + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// The cell contents.
    type Value: Clone + 'static;

    /// Computes the value of an isolated scope's copy; `None` drops the cell
    /// so the scope starts from the default.
    ///
    /// Without a policy the value is carried over unchanged.
    const FORK: Option<fn(&Self::Value) -> Option<Self::Value>> = None;

    /// Combines two versions of the cell when stores are merged.
    ///
    /// Without a policy the incoming value wins.
    const MERGE: Option<fn(&Versioned<Self::Value>, &Versioned<Self::Value>) -> Self::Value> = None;

    /// The default value.
    fn initial() -> Self::Value;

    /// Reads the cell.
    fn get() -> RefOp<Self::Value> {
        RefOp::new(RefStore::read::<Self>)
    }

    /// Writes `value` and completes with it.
    fn set(value: Self::Value) -> RefOp<Self::Value> {
        RefOp::new(move |store: &RefStore| store.write::<Self>(value.clone()))
    }

    /// Applies `f` and completes with the new value.
    fn update<F>(f: F) -> RefOp<Self::Value>
    where
        F: Fn(Self::Value) -> Self::Value + 'static,
    {
        RefOp::new(move |store: &RefStore| store.update::<Self, _>(&f))
    }

    /// Applies `f`, stores the second half of its result and completes with the first.
    fn modify<A, F>(f: F) -> RefOp<A>
    where
        A: 'static,
        F: Fn(Self::Value) -> (A, Self::Value) + 'static,
    {
        RefOp::new(move |store: &RefStore| store.modify::<Self, A, _>(&f))
    }

    /// Removes the cell, completing with its value if it was present.
    fn delete() -> RefOp<Option<Self::Value>> {
        RefOp::new(RefStore::remove::<Self>)
    }

    /// Completes with the version of the cell, 0 if it was never written.
    fn version() -> RefOp<u64> {
        RefOp::new(RefStore::version::<Self>)
    }

    /// Runs `nano` with this cell set to `value`.
    ///
    /// `nano` runs against a copy of the store in scope, so neither the
    /// override nor any other write made inside is visible afterwards.
    fn locally<N>(value: Self::Value, nano: N) -> Scope<N>
    where
        N: Nano<Yield = Effect>,
    {
        Refs::local(nano, move |store: RefStore| store.with_override::<Self>(value.clone()))
    }
}

// =============================================================================
// RefStore
// =============================================================================

type Cell = Rc<dyn Any>;

#[derive(Clone)]
struct Slot {
    name: &'static str,
    value: Cell,
    version: u64,
    fork: fn(&Slot) -> Option<Slot>,
    merge: fn(&Slot, &Slot) -> Slot,
}

impl Slot {
    fn new<R: Ref>(value: R::Value, version: u64) -> Self {
        Self {
            name: R::NAME,
            value: Rc::new(value),
            version,
            fork: fork_slot::<R>,
            merge: merge_slot::<R>,
        }
    }

    fn value<R: Ref>(&self) -> R::Value {
        match self.value.downcast_ref::<R::Value>() {
            Some(value) => value.clone(),
            None => unreachable!("cell {} does not hold a {}", self.name, type_name::<R::Value>()),
        }
    }

    fn versioned<R: Ref>(&self) -> Versioned<R::Value> {
        Versioned {
            value: self.value::<R>(),
            version: self.version,
        }
    }
}

fn fork_slot<R: Ref>(slot: &Slot) -> Option<Slot> {
    let Some(fork) = R::FORK else {
        return Some(slot.clone());
    };
    fork(&slot.value::<R>()).map(|value| Slot::new::<R>(value, slot.version))
}

fn merge_slot<R: Ref>(existing: &Slot, incoming: &Slot) -> Slot {
    let Some(merge) = R::MERGE else {
        return incoming.clone();
    };
    let value = merge(&existing.versioned::<R>(), &incoming.versioned::<R>());
    Slot::new::<R>(value, existing.version.max(incoming.version) + 1)
}

/// A shared, mutable map of cells.
///
/// Clones share the same cells; [`snapshot`](Self::snapshot),
/// [`forked`](Self::forked), [`merged`](Self::merged) and
/// [`with_override`](Self::with_override) build independent stores.
///
/// # Examples
///
/// ```rust
/// use nano_effect::effect::RefStore;
/// use nano_effect::define_ref;
///
/// define_ref! { pub Hits: u32 = 0 }
///
/// let store = RefStore::new();
/// assert_eq!(store.read::<Hits>(), 0);
/// assert_eq!(store.update::<Hits, _>(|n| n + 5), 5);
///
/// let copy = store.snapshot();
/// store.write::<Hits>(9);
/// assert_eq!(copy.read::<Hits>(), 5);
/// assert_eq!(store.version::<Hits>(), 2);
/// ```
#[derive(Clone, Default)]
pub struct RefStore {
    cells: Rc<RefCell<StoreMap<TypeId, Slot>>>,
}

impl RefStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn from_cells(cells: StoreMap<TypeId, Slot>) -> Self {
        Self {
            cells: Rc::new(RefCell::new(cells)),
        }
    }

    /// Reads a cell, installing its default at version 0 if absent.
    pub fn read<R: Ref>(&self) -> R::Value {
        if let Some(slot) = self.cells.borrow().get(&TypeId::of::<R>()) {
            return slot.value::<R>();
        }
        let initial = R::initial();
        tracing::trace!(cell = R::NAME, "installing default value");
        self.cells
            .borrow_mut()
            .insert(TypeId::of::<R>(), Slot::new::<R>(initial.clone(), 0));
        initial
    }

    /// Writes a cell, bumping its version, and returns the value.
    pub fn write<R: Ref>(&self, value: R::Value) -> R::Value {
        let version = self.version::<R>() + 1;
        self.cells
            .borrow_mut()
            .insert(TypeId::of::<R>(), Slot::new::<R>(value.clone(), version));
        value
    }

    /// Applies `f` to the current value, writes the result and returns it.
    pub fn update<R: Ref, F>(&self, f: F) -> R::Value
    where
        F: FnOnce(R::Value) -> R::Value,
    {
        let updated = f(self.read::<R>());
        self.write::<R>(updated)
    }

    /// Applies `f` to the current value, writes the second half and returns the first.
    pub fn modify<R: Ref, A, F>(&self, f: F) -> A
    where
        F: FnOnce(R::Value) -> (A, R::Value),
    {
        let (result, updated) = f(self.read::<R>());
        self.write::<R>(updated);
        result
    }

    /// Removes a cell, returning its value if it was present.
    pub fn remove<R: Ref>(&self) -> Option<R::Value> {
        self.cells
            .borrow_mut()
            .remove(&TypeId::of::<R>())
            .map(|slot| slot.value::<R>())
    }

    /// The version of a cell; 0 if it is absent or was never written.
    pub fn version<R: Ref>(&self) -> u64 {
        self.cells
            .borrow()
            .get(&TypeId::of::<R>())
            .map_or(0, |slot| slot.version)
    }

    /// Returns `true` if the cell has been installed.
    pub fn contains<R: Ref>(&self) -> bool {
        self.cells.borrow().contains_key(&TypeId::of::<R>())
    }

    /// The number of installed cells.
    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    /// Returns `true` if no cell has been installed.
    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }

    /// An independent copy of every cell.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        Self::from_cells(self.cells.borrow().clone())
    }

    /// An independent copy with one cell written to `value`.
    #[must_use]
    pub fn with_override<R: Ref>(&self, value: R::Value) -> Self {
        let copy = self.snapshot();
        copy.write::<R>(value);
        copy
    }

    /// An independent copy with every cell passed through its fork policy.
    #[must_use]
    pub fn forked(&self) -> Self {
        let cells: StoreMap<TypeId, Slot> = self
            .cells
            .borrow()
            .iter()
            .filter_map(|(key, slot)| (slot.fork)(slot).map(|slot| (*key, slot)))
            .collect();
        tracing::debug!(cells = cells.len(), "forked ref store");
        Self::from_cells(cells)
    }

    /// An independent store holding the cells of both, `other` taking precedence.
    ///
    /// Cells present in both are combined by their merge policy; a merged
    /// cell gets a version one past the larger of the two.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        if self.ptr_eq(other) {
            return self.snapshot();
        }
        let mut cells = self.cells.borrow().clone();
        for (key, incoming) in other.cells.borrow().iter() {
            let slot = match cells.get(key) {
                Some(existing) => (existing.merge)(existing, incoming),
                None => incoming.clone(),
            };
            cells.insert(*key, slot);
        }
        tracing::debug!(cells = cells.len(), "merged ref stores");
        Self::from_cells(cells)
    }

    /// Returns `true` if both handles share the same cells.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }
}

impl fmt::Debug for RefStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = self.cells.borrow();
        let mut names: Vec<_> = cells.values().map(|slot| (slot.name, slot.version)).collect();
        names.sort_unstable();
        formatter.debug_struct("RefStore").field("cells", &names).finish()
    }
}

// =============================================================================
// Refs tag
// =============================================================================

/// The reserved tag holding the [`RefStore`] in scope.
///
/// Reading it completes with the store itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Refs;

impl Tag for Refs {
    const NAME: &'static str = "Refs";
    type Service = RefStore;

    const MERGE: Option<fn(&RefStore, &RefStore) -> RefStore> = {
        let merge: fn(&RefStore, &RefStore) -> RefStore = RefStore::merged;
        Some(merge)
    };

    const FORK: Option<fn(&RefStore) -> RefStore> = {
        let fork: fn(&RefStore) -> RefStore = RefStore::forked;
        Some(fork)
    };
}

impl Nano for Refs {
    type Yield = Effect;
    type Output = RefStore;
    type Iter = <Lookup<Self> as Nano>::Iter;

    fn iterate(&self) -> Self::Iter {
        Self::service().iterate()
    }
}

/// Runs `nano` with a fresh store merged into the store in scope.
///
/// Outermost, this gives `nano` an empty store; nested, it gives `nano` a
/// copy of the enclosing store. Every run starts from a new store.
pub fn with_refs<N>(nano: N) -> Scope<N>
where
    N: Nano<Yield = Effect>,
{
    Scope::new(nano, |existing: &Env| Ok(existing.merge(&Refs::env(RefStore::new()))))
}

// =============================================================================
// RefOp
// =============================================================================

/// A computation that reads the store in scope and applies one cell operation.
///
/// Created by the methods of [`Ref`].
pub struct RefOp<A> {
    op: Rc<dyn Fn(&RefStore) -> A>,
}

impl<A> RefOp<A> {
    fn new<F>(op: F) -> Self
    where
        F: Fn(&RefStore) -> A + 'static,
    {
        Self { op: Rc::new(op) }
    }
}

impl<A> Clone for RefOp<A> {
    fn clone(&self) -> Self {
        Self {
            op: Rc::clone(&self.op),
        }
    }
}

impl<A> fmt::Debug for RefOp<A> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("RefOp").finish_non_exhaustive()
    }
}

impl<A: 'static> Nano for RefOp<A> {
    type Yield = Effect;
    type Output = A;
    type Iter = iter::Map<<Lookup<Refs> as Nano>::Iter, Box<dyn FnMut(RefStore) -> A>>;

    fn iterate(&self) -> Self::Iter {
        let op = Rc::clone(&self.op);
        let apply: Box<dyn FnMut(RefStore) -> A> = Box::new(move |store: RefStore| op(&store));
        iter::Map::new(Refs::service().iterate(), apply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Fault;
    use crate::control::run;
    use crate::effect::{isolate, with_env};
    use crate::{define_ref, nano};
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static DEFAULTS: AtomicUsize = AtomicUsize::new(0);

    fn counted_default() -> u32 {
        DEFAULTS.fetch_add(1, Ordering::SeqCst);
        7
    }

    define_ref! { Counter: i64 = 0 }

    define_ref! { Lazy: u32 = counted_default() }

    define_ref! { Name: String = String::from("anon") }

    define_ref! {
        Scratch: Vec<u8> = Vec::new(),
        fork = |_| None
    }

    define_ref! {
        Total: u32 = 0,
        merge = |existing, incoming| existing.value + incoming.value
    }

    fn in_scope<N>(nano: N) -> Result<N::Output, Fault>
    where
        N: Nano<Yield = Effect>,
        N::Output: Clone,
        N::Iter: 'static,
    {
        run(with_env(with_refs(nano)))
    }

    #[rstest]
    fn default_is_installed_once_per_store() {
        let store = RefStore::new();
        assert_eq!(store.read::<Lazy>(), 7);
        assert_eq!(store.read::<Lazy>(), 7);
        assert_eq!(DEFAULTS.load(Ordering::SeqCst), 1);
        assert!(store.contains::<Lazy>());
        assert_eq!(store.version::<Lazy>(), 0);
    }

    #[rstest]
    fn writes_bump_the_version() {
        let store = RefStore::new();
        store.write::<Counter>(1);
        store.update::<Counter, _>(|n| n * 10);
        assert_eq!(store.read::<Counter>(), 10);
        assert_eq!(store.version::<Counter>(), 2);
    }

    #[rstest]
    fn clones_share_cells() {
        let store = RefStore::new();
        let alias = store.clone();
        alias.write::<Counter>(4);
        assert_eq!(store.read::<Counter>(), 4);
        assert!(store.ptr_eq(&alias));
        assert!(!store.ptr_eq(&store.snapshot()));
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(3), Some(3))]
    fn remove_reports_the_prior_value(#[case] written: Option<i64>, #[case] expected: Option<i64>) {
        let store = RefStore::new();
        if let Some(value) = written {
            store.write::<Counter>(value);
        }
        assert_eq!(store.remove::<Counter>(), expected);
        assert!(!store.contains::<Counter>());
    }

    #[rstest]
    fn modify_returns_the_first_half_and_stores_the_second() {
        let take = || Name::modify(|name| (name.len(), format!("{name}!")));
        let program = take().flat_map(move |first| take().map(move |second| (first, second)));
        assert_eq!(in_scope(program.clone()), Ok((4, 5)));
        assert_eq!(in_scope(program.then(Name::get())), Ok(String::from("anon!!")));
    }

    #[rstest]
    fn fork_policy_drops_or_carries_cells() {
        let store = RefStore::new();
        store.write::<Scratch>(vec![1, 2]);
        store.write::<Counter>(5);
        let forked = store.forked();
        assert!(!forked.contains::<Scratch>());
        assert_eq!(forked.read::<Counter>(), 5);
        assert_eq!(forked.version::<Counter>(), 1);
    }

    #[rstest]
    fn merge_policy_combines_versions() {
        let left = RefStore::new();
        left.write::<Total>(2);
        let right = RefStore::new();
        right.write::<Total>(3);
        right.write::<Total>(4);
        right.write::<Counter>(8);
        let merged = left.merged(&right);
        assert_eq!(merged.read::<Total>(), 6);
        assert_eq!(merged.version::<Total>(), 3);
        assert_eq!(merged.read::<Counter>(), 8);
        assert_eq!(left.read::<Total>(), 2);
    }

    #[rstest]
    fn merge_without_policy_prefers_incoming() {
        let left = RefStore::new();
        left.write::<Name>(String::from("left"));
        let right = RefStore::new();
        right.write::<Name>(String::from("right"));
        assert_eq!(left.merged(&right).read::<Name>(), "right");
    }

    #[rstest]
    fn cell_is_a_computation() {
        assert_eq!(in_scope(Name), Ok(String::from("anon")));
    }

    #[rstest]
    fn set_then_read() {
        let program = Counter::set(41).then(Counter::update(|n| n + 1)).then(Counter);
        assert_eq!(in_scope(program), Ok(42));
    }

    #[rstest]
    fn update_on_fresh_cell_equals_set_of_default() {
        let updated = in_scope(Counter::update(|n| n - 3));
        let set = in_scope(Counter::set(-3));
        assert_eq!(updated, set);
    }

    #[rstest]
    fn delete_inside_a_program() {
        let program = Counter::set(2)
            .then(Counter::delete())
            .flat_map(|removed| Counter::delete().map(move |again| (removed, again)));
        assert_eq!(in_scope(program), Ok((Some(2), None)));
    }

    #[rstest]
    fn version_inside_a_program() {
        let program = Counter::set(1).then(Counter::set(2)).then(Counter::version());
        assert_eq!(in_scope(program), Ok(2));
    }

    #[rstest]
    fn locally_restores_the_outer_value() {
        let program = nano! {
            _ <= Name::set(String::from("outer"));
            inside <= Name::locally(String::from("inner"), Name);
            after <= Name;
            nano::of((inside, after))
        };
        assert_eq!(
            in_scope(program),
            Ok((String::from("inner"), String::from("outer")))
        );
    }

    #[rstest]
    fn nested_locally_restores_the_enclosing_override() {
        let innermost = Counter::locally(2, Counter);
        let middle = Counter.flat_map(move |before| innermost.clone().flat_map(move |inner| Counter.map(move |after| (before, inner, after))));
        let program = Counter::locally(1, middle).flat_map(|seen| Counter.map(move |outside| (seen, outside)));
        assert_eq!(in_scope(program), Ok(((1, 2, 1), 0)));
    }

    #[rstest]
    fn each_run_gets_a_fresh_store() {
        let program = Rc::new(with_env(with_refs(Counter::update(|n| n + 1))));
        assert_eq!(run(Rc::clone(&program)), Ok(1));
        assert_eq!(run(program), Ok(1));
    }

    #[rstest]
    fn nested_with_refs_copies_the_enclosing_store() {
        let program = Counter::set(10)
            .then(with_refs(Counter::update(|n| n + 1)))
            .flat_map(|inner| Counter.map(move |outer| (inner, outer)));
        assert_eq!(in_scope(program), Ok((11, 10)));
    }

    #[rstest]
    fn isolate_forks_the_store() {
        let program = Scratch::set(vec![9])
            .then(isolate(Scratch))
            .flat_map(|inside| Scratch.map(move |outside| (inside.clone(), outside)));
        assert_eq!(in_scope(program), Ok((Vec::new(), vec![9])));
    }

    #[rstest]
    fn cells_need_a_store_in_scope() {
        assert_eq!(run(with_env(Counter)), Err(Fault::TagNotFound { name: "Refs" }));
    }

    #[rstest]
    fn debug_lists_cells_with_versions() {
        let store = RefStore::new();
        store.write::<Counter>(1);
        assert_eq!(format!("{store:?}"), "RefStore { cells: [(\"Counter\", 1)] }");
    }
}
