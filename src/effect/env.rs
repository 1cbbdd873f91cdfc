//! Dependency injection through an immutable environment.
//!
//! A [`Tag`] is a zero-sized marker naming one service. A computation asks
//! for the current [`Env`] by yielding [`GetEnv`]; [`Lookup`] projects the
//! service out of the answer and raises [`Fault::TagNotFound`] when the tag
//! was never provided.
//!
//! Interpreters:
//!
//! - [`provide_all`] answers every request with a fixed environment
//! - [`provide`] merges its environment into the one already in scope
//! - [`isolate`] answers with a forked copy of the environment in scope
//! - [`Tag::local`] replaces one service for a nested computation
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::control::run;
//! use nano_effect::effect::{Env, Tag, provide, with_env};
//! use nano_effect::nano::Nano;
//! use nano_effect::define_tag;
//!
//! define_tag! {
//!     /// The base URL of the API.
//!     pub ApiUrl: String
//! }
//!
//! let program = ApiUrl.map(|url| format!("{url}/users"));
//! let wired = with_env(provide(program, ApiUrl::env(String::from("https://example.com"))));
//!
//! assert_eq!(run(wired), Ok(String::from("https://example.com/users")));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use super::{Answer, Effect, StoreMap, Variant, answer, forward};
use crate::Fault;
use crate::control::Either;
use crate::iter::{self, FromResult, Once, Raise, Success, Suspension, Value};
use crate::nano::{self, Nano};

// =============================================================================
// Tag
// =============================================================================

/// The key of one service in an [`Env`].
///
/// Identity is the `TypeId` of the implementing type; [`NAME`](Self::NAME)
/// is only used for diagnostics. Declare tags with
/// [`define_tag!`](crate::define_tag), which also makes the marker a
/// computation that reads the service.
pub trait Tag: Sized + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    /// The service stored under this tag.
    type Service: Clone + 'static;

    /// Combines an existing service with an incoming one on [`Env::merge`].
    ///
    /// Without a policy the incoming service replaces the existing one.
    const MERGE: Option<fn(&Self::Service, &Self::Service) -> Self::Service> = None;

    /// Derives the service seen by an isolated scope on [`Env::fork`].
    ///
    /// Without a policy the service is shared unchanged.
    const FORK: Option<fn(&Self::Service) -> Self::Service> = None;

    /// An environment holding only `service`.
    fn env(service: Self::Service) -> Env {
        Env::make::<Self>(service)
    }

    /// A computation that reads this service.
    fn service() -> Lookup<Self> {
        Lookup::new()
    }

    /// Reads this service and continues with `f`.
    fn using<N, F>(f: F) -> nano::FlatMap<Lookup<Self>, F>
    where
        F: Fn(Self::Service) -> N + 'static,
        N: Nano<Yield = Effect>,
    {
        Self::service().flat_map(f)
    }

    /// Runs `nano` with this service replaced by `f(service)`.
    ///
    /// The replacement is only visible inside `nano`.
    fn local<N, F>(nano: N, f: F) -> Scope<N>
    where
        N: Nano<Yield = Effect>,
        F: Fn(Self::Service) -> Self::Service + 'static,
    {
        Scope::new(nano, move |existing: &Env| {
            let service = existing.get::<Self>()?;
            Ok(existing.add::<Self>(f(service)))
        })
    }
}

// =============================================================================
// Env
// =============================================================================

type Service = Rc<dyn Any>;

#[derive(Clone)]
struct Entry {
    name: &'static str,
    service: Service,
    merge: fn(&Service, &Service) -> Option<Service>,
    fork: fn(&Service) -> Option<Service>,
}

fn merge_entry<T: Tag>(existing: &Service, incoming: &Service) -> Option<Service> {
    let merge = T::MERGE?;
    let existing = existing.downcast_ref::<T::Service>()?;
    let incoming = incoming.downcast_ref::<T::Service>()?;
    Some(Rc::new(merge(existing, incoming)))
}

fn fork_entry<T: Tag>(service: &Service) -> Option<Service> {
    let fork = T::FORK?;
    let service = service.downcast_ref::<T::Service>()?;
    Some(Rc::new(fork(service)))
}

impl Entry {
    fn new<T: Tag>(service: T::Service) -> Self {
        Self {
            name: T::NAME,
            service: Rc::new(service),
            merge: merge_entry::<T>,
            fork: fork_entry::<T>,
        }
    }
}

/// An immutable map from tags to services.
///
/// Every operation returns a new environment; cloning is a reference-count
/// bump. Services themselves are shared, so a service with interior
/// mutability (such as the refs store) is visible through every copy.
///
/// # Examples
///
/// ```rust
/// use nano_effect::effect::{Env, Tag};
/// use nano_effect::{define_tag, Fault};
///
/// define_tag! { pub Port: u16 }
/// define_tag! { pub Host: &'static str }
///
/// let env = Env::empty().add::<Port>(8080).add::<Host>("localhost");
/// assert_eq!(env.get::<Port>(), Ok(8080));
/// assert_eq!(env.len(), 2);
/// assert_eq!(Env::empty().get::<Host>(), Err(Fault::TagNotFound { name: "Host" }));
/// ```
#[derive(Clone, Default)]
pub struct Env {
    entries: Rc<StoreMap<TypeId, Entry>>,
}

impl Env {
    /// An environment with no services.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// An environment holding only `service` under `T`.
    #[must_use]
    pub fn make<T: Tag>(service: T::Service) -> Self {
        Self::empty().add::<T>(service)
    }

    /// Returns a new environment with `service` stored under `T`, replacing any previous one.
    #[must_use]
    pub fn add<T: Tag>(&self, service: T::Service) -> Self {
        let mut entries = StoreMap::clone(&self.entries);
        entries.insert(TypeId::of::<T>(), Entry::new::<T>(service));
        Self {
            entries: Rc::new(entries),
        }
    }

    /// Looks up the service stored under `T`.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::TagNotFound`] if `T` has no entry.
    pub fn get<T: Tag>(&self) -> Result<T::Service, Fault> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.service.downcast_ref::<T::Service>())
            .cloned()
            .ok_or(Fault::TagNotFound { name: T::NAME })
    }

    /// Returns `true` if `T` has an entry.
    pub fn contains<T: Tag>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// The number of services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no services.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Combines two environments.
    ///
    /// For a tag present in both, the tag's [`Tag::MERGE`] policy combines the
    /// two services; without a policy the service from `other` wins.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nano_effect::effect::Env;
    /// use nano_effect::define_tag;
    ///
    /// define_tag! {
    ///     pub Plugins: Vec<&'static str>,
    ///     merge = |existing, incoming| [existing.as_slice(), incoming.as_slice()].concat()
    /// }
    ///
    /// let base = Env::make::<Plugins>(vec!["auth"]);
    /// let extra = Env::make::<Plugins>(vec!["cache"]);
    /// assert_eq!(base.merge(&extra).get::<Plugins>(), Ok(vec!["auth", "cache"]));
    /// ```
    #[must_use]
    pub fn merge(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }
        let mut entries = StoreMap::clone(&self.entries);
        for (key, incoming) in other.entries.iter() {
            let merged = entries
                .get(key)
                .and_then(|existing| (existing.merge)(&existing.service, &incoming.service))
                .map_or_else(
                    || incoming.clone(),
                    |service| Entry {
                        service,
                        ..incoming.clone()
                    },
                );
            entries.insert(*key, merged);
        }
        Self {
            entries: Rc::new(entries),
        }
    }

    /// Derives the environment of an isolated scope.
    ///
    /// Each service passes through its tag's [`Tag::FORK`] policy; services
    /// without one are shared.
    #[must_use]
    pub fn fork(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(key, entry)| {
                let service = (entry.fork)(&entry.service).unwrap_or_else(|| Rc::clone(&entry.service));
                (*key, Entry { service, ..entry.clone() })
            })
            .collect();
        tracing::debug!(services = self.len(), "forked environment");
        Self {
            entries: Rc::new(entries),
        }
    }

    fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|entry| entry.name).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Env").field("tags", &self.names()).finish()
    }
}

// =============================================================================
// GetEnv / Lookup
// =============================================================================

/// The request for the environment currently in scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GetEnv;

impl Variant for GetEnv {
    const TAG: &'static str = "GetEnv";
    type Resume = Env;
}

/// A computation that reads the service stored under `T`.
///
/// Created by [`Tag::service`].
pub struct Lookup<T> {
    _tag: PhantomData<fn() -> T>,
}

impl<T> Lookup<T> {
    const fn new() -> Self {
        Self { _tag: PhantomData }
    }
}

impl<T> Clone for Lookup<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Lookup<T> {}

impl<T> Default for Lookup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tag> fmt::Debug for Lookup<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_tuple("Lookup").field(&T::NAME).finish()
    }
}

fn project<T: Tag>(env: Env) -> FromResult<Effect, T::Service> {
    iter::from_result(env.get::<T>())
}

impl<T: Tag> Nano for Lookup<T> {
    type Yield = Effect;
    type Output = T::Service;
    type Iter = iter::FlatMap<Once<Effect, Env>, fn(Env) -> FromResult<Effect, T::Service>, FromResult<Effect, T::Service>>;

    fn iterate(&self) -> Self::Iter {
        let project: fn(Env) -> FromResult<Effect, T::Service> = project::<T>;
        GetEnv.iterate().flat_map(project)
    }
}

// =============================================================================
// Interpreters
// =============================================================================

type Responder = Box<dyn FnMut(Effect) -> Answer<Success<Effect, Value>>>;

type Answering<S> = iter::FlatMapYield<S, Responder, Answer<Success<Effect, Value>>>;

fn answering<S>(suspension: S, env: Env) -> Answering<S>
where
    S: Suspension<Yield = Effect>,
{
    let respond: Responder = Box::new(move |effect: Effect| {
        if effect.is::<GetEnv>() {
            tracing::trace!(services = env.len(), "answering environment request");
            answer(iter::success(Value::new(env.clone())))
        } else {
            forward(effect)
        }
    });
    iter::FlatMapYield::new(suspension, respond)
}

/// Answers every environment request of `nano` with `env`.
///
/// This is the terminal interpreter: nothing outside sees the requests.
pub fn provide_all<N>(nano: N, env: Env) -> ProvideAll<N>
where
    N: Nano<Yield = Effect>,
{
    ProvideAll { nano, env }
}

/// Answers every environment request of `nano` with an empty environment.
///
/// Place this outermost so that [`provide`] and friends have a scope to merge into.
pub fn with_env<N>(nano: N) -> ProvideAll<N>
where
    N: Nano<Yield = Effect>,
{
    provide_all(nano, Env::empty())
}

/// A computation whose environment requests are answered with a fixed environment.
///
/// Created by [`provide_all`] and [`with_env`].
#[derive(Debug, Clone)]
pub struct ProvideAll<N> {
    nano: N,
    env: Env,
}

impl<N> Nano for ProvideAll<N>
where
    N: Nano<Yield = Effect>,
{
    type Yield = Effect;
    type Output = N::Output;
    type Iter = Answering<N::Iter>;

    fn iterate(&self) -> Self::Iter {
        answering(self.nano.iterate(), self.env.clone())
    }
}

/// Runs `nano` with `env` merged into the environment already in scope.
///
/// Nested `provide` calls compose: the innermost wins for plain tags and
/// merge policies apply otherwise.
pub fn provide<N>(nano: N, env: Env) -> Scope<N>
where
    N: Nano<Yield = Effect>,
{
    Scope::new(nano, move |existing: &Env| Ok(existing.merge(&env)))
}

/// Runs `nano` with `service` stored under `T` in the environment in scope.
pub fn with_tag<T, N>(nano: N, service: T::Service) -> Scope<N>
where
    T: Tag,
    N: Nano<Yield = Effect>,
{
    provide(nano, T::env(service))
}

/// Runs `nano` against a forked copy of the environment in scope.
pub fn isolate<N>(nano: N) -> Scope<N>
where
    N: Nano<Yield = Effect>,
{
    Scope::new(nano, |existing: &Env| Ok(existing.fork()))
}

/// A computation that runs against an environment derived from the one in scope.
///
/// Running it first asks for the environment in scope, derives the new one,
/// and then answers every request of the inner computation with it.
///
/// Created by [`provide`], [`with_tag`], [`isolate`] and [`Tag::local`].
pub struct Scope<N> {
    nano: N,
    rewire: Rc<dyn Fn(&Env) -> Result<Env, Fault>>,
}

impl<N> Scope<N> {
    pub(super) fn new<F>(nano: N, rewire: F) -> Self
    where
        F: Fn(&Env) -> Result<Env, Fault> + 'static,
    {
        Self {
            nano,
            rewire: Rc::new(rewire),
        }
    }
}

impl<N: Clone> Clone for Scope<N> {
    fn clone(&self) -> Self {
        Self {
            nano: self.nano.clone(),
            rewire: Rc::clone(&self.rewire),
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for Scope<N> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_struct("Scope").field("nano", &self.nano).finish_non_exhaustive()
    }
}

type Scoped<S> = Either<Raise<Effect, <S as Suspension>::Output>, Answering<S>>;

impl<N> Nano for Scope<N>
where
    N: Nano<Yield = Effect>,
    N::Output: Clone,
    N::Iter: 'static,
{
    type Yield = Effect;
    type Output = N::Output;
    #[allow(clippy::type_complexity)]
    type Iter = iter::FlatMap<Once<Effect, Env>, Box<dyn FnOnce(Env) -> Scoped<N::Iter>>, Scoped<N::Iter>>;

    fn iterate(&self) -> Self::Iter {
        let inner = self.nano.iterate();
        let rewire = Rc::clone(&self.rewire);
        let enter: Box<dyn FnOnce(Env) -> Scoped<N::Iter>> = Box::new(move |existing: Env| match rewire(&existing) {
            Ok(env) => Either::Right(answering(inner, env)),
            Err(fault) => {
                tracing::debug!(%fault, "could not derive scoped environment");
                Either::Left(iter::raise(fault))
            }
        });
        GetEnv.iterate().flat_map(enter)
    }
}
