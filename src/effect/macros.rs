//! Declaration macros for effect variants, dependency tags and ref cells.

/// Declares an effect [`Variant`](crate::effect::Variant).
///
/// The tag is the type name. Tuple fields keep their visibility; the resume
/// type follows `->`.
///
/// # Examples
///
/// ```rust
/// use nano_effect::effect::Variant;
/// use nano_effect::define_variant;
///
/// define_variant! {
///     /// Reads a line of input.
///     pub ReadLine -> String
/// }
///
/// define_variant! {
///     /// Writes a line of output.
///     pub WriteLine(pub String) -> ()
/// }
///
/// assert_eq!(ReadLine::TAG, "ReadLine");
/// assert_eq!(WriteLine(String::from("hi")).0, "hi");
/// ```
#[macro_export]
macro_rules! define_variant {
    ($(#[$meta:meta])* $vis:vis $name:ident -> $resume:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name;

        impl $crate::effect::Variant for $name {
            const TAG: &'static str = ::core::stringify!($name);
            type Resume = $resume;
        }
    };

    ($(#[$meta:meta])* $vis:vis $name:ident ( $($field_vis:vis $field:ty),* $(,)? ) -> $resume:ty) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        $vis struct $name($($field_vis $field),*);

        impl $crate::effect::Variant for $name {
            const TAG: &'static str = ::core::stringify!($name);
            type Resume = $resume;
        }
    };
}

/// Declares a dependency [`Tag`](crate::effect::Tag).
///
/// The marker type is also a computation that reads the service. Optional
/// `merge` and `fork` policies are non-capturing closures.
///
/// # Examples
///
/// ```rust
/// use nano_effect::control::run;
/// use nano_effect::effect::{Env, Tag, provide_all};
/// use nano_effect::nano::Nano;
/// use nano_effect::define_tag;
///
/// define_tag! {
///     /// Scales every price.
///     pub Rate: f64
/// }
///
/// define_tag! {
///     pub Labels: Vec<String>,
///     merge = |existing, incoming| existing.iter().chain(incoming).cloned().collect()
/// }
///
/// let price = Rate.map(|rate| 10.0 * rate);
/// assert_eq!(run(provide_all(price, Rate::env(1.5))), Ok(15.0));
/// assert!(Labels::MERGE.is_some());
/// assert!(Labels::FORK.is_none());
/// ```
#[macro_export]
macro_rules! define_tag {
    (
        $(#[$meta:meta])* $vis:vis $name:ident : $service:ty
        $(, merge = $merge:expr)?
        $(, fork = $fork:expr)?
        $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::effect::Tag for $name {
            const NAME: &'static str = ::core::stringify!($name);
            type Service = $service;

            $(
                const MERGE: ::core::option::Option<fn(&$service, &$service) -> $service> = {
                    let merge: fn(&$service, &$service) -> $service = $merge;
                    ::core::option::Option::Some(merge)
                };
            )?

            $(
                const FORK: ::core::option::Option<fn(&$service) -> $service> = {
                    let fork: fn(&$service) -> $service = $fork;
                    ::core::option::Option::Some(fork)
                };
            )?
        }

        impl $crate::nano::Nano for $name {
            type Yield = $crate::effect::Effect;
            type Output = $service;
            type Iter = <$crate::effect::Lookup<$name> as $crate::nano::Nano>::Iter;

            fn iterate(&self) -> Self::Iter {
                $crate::nano::Nano::iterate(&<$name as $crate::effect::Tag>::service())
            }
        }
    };
}

/// Declares a scoped [`Ref`](crate::effect::Ref) cell.
///
/// The expression after `=` is the default, evaluated the first time the
/// cell is read from a store. The marker type is also a computation that
/// reads the cell. Optional policies:
///
/// - `fork = |value| ...` returns the value an isolated scope starts with, or `None` to reset it
/// - `merge = |existing, incoming| ...` combines two [`Versioned`](crate::effect::Versioned) values
///
/// # Examples
///
/// ```rust
/// use nano_effect::control::run;
/// use nano_effect::effect::{Ref, with_env, with_refs};
/// use nano_effect::nano::Nano;
/// use nano_effect::define_ref;
///
/// define_ref! {
///     /// Requests served so far.
///     pub Served: u32 = 0
/// }
///
/// let program = Served::update(|n| n + 1).then(Served::update(|n| n + 1)).then(Served);
/// assert_eq!(run(with_env(with_refs(program))), Ok(2));
/// ```
#[cfg(feature = "refs")]
#[macro_export]
macro_rules! define_ref {
    (
        $(#[$meta:meta])* $vis:vis $name:ident : $value:ty = $initial:expr
        $(, fork = $fork:expr)?
        $(, merge = $merge:expr)?
        $(,)?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
        $vis struct $name;

        impl $crate::effect::Ref for $name {
            const NAME: &'static str = ::core::stringify!($name);
            type Value = $value;

            $(
                const FORK: ::core::option::Option<fn(&$value) -> ::core::option::Option<$value>> = {
                    let fork: fn(&$value) -> ::core::option::Option<$value> = $fork;
                    ::core::option::Option::Some(fork)
                };
            )?

            $(
                const MERGE: ::core::option::Option<
                    fn(&$crate::effect::Versioned<$value>, &$crate::effect::Versioned<$value>) -> $value,
                > = {
                    let merge: fn(&$crate::effect::Versioned<$value>, &$crate::effect::Versioned<$value>) -> $value =
                        $merge;
                    ::core::option::Option::Some(merge)
                };
            )?

            fn initial() -> $value {
                $initial
            }
        }

        impl $crate::nano::Nano for $name {
            type Yield = $crate::effect::Effect;
            type Output = $value;
            type Iter = <$crate::effect::RefOp<$value> as $crate::nano::Nano>::Iter;

            fn iterate(&self) -> Self::Iter {
                $crate::nano::Nano::iterate(&<$name as $crate::effect::Ref>::get())
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::{Tag, Variant};
    use rstest::rstest;

    define_variant! {
        /// Documented variant.
        pub(crate) Probe(pub u8, pub &'static str) -> bool
    }

    define_variant! { Tick -> () }

    define_tag! {
        Limits: (u8, u8),
        merge = |existing, incoming| (existing.0.min(incoming.0), existing.1.max(incoming.1)),
    }

    #[rstest]
    fn variant_tag_is_the_type_name() {
        assert_eq!(Probe::TAG, "Probe");
        assert_eq!(Tick::TAG, "Tick");
        let probe = Probe(1, "x");
        assert_eq!((probe.0, probe.1), (1, "x"));
    }

    #[rstest]
    fn tag_accepts_a_trailing_comma_after_policies() {
        let merge = Limits::MERGE.map(|merge| merge(&(3, 3), &(1, 9)));
        assert_eq!(merge, Some((1, 9)));
        assert_eq!(Limits::NAME, "Limits");
    }
}
