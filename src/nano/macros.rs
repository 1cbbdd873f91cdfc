//! `nano!` macro for do-notation over computations.
//!
//! # Syntax
//!
//! - `name <= computation;` - Bind: run the computation, name its result
//! - `(a, b) <= computation;` - Bind with a tuple pattern
//! - `_ <= computation;` - Run the computation, discard its result
//! - `let name = expression;` - Pure let binding
//! - `computation` - Final expression (must be a computation)
//!
//! The macro expands `name <= m; rest` into `m.flat_map(move |name| rest)`.
//! Because a computation can be run many times, every step closure is `Fn`;
//! names bound with `<=` or `let name =` are cloned into each later step, so
//! they must be `Clone`. Names bound by tuple patterns are not tracked and
//! must be cloned by hand if a later step needs an owned copy.

/// Do-notation for [`Nano`](crate::nano::Nano) computations.
///
/// # Examples
///
/// ```rust
/// use nano_effect::control::run_with;
/// use nano_effect::nano::{self, Nano};
/// use nano_effect::Value;
///
/// let greeting = nano_effect::nano! {
///     name <= nano::suspend::<String, _>("name?");
///     let upper = name.to_uppercase();
///     _ <= nano::suspend::<(), _>("log");
///     nano::of(format!("{name} / {upper}"))
/// };
///
/// let result = run_with(greeting, |request| match request {
///     "name?" => Ok(Value::new(String::from("ada"))),
///     _ => Ok(Value::unit()),
/// });
/// assert_eq!(result, Ok(String::from("ada / ADA")));
/// ```
#[macro_export]
macro_rules! nano {
    // ==========================================================================
    // Bind operations (names already in scope are listed in `[...]`)
    // ==========================================================================

    (@bound [$($bound:ident)*] $pattern:ident <= $nano:expr ; $($rest:tt)+) => {{
        let __nano = $nano;
        $(
            #[allow(unused_variables, clippy::redundant_clone, clippy::clone_on_copy)]
            let $bound = ::core::clone::Clone::clone(&$bound);
        )*
        $crate::nano::Nano::flat_map(__nano, move |$pattern| {
            $crate::nano!(@bound [$($bound)* $pattern] $($rest)+)
        })
    }};

    (@bound [$($bound:ident)*] ($($pattern:tt)*) <= $nano:expr ; $($rest:tt)+) => {{
        let __nano = $nano;
        $(
            #[allow(unused_variables, clippy::redundant_clone, clippy::clone_on_copy)]
            let $bound = ::core::clone::Clone::clone(&$bound);
        )*
        $crate::nano::Nano::flat_map(__nano, move |($($pattern)*)| {
            $crate::nano!(@bound [$($bound)*] $($rest)+)
        })
    }};

    (@bound [$($bound:ident)*] _ <= $nano:expr ; $($rest:tt)+) => {{
        let __nano = $nano;
        $(
            #[allow(unused_variables, clippy::redundant_clone, clippy::clone_on_copy)]
            let $bound = ::core::clone::Clone::clone(&$bound);
        )*
        $crate::nano::Nano::flat_map(__nano, move |_| {
            $crate::nano!(@bound [$($bound)*] $($rest)+)
        })
    }};

    // ==========================================================================
    // Let binding
    // ==========================================================================

    (@bound [$($bound:ident)*] let $pattern:ident = $expr:expr ; $($rest:tt)+) => {{
        let $pattern = $expr;
        $crate::nano!(@bound [$($bound)* $pattern] $($rest)+)
    }};

    (@bound [$($bound:ident)*] let ($($pattern:tt)*) = $expr:expr ; $($rest:tt)+) => {{
        let ($($pattern)*) = $expr;
        $crate::nano!(@bound [$($bound)*] $($rest)+)
    }};

    // ==========================================================================
    // Terminal case
    // ==========================================================================

    (@bound [$($bound:ident)*] $result:expr) => {{
        $(
            #[allow(unused_variables, clippy::redundant_clone, clippy::clone_on_copy)]
            let $bound = ::core::clone::Clone::clone(&$bound);
        )*
        $result
    }};

    // ==========================================================================
    // Entry point
    // ==========================================================================

    ($($tokens:tt)+) => {
        $crate::nano!(@bound [] $($tokens)+)
    };
}
