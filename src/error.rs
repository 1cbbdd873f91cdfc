//! Programmer-error channel of the runtime.
//!
//! Modeled failures travel through the yield channel as
//! [`Failure`](crate::effect::Failure) effects and can be recovered by any
//! ancestor. A [`Fault`] is different: it signals a wiring bug (a dependency
//! that was never provided, a resume value of the wrong type, an effect that
//! no interpreter answered) and is carried in the `Err` side of every
//! [`Suspension::resume`](crate::iter::Suspension::resume) call until it
//! reaches whoever drives the program.
//!
//! # Examples
//!
//! ```rust
//! use nano_effect::Fault;
//!
//! let fault = Fault::TagNotFound { name: "Config" };
//! assert_eq!(fault.to_string(), "Tag Config not found in environment");
//! ```

use thiserror::Error;

/// A non-recoverable composition or wiring error.
///
/// Faults are never produced by modeled failures and are not intercepted by
/// [`catch_failure`](crate::effect::catch_failure) or
/// [`result`](crate::effect::result).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Fault {
    /// A dependency tag was requested but the environment has no entry for it.
    #[error("Tag {name} not found in environment")]
    TagNotFound {
        /// The `NAME` of the missing tag.
        name: &'static str,
    },

    /// A suspension was resumed with a value of a different type than it expects.
    #[error("resume value mismatch: expected {expected}")]
    ResumeMismatch {
        /// The type name the suspended computation expected.
        expected: &'static str,
    },

    /// An effect matched by tag carried a payload of an incompatible type.
    #[error("effect {tag} carries an incompatible payload: expected {expected}")]
    PayloadMismatch {
        /// The tag that matched.
        tag: &'static str,
        /// The payload type the interpreter expected.
        expected: &'static str,
    },

    /// A yielded value reached the driver without any interpreter answering it.
    #[error("unhandled effect reached the driver: {effect}")]
    Unhandled {
        /// Debug rendering of the yielded value.
        effect: String,
    },

    /// The driver gave up after the configured number of resumptions.
    #[error("step limit of {limit} exceeded")]
    StepLimit {
        /// The configured limit.
        limit: usize,
    },

    /// A fault injected from outside through [`Suspension::throw`](crate::iter::Suspension::throw).
    #[error("{0}")]
    Injected(String),
}

impl Fault {
    /// Creates an injected fault carrying a message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use nano_effect::Fault;
    ///
    /// assert_eq!(Fault::injected("stop").to_string(), "stop");
    /// ```
    #[must_use]
    pub fn injected(message: impl Into<String>) -> Self {
        Self::Injected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Fault::TagNotFound { name: "Db" }, "Tag Db not found in environment")]
    #[case(Fault::ResumeMismatch { expected: "i32" }, "resume value mismatch: expected i32")]
    #[case(
        Fault::PayloadMismatch { tag: "Failure", expected: "u8" },
        "effect Failure carries an incompatible payload: expected u8"
    )]
    #[case(Fault::StepLimit { limit: 3 }, "step limit of 3 exceeded")]
    #[case(Fault::injected("boom"), "boom")]
    fn fault_display(#[case] fault: Fault, #[case] expected: &str) {
        assert_eq!(fault.to_string(), expected);
    }

    #[rstest]
    fn fault_is_std_error() {
        fn assert_error<T: std::error::Error>() {}
        assert_error::<Fault>();
    }
}
