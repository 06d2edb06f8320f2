//! # Error Handling
//!
//! This module defines the centralized error handling mechanism for
//! `converge-kit`. It uses the `thiserror` library to create a comprehensive
//! `Error` enum that covers all anticipated failure modes, providing clear
//! and descriptive error messages.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum that represents all possible errors that can
//!   occur while resolving configuration and converging managed objects. Each
//!   variant corresponds to a specific failure mode and includes contextual
//!   information to aid in debugging.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the library to simplify function signatures.
//!
//! ## Propagation policy
//!
//! Fatal errors (`Lookup`, `Ownership`, `Config`) abort the current unit's
//! reconcile pass and bubble up with no attempted rollback of prior writes;
//! already-converged children stay converged and later children retry on the
//! next pass. Transient errors (`Fetch`, `Conflict`) are propagated for the
//! external control loop to reschedule with backoff. `Diff` is recovered
//! inside the converge engine and never escapes `Converger::apply`.

use thiserror::Error;

/// Main error type for converge-kit operations
#[derive(Error, Debug)]
pub enum Error {
    /// The type registry has no entry for an object's kind.
    ///
    /// This is fatal for the owning unit's reconcile pass: an object whose
    /// type identity cannot be resolved can never be written.
    #[error("Unknown object kind: {kind}")]
    Lookup { kind: String },

    /// An owner reference could not be attached to a desired object.
    ///
    /// Fatal for that object only; sibling objects of the same unit are
    /// unaffected.
    #[error("Ownership error for {object}: {message}")]
    Ownership { object: String, message: String },

    /// The object does not exist in the external store.
    ///
    /// This is the distinguishable not-found: the converge engine consumes it
    /// to take the create path instead of propagating.
    #[error("Object not found: {object}")]
    NotFound { object: String },

    /// A transient error talking to the external store (anything other than
    /// not-found). Propagated; the external scheduler is expected to retry.
    #[error("Fetch error for {object}: {message}")]
    Fetch { object: String, message: String },

    /// Structural patch computation failed.
    ///
    /// The converge engine recovers from this locally by falling back to an
    /// unconditional update, so it never escapes `Converger::apply`.
    #[error("Diff computation error: {message}")]
    Diff { message: String },

    /// A resource-version mismatch on update. Propagated; the external
    /// scheduler retries the whole pass, which re-fetches the live object.
    #[error("Conflict updating {object}: expected resource version {expected}, found {actual}")]
    Conflict {
        object: String,
        expected: String,
        actual: String,
    },

    /// An invalid user-authored specification, surfaced before any write
    /// occurs.
    ///
    /// This error includes the specific issue and optionally a hint about how
    /// to fix it.
    #[error("Invalid specification: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    Config {
        message: String,
        /// Optional hint for how to fix the specification issue
        hint: Option<String>,
    },

    /// An error indicating that the in-memory store's lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether this error aborts the owning unit's reconcile pass outright,
    /// as opposed to a transient condition the external scheduler retries.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Lookup { .. } | Error::Ownership { .. } | Error::Config { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
