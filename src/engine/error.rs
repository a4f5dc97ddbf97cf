//! Error types for the dialogue engine
//!
//! Domain errors use thiserror, with one enum per concern and a top-level
//! `EngineError` that conversions funnel into at the public API boundary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use super::activity::ActivityId;

/// Top-level engine error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Process or activity description failed structural validation
    #[error("Description error: {0}")]
    Description(#[from] DescriptionError),

    /// An activity lacks a resolvable callback
    #[error("Callback error: {0}")]
    Callback(#[from] CallbackError),

    /// Text input could not be translated to data
    #[error("NLU error: {0}")]
    Nlu(#[from] NluError),

    /// A process, kb or context file could not be loaded
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// The knowledge-base persistence hook failed
    #[error("Knowledge base save failed: {0}")]
    Save(anyhow::Error),

    /// Resumption stack exhausted while advancing past an activity with no
    /// successor. Signals a defective process graph, not bad user input.
    #[error("Resumption stack underflow while leaving activity '{activity}'")]
    StackUnderflow {
        /// Activity that had no successor and no resumption point
        activity: ActivityId,
    },

    /// A gateway callback reported completion without naming a child even
    /// though its kind requires exactly one
    #[error("Gateway '{gateway}' completed without a choice")]
    MissingChoice {
        /// The offending gateway
        gateway: ActivityId,
    },

    /// A gateway callback chose a child id that is not part of the process
    #[error("Gateway '{gateway}' chose unknown activity '{choice}'")]
    UnknownChoice {
        /// The gateway whose callback misbehaved
        gateway: ActivityId,
        /// The unresolvable child id it returned
        choice: ActivityId,
    },

    /// Traversal reached an id with no matching activity. Unreachable for
    /// validated processes; kept as an explicit fault instead of a panic.
    #[error("Activity '{0}' is not part of the process")]
    UnknownActivity(ActivityId),
}

/// Errors found while validating a process or activity description
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptionError {
    /// The first-activity id resolves to no activity
    #[error("First activity id '{0}' has no corresponding activity")]
    FirstNotFound(ActivityId),

    /// The first-activity id resolves to more than one activity
    #[error("First activity id '{0}' has multiple corresponding activities")]
    FirstAmbiguous(ActivityId),

    /// An activity names itself as its successor
    #[error("Activity '{0}' is the next of itself")]
    SelfNext(ActivityId),

    /// A next id resolves to no activity
    #[error("Activity '{activity}': next id '{next}' has no corresponding activity")]
    DanglingNext {
        /// Activity carrying the bad next id
        activity: ActivityId,
        /// The unresolvable next id
        next: ActivityId,
    },

    /// A next id resolves to more than one activity
    #[error("Next id '{0}' has multiple corresponding activities")]
    AmbiguousNext(ActivityId),

    /// A gateway description contains a null choice
    #[error("Gateway '{0}' contains a null choice")]
    NullChoice(ActivityId),

    /// A gateway lists itself among its choices
    #[error("Gateway '{0}' has itself in its choices")]
    SelfChoice(ActivityId),

    /// A gateway lists the same choice twice
    #[error("Gateway '{activity}' contains duplicate choice '{choice}'")]
    DuplicateChoice {
        /// The offending gateway
        activity: ActivityId,
        /// The duplicated child id
        choice: ActivityId,
    },

    /// A choice resolves to no activity
    #[error("Gateway '{activity}': choice '{choice}' has no corresponding activity")]
    DanglingChoice {
        /// The offending gateway
        activity: ActivityId,
        /// The unresolvable child id
        choice: ActivityId,
    },

    /// A choice resolves to more than one activity
    #[error("Gateway '{activity}': choice '{choice}' has multiple corresponding activities")]
    AmbiguousChoice {
        /// The offending gateway
        activity: ActivityId,
        /// The ambiguous child id
        choice: ActivityId,
    },

    /// A gateway kind was declared without choices, or with an empty list
    #[error("Activity '{0}' expected some choices, but found none")]
    MissingChoices(ActivityId),

    /// A non-gateway kind was declared with choices
    #[error("Activity '{0}' has unexpected choices")]
    UnexpectedChoices(ActivityId),
}

/// Convenience result alias for description validation
pub type DescriptionResult<T> = std::result::Result<T, DescriptionError>;

/// Errors found while verifying callbacks at engine construction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CallbackError {
    /// The resolver knows no callback for the activity
    #[error("No callback registered for activity '{0}'")]
    Unknown(ActivityId),
}

/// Errors raised by text-to-data adapters
#[derive(Debug, Error)]
pub enum NluError {
    /// The request to the external parsing service failed
    #[error("NLU request to '{endpoint}' failed: {source}")]
    Request {
        /// Service endpoint the adapter called
        endpoint: String,
        /// Underlying transport error
        #[source]
        source: Box<ureq::Error>,
    },

    /// The parsing service answered with an undecodable body
    #[error("Could not decode NLU response: {0}")]
    Decode(#[from] io::Error),
}

/// Errors raised while loading process/kb/context files
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading the file failed
    #[error("Failed to read '{path}': {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// The file contents are not valid JSON of the expected shape
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// File that could not be parsed
        path: PathBuf,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

/// Result type using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;
