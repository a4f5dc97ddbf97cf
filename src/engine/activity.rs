//! Activity graph nodes
//!
//! An `Activity` is one node of a process graph: an id, an optional
//! successor, and a kind. Gateway kinds carry their child choices as
//! associated data, so a well-typed activity cannot mix kind and choices
//! incorrectly. The permissive wire form lives in `ActivityDescription`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{DescriptionError, DescriptionResult};

/// Unique identifier of an activity within a process
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    /// Create a new activity id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActivityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ActivityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of an activity, with gateway choices as associated data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityKind {
    /// Entry point of the process; its callback always succeeds and can
    /// seed the initial payload
    Start,

    /// Ordinary step; the callback reports whether it is done
    Task,

    /// Terminal sink; has no callback and only a default utterance
    End,

    /// Exclusive choice: the callback names exactly one child to enter
    Xor {
        /// Child activity ids offered by this gateway
        choices: Vec<ActivityId>,
    },

    /// Inclusive choice: complete after the first chosen child; a null
    /// choice then proceeds past the gateway
    Or {
        /// Child activity ids offered by this gateway
        choices: Vec<ActivityId>,
    },

    /// Parallel completion: complete only once every declared child has
    /// been chosen at least once
    Parallel {
        /// Child activity ids offered by this gateway
        choices: Vec<ActivityId>,
    },
}

impl ActivityKind {
    /// Child choices, for gateway kinds
    pub fn choices(&self) -> Option<&[ActivityId]> {
        match self {
            Self::Xor { choices } | Self::Or { choices } | Self::Parallel { choices } => {
                Some(choices)
            }
            Self::Start | Self::Task | Self::End => None,
        }
    }

    /// Whether this kind branches into choices
    pub fn is_gateway(&self) -> bool {
        self.choices().is_some()
    }

    /// Lowercase kind name as used in the wire format
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Task => "task",
            Self::End => "end",
            Self::Xor { .. } => "xor",
            Self::Or { .. } => "or",
            Self::Parallel { .. } => "parallel",
        }
    }
}

/// One node of a process graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ActivityDescription", into = "ActivityDescription")]
pub struct Activity {
    /// Unique id of this activity
    pub id: ActivityId,

    /// Successor when this activity completes. None marks "resume from
    /// the stack" for the last activity inside a gateway branch, and is
    /// the usual value for End.
    pub next_id: Option<ActivityId>,

    /// Kind of this activity, with choices for gateway kinds
    pub kind: ActivityKind,
}

impl Activity {
    /// Create an activity, rejecting gateway kinds with an empty choice list
    pub fn new(
        id: impl Into<ActivityId>,
        next_id: Option<ActivityId>,
        kind: ActivityKind,
    ) -> DescriptionResult<Self> {
        let id = id.into();
        if let Some(choices) = kind.choices() {
            if choices.is_empty() {
                return Err(DescriptionError::MissingChoices(id));
            }
        }
        Ok(Self { id, next_id, kind })
    }
}

/// Lowercase kind tag of the wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindName {
    /// Entry point
    Start,
    /// Ordinary step
    Task,
    /// Terminal sink
    End,
    /// Exclusive-choice gateway
    Xor,
    /// Inclusive-choice gateway
    Or,
    /// Parallel-completion gateway
    Parallel,
}

/// Wire form of an activity, as found in process description files
///
/// Deliberately permissive: choices may be absent, empty, or contain
/// nulls, so every malformed description is representable and rejected
/// with a `DescriptionError` instead of an opaque parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityDescription {
    /// Unique id of the activity
    pub id: String,

    /// Id of the successor activity, if any
    #[serde(default)]
    pub next_id: Option<String>,

    /// Kind tag
    pub kind: KindName,

    /// Child choices, required for gateway kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<Option<String>>>,
}

impl TryFrom<ActivityDescription> for Activity {
    type Error = DescriptionError;

    fn try_from(description: ActivityDescription) -> DescriptionResult<Self> {
        let id = ActivityId::new(description.id);
        let next_id = description.next_id.map(ActivityId::new);

        let kind = match description.kind {
            KindName::Start | KindName::Task | KindName::End => {
                if description.choices.is_some() {
                    return Err(DescriptionError::UnexpectedChoices(id));
                }
                match description.kind {
                    KindName::Start => ActivityKind::Start,
                    KindName::Task => ActivityKind::Task,
                    _ => ActivityKind::End,
                }
            }
            KindName::Xor | KindName::Or | KindName::Parallel => {
                let raw = description
                    .choices
                    .ok_or_else(|| DescriptionError::MissingChoices(id.clone()))?;
                let mut choices = Vec::with_capacity(raw.len());
                for choice in raw {
                    match choice {
                        Some(choice) => choices.push(ActivityId::new(choice)),
                        None => return Err(DescriptionError::NullChoice(id)),
                    }
                }
                match description.kind {
                    KindName::Xor => ActivityKind::Xor { choices },
                    KindName::Or => ActivityKind::Or { choices },
                    _ => ActivityKind::Parallel { choices },
                }
            }
        };

        Activity::new(id, next_id, kind)
    }
}

impl From<Activity> for ActivityDescription {
    fn from(activity: Activity) -> Self {
        let kind = match activity.kind {
            ActivityKind::Start => KindName::Start,
            ActivityKind::Task => KindName::Task,
            ActivityKind::End => KindName::End,
            ActivityKind::Xor { .. } => KindName::Xor,
            ActivityKind::Or { .. } => KindName::Or,
            ActivityKind::Parallel { .. } => KindName::Parallel,
        };
        let choices = activity.kind.choices().map(|choices| {
            choices
                .iter()
                .map(|choice| Some(choice.as_str().to_string()))
                .collect()
        });
        Self {
            id: activity.id.as_str().to_string(),
            next_id: activity.next_id.map(|id| id.as_str().to_string()),
            kind,
            choices,
        }
    }
}
