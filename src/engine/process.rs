//! Validated process graphs
//!
//! A `Process` is an ordered collection of activities plus the entry
//! point. Construction runs the full structural validation and fails with
//! the first `DescriptionError` found; a constructed process is immutable,
//! only the engine's traversal position changes at runtime.

use serde::{Deserialize, Serialize};

use super::activity::{Activity, ActivityDescription, ActivityId};
use super::error::{DescriptionError, DescriptionResult};

/// A validated process graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProcessDescription", into = "ProcessDescription")]
pub struct Process {
    activities: Vec<Activity>,
    first_id: ActivityId,
}

impl Process {
    /// Build and validate a process from activities and the entry id
    pub fn new(
        activities: Vec<Activity>,
        first_activity_id: ActivityId,
    ) -> DescriptionResult<Self> {
        let process = Self {
            activities,
            first_id: first_activity_id,
        };
        process.check()?;
        Ok(process)
    }

    /// The entry activity
    pub fn first(&self) -> &Activity {
        // Resolution is guaranteed by check() at construction.
        self.activities
            .iter()
            .find(|activity| activity.id == self.first_id)
            .expect("validated process has a first activity")
    }

    /// All activities, in description order
    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    /// Look up an activity by id
    pub fn activity(&self, id: &ActivityId) -> Option<&Activity> {
        self.activities.iter().find(|activity| &activity.id == id)
    }

    /// Index of the activity with the given id
    pub(crate) fn position(&self, id: &ActivityId) -> Option<usize> {
        self.activities.iter().position(|activity| &activity.id == id)
    }

    /// Structural validation; every check must pass
    fn check(&self) -> DescriptionResult<()> {
        match self.count_matches(&self.first_id) {
            0 => return Err(DescriptionError::FirstNotFound(self.first_id.clone())),
            1 => {}
            _ => return Err(DescriptionError::FirstAmbiguous(self.first_id.clone())),
        }

        for activity in &self.activities {
            if activity.next_id.as_ref() == Some(&activity.id) {
                return Err(DescriptionError::SelfNext(activity.id.clone()));
            }

            if let Some(next) = &activity.next_id {
                match self.count_matches(next) {
                    0 => {
                        return Err(DescriptionError::DanglingNext {
                            activity: activity.id.clone(),
                            next: next.clone(),
                        });
                    }
                    1 => {}
                    _ => return Err(DescriptionError::AmbiguousNext(next.clone())),
                }
            }

            if let Some(choices) = activity.kind.choices() {
                for (index, choice) in choices.iter().enumerate() {
                    if choice == &activity.id {
                        return Err(DescriptionError::SelfChoice(activity.id.clone()));
                    }
                    if choices[..index].contains(choice) {
                        return Err(DescriptionError::DuplicateChoice {
                            activity: activity.id.clone(),
                            choice: choice.clone(),
                        });
                    }
                    match self.count_matches(choice) {
                        0 => {
                            return Err(DescriptionError::DanglingChoice {
                                activity: activity.id.clone(),
                                choice: choice.clone(),
                            });
                        }
                        1 => {}
                        _ => {
                            return Err(DescriptionError::AmbiguousChoice {
                                activity: activity.id.clone(),
                                choice: choice.clone(),
                            });
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn count_matches(&self, id: &ActivityId) -> usize {
        self.activities
            .iter()
            .filter(|activity| &activity.id == id)
            .count()
    }
}

/// Wire form of a process, as found in description files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessDescription {
    /// Id of the entry activity
    pub first_activity_id: String,

    /// Activity descriptions, in order
    pub activities: Vec<ActivityDescription>,
}

impl TryFrom<ProcessDescription> for Process {
    type Error = DescriptionError;

    fn try_from(description: ProcessDescription) -> DescriptionResult<Self> {
        let activities = description
            .activities
            .into_iter()
            .map(Activity::try_from)
            .collect::<DescriptionResult<Vec<_>>>()?;
        Process::new(activities, ActivityId::new(description.first_activity_id))
    }
}

impl From<Process> for ProcessDescription {
    fn from(process: Process) -> Self {
        Self {
            first_activity_id: process.first_id.as_str().to_string(),
            activities: process
                .activities
                .into_iter()
                .map(ActivityDescription::from)
                .collect(),
        }
    }
}
