use std::fmt;
use std::sync::Arc;

use crate::event_log::{NullEventLog, RtcEventLog};
use crate::field_trial::{FieldTrials, FieldTrialsView};

/// Collaborators shared by everything created for one call: field trial
/// configuration and the diagnostic event log.
///
/// Cloning is cheap, all members are reference counted.
#[derive(Clone)]
pub struct Environment {
    field_trials: Arc<dyn FieldTrialsView>,
    event_log: Arc<dyn RtcEventLog>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            field_trials: Arc::new(FieldTrials::default()),
            event_log: Arc::new(NullEventLog),
        }
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_trials(mut self, field_trials: Arc<dyn FieldTrialsView>) -> Self {
        self.field_trials = field_trials;
        self
    }

    pub fn with_event_log(mut self, event_log: Arc<dyn RtcEventLog>) -> Self {
        self.event_log = event_log;
        self
    }

    pub fn field_trials(&self) -> &dyn FieldTrialsView {
        self.field_trials.as_ref()
    }

    pub fn event_log(&self) -> &dyn RtcEventLog {
        self.event_log.as_ref()
    }
}
