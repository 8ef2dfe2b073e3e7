//! Declarative pattern rules
//!
//! A [`Statement`] pairs an [`Expression`] with an optional timed follow-up
//! and the event type emitted when the whole chain completes.

use crate::expression::Expression;
use crate::types::{CepError, EventType, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A CEP rule: predicate, optional follow-up, output event type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    /// Predicate that must match for this step to complete
    pub expression: Expression,

    /// Next step, which must match within a time window after this one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followed_by: Option<Box<FollowedBy>>,

    /// Event type emitted when this statement completes with no follow-up left
    #[serde(default)]
    pub triggers: EventType,

    /// May multiple instances of this statement be in effect at one time
    #[serde(default)]
    pub allow_multiple: bool,
}

/// "Must be followed, within `within`, by a match of `statement`"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedBy {
    pub statement: Statement,

    /// Window length; only whole seconds are significant
    #[serde(rename = "within_secs", with = "duration_secs")]
    pub within: Duration,
}

impl Statement {
    /// Create a single-step statement with an undefined trigger
    pub fn new(expression: Expression) -> Self {
        Self {
            expression,
            followed_by: None,
            triggers: EventType::UNDEFINED,
            allow_multiple: false,
        }
    }

    /// Builder method: set the emitted event type
    pub fn with_triggers(mut self, triggers: impl Into<EventType>) -> Self {
        self.triggers = triggers.into();
        self
    }

    /// Builder method: require `statement` to match within `within` after this one
    pub fn with_followed_by(mut self, statement: Statement, within: Duration) -> Self {
        self.followed_by = Some(Box::new(FollowedBy { statement, within }));
        self
    }

    /// Builder method: allow concurrent instances of this statement
    pub fn with_allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple = allow;
        self
    }

    /// Number of steps in the followed-by chain, including this one
    pub fn steps(&self) -> usize {
        let mut count = 1;
        let mut current = self;
        while let Some(next) = &current.followed_by {
            count += 1;
            current = &next.statement;
        }
        count
    }

    /// The statement at the end of the followed-by chain
    pub fn terminal(&self) -> &Statement {
        let mut current = self;
        while let Some(next) = &current.followed_by {
            current = &next.statement;
        }
        current
    }

    /// Check that the chain can fire something meaningful
    ///
    /// Only the terminal statement's `triggers` is ever emitted, so it must
    /// not be the undefined type.
    pub fn validate(&self) -> Result<()> {
        let terminal = self.terminal();
        if terminal.triggers.is_undefined() {
            return Err(CepError::InvalidStatement(format!(
                "terminal step of a {}-step statement triggers the undefined event type",
                self.steps()
            )));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
