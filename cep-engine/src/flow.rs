//! Pattern state machine
//!
//! A [`Flow`] is one in-flight match attempt of a statement. Each event shown
//! to it either expires it, leaves it unchanged, advances it to the next
//! followed-by step, or completes it.
//!
//! ```text
//!            match, follow-up left
//!   Active ─────────────────────────▶ AwaitingFollowUp ──┐ match, follow-up left
//!     │                                  │    ▲          │
//!     │ match, no follow-up              │    └──────────┘
//!     ▼                                  │ match, no follow-up / late event
//!   Terminated ◀─────────────────────────┘
//! ```

use crate::statement::{FollowedBy, Statement};
use crate::types::{Event, Timestamp};
use std::fmt;

/// Capability handed to a flow so it can remove itself from its registry
pub trait Context {
    /// Remove the flow with this id; returns whether anything was removed
    fn unregister(&self, id: &str) -> bool;
}

/// An in-flight pattern instance
pub trait Flow: Send {
    /// Identity, unique within a registry for the flow's lifetime
    fn id(&self) -> &str;

    /// Show the flow one event; returns the derived events it produces
    fn on_event(&mut self, ctx: &dyn Context, event: &Event) -> Vec<Event>;

    /// Name of the pattern this flow was spawned from
    fn pattern(&self) -> &str {
        ""
    }

    /// Deadline of the open followed-by window (0 = none)
    fn expires_at(&self) -> Timestamp {
        0
    }
}

/// Lifecycle state of a [`StatementFlow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No step has matched yet
    Active,
    /// A step matched and the window for the next one is open
    AwaitingFollowUp,
    /// Fired or expired
    Terminated,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Active => write!(f, "Active"),
            FlowState::AwaitingFollowUp => write!(f, "AwaitingFollowUp"),
            FlowState::Terminated => write!(f, "Terminated"),
        }
    }
}

/// Flow driven by a privately owned [`Statement`]
///
/// The statement is rewritten in place as the pattern advances, so each
/// instance must own its copy.
#[derive(Debug, Clone)]
pub struct StatementFlow {
    id: String,
    pattern: String,
    expires_at: Timestamp,
    statement: Statement,
    steps_matched: usize,
    terminated: bool,
}

impl StatementFlow {
    /// Create a flow at the first step of `statement`
    pub fn new(id: impl Into<String>, statement: Statement) -> Self {
        Self {
            id: id.into(),
            pattern: String::new(),
            expires_at: 0,
            statement,
            steps_matched: 0,
            terminated: false,
        }
    }

    /// Builder method: record the pattern name this flow belongs to
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    /// The step currently being awaited
    pub fn statement(&self) -> &Statement {
        &self.statement
    }

    pub fn state(&self) -> FlowState {
        if self.terminated {
            FlowState::Terminated
        } else if self.steps_matched > 0 {
            FlowState::AwaitingFollowUp
        } else {
            FlowState::Active
        }
    }

    fn terminate(&mut self, ctx: &dyn Context) {
        self.terminated = true;
        if !ctx.unregister(&self.id) {
            log::warn!("Flow {} was not registered when it terminated", self.id);
        }
    }
}

impl Flow for StatementFlow {
    fn id(&self) -> &str {
        &self.id
    }

    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    fn on_event(&mut self, ctx: &dyn Context, event: &Event) -> Vec<Event> {
        if self.terminated {
            return Vec::new();
        }

        // Expiry is checked before matching so a late event never also matches
        if self.expires_at != 0 && self.expires_at < event.time {
            log::debug!(
                "Flow {} expired: deadline {} passed by event at {}",
                self.id,
                self.expires_at,
                event.time
            );
            self.terminate(ctx);
            return Vec::new();
        }

        if !self.statement.expression.matches(event) {
            return Vec::new();
        }

        if let Some(next) = self.statement.followed_by.take() {
            let FollowedBy { statement, within } = *next;
            let window = Timestamp::try_from(within.as_secs()).unwrap_or(Timestamp::MAX);
            self.statement = statement;
            self.expires_at = event.time.saturating_add(window);
            self.steps_matched += 1;
            log::debug!(
                "Flow {} advanced to step {} (expires at {})",
                self.id,
                self.steps_matched + 1,
                self.expires_at
            );
            return Vec::new();
        }

        self.terminate(ctx);
        let derived = Event::new(event.time, self.statement.triggers.clone());
        log::debug!("Flow {} fired {}", self.id, derived.event_type);
        vec![derived]
    }
}
