//! Flow factories
//!
//! An [`Emitter`] watches the event stream for the first step of a pattern and
//! spawns a fresh [`Flow`] each time it sees one. Flow ids come from an
//! [`IdGenerator`] supplied by the host.

use crate::flow::{Flow, StatementFlow};
use crate::statement::Statement;
use crate::types::{CepError, Event, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Spawns flows when a pattern's first step is observed
pub trait Emitter: Send + Sync {
    /// Returns a new flow if `event` starts this pattern, `None` otherwise
    fn on_event(&self, event: &Event) -> Result<Option<Box<dyn Flow>>>;

    /// Name of the pattern this emitter spawns
    fn pattern(&self) -> &str;

    /// May several flows of this pattern be live at once
    ///
    /// Defaults to `false`, like [`Statement::allow_multiple`].
    fn allow_multiple(&self) -> bool {
        false
    }
}

/// Source of flow ids, unique for the lifetime of a registry
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> Result<String>;
}

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> Result<String> {
        Ok(uuid::Uuid::new_v4().to_string())
    }
}

/// `<prefix>-<n>` with a monotonically increasing counter
///
/// Readable ids for logs and tests. Fails once the counter is exhausted
/// rather than wrapping into ids that may still be live.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::starting_at(prefix, 1)
    }

    /// Create a generator whose first id uses `start`
    pub fn starting_at(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(start),
        }
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> Result<String> {
        let n = self
            .next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_add(1))
            .map_err(|_| CepError::IdSpaceExhausted(self.prefix.clone()))?;
        Ok(format!("{}-{}", self.prefix, n))
    }
}

/// Emitter backed by a statement template
///
/// Every spawned flow owns a clone of the template, so advancing one instance
/// never affects the template or its siblings.
pub struct StatementEmitter {
    name: String,
    statement: Statement,
    ids: Arc<dyn IdGenerator>,
}

impl StatementEmitter {
    /// Create an emitter using random UUID flow ids
    pub fn new(name: impl Into<String>, statement: Statement) -> Self {
        Self::with_id_generator(name, statement, Arc::new(UuidIdGenerator))
    }

    pub fn with_id_generator(
        name: impl Into<String>,
        statement: Statement,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            name: name.into(),
            statement,
            ids,
        }
    }

    /// The template statement
    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

impl Emitter for StatementEmitter {
    fn on_event(&self, event: &Event) -> Result<Option<Box<dyn Flow>>> {
        if !self.statement.expression.matches(event) {
            return Ok(None);
        }

        let id = self.ids.next_id()?;
        log::debug!("Pattern {} spawning flow {} on {}", self.name, id, event);

        let flow = StatementFlow::new(id, self.statement.clone()).with_pattern(self.name.as_str());
        Ok(Some(Box::new(flow)))
    }

    fn pattern(&self) -> &str {
        &self.name
    }

    fn allow_multiple(&self) -> bool {
        self.statement.allow_multiple
    }
}
