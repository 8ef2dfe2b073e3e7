//! Event dispatcher
//!
//! The [`Graph`] owns the emitters and the registry of live flows. Each event
//! is offered to every emitter, then shown to every live flow; derived events
//! are handed to listeners and dispatched recursively before `on_event`
//! returns.

use crate::config::GraphConfig;
use crate::emitter::Emitter;
use crate::registry::Registry;
use crate::types::{CepError, Event, Result, Timestamp};

/// Callback invoked with every derived event
pub type Listener = Box<dyn Fn(&Event) + Send + Sync>;

/// Registry plus dispatcher
///
/// `on_event` takes `&self`, so one graph can be shared between producer
/// threads (e.g. behind an `Arc`).
pub struct Graph {
    emitters: Vec<Box<dyn Emitter>>,
    registry: Registry,
    listeners: Vec<Listener>,
    config: GraphConfig,
}

impl Graph {
    /// Create a graph with an empty registry and default configuration
    pub fn new(emitters: Vec<Box<dyn Emitter>>) -> Self {
        Self::with_config(emitters, GraphConfig::default())
    }

    pub fn with_config(emitters: Vec<Box<dyn Emitter>>, config: GraphConfig) -> Self {
        Self {
            emitters,
            registry: Registry::new(),
            listeners: Vec::new(),
            config,
        }
    }

    pub fn add_emitter(&mut self, emitter: Box<dyn Emitter>) {
        self.emitters.push(emitter);
    }

    /// Register a callback for derived events
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Dispatch one event, including every derived event it causes
    ///
    /// Success with no visible effect is the normal outcome. Errors from
    /// emitters, id collisions and the recursion limit abort the dispatch and
    /// are returned; flows that already fired during this call stay
    /// unregistered.
    pub fn on_event(&self, event: &Event) -> Result<()> {
        self.dispatch(event, 0)
    }

    /// Drop every flow whose window closed strictly before `now`
    ///
    /// Expiry is otherwise only noticed when a later event reaches the flow;
    /// hosts with sparse streams call this periodically to bound the registry.
    pub fn sweep(&self, now: Timestamp) -> usize {
        let removed = self.registry.sweep(now);
        if removed > 0 {
            log::debug!("Swept {} expired flow(s) at {}", removed, now);
        }
        removed
    }

    fn dispatch(&self, event: &Event, depth: usize) -> Result<()> {
        if depth > self.config.max_depth {
            log::warn!("Derived event {} exceeds recursion limit {}", event, self.config.max_depth);
            return Err(CepError::RecursionLimitExceeded { depth });
        }
        log::trace!("Dispatching {} (depth {})", event, depth);

        self.spawn_flows(event)?;

        // Flows registered by this dispatch's own emitters are part of the
        // snapshot and therefore see the event that spawned them.
        for (id, handle) in self.registry.snapshot() {
            let derived = {
                let mut flow = handle.lock().unwrap_or_else(|e| e.into_inner());
                // Terminated by a concurrent dispatch after the snapshot was taken
                if !self.registry.contains(&id) {
                    continue;
                }
                let derived = flow.on_event(&self.registry, event);
                self.registry.update_deadline(&id, flow.expires_at());
                derived
            };

            for derived_event in derived {
                for listener in &self.listeners {
                    listener(&derived_event);
                }
                self.dispatch(&derived_event, depth + 1)?;
            }
        }

        Ok(())
    }

    fn spawn_flows(&self, event: &Event) -> Result<()> {
        for emitter in &self.emitters {
            let Some(flow) = emitter.on_event(event)? else {
                continue;
            };
            let id = flow.id().to_string();

            let registered = if emitter.allow_multiple() {
                self.registry.register(flow).map(|_| true)
            } else {
                self.registry.register_exclusive(flow, event.time)
            };

            match registered {
                Ok(true) => log::debug!("Registered flow {} for pattern {}", id, emitter.pattern()),
                Ok(false) => log::debug!(
                    "Pattern {} already has a live flow, dropping {}",
                    emitter.pattern(),
                    id
                ),
                Err(e) => {
                    log::warn!("Failed to register flow {}: {}", id, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}
