//! Complex Event Processing Engine
//!
//! A reusable library that matches a stream of timestamped events against
//! declarative pattern rules ("statements") and re-injects the events those
//! rules derive.
//!
//! # Architecture
//!
//! - [`Expression`]: pure predicate over a single event
//! - [`Statement`]: expression, optional timed follow-up, output event type
//! - [`Flow`]: one in-flight match of a statement; advances or expires per event
//! - [`Emitter`]: spawns a new flow when a pattern's first step is seen
//! - [`Graph`]: owns the [`Registry`] of live flows and dispatches every event
//!   to every emitter and flow, recursing on derived events
//!
//! Temporal expiry is driven purely by event timestamps; no wall clock is read.
//!
//! The library does NOT:
//! - Author or load rule files
//! - Ingest events from any transport
//! - Persist flows across restarts
//!
//! Those belong to the host application (see cep-cli).
//!
//! # Example Usage
//!
//! ```
//! use cep_engine::{Emitter, Event, Expression, Graph, Statement, StatementEmitter};
//! use std::sync::{Arc, Mutex};
//! use std::time::Duration;
//!
//! let login_then_fail = Statement::new(Expression::equals("Login"))
//!     .with_followed_by(
//!         Statement::new(Expression::equals("Failure")).with_triggers("Suspicious"),
//!         Duration::from_secs(180),
//!     );
//!
//! let emitters: Vec<Box<dyn Emitter>> =
//!     vec![Box::new(StatementEmitter::new("login-fail", login_then_fail))];
//! let mut graph = Graph::new(emitters);
//!
//! let derived = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&derived);
//! graph.add_listener(move |event| sink.lock().unwrap().push(event.clone()));
//!
//! graph.on_event(&Event::new(1_000, "Login")).unwrap();
//! graph.on_event(&Event::new(1_060, "Failure")).unwrap();
//!
//! assert_eq!(*derived.lock().unwrap(), vec![Event::new(1_060, "Suspicious")]);
//! ```

// Public modules
pub mod config;
pub mod emitter;
pub mod expression;
pub mod flow;
pub mod graph;
pub mod registry;
pub mod statement;
pub mod types;

// Re-export main types for convenience
pub use config::GraphConfig;
pub use emitter::{Emitter, IdGenerator, SequentialIdGenerator, StatementEmitter, UuidIdGenerator};
pub use expression::Expression;
pub use flow::{Context, Flow, FlowState, StatementFlow};
pub use graph::{Graph, Listener};
pub use registry::{FlowHandle, Registry};
pub use statement::{FollowedBy, Statement};
pub use types::{CepError, Event, EventType, Result, Timestamp};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
