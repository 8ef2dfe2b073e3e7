//! Small walkthrough of the pattern engine
//!
//! Builds two rules, one of which consumes the other's derived events, and
//! feeds a short scripted stream through them.
//!
//! Usage:
//!   RUST_LOG=debug cargo run -p cep-engine --example pattern_demo

use cep_engine::{Emitter, Event, Expression, Graph, Statement, StatementEmitter};
use std::time::Duration;

fn main() {
    env_logger::init();

    let overheat = Statement::new(Expression::equals("TempHigh")).with_followed_by(
        Statement::new(Expression::Or(vec![
            Expression::equals("FanFault"),
            Expression::equals("PumpFault"),
        ]))
        .with_triggers("Overheat"),
        Duration::from_secs(60),
    );

    let shutdown = Statement::new(Expression::equals("Overheat")).with_followed_by(
        Statement::new(Expression::equals("TempHigh")).with_triggers("EmergencyShutdown"),
        Duration::from_secs(300),
    );

    let emitters: Vec<Box<dyn Emitter>> = vec![
        Box::new(StatementEmitter::new("overheat", overheat)),
        Box::new(StatementEmitter::new("shutdown", shutdown)),
    ];
    let mut graph = Graph::new(emitters);
    graph.add_listener(|event| println!("  => derived {}", event));

    let stream = [
        Event::new(1_700_000_000, "TempHigh"),
        Event::new(1_700_000_010, "Heartbeat"),
        Event::new(1_700_000_030, "PumpFault"),
        Event::new(1_700_000_200, "TempHigh"),
    ];

    for event in &stream {
        println!("{}", event);
        if let Err(e) = graph.on_event(event) {
            eprintln!("Dispatch failed: {}", e);
            return;
        }
    }

    println!("\nLive flows remaining: {}", graph.registry().len());
}
