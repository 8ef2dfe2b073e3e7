//! Event predicates
//!
//! An [`Expression`] tests a single event. Expressions are pure values with no
//! mutable state; composite variants nest to any depth the configuration
//! describes.

use crate::types::{Event, EventType};
use serde::{Deserialize, Serialize};

/// A boolean predicate over one event
///
/// In configuration files expressions are written as single-key tables, e.g.
/// `{ equals = "Foo" }` or `{ or = [{ equals = "Foo" }, { equals = "Bar" }] }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Event type equals the given type
    Equals(EventType),
    /// Event type differs from the given type
    NotEquals(EventType),
    /// At least one child matches (empty = false)
    Or(Vec<Expression>),
    /// Every child matches (empty = true)
    And(Vec<Expression>),
}

impl Expression {
    pub fn equals(event_type: impl Into<EventType>) -> Self {
        Expression::Equals(event_type.into())
    }

    pub fn not_equals(event_type: impl Into<EventType>) -> Self {
        Expression::NotEquals(event_type.into())
    }

    /// Test the expression against an event
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Expression::Equals(t) => event.event_type == *t,
            Expression::NotEquals(t) => event.event_type != *t,
            Expression::Or(children) => children.iter().any(|expr| expr.matches(event)),
            Expression::And(children) => children.iter().all(|expr| expr.matches(event)),
        }
    }

    /// Nesting depth of this expression (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        match self {
            Expression::Equals(_) | Expression::NotEquals(_) => 1,
            Expression::Or(children) | Expression::And(children) => {
                1 + children.iter().map(Expression::depth).max().unwrap_or(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn foo() -> Event {
        Event::of_type("Foo")
    }

    fn bar() -> Event {
        Event::of_type("Bar")
    }

    #[test]
    fn test_equals() {
        let expr = Expression::equals("Foo");
        assert!(expr.matches(&foo()));
        assert!(!expr.matches(&bar()));
    }

    #[test]
    fn test_not_equals() {
        let expr = Expression::not_equals("Foo");
        assert!(!expr.matches(&foo()));
        assert!(expr.matches(&bar()));
    }

    #[test]
    fn test_empty_composites() {
        assert!(!Expression::Or(vec![]).matches(&foo()));
        assert!(Expression::And(vec![]).matches(&foo()));
    }

    #[test]
    fn test_or_and_ignore_child_order() {
        let children = vec![Expression::equals("Foo"), Expression::not_equals("Bar")];
        let mut reversed = children.clone();
        reversed.reverse();

        for event in [foo(), bar(), Event::of_type("Baz")] {
            assert_eq!(
                Expression::Or(children.clone()).matches(&event),
                Expression::Or(reversed.clone()).matches(&event)
            );
            assert_eq!(
                Expression::And(children.clone()).matches(&event),
                Expression::And(reversed.clone()).matches(&event)
            );
        }

        assert!(Expression::Or(children.clone()).matches(&Event::of_type("Baz")));
        assert!(!Expression::And(children).matches(&bar()));
    }

    #[test]
    fn test_deep_nesting() {
        let mut expr = Expression::equals("Foo");
        for i in 0..200 {
            expr = if i % 2 == 0 {
                Expression::And(vec![expr])
            } else {
                Expression::Or(vec![expr])
            };
        }
        assert_eq!(expr.depth(), 201);
        assert!(expr.matches(&foo()));
        assert!(!expr.matches(&bar()));
    }

    #[test]
    fn test_undefined_type() {
        let expr = Expression::Equals(EventType::UNDEFINED);
        assert!(expr.matches(&Event::default()));
        assert!(!expr.matches(&foo()));
    }
}
