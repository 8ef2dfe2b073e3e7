//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use cep_engine::{
    Emitter, EventType, Expression, FollowedBy, Graph, GraphConfig, IdGenerator,
    SequentialIdGenerator, Statement, StatementEmitter, UuidIdGenerator,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Main application configuration (loaded from rules.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub statements: Vec<StatementConfig>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    #[default]
    Uuid,
    /// `<statement name>-<n>`
    Sequential,
}

/// One named rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatementConfig {
    pub name: String,
    pub expression: Expression,
    pub followed_by: Option<Box<FollowedBy>>,
    #[serde(default)]
    pub triggers: EventType,
    #[serde(default)]
    pub allow_multiple: bool,
}

impl StatementConfig {
    pub fn to_statement(&self) -> Statement {
        Statement {
            expression: self.expression.clone(),
            followed_by: self.followed_by.clone(),
            triggers: self.triggers.clone(),
            allow_multiple: self.allow_multiple,
        }
    }
}

impl AppConfig {
    /// Check rule names and that every rule fires a defined event type
    pub fn validate(&self) -> Result<()> {
        if self.statements.is_empty() {
            bail!("No statements configured");
        }

        let mut names = HashSet::new();
        for stmt in &self.statements {
            if stmt.name.trim().is_empty() {
                bail!("Statement with empty name");
            }
            if !names.insert(stmt.name.as_str()) {
                bail!("Duplicate statement name: {}", stmt.name);
            }
            stmt.to_statement()
                .validate()
                .with_context(|| format!("Statement {:?} is invalid", stmt.name))?;
        }
        Ok(())
    }

    /// Graph configuration, with an optional command-line override
    pub fn graph_config(&self, max_depth_override: Option<usize>) -> GraphConfig {
        let mut config = GraphConfig::new();
        if let Some(depth) = max_depth_override.or(self.engine.max_depth) {
            config = config.with_max_depth(depth);
        }
        config
    }

    /// Build one emitter per statement and wrap them in a graph
    pub fn build_graph(&self, max_depth_override: Option<usize>) -> Graph {
        let emitters: Vec<Box<dyn Emitter>> = self
            .statements
            .iter()
            .map(|stmt| {
                let ids: Arc<dyn IdGenerator> = match self.engine.id_strategy {
                    IdStrategy::Uuid => Arc::new(UuidIdGenerator),
                    IdStrategy::Sequential => Arc::new(SequentialIdGenerator::new(stmt.name.as_str())),
                };
                Box::new(StatementEmitter::with_id_generator(
                    stmt.name.as_str(),
                    stmt.to_statement(),
                    ids,
                )) as Box<dyn Emitter>
            })
            .collect();

        Graph::with_config(emitters, self.graph_config(max_depth_override))
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const RULES: &str = r#"
        [engine]
        max_depth = 32
        id_strategy = "sequential"

        [[statements]]
        name = "foo-then-bar"
        triggers = "FooBar"
        expression = { equals = "Foo" }

        [statements.followed_by]
        within_secs = 180
        statement = { expression = { or = [{ equals = "Bar" }, { equals = "Baz" }] }, triggers = "FooBar" }

        [[statements]]
        name = "activity"
        triggers = "Activity"
        allow_multiple = true
        expression = { and = [{ not_equals = "Heartbeat" }, { not_equals = "Activity" }] }
    "#;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_config_deserialization() {
        let config: AppConfig = toml::from_str(RULES).unwrap();

        assert_eq!(config.engine.max_depth, Some(32));
        assert_eq!(config.engine.id_strategy, IdStrategy::Sequential);
        assert_eq!(config.statements.len(), 2);

        let first = config.statements[0].to_statement();
        assert_eq!(first.expression, Expression::equals("Foo"));
        assert!(!first.allow_multiple);
        let next = first.followed_by.as_ref().unwrap();
        assert_eq!(next.within, Duration::from_secs(180));
        assert_eq!(
            next.statement.expression,
            Expression::Or(vec![Expression::equals("Bar"), Expression::equals("Baz")])
        );

        let second = config.statements[1].to_statement();
        assert_eq!(
            second.expression,
            Expression::And(vec![
                Expression::not_equals("Heartbeat"),
                Expression::not_equals("Activity"),
            ])
        );
        assert!(second.allow_multiple);
    }

    #[test]
    fn test_load_config_from_file() {
        let file = write_config(RULES);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.statements[0].name, "foo-then-bar");
        assert_eq!(config.graph_config(None).max_depth, 32);
        assert_eq!(config.graph_config(Some(4)).max_depth, 4);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let file = write_config(
            r#"
            [[statements]]
            name = "dup"
            triggers = "A"
            expression = { equals = "Foo" }

            [[statements]]
            name = "dup"
            triggers = "B"
            expression = { equals = "Bar" }
        "#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate statement name: dup"));
    }

    #[test]
    fn test_undefined_trigger_rejected() {
        let file = write_config(
            r#"
            [[statements]]
            name = "silent"
            expression = { equals = "Foo" }
        "#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Statement \"silent\" is invalid"));
    }

    #[test]
    fn test_example_rules_load() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("rules.example.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config.statements.len(), 3);
        assert_eq!(config.graph_config(None).max_depth, 64);
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/rules.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_build_graph_uses_sequential_ids() {
        let config: AppConfig = toml::from_str(RULES).unwrap();
        let graph = config.build_graph(None);

        graph
            .on_event(&cep_engine::Event::new(100, "Foo"))
            .unwrap();

        let mut ids = graph.registry().ids();
        ids.sort();
        // activity fires immediately; foo-then-bar waits for its follow-up
        assert_eq!(ids, vec!["foo-then-bar-1".to_string()]);
    }
}
