//! In-memory processing runtime
//!
//! Resolves the stream references of each statement against the registry
//! and keeps deployments in process memory. Intended for tests and for
//! single-process setups where statement evaluation happens elsewhere.
//!
//! Reference extraction understands the parts of the query syntax that name
//! streams: `from <id>[, <id>...]`, `join <id>`, `insert into <id>` and the
//! filters of a `from pattern [...]` clause. View suffixes such as
//! `.win:length(3)` or `#length(3)` are ignored.

use super::{CepRuntime, DeploymentId, DeploymentSnapshot, RuntimeSnapshot};
use crate::error::{CepError, Result};
use crate::registry::EventTypeRegistry;
use crate::statement::CompiledStatement;
use crate::types::Category;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Memory runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryConfig {
    /// Maximum statements accepted in one deployment
    pub max_statements: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_statements: 1024,
        }
    }
}

struct Deployment {
    id: DeploymentId,
    statements: Vec<CompiledStatement>,
    registry: Arc<EventTypeRegistry>,
    activated_at: DateTime<Utc>,
}

/// In-memory `CepRuntime`
#[derive(Default)]
pub struct MemoryRuntime {
    config: MemoryConfig,
    deployments: RwLock<Vec<Deployment>>,
}

impl MemoryRuntime {
    /// Create a runtime with custom settings
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            deployments: RwLock::new(Vec::new()),
        }
    }

    /// Number of deployments currently installed
    pub async fn deployment_count(&self) -> usize {
        self.deployments.read().await.len()
    }
}

#[async_trait]
impl CepRuntime for MemoryRuntime {
    async fn compile(
        &self,
        index: usize,
        source: &str,
        registry: &EventTypeRegistry,
    ) -> Result<CompiledStatement> {
        let refs = references(source);
        let mut statement = CompiledStatement::new(index, source);

        for id in refs.sources {
            if registry.resolve_any(&id).is_err() {
                return Err(unknown(&id));
            }
            if !statement.inputs.contains(&id) {
                statement.inputs.push(id);
            }
        }
        for id in refs.sinks {
            if !registry.contains(&id, Category::Output) {
                return Err(unknown(&id));
            }
            if !statement.outputs.contains(&id) {
                statement.outputs.push(id);
            }
        }

        Ok(statement)
    }

    async fn activate(
        &self,
        statements: Vec<CompiledStatement>,
        registry: Arc<EventTypeRegistry>,
    ) -> Result<DeploymentId> {
        if statements.len() > self.config.max_statements {
            return Err(CepError::Runtime(format!(
                "Deployment of {} statements exceeds the limit of {}",
                statements.len(),
                self.config.max_statements
            )));
        }

        let id = DeploymentId::generate();
        let mut deployments = self.deployments.write().await;
        deployments.push(Deployment {
            id: id.clone(),
            statements,
            registry,
            activated_at: Utc::now(),
        });

        tracing::debug!(deployment = %id, "Deployment activated");
        Ok(id)
    }

    async fn deactivate(&self, deployment: &DeploymentId) -> Result<()> {
        let mut deployments = self.deployments.write().await;
        let before = deployments.len();
        deployments.retain(|d| &d.id != deployment);
        if deployments.len() == before {
            return Err(CepError::Runtime(format!(
                "Deployment not found: {}",
                deployment
            )));
        }

        tracing::debug!(deployment = %deployment, "Deployment deactivated");
        Ok(())
    }

    async fn snapshot(&self) -> Result<RuntimeSnapshot> {
        let deployments = self.deployments.read().await;
        Ok(RuntimeSnapshot {
            runtime: self.name().to_string(),
            deployments: deployments
                .iter()
                .map(|d| DeploymentSnapshot {
                    id: d.id.clone(),
                    statements: d.statements.iter().map(|s| s.source.clone()).collect(),
                    inputs: d.registry.ids(Category::Input).to_vec(),
                    outputs: d.registry.ids(Category::Output).to_vec(),
                    activated_at: d.activated_at,
                })
                .collect(),
        })
    }

    fn name(&self) -> &str {
        "memory"
    }
}

fn unknown(id: &str) -> CepError {
    CepError::Compilation {
        reason: "Unknown event type".to_string(),
        detail: format!("Statement references undeclared event type '{}'", id),
    }
}

#[derive(Debug, Default, PartialEq)]
struct References {
    sources: Vec<String>,
    sinks: Vec<String>,
}

/// Keywords ending a `from` clause
const CLAUSE_END: &[&str] = &["where", "group", "having", "order", "output", "limit", "select"];

/// Join qualifiers skipped inside a `from` clause
const JOIN_QUALIFIERS: &[&str] = &["inner", "left", "right", "full", "outer", "unidirectional"];

/// Operators and guards inside a pattern that are not event types
const PATTERN_KEYWORDS: &[&str] = &["every", "every-distinct", "and", "or", "not", "where", "until"];

/// Pattern keywords whose parentheses group sub-expressions
const PATTERN_GROUPING: &[&str] = &["every", "and", "or", "not"];

fn is_keyword(token: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| token.eq_ignore_ascii_case(k))
}

fn references(source: &str) -> References {
    let tokens: Vec<&str> = source.split_whitespace().collect();
    let mut refs = References::default();
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];

        if token.eq_ignore_ascii_case("insert")
            && tokens.get(i + 1).is_some_and(|t| t.eq_ignore_ascii_case("into"))
        {
            if let Some(name) = tokens.get(i + 2).and_then(|t| stream_name(t)) {
                refs.sinks.push(name);
            }
            i += 3;
            continue;
        }

        if token.eq_ignore_ascii_case("from") {
            i = from_clause(&tokens, i + 1, &mut refs.sources);
            continue;
        }

        i += 1;
    }

    refs
}

/// Collect stream names of a `from` clause starting at `start`
///
/// Returns the index of the first token after the clause.
fn from_clause(tokens: &[&str], start: usize, sources: &mut Vec<String>) -> usize {
    let mut expect_name = true;
    let mut in_condition = false;
    let mut i = start;

    while i < tokens.len() {
        let mut token = tokens[i];
        if is_keyword(token, CLAUSE_END) || token.eq_ignore_ascii_case("from") {
            break;
        }
        if expect_name && starts_pattern(tokens, i) {
            let (next, continues) = pattern_clause(tokens, i, sources);
            i = next;
            expect_name = continues;
            continue;
        }
        i += 1;

        if token.eq_ignore_ascii_case("join") {
            expect_name = true;
            in_condition = false;
            continue;
        }
        if token.eq_ignore_ascii_case("on") {
            in_condition = true;
            continue;
        }
        if in_condition || is_keyword(token, JOIN_QUALIFIERS) {
            continue;
        }

        if let Some(rest) = token.strip_prefix(',') {
            expect_name = true;
            token = rest;
            if token.is_empty() {
                continue;
            }
        }

        let continues = token.ends_with(',');
        if expect_name {
            if let Some(name) = stream_name(token.trim_end_matches(',')) {
                sources.push(name);
            }
            expect_name = false;
        }
        if continues {
            expect_name = true;
        }
    }

    i
}

/// Whether `tokens[i]` opens a `pattern [...]` clause
fn starts_pattern(tokens: &[&str], i: usize) -> bool {
    let token = tokens[i];
    match token.get(..7) {
        Some(keyword) if keyword.eq_ignore_ascii_case("pattern") => {}
        _ => return false,
    }
    let rest = &token[7..];
    rest.starts_with('[')
        || (rest.is_empty() && tokens.get(i + 1).is_some_and(|t| t.starts_with('[')))
}

/// Collect the event types filtered by a pattern clause starting at `start`
///
/// Returns the index after the closing bracket and whether the clause ends
/// with a comma.
fn pattern_clause(tokens: &[&str], start: usize, sources: &mut Vec<String>) -> (usize, bool) {
    let mut body = String::new();
    let mut depth = 0usize;
    let mut opened = false;
    let mut i = start;

    while i < tokens.len() {
        let token = if i == start { &tokens[i][7..] } else { tokens[i] };
        i += 1;
        for c in token.chars() {
            match c {
                '[' => {
                    depth += 1;
                    opened = true;
                }
                ']' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        body.push_str(token);
        body.push(' ');
        if opened && depth == 0 {
            break;
        }
    }

    sources.extend(pattern_filters(&body));
    (i, tokens[i - 1].ends_with(','))
}

/// Event types named by the filters of a pattern body
///
/// `a=Room(temperature > 30) -> b=Floor` yields `Room` and `Floor`. Tags,
/// filter criteria, repeat counts, observers and guards are skipped.
fn pattern_filters(body: &str) -> Vec<String> {
    let mut filters = Vec::new();
    let mut atom = String::new();
    let mut pending: Option<String> = None;
    let mut chars = body.chars().peekable();

    fn flush(atom: &mut String, pending: &mut Option<String>, filters: &mut Vec<String>) {
        if atom.is_empty() {
            return;
        }
        if let Some(previous) = pending.replace(std::mem::take(atom)) {
            commit_filter(&previous, filters);
        }
    }

    while let Some(c) = chars.next() {
        match c {
            '-' if chars.peek() == Some(&'>') => {
                chars.next();
                flush(&mut atom, &mut pending, &mut filters);
                if let Some(previous) = pending.take() {
                    commit_filter(&previous, &mut filters);
                }
            }
            '=' => {
                // Drop the tag in `tag=Type`
                if atom.is_empty() {
                    pending = None;
                } else {
                    atom.clear();
                }
            }
            '(' => {
                flush(&mut atom, &mut pending, &mut filters);
                let groups = pending
                    .as_deref()
                    .map_or(true, |p| is_keyword(p, PATTERN_GROUPING));
                if !groups {
                    // Filter criteria or observer arguments
                    let mut depth = 1;
                    for c in chars.by_ref() {
                        match c {
                            '(' => depth += 1,
                            ')' => depth -= 1,
                            _ => {}
                        }
                        if depth == 0 {
                            break;
                        }
                    }
                }
            }
            c if c.is_whitespace() || matches!(c, ',' | '[' | ']' | ')') => {
                flush(&mut atom, &mut pending, &mut filters);
            }
            c => atom.push(c),
        }
    }

    flush(&mut atom, &mut pending, &mut filters);
    if let Some(previous) = pending {
        commit_filter(&previous, &mut filters);
    }
    filters
}

fn commit_filter(name: &str, filters: &mut Vec<String>) {
    if is_keyword(name, PATTERN_KEYWORDS) {
        return;
    }
    match name.chars().next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return,
    }
    // `timer:interval` and other observers have no stream before the colon
    if let Some(colon) = name.find(':') {
        if !name[..colon].contains('.') {
            return;
        }
    }
    if let Some(stream) = stream_name(name) {
        if !filters.contains(&stream) {
            filters.push(stream);
        }
    }
}

/// Extract an event type id from a stream token
fn stream_name(token: &str) -> Option<String> {
    let end = token.find(&['(', ')', ';', '#'][..]).unwrap_or(token.len());
    let mut name = &token[..end];

    // `S.win:length` → `S`
    if let Some(colon) = name.find(':') {
        name = match name[..colon].rfind('.') {
            Some(dot) => &name[..dot],
            None => &name[..colon],
        };
    }

    let first = name.chars().next()?;
    if first.is_alphanumeric() || first == '_' {
        Some(name.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IdCollisionPolicy;
    use crate::types::{Configuration, EventTypeIn, EventTypeOut};

    fn registry() -> Arc<EventTypeRegistry> {
        let conf = Configuration::new()
            .with_input(EventTypeIn::new("S.*"))
            .with_input(EventTypeIn::new("Room"))
            .with_input(EventTypeIn::new("Floor"))
            .with_output(EventTypeOut::new("OUT1"));
        Arc::new(EventTypeRegistry::build(&conf, IdCollisionPolicy::Reject).unwrap())
    }

    #[test]
    fn test_references_simple_select() {
        let refs = references("select * from S.*");
        assert_eq!(refs.sources, vec!["S.*"]);
        assert!(refs.sinks.is_empty());
    }

    #[test]
    fn test_references_insert_into() {
        let refs = references(
            "INSERT INTO OUT1 SELECT avg(temperature) as t FROM Room.win:time(10 sec) WHERE t > 20",
        );
        assert_eq!(refs.sinks, vec!["OUT1"]);
        assert_eq!(refs.sources, vec!["Room"]);
    }

    #[test]
    fn test_references_lists_and_joins() {
        let refs = references("select * from Room as r, Floor as f where r.floor = f.id");
        assert_eq!(refs.sources, vec!["Room", "Floor"]);

        let refs = references("select * from Room r inner join Floor f on r.floor = f.id");
        assert_eq!(refs.sources, vec!["Room", "Floor"]);

        let refs = references("select * from Room ,Floor");
        assert_eq!(refs.sources, vec!["Room", "Floor"]);
    }

    #[test]
    fn test_references_insert_with_column_list() {
        let refs = references("insert into OUT1(id, t) select id, t from Room");
        assert_eq!(refs.sinks, vec!["OUT1"]);
        assert_eq!(refs.sources, vec!["Room"]);
    }

    #[test]
    fn test_references_hash_views() {
        let refs = references("select * from Room#length(3) as r, Floor#time(10 sec)");
        assert_eq!(refs.sources, vec!["Room", "Floor"]);
    }

    #[test]
    fn test_references_pattern() {
        let refs = references(
            "insert into OUT1 select a.id as id from pattern [every a=Room -> b=Room]",
        );
        assert_eq!(refs.sinks, vec!["OUT1"]);
        assert_eq!(refs.sources, vec!["Room"]);

        let refs = references("select * from pattern[every Room]");
        assert_eq!(refs.sources, vec!["Room"]);
    }

    #[test]
    fn test_references_pattern_criteria_and_guards() {
        let refs = references(
            "select * from pattern [every a=Room(temperature > 30, floor = 2) -> \
             (b = Floor or timer:interval(5 sec)) where timer:within(1 min)]",
        );
        assert_eq!(refs.sources, vec!["Room", "Floor"]);

        let refs = references("select * from pattern [every-distinct(a.id) a=Room until [2] Floor]");
        assert_eq!(refs.sources, vec!["Room", "Floor"]);
    }

    #[test]
    fn test_references_pattern_then_stream() {
        let refs = references("select * from pattern [a=Room] as p, Floor where p.a.floor = 1");
        assert_eq!(refs.sources, vec!["Room", "Floor"]);
    }

    #[test]
    fn test_stream_name() {
        assert_eq!(stream_name("S.*"), Some("S.*".to_string()));
        assert_eq!(stream_name("Room.win:length(3)"), Some("Room".to_string()));
        assert_eq!(stream_name("Room;"), Some("Room".to_string()));
        assert_eq!(stream_name("Room#length(3)"), Some("Room".to_string()));
        assert_eq!(stream_name("(select"), None);
    }

    #[tokio::test]
    async fn test_compile_resolves_references() {
        let runtime = MemoryRuntime::default();
        let statement = runtime
            .compile(0, "insert into OUT1 select * from Room", &registry())
            .await
            .unwrap();
        assert_eq!(statement.inputs, vec!["Room"]);
        assert_eq!(statement.outputs, vec!["OUT1"]);
    }

    #[tokio::test]
    async fn test_compile_unknown_source() {
        let runtime = MemoryRuntime::default();
        let err = runtime
            .compile(0, "select * from Kitchen", &registry())
            .await
            .unwrap_err();
        match err {
            CepError::Compilation { reason, detail } => {
                assert_eq!(reason, "Unknown event type");
                assert!(detail.contains("Kitchen"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_compile_pattern_statement() {
        let runtime = MemoryRuntime::default();
        let statement = runtime
            .compile(
                0,
                "insert into OUT1 select a.id as id from pattern [every a=Room -> b=Floor]",
                &registry(),
            )
            .await
            .unwrap();
        assert_eq!(statement.inputs, vec!["Room", "Floor"]);
        assert_eq!(statement.outputs, vec!["OUT1"]);

        let err = runtime
            .compile(0, "select * from pattern [every a=Kitchen]", &registry())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("'Kitchen'"));
    }

    #[tokio::test]
    async fn test_compile_sink_must_be_output() {
        let runtime = MemoryRuntime::default();
        let result = runtime
            .compile(0, "insert into Room select * from Floor", &registry())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_activate_deactivate_snapshot() {
        let runtime = MemoryRuntime::default();
        let registry = registry();
        let statement = runtime
            .compile(0, "select * from S.*", &registry)
            .await
            .unwrap();

        let first = runtime
            .activate(vec![statement.clone()], Arc::clone(&registry))
            .await
            .unwrap();
        let second = runtime
            .activate(vec![statement], Arc::clone(&registry))
            .await
            .unwrap();
        assert_eq!(runtime.deployment_count().await, 2);

        runtime.deactivate(&first).await.unwrap();
        let snapshot = runtime.snapshot().await.unwrap();
        assert_eq!(snapshot.runtime, "memory");
        assert_eq!(snapshot.deployments.len(), 1);
        assert_eq!(snapshot.deployments[0].id, second);
        assert_eq!(snapshot.current_statements(), ["select * from S.*"]);
        assert_eq!(snapshot.deployments[0].outputs, vec!["OUT1"]);

        assert!(runtime.deactivate(&first).await.is_err());
    }

    #[tokio::test]
    async fn test_activate_respects_statement_limit() {
        let runtime = MemoryRuntime::new(MemoryConfig { max_statements: 1 });
        let statements = vec![
            CompiledStatement::new(0, "select * from Room"),
            CompiledStatement::new(1, "select * from Floor"),
        ];
        let err = runtime.activate(statements, registry()).await.unwrap_err();
        assert!(matches!(err, CepError::Runtime(_)));
        assert_eq!(runtime.deployment_count().await, 0);
    }
}
