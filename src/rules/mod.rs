//! Rule contract and the built-in rule collection.
//!
//! A rule inspects the shared document model (and, when it needs to, the
//! network through the run's link resolver) and reports findings through
//! its [`Reporter`]. Completion is signalled by the orchestrator when the
//! rule's future resolves, so a rule cannot report after its own `done`
//! unless it leaks work into a detached task.
//!
//! Rules are located through a [`RuleRegistry`] keyed by `category/name`.

pub mod headers;
pub mod heuristic;
pub mod links;
pub mod sotd;
pub mod structure;
pub mod style;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::document::{Dom, DocumentModel, StructureError};
use crate::engine::sink::Sink;
use crate::links::{LinkResolver, ResolverError};
use crate::profile::{ProfileError, RunConfig};
use crate::{Finding, RuleId, Severity};

/// An isolated failure inside one rule
#[derive(Debug, Error)]
pub enum RuleFault {
    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Resolver(#[from] ResolverError),

    #[error("{0}")]
    Message(String),
}

/// Everything a rule may use during one run
pub struct RuleContext {
    pub model: Arc<DocumentModel>,
    pub config: Arc<RunConfig>,
    pub resolver: Arc<LinkResolver>,
    pub report: Reporter,
}

impl RuleContext {
    /// Status code from the configuration, else the one the document declares
    pub fn status(&self) -> Option<String> {
        self.config
            .status
            .clone()
            .or_else(|| self.model.profile.map(|p| p.as_str().to_string()))
    }
}

/// Finding reporter bound to one rule
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<Sink>,
    rule: RuleId,
}

impl Reporter {
    pub fn new(sink: Arc<Sink>, rule: RuleId) -> Self {
        Reporter { sink, rule }
    }

    pub fn rule(&self) -> &RuleId {
        &self.rule
    }

    fn emit(&self, key: &str, severity: Severity, detail: Option<String>) {
        let finding = Finding {
            rule: self.rule.clone(),
            key: key.to_string(),
            severity,
            detail,
        };
        match severity {
            Severity::Error => self.sink.error(finding),
            Severity::Warning => self.sink.warning(finding),
        };
    }

    pub fn error(&self, key: &str) {
        self.emit(key, Severity::Error, None);
    }

    pub fn error_with(&self, key: &str, detail: impl Into<String>) {
        self.emit(key, Severity::Error, Some(detail.into()));
    }

    pub fn warning(&self, key: &str) {
        self.emit(key, Severity::Warning, None);
    }

    pub fn warning_with(&self, key: &str, detail: impl Into<String>) {
        self.emit(key, Severity::Warning, Some(detail.into()));
    }
}

/// A unit of conformance checking
#[async_trait]
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn description(&self) -> &'static str;

    /// Inspect the document and report findings through `ctx.report`.
    async fn run(&self, ctx: &RuleContext) -> Result<(), RuleFault>;
}

/// Body of a rule that only needs the parsed document
pub type StaticCheck = fn(&Dom, &RuleContext) -> Result<(), RuleFault>;

/// Rule whose body is a synchronous function over the document structure
pub struct StaticRule {
    id: RuleId,
    description: &'static str,
    check: StaticCheck,
}

impl StaticRule {
    pub fn new(
        category: &str,
        name: &str,
        description: &'static str,
        check: StaticCheck,
    ) -> Self {
        StaticRule {
            id: RuleId::new(category, name),
            description,
            check,
        }
    }

    fn run_now(&self, ctx: &RuleContext) -> Result<(), RuleFault> {
        let dom = ctx.model.structure();
        (self.check)(&dom, ctx)
    }
}

#[async_trait]
impl Rule for StaticRule {
    fn id(&self) -> RuleId {
        self.id.clone()
    }

    fn description(&self) -> &'static str {
        self.description
    }

    async fn run(&self, ctx: &RuleContext) -> Result<(), RuleFault> {
        self.run_now(ctx)
    }
}

/// Rule implementations by identifier
#[derive(Clone, Default)]
pub struct RuleRegistry {
    rules: BTreeMap<RuleId, Arc<dyn Rule>>,
}

impl RuleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in rule
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        headers::register(&mut registry);
        style::register(&mut registry);
        links::register(&mut registry);
        structure::register(&mut registry);
        sotd::register(&mut registry);
        heuristic::register(&mut registry);
        registry
    }

    /// Add or replace a rule
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        self.rules.insert(rule.id(), rule);
    }

    pub fn get(&self, id: &RuleId) -> Option<Arc<dyn Rule>> {
        self.rules.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over `(id, description)` pairs in identifier order
    pub fn describe(&self) -> impl Iterator<Item = (&RuleId, &'static str)> {
        self.rules.iter().map(|(id, rule)| (id, rule.description()))
    }

    /// Look up every identifier; the first unknown one is an error
    pub fn resolve(&self, ids: &[RuleId]) -> Result<Vec<Arc<dyn Rule>>, ProfileError> {
        ids.iter()
            .map(|id| {
                self.get(id)
                    .ok_or_else(|| ProfileError::UnknownRule(id.clone()))
            })
            .collect()
    }
}
