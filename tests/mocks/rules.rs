//! Scripted rules for driving the orchestrator from integration tests.

use std::time::Duration;

use async_trait::async_trait;
use docrules::links::ResolveOptions;
use docrules::rules::{Rule, RuleContext, RuleFault, RuleRegistry};
use docrules::RuleId;

/// What a scripted rule does when it runs
#[derive(Debug, Clone)]
pub enum Script {
    /// Return a fault without reporting anything
    Fault(String),
    /// Resolve the URL through the run's resolver, then finish cleanly
    Resolve(String),
    /// Sleep, then report an error under `key`
    ReportAfter(Duration, String),
}

pub struct ScriptedRule {
    id: RuleId,
    script: Script,
}

impl ScriptedRule {
    pub fn new(name: &str, script: Script) -> Self {
        ScriptedRule {
            id: RuleId::new("scripted", name),
            script,
        }
    }
}

#[async_trait]
impl Rule for ScriptedRule {
    fn id(&self) -> RuleId {
        self.id.clone()
    }

    fn description(&self) -> &'static str {
        "scripted test rule"
    }

    async fn run(&self, ctx: &RuleContext) -> Result<(), RuleFault> {
        match &self.script {
            Script::Fault(message) => Err(RuleFault::Message(message.clone())),
            Script::Resolve(url) => {
                ctx.resolver.resolve(url, ResolveOptions::default()).await?;
                Ok(())
            }
            Script::ReportAfter(delay, key) => {
                tokio::time::sleep(*delay).await;
                ctx.report.error(key);
                Ok(())
            }
        }
    }
}

/// Registry holding one scripted rule per entry, plus the identifiers in order
pub fn scripted_registry(rules: Vec<ScriptedRule>) -> (RuleRegistry, Vec<RuleId>) {
    let mut registry = RuleRegistry::new();
    let ids = rules.iter().map(|rule| rule.id.clone()).collect();
    for rule in rules {
        registry.register(std::sync::Arc::new(rule));
    }
    (registry, ids)
}
