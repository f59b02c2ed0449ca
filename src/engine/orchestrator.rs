//! Validation run orchestrator.
//!
//! Drives one run through `Idle → Extracting → Running → Aggregating →
//! Terminated`: loads and extracts the document, dispatches every rule of
//! the profile concurrently, waits on a counted completion barrier, and
//! emits the single terminal `end-all` signal.
//!
//! # Graceful Degradation
//!
//! This module handles errors gracefully:
//! - Rule faults: reported as an `exception` carrying the rule id, rule counted as settled
//! - Rule panics: caught via `FutureExt::catch_unwind`, handled like faults
//! - Run timeout: `exception` naming the unsettled rules, partial report flagged `timed_out`
//! - Extraction failure: one `exception`, no rules run, no `end-all`
//! - Unknown rule in profile: one `exception` before dispatch, no rules run
//!
//! Rules still running after a timeout are detached rather than aborted;
//! anything they report afterwards is discarded by the terminated sink.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::document::{extract, DocumentModel, DocumentSource};
use crate::engine::barrier::CompletionBarrier;
use crate::engine::result::{ResultAggregator, RunReport};
use crate::engine::sink::Sink;
use crate::links::{HostPolicy, HttpFetch, LinkResolver, ReqwestFetcher, ResolverError};
use crate::rules::{Reporter, Rule, RuleContext, RuleRegistry};
use crate::{DocrulesError, ValidationRequest};

/// Profile name recorded for metadata-only runs
const METADATA_PROFILE: &str = "metadata";

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Bound on the wait for every rule to settle
    pub timeout: Duration,
    pub max_redirects: usize,
    /// Per HTTP request
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            timeout: Duration::from_secs(30),
            max_redirects: 10,
            request_timeout: Duration::from_secs(10),
            user_agent: format!("docrules/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Extracting,
    Running,
    Aggregating,
    Terminated,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Extracting => "extracting",
            RunPhase::Running => "running",
            RunPhase::Aggregating => "aggregating",
            RunPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// State of the run in progress
struct Run {
    phase: RunPhase,
    sink: Arc<Sink>,
    aggregator: ResultAggregator,
    started: Instant,
}

impl Run {
    fn new(profile: &str, source: &DocumentSource, sink: Arc<Sink>) -> Self {
        Run {
            phase: RunPhase::Idle,
            sink,
            aggregator: ResultAggregator::new(profile, source.to_string()),
            started: Instant::now(),
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(from = %self.phase, to = %phase, "run phase");
        self.phase = phase;
    }

    /// Report a fatal condition and stop without `end-all`
    fn abort(&mut self, error: DocrulesError) -> DocrulesError {
        self.sink.exception(None, error.to_string());
        self.enter(RunPhase::Terminated);
        error
    }

    async fn extract(
        &mut self,
        source: &DocumentSource,
        fetcher: &dyn HttpFetch,
    ) -> Result<DocumentModel, DocrulesError> {
        self.enter(RunPhase::Extracting);
        let extracted = match source.load(fetcher).await {
            Ok(loaded) => extract(&loaded.text, loaded.base_url),
            Err(e) => Err(e),
        };
        extracted.map_err(|e| self.abort(e.into()))
    }

    fn finish(mut self) -> RunReport {
        self.enter(RunPhase::Aggregating);
        self.sink.end_all();
        let elapsed = self.started.elapsed().as_millis() as u64;
        let report = self.aggregator.to_report(&self.sink, elapsed);
        self.enter(RunPhase::Terminated);
        report
    }
}

/// Runs profiles against documents
pub struct Validator {
    config: OrchestratorConfig,
    fetcher: Arc<dyn HttpFetch>,
    registry: RuleRegistry,
    host_policy: HostPolicy,
}

impl Validator {
    /// Validator with the reqwest fetcher and the built-in rule collection
    pub fn new(config: OrchestratorConfig) -> Result<Self, DocrulesError> {
        let fetcher = ReqwestFetcher::new(
            config.request_timeout,
            config.max_redirects,
            &config.user_agent,
        )
        .map_err(|e| ResolverError::Client(e.to_string()))?;

        Ok(Validator {
            config,
            fetcher: Arc::new(fetcher),
            registry: RuleRegistry::builtin(),
            host_policy: HostPolicy::default(),
        })
    }

    /// Replace the network boundary
    pub fn with_fetcher(mut self, fetcher: Arc<dyn HttpFetch>) -> Self {
        self.fetcher = fetcher;
        self
    }

    pub fn with_registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_host_policy(mut self, host_policy: HostPolicy) -> Self {
        self.host_policy = host_policy;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Run every rule of the request's profile against its document.
    ///
    /// `sink` must be fresh; it receives findings while the run progresses
    /// and exactly one `end-all` unless the run fails fatally.
    pub async fn validate(
        &self,
        request: ValidationRequest,
        sink: Arc<Sink>,
    ) -> Result<RunReport, DocrulesError> {
        sink.claim()?;
        let ValidationRequest { source, profile } = request;
        let mut run = Run::new(&profile.name, &source, Arc::clone(&sink));

        let ids = profile.rule_ids();
        let rules = match self.registry.resolve(&ids) {
            Ok(rules) => rules,
            Err(e) => return Err(run.abort(e.into())),
        };
        run.aggregator.set_rules(ids.clone());

        let model = run.extract(&source, self.fetcher.as_ref()).await?;
        run.aggregator.set_metadata(model.clone());

        run.enter(RunPhase::Running);
        let barrier = Arc::new(CompletionBarrier::new(ids));
        let context = SharedContext {
            model: Arc::new(model),
            config: Arc::new(profile.config),
            resolver: Arc::new(LinkResolver::new(
                Arc::clone(&self.fetcher),
                self.host_policy.clone(),
                self.config.max_redirects,
            )),
        };
        for rule in rules {
            dispatch(rule, &context, &sink, &barrier);
        }

        if tokio::time::timeout(self.config.timeout, barrier.wait())
            .await
            .is_err()
        {
            let unsettled = barrier.unsettled();
            let names: Vec<String> = unsettled.iter().map(ToString::to_string).collect();
            warn!(
                timeout_ms = self.config.timeout.as_millis() as u64,
                unsettled = %names.join(", "),
                "validation run timed out"
            );
            sink.exception(
                None,
                format!(
                    "run timed out after {} ms; unsettled rules: {}",
                    self.config.timeout.as_millis(),
                    names.join(", ")
                ),
            );
            run.aggregator.mark_timed_out();
        }

        let report = run.finish();
        let summary = report.summary();
        info!(
            profile = %report.profile,
            errors = summary.errors,
            warnings = summary.warnings,
            exceptions = summary.exceptions,
            duration_ms = summary.total_duration_ms,
            "validation complete"
        );
        Ok(report)
    }

    /// Extract the document model without running any rules
    pub async fn extract_metadata(
        &self,
        source: DocumentSource,
        sink: Arc<Sink>,
    ) -> Result<RunReport, DocrulesError> {
        sink.claim()?;
        let mut run = Run::new(METADATA_PROFILE, &source, Arc::clone(&sink));

        let model = run.extract(&source, self.fetcher.as_ref()).await?;
        run.aggregator.set_metadata(model);

        let report = run.finish();
        info!(source = %report.source, "metadata extracted");
        Ok(report)
    }
}

/// Run-wide state every rule context shares
struct SharedContext {
    model: Arc<DocumentModel>,
    config: Arc<crate::profile::RunConfig>,
    resolver: Arc<LinkResolver>,
}

/// Spawn one rule; its completion is signalled once its future resolves,
/// whatever the outcome.
fn dispatch(
    rule: Arc<dyn Rule>,
    shared: &SharedContext,
    sink: &Arc<Sink>,
    barrier: &Arc<CompletionBarrier>,
) {
    let id = rule.id();
    let ctx = RuleContext {
        model: Arc::clone(&shared.model),
        config: Arc::clone(&shared.config),
        resolver: Arc::clone(&shared.resolver),
        report: Reporter::new(Arc::clone(sink), id.clone()),
    };
    let sink = Arc::clone(sink);
    let barrier = Arc::clone(barrier);

    tokio::spawn(async move {
        debug!(rule = %id, "rule dispatched");
        match AssertUnwindSafe(rule.run(&ctx)).catch_unwind().await {
            Ok(Ok(())) => {}
            Ok(Err(fault)) => {
                warn!(rule = %id, error = %fault, "rule fault");
                sink.exception(Some(id.clone()), fault.to_string());
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(rule = %id, %message, "rule panicked");
                sink.exception(Some(id.clone()), format!("rule panicked: {message}"));
            }
        }
        sink.done(id.clone());
        barrier.settle(&id);
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
