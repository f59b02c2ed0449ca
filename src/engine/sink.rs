//! Event Sink.
//!
//! The single aggregation point of one validation run. Rules report
//! findings through it, the orchestrator reports completions and the
//! terminal `end-all` signal, and callers subscribe to any of those.
//!
//! Every `report` call is serialized by one mutex, so observers see events
//! in exactly the order they were accepted. Observers run while that lock
//! is held and must not report back into the same sink.
//!
//! # Graceful Degradation
//!
//! Signals that break the per-rule protocol are never applied and never
//! crash the run:
//! - a finding from a rule that already completed
//! - a second completion for the same rule
//! - anything at all after `end-all`
//!
//! Each one is kept in [`Sink::discarded`] and surfaced as an `exception`
//! event naming the offending rule.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::{DocrulesError, Finding, RuleId, Severity};

/// Kind of a sink event, used to route subscriptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Error,
    Warning,
    Done,
    Exception,
    EndAll,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Error => "error",
            EventKind::Warning => "warning",
            EventKind::Done => "done",
            EventKind::Exception => "exception",
            EventKind::EndAll => "end-all",
        };
        write!(f, "{}", name)
    }
}

/// An exception signal: a rule fault, a protocol violation or a fatal run error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<RuleId>,
    pub message: String,
}

impl fmt::Display for ExceptionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Some(rule) => write!(f, "[{}] {}", rule, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// One signal delivered through the sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Error(Finding),
    Warning(Finding),
    Done(RuleId),
    Exception(ExceptionReport),
    EndAll,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Error(_) => EventKind::Error,
            Event::Warning(_) => EventKind::Warning,
            Event::Done(_) => EventKind::Done,
            Event::Exception(_) => EventKind::Exception,
            Event::EndAll => EventKind::EndAll,
        }
    }

    /// Build the finding event matching the finding's severity
    pub fn finding(finding: Finding) -> Self {
        match finding.severity {
            Severity::Error => Event::Error(finding),
            Severity::Warning => Event::Warning(finding),
        }
    }

    fn rule(&self) -> Option<&RuleId> {
        match self {
            Event::Error(f) | Event::Warning(f) => Some(&f.rule),
            Event::Done(rule) => Some(rule),
            Event::Exception(report) => report.rule.as_ref(),
            Event::EndAll => None,
        }
    }
}

type Observer = Box<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct SinkState {
    observers: Vec<(EventKind, Observer)>,
    accepted: Vec<Event>,
    settled: HashSet<RuleId>,
    terminated: bool,
    discarded: Vec<Event>,
}

impl SinkState {
    fn deliver(&mut self, event: Event) {
        let kind = event.kind();
        for (wanted, observer) in &self.observers {
            if *wanted == kind {
                observer(&event);
            }
        }
        self.accepted.push(event);
    }

    /// Why `event` must be rejected, if it must
    fn violation(&self, event: &Event) -> Option<String> {
        if self.terminated {
            return Some(format!("{} signal after end-all", event.kind()));
        }
        match event {
            Event::Error(f) | Event::Warning(f) if self.settled.contains(&f.rule) => Some(format!(
                "finding '{}' reported after the rule completed",
                f.id()
            )),
            Event::Done(rule) if self.settled.contains(rule) => {
                Some("rule signalled completion more than once".to_string())
            }
            _ => None,
        }
    }
}

/// Findings collector and event bus for exactly one validation run
#[derive(Default)]
pub struct Sink {
    state: Mutex<SinkState>,
    claimed: AtomicBool,
}

impl Sink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Bind the sink to a run; a second claim fails.
    pub fn claim(&self) -> Result<(), DocrulesError> {
        if self.claimed.swap(true, Ordering::SeqCst) {
            return Err(DocrulesError::SinkReused);
        }
        Ok(())
    }

    /// Register an observer for one kind of event.
    ///
    /// Observers are called in report order while the sink is locked.
    pub fn subscribe<F>(&self, kind: EventKind, observer: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.lock().observers.push((kind, Box::new(observer)));
    }

    /// Report an event. Returns `false` when the event was discarded.
    pub fn report(&self, event: Event) -> bool {
        let mut state = self.lock();

        if let Some(reason) = state.violation(&event) {
            tracing::warn!(event = %event.kind(), %reason, "discarding signal");
            let rule = event.rule().cloned();
            state.discarded.push(event);
            state.deliver(Event::Exception(ExceptionReport {
                rule,
                message: reason,
            }));
            return false;
        }

        match &event {
            Event::Done(rule) => {
                state.settled.insert(rule.clone());
            }
            Event::EndAll => state.terminated = true,
            _ => {}
        }
        state.deliver(event);
        true
    }

    pub fn error(&self, finding: Finding) -> bool {
        self.report(Event::Error(finding))
    }

    pub fn warning(&self, finding: Finding) -> bool {
        self.report(Event::Warning(finding))
    }

    pub fn done(&self, rule: RuleId) -> bool {
        self.report(Event::Done(rule))
    }

    pub fn exception(&self, rule: Option<RuleId>, message: impl Into<String>) -> bool {
        self.report(Event::Exception(ExceptionReport {
            rule,
            message: message.into(),
        }))
    }

    pub fn end_all(&self) -> bool {
        self.report(Event::EndAll)
    }

    /// Every accepted event, in delivery order
    pub fn events(&self) -> Vec<Event> {
        self.lock().accepted.clone()
    }

    /// Accepted findings of both severities, in delivery order
    pub fn findings(&self) -> Vec<Finding> {
        self.lock()
            .accepted
            .iter()
            .filter_map(|event| match event {
                Event::Error(f) | Event::Warning(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<Finding> {
        self.findings_of(Severity::Error)
    }

    pub fn warnings(&self) -> Vec<Finding> {
        self.findings_of(Severity::Warning)
    }

    fn findings_of(&self, severity: Severity) -> Vec<Finding> {
        self.findings()
            .into_iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    pub fn exceptions(&self) -> Vec<ExceptionReport> {
        self.lock()
            .accepted
            .iter()
            .filter_map(|event| match event {
                Event::Exception(report) => Some(report.clone()),
                _ => None,
            })
            .collect()
    }

    /// Rules whose completion has been accepted
    pub fn settled_rules(&self) -> HashSet<RuleId> {
        self.lock().settled.clone()
    }

    /// Number of accepted `end-all` signals (0 or 1)
    pub fn end_all_count(&self) -> usize {
        self.lock()
            .accepted
            .iter()
            .filter(|event| matches!(event, Event::EndAll))
            .count()
    }

    pub fn is_terminated(&self) -> bool {
        self.lock().terminated
    }

    /// Signals rejected for breaking the run protocol
    pub fn discarded(&self) -> Vec<Event> {
        self.lock().discarded.clone()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Sink")
            .field("accepted", &state.accepted.len())
            .field("observers", &state.observers.len())
            .field("terminated", &state.terminated)
            .finish()
    }
}
