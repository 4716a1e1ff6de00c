//! The pipeline executor: drives each item through its rule sequence,
//! enforcing per-rule conditions, timeouts and outcome classification.
//!
//! Grounded on `core/rulemanager.py::sequence`. The original arms a
//! `SIGALRM` around `rule.apply()` (conditions *and* action together) and
//! disarms it in a `finally`; Rust has no portable alarm signal and cannot
//! interrupt a running thread, so the deadline is enforced by racing a
//! worker thread against a channel receive with a timeout (§9 design
//! note) — the worker is abandoned, not killed, if it overruns, and that
//! is logged.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use sds_catalog::LoadedRule;
use sds_collab::Collaborators;
use sds_descriptor::Descriptor;
use sds_rules::RuleOutcome;

/// RAII guard marking the span during which a rule's deadline is "armed".
/// Disarming happens on every exit path of the guarded scope, including a
/// panic unwinding through it — there is no `finally` in Rust, so the
/// guarantee comes from `Drop` instead.
struct DeadlineGuard {
    rule_name: String,
    armed_at: Instant,
}

impl DeadlineGuard {
    fn arm(rule_name: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            armed_at: Instant::now(),
        }
    }
}

impl Drop for DeadlineGuard {
    fn drop(&mut self) {
        tracing::trace!(
            rule = %self.rule_name,
            elapsed_ms = self.armed_at.elapsed().as_millis() as u64,
            "rule deadline disarmed"
        );
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "rule panicked with a non-string payload".to_string()
    }
}

/// Evaluate `rule`'s conditions in order (first `false` short-circuits)
/// and, if all pass, invoke its action. Runs inside the timeout worker
/// thread, wrapped in `catch_unwind` so a panicking rule is reported as
/// `RuleOutcome::Error` rather than tearing down the process.
fn evaluate_and_invoke(rule: &LoadedRule, descriptor: &Descriptor, collab: &Collaborators) -> RuleOutcome {
    for condition in &rule.conditions {
        match condition.evaluate(descriptor, collab) {
            Ok(true) => continue,
            Ok(false) => return RuleOutcome::ConditionFailure(condition.display_name()),
            Err(err) => return RuleOutcome::Error(err.to_string()),
        }
    }
    rule.action.invoke(descriptor, collab)
}

fn run_with_timeout(rule: LoadedRule, descriptor: Descriptor, collab: Arc<Collaborators>, timeout: Duration) -> RuleOutcome {
    let (tx, rx) = mpsc::channel();
    let rule_name = rule.name.clone();

    thread::spawn(move || {
        let _guard = DeadlineGuard::arm(&rule_name);
        let result = panic::catch_unwind(AssertUnwindSafe(|| evaluate_and_invoke(&rule, &descriptor, &collab)));
        let outcome = result.unwrap_or_else(|payload| RuleOutcome::Error(panic_message(payload)));
        let _ = tx.send(outcome);
    });

    match rx.recv_timeout(timeout) {
        Ok(outcome) => outcome,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::warn!(
                "rule exceeded its {:?} deadline; the worker thread cannot be cancelled and is abandoned",
                timeout
            );
            RuleOutcome::Timeout
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            RuleOutcome::Error("rule worker thread terminated without producing a result".to_string())
        }
    }
}

/// Tallies outcome kinds across a run, for the end-of-run summary.
#[derive(Debug, Default, Clone)]
pub struct OutcomeSummary {
    pub success: u64,
    pub pipeline_exit_ok: u64,
    pub pipeline_exit_error: u64,
    pub timeout: u64,
    pub condition_failure: u64,
    pub error: u64,
}

impl OutcomeSummary {
    fn record(&mut self, outcome: &RuleOutcome) {
        match outcome {
            RuleOutcome::Success => self.success += 1,
            RuleOutcome::PipelineExit { success: true, .. } => self.pipeline_exit_ok += 1,
            RuleOutcome::PipelineExit { success: false, .. } => self.pipeline_exit_error += 1,
            RuleOutcome::Timeout => self.timeout += 1,
            RuleOutcome::ConditionFailure(_) => self.condition_failure += 1,
            RuleOutcome::Error(_) => self.error += 1,
        }
    }
}

/// Drives `items` through `rules`, in caller order; within one item, rules
/// run strictly sequentially and a `PipelineExit` outcome stops the
/// remaining rules for that item only. Never aborts the run on a per-item
/// failure.
pub fn run(items: &[Descriptor], rules: &[LoadedRule], collab: Arc<Collaborators>) -> OutcomeSummary {
    let mut summary = OutcomeSummary::default();
    let total = items.len();

    for (index, item) in items.iter().enumerate() {
        tracing::info!(item = %item.filename(), position = index + 1, total, "Item {} of {}", index + 1, total);

        for rule in rules {
            let timeout = Duration::from_secs(rule.timeout_secs);
            let outcome = run_with_timeout(rule.clone(), item.clone(), Arc::clone(&collab), timeout);
            summary.record(&outcome);

            match &outcome {
                RuleOutcome::Success => {
                    tracing::info!(item = %item.filename(), rule = %rule.name, outcome = outcome.kind(), "rule succeeded");
                }
                RuleOutcome::PipelineExit { success, message } => {
                    tracing::info!(
                        item = %item.filename(),
                        rule = %rule.name,
                        outcome = outcome.kind(),
                        success,
                        message = message.as_deref().unwrap_or(""),
                        "pipeline exited for this item"
                    );
                    break;
                }
                RuleOutcome::Timeout => {
                    tracing::warn!(item = %item.filename(), rule = %rule.name, outcome = outcome.kind(), "rule timed out");
                }
                RuleOutcome::ConditionFailure(name) => {
                    tracing::info!(item = %item.filename(), rule = %rule.name, outcome = outcome.kind(), condition = %name, "rule skipped");
                }
                RuleOutcome::Error(detail) => {
                    tracing::error!(item = %item.filename(), rule = %rule.name, outcome = outcome.kind(), detail, "rule failed");
                }
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use sds_collab::fakes::*;
    use sds_collab::Collaborators;
    use sds_rules::{BoundAction, BoundCondition, Options};
    use std::fs;

    fn collaborators() -> Arc<Collaborators> {
        Arc::new(Collaborators {
            object_store: Box::new(FakeObjectStore::default()),
            grid_archive: Box::new(FakeGridArchive::default()),
            catalog_store: Box::new(FakeCatalogStore::default()),
            waveform_analysis: Box::new(FakeWaveformAnalysis::default()),
            inventory_service: Box::new(FakeInventoryService::default()),
            deletion_ledger: Box::new(FakeDeletionLedger::default()),
        })
    }

    fn rule(name: &str, action: &str, conditions: Vec<BoundCondition>, options: serde_json::Value, timeout_secs: u64) -> LoadedRule {
        LoadedRule {
            name: name.to_string(),
            action: BoundAction::bind(action, Options::new(options.as_object().unwrap().clone())).unwrap(),
            conditions,
            timeout_secs,
        }
    }

    #[test]
    fn successful_rule_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", dir.path()).unwrap();
        fs::create_dir_all(descriptor.filepath().parent().unwrap()).unwrap();
        fs::write(descriptor.filepath(), b"waveform").unwrap();

        let rules = vec![rule("ingest", "ingest_object_store", vec![], serde_json::json!({}), 5)];
        let summary = run(&[descriptor], &rules, collaborators());
        assert_eq!(summary.success, 1);
    }

    #[test]
    fn failing_condition_skips_the_rule() {
        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", "/tmp/SDS").unwrap();
        let condition = BoundCondition::bind(
            "quality_in",
            Options::new(serde_json::json!({"qualities": ["Q"]}).as_object().unwrap().clone()),
        )
        .unwrap();
        let rules = vec![rule("assign", "assign_pid", vec![condition], serde_json::json!({}), 5)];
        let summary = run(&[descriptor], &rules, collaborators());
        assert_eq!(summary.condition_failure, 1);
        assert_eq!(summary.success, 0);
    }

    #[test]
    fn negated_condition_allows_the_rule_to_run() {
        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", "/tmp/SDS").unwrap();
        let condition = BoundCondition::bind(
            "!quality_in",
            Options::new(serde_json::json!({"qualities": ["Q"]}).as_object().unwrap().clone()),
        )
        .unwrap();
        let rules = vec![rule("assign", "assign_pid", vec![condition], serde_json::json!({}), 5)];
        let summary = run(&[descriptor], &rules, collaborators());
        assert_eq!(summary.success, 1);
    }

    #[test]
    fn add_pid_to_catalog_without_pid_is_an_error_outcome() {
        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", "/tmp/SDS").unwrap();
        let rules = vec![rule("add_pid", "add_pid_to_catalog", vec![], serde_json::json!({}), 5)];
        let summary = run(&[descriptor], &rules, collaborators());
        assert_eq!(summary.error, 1);
    }

    #[test]
    fn condition_skip_does_not_stop_later_rules() {
        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", "/tmp/SDS").unwrap();
        let failing_condition = BoundCondition::bind(
            "quality_in",
            Options::new(serde_json::json!({"qualities": ["Q"]}).as_object().unwrap().clone()),
        )
        .unwrap();
        let rules = vec![
            rule("skip_me", "assign_pid", vec![failing_condition], serde_json::json!({}), 5),
            rule("run_me", "assign_pid", vec![], serde_json::json!({}), 5),
        ];
        let summary = run(&[descriptor], &rules, collaborators());
        assert_eq!(summary.condition_failure, 1);
        assert_eq!(summary.success, 1);
    }

    /// S7: a rule configured `exit_on_failure=true` converts a collaborator
    /// error into `PipelineExit(error)`, and the rule loop stops for this
    /// item — the following rule must NOT run.
    #[test]
    fn pipeline_exit_error_stops_remaining_rules_for_the_item() {
        struct FailingObjectStore;
        impl sds_collab::ObjectStore for FailingObjectStore {
            fn exists(&self, _descriptor: &Descriptor) -> Result<bool, sds_collab::CollabError> {
                Ok(false)
            }
            fn checksum(&self, _descriptor: &Descriptor) -> Result<Option<String>, sds_collab::CollabError> {
                Ok(None)
            }
            fn put(&self, _descriptor: &Descriptor, _checksum: &str) -> Result<(), sds_collab::CollabError> {
                Err(sds_collab::CollabError::ObjectStore("credential rejected".to_string()))
            }
            fn delete(&self, _descriptor: &Descriptor) -> Result<(), sds_collab::CollabError> {
                unimplemented!()
            }
            fn get(&self, _descriptor: &Descriptor, _destination: &std::path::Path) -> Result<(), sds_collab::CollabError> {
                unimplemented!()
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", dir.path()).unwrap();
        fs::create_dir_all(descriptor.filepath().parent().unwrap()).unwrap();
        fs::write(descriptor.filepath(), b"waveform").unwrap();

        let collab = Arc::new(Collaborators {
            object_store: Box::new(FailingObjectStore),
            grid_archive: Box::new(FakeGridArchive::default()),
            catalog_store: Box::new(FakeCatalogStore::default()),
            waveform_analysis: Box::new(FakeWaveformAnalysis::default()),
            inventory_service: Box::new(FakeInventoryService::default()),
            deletion_ledger: Box::new(FakeDeletionLedger::default()),
        });

        let rules = vec![
            rule(
                "ingest",
                "ingest_object_store",
                vec![],
                serde_json::json!({"exit_on_failure": true}),
                5,
            ),
            rule("assign", "assign_pid", vec![], serde_json::json!({}), 5),
        ];
        let summary = run(&[descriptor], &rules, collab);
        assert_eq!(summary.pipeline_exit_error, 1);
        assert_eq!(summary.success, 0);
    }

    #[test]
    fn slow_rule_times_out() {
        // `grid_exists` blocks on a `Mutex` held for longer than the
        // deadline to exercise the timeout path without a dedicated
        // "sleep" rule action in the catalog.
        struct BlockingGridArchive;
        impl sds_collab::GridArchive for BlockingGridArchive {
            fn exists(&self, _descriptor: &Descriptor) -> Result<bool, sds_collab::CollabError> {
                std::thread::sleep(Duration::from_millis(200));
                Ok(true)
            }
            fn get_data_object(&self, _descriptor: &Descriptor) -> Result<Vec<u8>, sds_collab::CollabError> {
                unimplemented!()
            }
            fn put(&self, _descriptor: &Descriptor, _bytes: &[u8]) -> Result<(), sds_collab::CollabError> {
                unimplemented!()
            }
            fn delete(&self, _descriptor: &Descriptor) -> Result<(), sds_collab::CollabError> {
                unimplemented!()
            }
            fn assign_pid(&self, _descriptor: &Descriptor) -> Result<String, sds_collab::CollabError> {
                unimplemented!()
            }
            fn get_pid(&self, _descriptor: &Descriptor) -> Result<Option<String>, sds_collab::CollabError> {
                Ok(None)
            }
            fn replicate(&self, _descriptor: &Descriptor, _remote_root: &str) -> Result<(), sds_collab::CollabError> {
                unimplemented!()
            }
            fn federated_exists(&self, _descriptor: &Descriptor, _remote_root: &str) -> Result<bool, sds_collab::CollabError> {
                unimplemented!()
            }
            fn federated_get_pid(&self, _descriptor: &Descriptor, _remote_root: &str) -> Result<Option<String>, sds_collab::CollabError> {
                unimplemented!()
            }
        }

        let descriptor = Descriptor::new("NL.HGN.02.BHZ.D.1970.001", "/tmp/SDS").unwrap();
        let condition = BoundCondition::bind("grid_exists", Options::empty()).unwrap();
        let rules = vec![rule("slow", "assign_pid", vec![condition], serde_json::json!({}), 0)];
        let collab = Arc::new(Collaborators {
            object_store: Box::new(FakeObjectStore::default()),
            grid_archive: Box::new(BlockingGridArchive),
            catalog_store: Box::new(FakeCatalogStore::default()),
            waveform_analysis: Box::new(FakeWaveformAnalysis::default()),
            inventory_service: Box::new(FakeInventoryService::default()),
            deletion_ledger: Box::new(FakeDeletionLedger::default()),
        });
        let summary = run(&[descriptor], &rules, collab);
        assert_eq!(summary.timeout, 1);
    }
}
