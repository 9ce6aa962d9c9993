//! webprobe engine — the public surface a UI or CLI drives.
//!
//! [`TestEngine`] owns the immutable registries (validation rules, suites),
//! the step executor bound to one element tree, and the two append-only
//! logs (run results and network calls).

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;
use webprobe_core::dom::ScreenshotCapture;
use webprobe_core::{
    ElementId, ElementTree, EngineClock, EngineConfig, EngineError, EngineResult, ExecutionStatus,
    Timing,
};
use webprobe_interaction::{
    generate_test_data, CustomAction, FormInteraction, FormInteractionResult, FormTestData,
    Sequence, SequenceResult, SequenceRunner, StepExecutor,
};
use webprobe_network::{instrument, Instrumented, NetworkCallRecorder, RequestExecutor};
use webprobe_reporting::{
    should_trigger, CiSession, PerformanceReport, ResultsLog, RunRecord,
};
use webprobe_suite::{SuiteRegistry, SuiteResult, TestSuite, TestSuiteRunner};
use webprobe_validation::{
    FieldValidator, FormValidationCoordinator, FormValidationResult, ValidationRuleSet,
};

pub struct TestEngine {
    config: EngineConfig,
    clock: EngineClock,
    coordinator: FormValidationCoordinator,
    executor: StepExecutor,
    registry: SuiteRegistry,
    results: ResultsLog,
    network: Arc<NetworkCallRecorder>,
}

impl TestEngine {
    /// Build the engine against `tree`. Registries are fixed from here on,
    /// apart from suites added through [`TestEngine::register_suite`] before
    /// the first run.
    pub fn new(config: EngineConfig, tree: Arc<dyn ElementTree>) -> EngineResult<Self> {
        let clock = EngineClock::new();
        let rules = Arc::new(ValidationRuleSet::new()?);
        let coordinator = FormValidationCoordinator::new(FieldValidator::new(rules));
        let executor = StepExecutor::new(tree, config.timing.clone(), clock);
        let registry = SuiteRegistry::with_builtins(&config.enabled_suites);

        info!(
            suites = registry.len(),
            auto_test = config.auto_test,
            stop_on_failure = config.stop_on_failure,
            "Test engine initialized"
        );

        Ok(Self {
            config,
            clock,
            coordinator,
            executor,
            registry,
            results: ResultsLog::new(),
            network: Arc::new(NetworkCallRecorder::new(clock)),
        })
    }

    pub fn with_screenshots(mut self, capture: Arc<dyn ScreenshotCapture>) -> Self {
        self.executor = self.executor.with_screenshots(capture);
        self
    }

    pub fn with_custom_action(mut self, name: impl Into<String>, action: Arc<dyn CustomAction>) -> Self {
        self.executor = self.executor.with_custom_action(name, action);
        self
    }

    pub fn register_suite(&mut self, key: impl Into<String>, suite: TestSuite) {
        self.registry.register(key, suite);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &EngineClock {
        &self.clock
    }

    pub fn tree(&self) -> &dyn ElementTree {
        self.executor.tree()
    }

    pub fn suite_names(&self) -> Vec<String> {
        self.registry.names().map(str::to_string).collect()
    }

    // ─── Validation ────────────────────────────────────────────────────

    pub async fn validate_form(&self, selector: &str) -> EngineResult<FormValidationResult> {
        self.coordinator.validate_form(self.tree(), selector).await
    }

    /// Submit hook: validates the form when auto-testing is enabled.
    pub async fn on_form_submitted(
        &self,
        form: ElementId,
    ) -> EngineResult<Option<FormValidationResult>> {
        if !self.config.auto_test {
            return Ok(None);
        }
        let result = self
            .coordinator
            .validate_form_element(self.tree(), form)
            .await?;
        if !result.is_valid {
            warn!(
                form = form.0,
                errors = result.errors.len(),
                "Submitted form failed validation"
            );
        }
        Ok(Some(result))
    }

    // ─── Runs ──────────────────────────────────────────────────────────

    pub async fn run_sequence(&self, sequence: &Sequence) -> SequenceResult {
        let result = SequenceRunner::new(&self.executor, self.config.stop_on_failure)
            .run(sequence)
            .await;
        self.results.append(result.clone());
        result
    }

    /// Parse an authored sequence descriptor and run it. Malformed
    /// descriptors (unknown step types included) fail before any step runs.
    pub async fn run_sequence_value(&self, descriptor: Value) -> EngineResult<SequenceResult> {
        let sequence = Sequence::from_value(descriptor)?;
        Ok(self.run_sequence(&sequence).await)
    }

    pub async fn run_suite(&self, name: &str, target: Option<&str>) -> EngineResult<SuiteResult> {
        let result = TestSuiteRunner::new(&self.registry, &self.executor, &self.coordinator)
            .run_suite(name, target)
            .await?;
        self.results.append(result.clone());
        Ok(result)
    }

    /// Run the fill/validate/submit flow on one form. Without `data`, values
    /// are generated from the form's fields.
    pub async fn test_form_interaction(
        &self,
        selector: &str,
        data: Option<FormTestData>,
    ) -> EngineResult<FormInteractionResult> {
        let data = match data {
            Some(data) => data,
            None => match self.tree().resolve(selector).await? {
                Some(form) => generate_test_data(self.tree(), form).await?,
                None => FormTestData::default(),
            },
        };
        let result = FormInteraction::new(&self.executor, &self.coordinator)
            .run(selector, &data)
            .await;
        self.results.append(result.clone());
        Ok(result)
    }

    /// Run every registered suite against the whole page at `url`.
    pub async fn run_ci_session(&self, url: &str) -> CiSession {
        let session_id = Uuid::new_v4();
        let start_ms = self.clock.now_ms();
        info!(%session_id, url, environment = %self.config.ci.environment, "CI session started");

        let mut status = ExecutionStatus::Completed;
        let mut suites = Vec::new();
        for name in self.suite_names() {
            match self.run_suite(&name, None).await {
                Ok(result) => suites.push(result),
                Err(e) => {
                    warn!(%session_id, suite = %name, error = %e, "Suite could not run");
                    status = ExecutionStatus::Failed;
                }
            }
        }

        let session = CiSession {
            session_id,
            url: url.to_string(),
            environment: self.config.ci.environment.clone(),
            status,
            timing: Timing::since(&self.clock, start_ms),
            suites,
        };
        info!(
            %session_id,
            status = %session.status,
            tests = session.total_tests(),
            failed = session.failed_tests(),
            duration_ms = session.timing.duration_ms,
            "CI session finished"
        );
        session
    }

    /// Whether `url` qualifies for an automatic CI run.
    pub fn should_trigger_ci(&self, url: &str) -> bool {
        should_trigger(url, &self.config.ci)
    }

    // ─── Results ───────────────────────────────────────────────────────

    pub fn results(&self) -> Vec<RunRecord> {
        self.results.snapshot()
    }

    pub fn clear_results(&self) {
        let dropped = self.results.len();
        self.results.clear();
        info!(dropped, "Results cleared");
    }

    pub fn performance_report(&self) -> PerformanceReport {
        PerformanceReport::build(
            self.clock.wall_origin(),
            self.results.snapshot(),
            self.network.stats(),
            self.network.calls(),
        )
    }

    pub fn export(&self, format: &str) -> EngineResult<String> {
        webprobe_reporting::export(&self.performance_report(), format)
    }

    /// Export in every configured format. Stops at the first unsupported one.
    pub fn export_configured(&self) -> EngineResult<Vec<(String, String)>> {
        let report = self.performance_report();
        self.config
            .report_formats
            .iter()
            .map(|format| Ok((format.clone(), webprobe_reporting::export(&report, format)?)))
            .collect::<Result<Vec<_>, EngineError>>()
    }

    // ─── Network ───────────────────────────────────────────────────────

    pub fn network_recorder(&self) -> Arc<NetworkCallRecorder> {
        self.network.clone()
    }

    /// Wrap `inner` so its calls are recorded in this engine's network log.
    pub fn instrument<E: RequestExecutor>(&self, inner: E) -> Instrumented<E> {
        instrument(inner, self.network.clone())
    }
}
