use std::sync::Arc;

use tokio::time::Instant;
use webprobe_core::dom::{ElementFixture, MemoryTree};
use webprobe_core::{ElementTree, EngineClock, ExecutionStatus, TimingConfig};
use webprobe_interaction::{InteractionStep, Sequence, SequenceRunner, StepExecutor};

fn page() -> Arc<MemoryTree> {
    let tree = Arc::new(MemoryTree::new());
    tree.insert(None, ElementFixture::new("input").attr("id", "name"));
    tree.insert(None, ElementFixture::new("button").attr("id", "save").text("Save"));
    tree
}

fn executor(tree: Arc<MemoryTree>) -> StepExecutor {
    StepExecutor::new(tree, TimingConfig::default(), EngineClock::new())
}

#[tokio::test(start_paused = true)]
async fn test_failing_step_stops_sequence_when_requested() {
    let tree = page();
    let executor = executor(tree.clone());
    let sequence = Sequence::new(
        "save profile",
        vec![InteractionStep::click("#missing"), InteractionStep::input("#name", "Ada")],
    )
    .stop_on_failure(true);

    let result = SequenceRunner::new(&executor, true).run(&sequence).await;

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].status, ExecutionStatus::Failed);
    assert_eq!(result.errors.len(), 1);
    let name = tree.resolve("#name").await.unwrap().unwrap();
    assert_eq!(tree.value_of(name).as_deref(), Some(""));
}

#[tokio::test(start_paused = true)]
async fn test_failing_step_continues_when_not_stopping() {
    let tree = page();
    let executor = executor(tree.clone());
    let sequence = Sequence::new(
        "save profile",
        vec![InteractionStep::click("#missing"), InteractionStep::input("#name", "Ada")],
    )
    .stop_on_failure(false);

    let result = SequenceRunner::new(&executor, true).run(&sequence).await;

    assert_eq!(result.status, ExecutionStatus::Completed);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.steps[0].status, ExecutionStatus::Failed);
    assert_eq!(result.steps[1].status, ExecutionStatus::Completed);
    let name = tree.resolve("#name").await.unwrap().unwrap();
    assert_eq!(tree.value_of(name).as_deref(), Some("Ada"));
}

#[tokio::test(start_paused = true)]
async fn test_engine_default_applies_when_sequence_is_silent() {
    let executor = executor(page());
    let sequence = Sequence::new(
        "defaults",
        vec![InteractionStep::click("#missing"), InteractionStep::wait(10)],
    );

    let lenient = SequenceRunner::new(&executor, false).run(&sequence).await;
    assert_eq!(lenient.steps.len(), 2);

    let strict = SequenceRunner::new(&executor, true).run(&sequence).await;
    assert_eq!(strict.steps.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_element_times_out_within_one_poll() {
    let executor = executor(page());
    let sequence = Sequence::new(
        "toast",
        vec![InteractionStep::wait_for_element(".toast", Some(500))],
    );

    let started = Instant::now();
    let result = SequenceRunner::new(&executor, true).run(&sequence).await;
    let elapsed = started.elapsed().as_millis() as u64;

    assert!(elapsed >= 500, "failed after {elapsed}ms");
    assert!(elapsed <= 600, "failed after {elapsed}ms");
    let error = result.steps[0].error.as_ref().unwrap();
    assert_eq!(error.kind, "element_not_found");
    assert_eq!(error.message, "Element not found within 500ms: .toast");
}

#[tokio::test(start_paused = true)]
async fn test_wait_for_element_returns_once_visible() {
    let tree = page();
    let toast = tree.insert(None, ElementFixture::new("div").attr("class", "toast").hidden());
    let executor = executor(tree.clone());

    let reveal = {
        let tree = tree.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
            tree.set_visible(toast, true);
        })
    };

    let started = Instant::now();
    let result = executor
        .execute(&InteractionStep::wait_for_element(".toast", Some(1000)), 0)
        .await;
    reveal.await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Completed);
    let elapsed = started.elapsed().as_millis() as u64;
    assert!((250..=350).contains(&elapsed), "returned after {elapsed}ms");
}

#[tokio::test(start_paused = true)]
async fn test_timings_are_consistent() {
    let executor = executor(page());
    let sequence = Sequence::new(
        "mixed",
        vec![
            InteractionStep::input("#name", "Grace").wait_after(30),
            InteractionStep::click("#save"),
            InteractionStep::click("#nowhere"),
            InteractionStep::wait(0),
        ],
    )
    .stop_on_failure(false);

    let result = SequenceRunner::new(&executor, true).run(&sequence).await;

    assert_eq!(result.timing.duration_ms, result.timing.end_ms - result.timing.start_ms);
    for step in &result.steps {
        assert_eq!(step.timing.duration_ms, step.timing.end_ms - step.timing.start_ms);
        assert!(step.status.is_terminal());
    }
    for pair in result.steps.windows(2) {
        assert!(pair[1].timing.start_ms >= pair[0].timing.end_ms);
    }
}
