//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use patisserie::providers::CompletionProvider;
use patisserie::telemetry;
use patisserie::{
    CompletionOptions, CompletionResponse, ExampleTable, GroqClient, IntentClassifier, Message,
    PatisserieError, Result, StaticFewShotClassifier,
};

// ============================================================================
// Mock providers
// ============================================================================

struct LabelProvider;

#[async_trait]
impl CompletionProvider for LabelProvider {
    fn name(&self) -> &str {
        "label"
    }

    fn model(&self) -> &str {
        "label-model"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            content: "check_ingredients".to_string(),
            model: None,
            usage: None,
        })
    }
}

struct FailingProvider;

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn model(&self) -> &str {
        "failing-model"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        Err(PatisserieError::AuthenticationFailed)
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any counter for `name` carries the label pair.
fn has_counter_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> bool {
    snapshot.iter().any(|(key, _, _, _)| {
        key.kind() == MetricKind::Counter
            && key.key().name() == name
            && key
                .key()
                .labels()
                .any(|l| l.key() == label && l.value() == value)
    })
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn few_shot(provider: Arc<dyn CompletionProvider>) -> StaticFewShotClassifier {
    StaticFewShotClassifier::new(provider, &ExampleTable::new(["text", "intent"]))
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn completion_request_records_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": "greeting"}}]
                    })))
                    .mount(&server)
                    .await;

                let client = GroqClient::with_base_url(Some("k".into()), server.uri());
                client
                    .complete(&[Message::user("merhaba")], &CompletionOptions::new())
                    .await
            })
        })
    });
    assert!(result.is_ok());

    let snapshot = snapshotter.snapshot().into_vec();

    let count = counter_total(&snapshot, telemetry::COMPLETION_REQUESTS_TOTAL);
    assert_eq!(count, 1, "expected 1 request counter");
    assert!(has_counter_label(
        &snapshot,
        telemetry::COMPLETION_REQUESTS_TOTAL,
        "status",
        "ok"
    ));
    assert!(
        has_histogram(&snapshot, telemetry::COMPLETION_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn failed_completion_records_failure_kind() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    let _result = metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let client = GroqClient::with_base_url(None, "http://127.0.0.1:9");
                client
                    .complete(&[Message::user("merhaba")], &CompletionOptions::new())
                    .await
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::COMPLETION_REQUESTS_TOTAL), 1);
    assert!(has_counter_label(
        &snapshot,
        telemetry::COMPLETION_REQUESTS_TOTAL,
        "status",
        "missing_credential"
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn predictions_are_counted_by_label() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let ok = few_shot(Arc::new(LabelProvider));
                ok.predict_intent("içinde fındık var mı").await;
                ok.predict_intent("glutensiz mi").await;

                let failing = few_shot(Arc::new(FailingProvider));
                failing.predict_intent("merhaba").await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::PREDICTIONS_TOTAL), 3);
    assert!(has_counter_label(
        &snapshot,
        telemetry::PREDICTIONS_TOTAL,
        "label",
        "check_ingredients"
    ));
    assert!(has_counter_label(
        &snapshot,
        telemetry::PREDICTIONS_TOTAL,
        "label",
        "error"
    ));
    assert!(has_counter_label(
        &snapshot,
        telemetry::PREDICTIONS_TOTAL,
        "classifier",
        "static-few-shot"
    ));
}

#[test]
fn no_recorder_is_a_noop() {
    // Metric macros without an installed recorder must not panic
    metrics::counter!(telemetry::PREDICTIONS_TOTAL, "label" => "greeting").increment(1);
}
