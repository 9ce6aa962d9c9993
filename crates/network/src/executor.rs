//! Request executors and their instrumented wrappers. Instrumentation is
//! composed around an executor; the wrapped executor's behaviour is
//! unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::recorder::{CallKind, CallOutcome, InFlightCall, NetworkCallRecorder};

/// Error recorded for a call abandoned before it settled.
pub const CANCELLED: &str = "cancelled";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: "POST".to_string(),
            url: url.into(),
            body: Some(body.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Future-returning request executor.
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse>;
}

pub type Settled = Box<dyn FnOnce(anyhow::Result<HttpResponse>) + Send>;

/// Executor that reports completion through a callback.
pub trait CallbackExecutor: Send + Sync {
    fn send(&self, request: HttpRequest, on_settled: Settled);
}

/// Wrap a future-returning executor so every call is recorded.
pub fn instrument<E: RequestExecutor>(inner: E, recorder: Arc<NetworkCallRecorder>) -> Instrumented<E> {
    Instrumented { inner, recorder }
}

/// Wrap a callback executor so every call is recorded before the caller's
/// callback runs.
pub fn instrument_callback<E: CallbackExecutor>(
    inner: E,
    recorder: Arc<NetworkCallRecorder>,
) -> InstrumentedCallback<E> {
    InstrumentedCallback { inner, recorder }
}

pub struct Instrumented<E> {
    inner: E,
    recorder: Arc<NetworkCallRecorder>,
}

impl<E> Instrumented<E> {
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: RequestExecutor> RequestExecutor for Instrumented<E> {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let pending = PendingCall::begin(&self.recorder, &request, CallKind::Simple);
        let result = self.inner.execute(request).await;
        pending.settle(&result);
        result
    }
}

pub struct InstrumentedCallback<E> {
    inner: E,
    recorder: Arc<NetworkCallRecorder>,
}

impl<E: CallbackExecutor> CallbackExecutor for InstrumentedCallback<E> {
    fn send(&self, request: HttpRequest, on_settled: Settled) {
        let pending = PendingCall::begin(&self.recorder, &request, CallKind::CallbackBased);
        self.inner.send(
            request,
            Box::new(move |result| {
                pending.settle(&result);
                on_settled(result);
            }),
        );
    }
}

/// A started call that is recorded exactly once. Dropping it before it
/// settles (the caller's future was dropped, or the callback was discarded
/// unused) records the call as cancelled.
struct PendingCall {
    recorder: Arc<NetworkCallRecorder>,
    call: Option<InFlightCall>,
}

impl PendingCall {
    fn begin(recorder: &Arc<NetworkCallRecorder>, request: &HttpRequest, kind: CallKind) -> Self {
        Self {
            recorder: recorder.clone(),
            call: Some(recorder.begin(&request.method, &request.url, kind)),
        }
    }

    fn settle(mut self, result: &anyhow::Result<HttpResponse>) {
        let outcome = match result {
            Ok(response) => CallOutcome::Response {
                status: response.status,
            },
            Err(err) => CallOutcome::Error(format!("{err:#}")),
        };
        if let Some(call) = self.call.take() {
            self.recorder.finish(call, outcome);
        }
    }
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if let Some(call) = self.call.take() {
            self.recorder.finish(call, CallOutcome::Error(CANCELLED.to_string()));
        }
    }
}

/// `reqwest`-backed executor.
#[derive(Debug, Clone, Default)]
pub struct ReqwestExecutor {
    client: reqwest::Client,
}

impl ReqwestExecutor {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RequestExecutor for ReqwestExecutor {
    async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())?;
        let mut builder = self.client.request(method, &request.url);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;
    use webprobe_core::EngineClock;

    use super::*;

    struct Scripted;

    #[async_trait]
    impl RequestExecutor for Scripted {
        async fn execute(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
            tokio::time::sleep(Duration::from_millis(30)).await;
            if request.url.ends_with("/down") {
                anyhow::bail!("connection refused");
            }
            Ok(HttpResponse {
                status: 201,
                body: "created".into(),
            })
        }
    }

    struct Slow(u64);

    #[async_trait]
    impl RequestExecutor for Slow {
        async fn execute(&self, _request: HttpRequest) -> anyhow::Result<HttpResponse> {
            tokio::time::sleep(Duration::from_millis(self.0)).await;
            Ok(HttpResponse {
                status: 200,
                body: String::new(),
            })
        }
    }

    /// Settles on a spawned task after a delay.
    struct Deferred;

    /// Drops the callback without ever calling it.
    struct Discards;

    impl CallbackExecutor for Discards {
        fn send(&self, _request: HttpRequest, _on_settled: Settled) {}
    }

    impl CallbackExecutor for Deferred {
        fn send(&self, _request: HttpRequest, on_settled: Settled) {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(40)).await;
                on_settled(Ok(HttpResponse {
                    status: 500,
                    body: String::new(),
                }));
            });
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_instrumented_passes_results_through() {
        let recorder = Arc::new(NetworkCallRecorder::new(EngineClock::new()));
        let executor = instrument(Scripted, recorder.clone());

        let response = executor
            .execute(HttpRequest::post("https://api.test/items", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status, 201);

        let err = executor
            .execute(HttpRequest::get("https://api.test/down"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");

        let calls = recorder.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].kind, CallKind::Simple);
        assert!(calls[0].success);
        assert_eq!(calls[1].error.as_deref(), Some("connection refused"));
        assert_eq!(calls[1].duration_ms, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_callback_records_before_caller_sees_result() {
        let recorder = Arc::new(NetworkCallRecorder::new(EngineClock::new()));
        let executor = instrument_callback(Deferred, recorder.clone());

        let (tx, rx) = oneshot::channel();
        let seen_by_caller = recorder.clone();
        executor.send(
            HttpRequest::get("https://api.test/report"),
            Box::new(move |result| {
                let recorded = seen_by_caller.calls().len();
                let _ = tx.send((result.map(|r| r.status).ok(), recorded));
            }),
        );

        let (status, recorded) = rx.await.unwrap();
        assert_eq!(status, Some(500));
        assert_eq!(recorded, 1);

        let call = &recorder.calls()[0];
        assert_eq!(call.kind, CallKind::CallbackBased);
        assert!(!call.success);
        assert_eq!(call.duration_ms, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_call_is_recorded_as_cancelled() {
        let recorder = Arc::new(NetworkCallRecorder::new(EngineClock::new()));
        let executor = instrument(Slow(5_000), recorder.clone());

        let timed_out = tokio::time::timeout(
            Duration::from_millis(200),
            executor.execute(HttpRequest::get("https://api.test/slow")),
        )
        .await;
        assert!(timed_out.is_err());

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].success);
        assert_eq!(calls[0].status_code, None);
        assert_eq!(calls[0].error.as_deref(), Some(CANCELLED));
        assert_eq!(calls[0].duration_ms, 200);

        let discarded = instrument_callback(Discards, recorder.clone());
        discarded.send(HttpRequest::get("https://api.test/void"), Box::new(|_| {}));
        let calls = recorder.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].kind, CallKind::CallbackBased);
        assert_eq!(calls[1].error.as_deref(), Some(CANCELLED));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_calls_record_in_settlement_order() {
        let recorder = Arc::new(NetworkCallRecorder::new(EngineClock::new()));
        let simple = instrument(Slow(100), recorder.clone());
        let callback = instrument_callback(Deferred, recorder.clone());

        let (tx, rx) = oneshot::channel();
        let (response, settled) = tokio::join!(
            simple.execute(HttpRequest::get("https://api.test/slow")),
            async {
                callback.send(
                    HttpRequest::post("https://api.test/fast", "{}"),
                    Box::new(move |result| {
                        let _ = tx.send(result.map(|r| r.status).ok());
                    }),
                );
                rx.await.unwrap()
            }
        );
        assert_eq!(response.unwrap().status, 200);
        assert_eq!(settled, Some(500));

        let calls = recorder.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].url, "https://api.test/fast");
        assert_eq!(calls[0].method, "POST");
        assert_eq!(calls[0].kind, CallKind::CallbackBased);
        assert_eq!(calls[0].duration_ms, 40);
        assert_eq!(calls[1].url, "https://api.test/slow");
        assert_eq!(calls[1].kind, CallKind::Simple);
        assert_eq!(calls[1].duration_ms, 100);
        assert!(calls[1].success);
        assert_eq!(calls[0].start_ms, calls[1].start_ms);
    }
}
