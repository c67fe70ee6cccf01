use std::future::{pending, Future};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info_span, warn, Instrument};
use uuid::Uuid;

use crate::analytics::stats::SubmissionStats;
use crate::config::Config;
use crate::error::{AppError, Result, Stage};
use crate::http::pool::create_http_client;
use crate::http::submitter::{HttpSubmitter, Submitter};
use crate::limiter::RateLimiter;
use crate::utils::time::{elapsed_ms, now_instant};

pub const DOCUMENT_CONTENT_TYPE: &str = "application/json";
pub const SIGNATURE_CONTENT_TYPE: &str = "application/plain-text";

/// Rate-limited client for the document creation endpoint.
///
/// Every submission holds one limiter permit for the whole document + signature
/// exchange and gives it back however the exchange ends.
pub struct DocumentApi<S = HttpSubmitter> {
    submitter: S,
    limiter: RateLimiter,
    stats: Arc<SubmissionStats>,
}

impl DocumentApi<HttpSubmitter> {
    pub fn new(config: &Config) -> Result<Self> {
        let client = create_http_client(
            Duration::from_millis(config.connect_timeout_ms),
            Duration::from_millis(config.request_timeout_ms),
        )?;
        let submitter = HttpSubmitter::new(client, &config.endpoint)?;
        let limiter = RateLimiter::new(config.window_unit, config.request_limit)?;

        Ok(Self::with_submitter(submitter, limiter))
    }
}

impl<S: Submitter> DocumentApi<S> {
    pub fn with_submitter(submitter: S, limiter: RateLimiter) -> Self {
        Self {
            submitter,
            limiter,
            stats: Arc::new(SubmissionStats::new()),
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn stats(&self) -> Arc<SubmissionStats> {
        self.stats.clone()
    }

    /// Waits for admission, then submits the document followed by its signature.
    pub async fn create_document(&self, document: &str, signature: &str) -> Result<()> {
        self.create_document_or_cancel(document, signature, pending::<()>())
            .await
    }

    /// Like [`create_document`](Self::create_document), but gives up while still waiting
    /// for admission once `cancel` completes. A cancelled submission makes no calls.
    pub async fn create_document_or_cancel<C: Future>(
        &self,
        document: &str,
        signature: &str,
        cancel: C,
    ) -> Result<()> {
        let request_id = Uuid::new_v4();
        let span = info_span!("create_document", %request_id);

        async move {
            let _permit = match self.limiter.acquire_or_cancel(cancel).await {
                Ok(permit) => permit,
                Err(e) => {
                    self.stats.inc_interrupted();
                    debug!("Admission cancelled: {}", e);
                    return Err(e.into());
                }
            };

            let started = now_instant();
            let result = self.submit(document, signature).await;
            self.stats.update_submission_latency(elapsed_ms(started));

            match &result {
                Ok(()) => {
                    self.stats.inc_submitted();
                    debug!("Document created");
                }
                Err(e) => {
                    self.stats.inc_failed();
                    warn!("Document submission failed: {}", e);
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn submit(&self, document: &str, signature: &str) -> Result<()> {
        self.send(Stage::Document, document, DOCUMENT_CONTENT_TYPE).await?;
        self.send(Stage::Signature, signature, SIGNATURE_CONTENT_TYPE).await
    }

    async fn send(&self, stage: Stage, body: &str, content_type: &'static str) -> Result<()> {
        let reply = self.submitter.post(body.to_owned(), content_type).await?;
        if !reply.status.is_success() {
            return Err(AppError::Rejected {
                stage,
                status: reply.status.as_u16(),
                body: reply.body,
            });
        }
        debug!("{} accepted with status {}", stage, reply.status);
        Ok(())
    }

    /// Logs the final counters and shuts the limiter down.
    pub async fn close(self) {
        self.stats.log_stats();
        self.limiter.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LimiterError;
    use crate::http::submitter::Reply;
    use async_trait::async_trait;
    use futures_util::future::join_all;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    #[derive(Debug, Clone)]
    struct Call {
        at: Instant,
        body: String,
        content_type: &'static str,
    }

    #[derive(Clone, Default)]
    struct MockSubmitter {
        replies: Arc<Mutex<VecDeque<Result<StatusCode>>>>,
        calls: Arc<Mutex<Vec<Call>>>,
        delay: Duration,
    }

    impl MockSubmitter {
        fn replying(replies: Vec<Result<StatusCode>>) -> Self {
            Self {
                replies: Arc::new(Mutex::new(replies.into())),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Submitter for MockSubmitter {
        async fn post(&self, body: String, content_type: &'static str) -> Result<Reply> {
            self.calls.lock().push(Call {
                at: Instant::now(),
                body,
                content_type,
            });
            tokio::time::sleep(self.delay).await;

            let next = self.replies.lock().pop_front();
            let status = next.unwrap_or(Ok(StatusCode::OK))?;
            Ok(Reply {
                status,
                body: format!("status {}", status.as_u16()),
            })
        }
    }

    fn api(submitter: MockSubmitter, limit: usize) -> DocumentApi<MockSubmitter> {
        let limiter = RateLimiter::with_interval(Duration::from_secs(1), limit).unwrap();
        DocumentApi::with_submitter(submitter, limiter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_document_then_signature() {
        let submitter = MockSubmitter::default();
        let api = api(submitter.clone(), 2);

        api.create_document(r#"{"doc_id":"1"}"#, "abc").await.unwrap();

        let calls = submitter.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].body, r#"{"doc_id":"1"}"#);
        assert_eq!(calls[0].content_type, DOCUMENT_CONTENT_TYPE);
        assert_eq!(calls[1].body, "abc");
        assert_eq!(calls[1].content_type, SIGNATURE_CONTENT_TYPE);

        assert_eq!(api.stats().submitted(), 1);
        assert_eq!(api.limiter().gate().available(), 2);
        api.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_document_skips_signature_and_releases() {
        let submitter = MockSubmitter::replying(vec![Ok(StatusCode::INTERNAL_SERVER_ERROR)]);
        let api = api(submitter.clone(), 1);

        let err = api.create_document("{}", "abc").await.unwrap_err();
        match err {
            AppError::Rejected { stage, status, .. } => {
                assert_eq!(stage, Stage::Document);
                assert_eq!(status, 500);
            }
            other => panic!("unexpected error: {}", other),
        }

        assert_eq!(submitter.calls().len(), 1);
        assert_eq!(api.stats().failed(), 1);
        assert_eq!(api.limiter().gate().available(), 1);
        api.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_signature_is_reported() {
        let submitter = MockSubmitter::replying(vec![
            Ok(StatusCode::OK),
            Ok(StatusCode::UNAUTHORIZED),
        ]);
        let api = api(submitter.clone(), 1);

        let err = api.create_document("{}", "abc").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Rejected {
                stage: Stage::Signature,
                status: 401,
                ..
            }
        ));
        assert_eq!(submitter.calls().len(), 2);
        assert_eq!(api.limiter().gate().available(), 1);
        api.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_passes_through_and_releases() {
        let submitter =
            MockSubmitter::replying(vec![Err(AppError::Init("connection reset".into()))]);
        let api = api(submitter.clone(), 1);

        let err = api.create_document("{}", "abc").await.unwrap_err();
        assert!(matches!(err, AppError::Init(_)));
        assert_eq!(api.limiter().gate().available(), 1);
        api.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_admission_makes_no_calls() {
        let submitter = MockSubmitter::default();
        let api = api(submitter.clone(), 1);
        let _held = api.limiter().acquire().await.unwrap();

        let err = api
            .create_document_or_cancel("{}", "abc", async {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Limiter(LimiterError::Interrupted)));
        assert!(submitter.calls().is_empty());
        assert_eq!(api.stats().interrupted(), 1);
        api.close().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_submissions_beyond_limit_wait_for_next_window() {
        let submitter = MockSubmitter {
            delay: Duration::from_secs(5),
            ..MockSubmitter::default()
        };
        let api = api(submitter.clone(), 2);
        let start = Instant::now();

        let results = join_all((0..3).map(|i| {
            let api = &api;
            async move { api.create_document(&format!("{{\"n\":{}}}", i), "abc").await }
        }))
        .await;
        assert!(results.iter().all(|r| r.is_ok()));

        let mut first_calls: Vec<Duration> = submitter
            .calls()
            .iter()
            .filter(|call| call.content_type == DOCUMENT_CONTENT_TYPE)
            .map(|call| call.at.duration_since(start))
            .collect();
        first_calls.sort();

        assert_eq!(first_calls.len(), 3);
        assert_eq!(first_calls[0], Duration::ZERO);
        assert_eq!(first_calls[1], Duration::ZERO);
        assert!(first_calls[2] >= Duration::from_secs(1));
        assert!(first_calls[2] < Duration::from_millis(1010));
        api.close().await;
    }
}
