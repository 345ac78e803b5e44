// Authenticated fetch with bounded retry.
// A pure retry state machine plus the async driver that performs requests,
// waits out the backoff and purges the credential cache on expiry.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use tracing::{debug, info, warn};

use crate::config::RetryConfig;
use crate::credentials::{self, Credential, CredentialStore};

use super::transport::{Transport, TransportResponse};
use super::types::{AppError, FetchOutcome, ResponseShape};

/// Longest slice of an error body echoed into failure messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Attempt budget, delay and per-attempt timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            timeout,
        }
    }

    /// Single attempt, no delay.
    pub fn once(timeout: Duration) -> Self {
        Self::new(1, Duration::ZERO, timeout)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.backoff(), config.timeout())
    }
}

/// What one attempt produced, as seen by the retry machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptResult {
    /// 2xx response with a classified body.
    Completed(ResponseShape),
    /// HTTP 401.
    Unauthorized,
    /// Timeout, network error or any other non-2xx status.
    Failed(String),
}

impl AttemptResult {
    fn from_response(response: TransportResponse) -> Self {
        if response.status == StatusCode::UNAUTHORIZED {
            return AttemptResult::Unauthorized;
        }
        if response.status.is_success() {
            return AttemptResult::Completed(ResponseShape::classify(&response.body));
        }

        let body: String = response.body.chars().take(ERROR_BODY_LIMIT).collect();
        if body.trim().is_empty() {
            AttemptResult::Failed(format!("HTTP {}", response.status))
        } else {
            AttemptResult::Failed(format!("HTTP {}: {}", response.status, body.trim()))
        }
    }
}

/// Position of a call in the retry state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Idle,
    /// Attempt `k` (1-based) is in flight.
    Attempting(u32),
    /// Backoff running; attempt `k` follows.
    Waiting(u32),
    Finished,
}

/// Next action the driver must take.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Attempt(u32),
    Delay(Duration),
    Done(FetchOutcome),
}

/// Sequential retry state machine for a single fetch call.
///
/// Holds no I/O: the driver reports attempt results and elapsed delays, the
/// machine answers with the next step. `Attempting` is entered at most
/// `max_attempts` times.
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    state: RetryState,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: RetryState::Idle,
        }
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Begin the call. Without a credential the call ends immediately.
    pub fn start(&mut self, has_credential: bool) -> Step {
        if self.state != RetryState::Idle {
            return self.invalid("start");
        }
        if !has_credential {
            return self.finish(FetchOutcome::EmptyOrAuthError(AppError::MissingCredential));
        }
        self.state = RetryState::Attempting(1);
        Step::Attempt(1)
    }

    /// Report the result of the attempt in flight.
    pub fn record(&mut self, result: AttemptResult) -> Step {
        let RetryState::Attempting(attempt) = self.state else {
            return self.invalid("record");
        };

        match result {
            AttemptResult::Completed(ResponseShape::Items(items)) => {
                self.finish(FetchOutcome::Success(items))
            }
            AttemptResult::Completed(ResponseShape::Message(message)) => {
                self.finish(FetchOutcome::EmptyOrAuthError(AppError::Backend(message)))
            }
            AttemptResult::Completed(ResponseShape::Unexpected) => {
                self.finish(FetchOutcome::EmptyOrAuthError(AppError::UnexpectedResponse))
            }
            AttemptResult::Unauthorized => self.finish(FetchOutcome::AuthExpired),
            AttemptResult::Failed(message) => {
                if attempt < self.policy.max_attempts {
                    self.state = RetryState::Waiting(attempt + 1);
                    Step::Delay(self.policy.backoff)
                } else {
                    self.finish(FetchOutcome::TransientFailure(message))
                }
            }
        }
    }

    /// Report that the backoff delay has elapsed.
    pub fn resume(&mut self) -> Step {
        let RetryState::Waiting(attempt) = self.state else {
            return self.invalid("resume");
        };
        self.state = RetryState::Attempting(attempt);
        Step::Attempt(attempt)
    }

    fn finish(&mut self, outcome: FetchOutcome) -> Step {
        self.state = RetryState::Finished;
        Step::Done(outcome)
    }

    fn invalid(&mut self, action: &str) -> Step {
        let message = format!("cannot {} from state {:?}", action, self.state);
        warn!(%message, "retry machine misused");
        self.finish(FetchOutcome::TransientFailure(message))
    }
}

/// Fetches feed resources on behalf of the cached credential.
///
/// Cloning is cheap; clones share the store and transport, so independent
/// calls can run concurrently on separate tasks.
#[derive(Clone)]
pub struct AuthenticatedFetcher {
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl AuthenticatedFetcher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            transport,
            policy,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch with the configured retry policy.
    pub async fn fetch_with_retry(&self, url: &Url) -> FetchOutcome {
        self.fetch_with_policy(url, self.policy).await
    }

    /// Fetch exactly once, keeping the configured per-attempt timeout.
    pub async fn fetch_once(&self, url: &Url) -> FetchOutcome {
        self.fetch_with_policy(url, RetryPolicy::once(self.policy.timeout))
            .await
    }

    /// Drive the retry machine to a terminal outcome.
    pub async fn fetch_with_policy(&self, url: &Url, policy: RetryPolicy) -> FetchOutcome {
        // Read fresh on every call so a login or purge elsewhere is observed
        let credential = match credentials::load(self.store.as_ref()) {
            Ok(credential) => credential,
            Err(e) => {
                warn!(error = %e, "failed to read credential cache");
                None
            }
        };

        debug!(
            %url,
            access_token = if credential.is_some() { "present" } else { "missing" },
            max_attempts = policy.max_attempts(),
            "starting fetch"
        );

        let mut machine = RetryMachine::new(policy);
        let mut step = machine.start(credential.is_some());

        loop {
            step = match step {
                Step::Attempt(attempt) => {
                    let Some(credential) = credential.as_ref() else {
                        // start() never asks for an attempt without a credential
                        return FetchOutcome::EmptyOrAuthError(AppError::MissingCredential);
                    };
                    info!(%url, attempt, "sending request");
                    let result = self.attempt(url, credential, policy.timeout()).await;
                    if let AttemptResult::Failed(message) = &result {
                        warn!(%url, attempt, error = %message, "attempt failed");
                    }
                    machine.record(result)
                }
                Step::Delay(delay) => {
                    info!(delay_ms = delay.as_millis() as u64, "retrying after delay");
                    tokio::time::sleep(delay).await;
                    machine.resume()
                }
                Step::Done(outcome) => {
                    if outcome == FetchOutcome::AuthExpired {
                        self.expire();
                    }
                    return outcome;
                }
            };
        }
    }

    async fn attempt(&self, url: &Url, credential: &Credential, timeout: Duration) -> AttemptResult {
        let headers = credential.request_headers();
        let request = self.transport.get(url, &headers, timeout);

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(response)) => AttemptResult::from_response(response),
            Ok(Err(e)) => AttemptResult::Failed(e.to_string()),
            Err(_) => AttemptResult::Failed(format!(
                "timeout of {}ms exceeded",
                timeout.as_millis()
            )),
        }
    }

    /// Purge the cache after the backend rejected the credential.
    fn expire(&self) {
        info!("access token expired, clearing credential cache");
        if let Err(e) = credentials::purge(self.store.as_ref()) {
            warn!(error = %e, "failed to purge credential cache");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::credentials::{CREDENTIAL_KEYS, MemoryStore};
    use crate::error::{Result, SubfeedError};

    const VIDEOS: &str = r#"[{"video_id":"v1","title":"First","channel_title":"Chan"}]"#;

    /// Scripted reply for one request.
    pub(crate) enum Reply {
        Status(u16, &'static str),
        Error(&'static str),
        Hang,
    }

    /// Transport that replays a fixed script and records every request.
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        replies: Mutex<VecDeque<Reply>>,
        calls: AtomicUsize,
        headers: Mutex<Vec<Vec<(&'static str, String)>>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(replies: Vec<Reply>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn last_headers(&self) -> Vec<(&'static str, String)> {
            self.headers.lock().unwrap().last().cloned().unwrap_or_default()
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(
            &self,
            url: &Url,
            headers: &[(&'static str, String)],
            _timeout: Duration,
        ) -> Result<TransportResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.headers.lock().unwrap().push(headers.to_vec());
            self.urls.lock().unwrap().push(url.to_string());

            // Let concurrent callers reach the transport before anyone replies
            tokio::task::yield_now().await;

            let reply = self.replies.lock().unwrap().pop_front();
            match reply {
                Some(Reply::Status(code, body)) => Ok(TransportResponse::new(
                    StatusCode::from_u16(code).unwrap(),
                    body,
                )),
                Some(Reply::Error(message)) => Err(SubfeedError::Other(message.to_string())),
                Some(Reply::Hang) => std::future::pending().await,
                None => panic!("unexpected request to {}", url),
            }
        }

        async fn post_json(
            &self,
            url: &Url,
            _body: &serde_json::Value,
            _timeout: Duration,
        ) -> Result<TransportResponse> {
            panic!("unexpected POST to {}", url)
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(2000), Duration::from_secs(30))
    }

    fn logged_in_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        credentials::save(
            store.as_ref(),
            &Credential::new("abc", Some("r1".to_string()), Some(3599)),
        )
        .unwrap();
        store
    }

    fn videos_url() -> Url {
        Url::parse("http://localhost:8080/subscriptions/videos").unwrap()
    }

    fn fetcher(
        store: Arc<MemoryStore>,
        transport: Arc<ScriptedTransport>,
        max_attempts: u32,
    ) -> AuthenticatedFetcher {
        AuthenticatedFetcher::new(store, transport, policy(max_attempts))
    }

    #[test]
    fn test_policy_clamps_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 3);
        assert_eq!(RetryPolicy::default().backoff(), Duration::from_secs(2));
    }

    #[test]
    fn test_machine_without_credential_finishes_immediately() {
        let mut machine = RetryMachine::new(policy(3));
        assert_eq!(
            machine.start(false),
            Step::Done(FetchOutcome::EmptyOrAuthError(AppError::MissingCredential))
        );
        assert_eq!(machine.state(), RetryState::Finished);
    }

    #[test]
    fn test_machine_retries_then_gives_up() {
        let mut machine = RetryMachine::new(policy(3));
        let mut delays = 0;
        let mut attempts = 0;

        let mut step = machine.start(true);
        let outcome = loop {
            step = match step {
                Step::Attempt(k) => {
                    attempts += 1;
                    assert_eq!(k, attempts);
                    machine.record(AttemptResult::Failed(format!("boom {}", k)))
                }
                Step::Delay(d) => {
                    assert_eq!(d, Duration::from_millis(2000));
                    delays += 1;
                    machine.resume()
                }
                Step::Done(outcome) => break outcome,
            };
        };

        assert_eq!(attempts, 3);
        assert_eq!(delays, 2);
        assert_eq!(outcome, FetchOutcome::TransientFailure("boom 3".to_string()));
    }

    #[test]
    fn test_machine_terminal_results_do_not_retry() {
        let cases = vec![
            (
                AttemptResult::Completed(ResponseShape::Message("quota exceeded".into())),
                FetchOutcome::EmptyOrAuthError(AppError::Backend("quota exceeded".into())),
            ),
            (
                AttemptResult::Completed(ResponseShape::Unexpected),
                FetchOutcome::EmptyOrAuthError(AppError::UnexpectedResponse),
            ),
            (AttemptResult::Unauthorized, FetchOutcome::AuthExpired),
            (
                AttemptResult::Completed(ResponseShape::Items(vec![])),
                FetchOutcome::Success(vec![]),
            ),
        ];

        for (result, expected) in cases {
            let mut machine = RetryMachine::new(policy(5));
            assert_eq!(machine.start(true), Step::Attempt(1));
            assert_eq!(machine.record(result), Step::Done(expected));
        }
    }

    #[test]
    fn test_machine_rejects_out_of_order_calls() {
        let mut machine = RetryMachine::new(policy(3));
        assert!(matches!(
            machine.resume(),
            Step::Done(FetchOutcome::TransientFailure(_))
        ));
        assert_eq!(machine.state(), RetryState::Finished);
    }

    #[test]
    fn test_attempt_result_from_response() {
        assert_eq!(
            AttemptResult::from_response(TransportResponse::new(StatusCode::UNAUTHORIZED, "")),
            AttemptResult::Unauthorized
        );
        assert_eq!(
            AttemptResult::from_response(TransportResponse::new(StatusCode::BAD_GATEWAY, "")),
            AttemptResult::Failed("HTTP 502 Bad Gateway".to_string())
        );
        assert_eq!(
            AttemptResult::from_response(TransportResponse::new(StatusCode::FORBIDDEN, "nope")),
            AttemptResult::Failed("HTTP 403 Forbidden: nope".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_token_makes_no_request() {
        let store = Arc::new(MemoryStore::new());
        store.set("refresh_token", "r1").unwrap();
        let transport = ScriptedTransport::new(vec![]);

        let outcome = fetcher(store.clone(), transport.clone(), 3)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::EmptyOrAuthError(AppError::MissingCredential)
        );
        assert_eq!(transport.calls(), 0);
        // Nothing is purged on this path
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_purges_cache_without_retry() {
        let store = logged_in_store();
        let transport = ScriptedTransport::new(vec![Reply::Status(401, "")]);
        let start = Instant::now();

        let outcome = fetcher(store.clone(), transport.clone(), 5)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(outcome, FetchOutcome::AuthExpired);
        assert_eq!(transport.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        for key in CREDENTIAL_KEYS {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unauthorized_after_transient_failure() {
        let store = logged_in_store();
        let transport =
            ScriptedTransport::new(vec![Reply::Error("connection reset"), Reply::Status(401, "")]);

        let outcome = fetcher(store.clone(), transport.clone(), 3)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(outcome, FetchOutcome::AuthExpired);
        assert_eq!(transport.calls(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let store = logged_in_store();
        let transport = ScriptedTransport::new(vec![
            Reply::Error("connection refused"),
            Reply::Status(500, "oops"),
            Reply::Status(200, VIDEOS),
        ]);
        let start = Instant::now();

        let outcome = fetcher(store.clone(), transport.clone(), 3)
            .fetch_with_retry(&videos_url())
            .await;

        let FetchOutcome::Success(items) = outcome else {
            panic!("expected success, got {:?}", outcome);
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "v1");
        assert_eq!(transport.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(2 * 2000));
        assert_eq!(store.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_budget() {
        let store = logged_in_store();
        let transport = ScriptedTransport::new(vec![
            Reply::Error("network down"),
            Reply::Error("network down"),
            Reply::Error("still down"),
        ]);
        let start = Instant::now();

        let outcome = fetcher(store.clone(), transport.clone(), 3)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::TransientFailure("still down".to_string())
        );
        assert_eq!(transport.calls(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(2 * 2000));
        assert_eq!(store.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_message_is_not_retried() {
        let store = logged_in_store();
        let transport =
            ScriptedTransport::new(vec![Reply::Status(200, r#"{"message":"quota exceeded"}"#)]);
        let start = Instant::now();

        let outcome = fetcher(store.clone(), transport.clone(), 3)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::EmptyOrAuthError(AppError::Backend("quota exceeded".to_string()))
        );
        assert_eq!(transport.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_is_not_retried() {
        let store = logged_in_store();
        let transport = ScriptedTransport::new(vec![Reply::Status(200, r#"{"videos":[]}"#)]);

        let outcome = fetcher(store, transport.clone(), 3)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(
            outcome,
            FetchOutcome::EmptyOrAuthError(AppError::UnexpectedResponse)
        );
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_counts_as_transient() {
        let store = logged_in_store();
        let transport = ScriptedTransport::new(vec![Reply::Hang, Reply::Status(200, "[]")]);
        let start = Instant::now();

        let outcome = fetcher(store, transport.clone(), 2)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(outcome, FetchOutcome::Success(vec![]));
        assert_eq!(transport.calls(), 2);
        assert_eq!(
            start.elapsed(),
            Duration::from_secs(30) + Duration::from_millis(2000)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_headers_follow_cached_credential() {
        let store = Arc::new(MemoryStore::new());
        credentials::save(store.as_ref(), &Credential::new("tok", None, None)).unwrap();
        let transport = ScriptedTransport::new(vec![Reply::Status(200, "[]")]);

        fetcher(store, transport.clone(), 1)
            .fetch_with_retry(&videos_url())
            .await;

        assert_eq!(
            transport.last_headers(),
            vec![("Authorization", "Bearer tok".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_is_read_at_call_time() {
        let store = Arc::new(MemoryStore::new());
        let transport = ScriptedTransport::new(vec![Reply::Status(200, "[]")]);
        let fetcher = fetcher(store.clone(), transport.clone(), 1);

        assert!(!fetcher.fetch_with_retry(&videos_url()).await.is_success());

        credentials::save(store.as_ref(), &Credential::new("late", None, None)).unwrap();
        assert!(fetcher.fetch_with_retry(&videos_url()).await.is_success());
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_expiry_purges_are_idempotent() {
        let store = logged_in_store();
        let transport =
            ScriptedTransport::new(vec![Reply::Status(401, ""), Reply::Status(401, "")]);
        let fetcher = fetcher(store.clone(), transport.clone(), 3);

        let url = videos_url();
        let (first, second) = tokio::join!(
            fetcher.fetch_with_retry(&url),
            fetcher.fetch_with_retry(&url)
        );

        assert_eq!(first, FetchOutcome::AuthExpired);
        assert_eq!(second, FetchOutcome::AuthExpired);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_once_does_not_retry() {
        let store = logged_in_store();
        let transport = ScriptedTransport::new(vec![Reply::Error("down")]);
        let start = Instant::now();

        let outcome = fetcher(store, transport.clone(), 3)
            .fetch_once(&videos_url())
            .await;

        assert_eq!(outcome, FetchOutcome::TransientFailure("down".to_string()));
        assert_eq!(transport.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
