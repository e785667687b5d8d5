// Copyright 2024 Wladimir Palant
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The retry loop

use log::{debug, info, warn};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout, Instant};

use crate::budget::RetryBudget;
use crate::error::VerifyError;
use crate::probe::{ExpectedStatus, HttpGetter, ProbeError, ProbeResult};

/// Polls URLs until they produce the expected response
///
/// Attempts for one URL are strictly sequential, each one a fresh request. Multiple URLs can be
/// verified in parallel with [`Verifier::verify_all`].
#[derive(Debug, Clone)]
pub struct Verifier {
    getter: Arc<dyn HttpGetter>,
    budget: RetryBudget,
}

impl Verifier {
    /// Creates a verifier using the given HTTP client and budget. The budget is validated.
    pub fn new(getter: Arc<dyn HttpGetter>, budget: RetryBudget) -> Result<Self, VerifyError> {
        budget.validate()?;
        Ok(Self { getter, budget })
    }

    /// The retry budget applied to each URL
    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    /// Probes a URL until a response matches the expectation.
    ///
    /// Transport errors and mismatching responses are retried after the configured delay. The
    /// first matching response is returned, no further requests are made afterwards. Once the
    /// attempts are used up or the deadline passed, the outcome of the final attempt is reported.
    pub async fn verify(
        &self,
        url: &str,
        expected: &ExpectedStatus,
    ) -> Result<ProbeResult, VerifyError> {
        let budget = &self.budget;
        let deadline = budget.deadline.map(|deadline| Instant::now() + deadline);
        let mut last = None;

        for attempt in 1..=budget.max_attempts {
            let mut request_timeout = budget.request_timeout;
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    if let Some(last) = last.take() {
                        warn!("GET {url}: deadline passed after {} attempts", attempt - 1);
                        return Err(VerifyError::DeadlineExceeded {
                            url: url.to_owned(),
                            attempts: attempt - 1,
                            last,
                        });
                    }
                }
                request_timeout = request_timeout.min(remaining);
            }

            debug!("GET {url}: attempt {attempt}/{}", budget.max_attempts);
            let outcome = match timeout(request_timeout, self.getter.get(url, request_timeout)).await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProbeError::Transport(format!(
                    "request timed out after {request_timeout:?}"
                ))),
            };

            let err = match outcome {
                Ok(result) => match expected.check(&result) {
                    Ok(()) => {
                        debug!("GET {url}: got {} on attempt {attempt}", result.status);
                        return Ok(result);
                    }
                    Err(err) => err,
                },
                Err(err) => err,
            };

            if attempt < budget.max_attempts {
                let mut delay = budget.delay;
                if let Some(deadline) = deadline {
                    delay = delay.min(deadline.saturating_duration_since(Instant::now()));
                }
                info!(
                    "GET {url}: {err}, retrying in {delay:?} (attempt {attempt}/{})",
                    budget.max_attempts
                );
                sleep(delay).await;
            }
            last = Some(err);
        }

        let attempts = budget.max_attempts;
        match last {
            Some(last) => {
                warn!("GET {url} failed after {attempts} attempts: last error: {last}");
                Err(VerifyError::BudgetExhausted {
                    url: url.to_owned(),
                    attempts,
                    last,
                })
            }
            None => Err(VerifyError::InvalidBudget("at least one attempt is required")),
        }
    }

    /// Verifies multiple URLs in parallel, each one running its own sequential attempts. Results
    /// are returned in the order of `targets`.
    pub async fn verify_all(
        &self,
        targets: Vec<(String, ExpectedStatus)>,
    ) -> Vec<Result<ProbeResult, VerifyError>> {
        let urls: Vec<_> = targets.iter().map(|(url, _)| url.clone()).collect();

        let mut tasks = JoinSet::new();
        for (index, (url, expected)) in targets.into_iter().enumerate() {
            let verifier = self.clone();
            tasks.spawn(async move { (index, verifier.verify(&url, &expected).await) });
        }

        let mut results: Vec<Option<Result<ProbeResult, VerifyError>>> =
            urls.iter().map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(err) => warn!("verification task failed: {err}"),
            }
        }

        results
            .into_iter()
            .zip(urls)
            .map(|(result, url)| {
                result.unwrap_or_else(|| {
                    Err(VerifyError::Aborted {
                        url,
                        message: "task did not complete".to_owned(),
                    })
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::probe::ProbeError;
    use crate::testing::{response, status, transport, ScriptedGetter};
    use http::StatusCode;
    use std::time::Duration;
    use test_log::test;

    const URL: &str = "https://edge.example/about/";

    fn scripted_verifier(getter: &Arc<ScriptedGetter>, budget: RetryBudget) -> Verifier {
        Verifier::new(getter.clone(), budget).unwrap()
    }

    #[test(tokio::test(start_paused = true))]
    async fn stops_at_first_match() {
        let getter = Arc::new(ScriptedGetter::new().script(
            URL,
            vec![
                status(503),
                status(404),
                response(200, "text/html", "<h1>About</h1>"),
                status(500),
            ],
        ));
        let verifier = scripted_verifier(&getter, RetryBudget::new(5, Duration::from_secs(10)));

        let result = verifier.verify(URL, &ExpectedStatus::ok()).await.unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(result.body, "<h1>About</h1>");
        assert_eq!(result.content_type(), "text/html");
        assert_eq!(getter.calls(URL), 3);
    }

    #[test(tokio::test(start_paused = true))]
    async fn first_attempt_match() {
        let getter = Arc::new(ScriptedGetter::new().script(URL, vec![status(404)]));
        let verifier = scripted_verifier(&getter, RetryBudget::new(5, Duration::from_secs(10)));

        let start = Instant::now();
        let result = verifier
            .verify(URL, &ExpectedStatus::not_found())
            .await
            .unwrap();
        assert_eq!(result.status, StatusCode::NOT_FOUND);
        assert_eq!(getter.calls(URL), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test(tokio::test(start_paused = true))]
    async fn exhausts_budget() {
        let getter = Arc::new(ScriptedGetter::new().script(URL, vec![status(403)]));
        let verifier = scripted_verifier(&getter, RetryBudget::new(3, Duration::from_secs(10)));

        let start = Instant::now();
        let err = verifier
            .verify(URL, &ExpectedStatus::ok())
            .await
            .unwrap_err();
        assert_eq!(getter.calls(URL), 3);
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.last_status(), Some(StatusCode::FORBIDDEN));
        assert!(matches!(err, VerifyError::BudgetExhausted { .. }));
        assert_eq!(
            err.to_string(),
            "GET https://edge.example/about/ failed after 3 attempts: last error: expected 200, got 403 Forbidden"
        );

        // No delay after the final attempt
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[test(tokio::test(start_paused = true))]
    async fn single_attempt() {
        let getter = Arc::new(ScriptedGetter::new().script(URL, vec![status(500)]));
        let verifier = scripted_verifier(&getter, RetryBudget::new(1, Duration::from_secs(10)));

        let err = verifier
            .verify(URL, &ExpectedStatus::ok())
            .await
            .unwrap_err();
        assert_eq!(getter.calls(URL), 1);
        assert_eq!(err.attempts(), 1);
    }

    #[test(tokio::test(start_paused = true))]
    async fn transport_errors_retried() {
        let getter = Arc::new(ScriptedGetter::new().script(
            URL,
            vec![
                transport("connection refused"),
                transport("connection reset"),
                status(200),
            ],
        ));
        let verifier = scripted_verifier(&getter, RetryBudget::new(3, Duration::from_secs(1)));

        let result = verifier.verify(URL, &ExpectedStatus::ok()).await.unwrap();
        assert_eq!(result.status, StatusCode::OK);
        assert_eq!(getter.calls(URL), 3);

        let getter = Arc::new(ScriptedGetter::new().script(URL, vec![transport("refused")]));
        let verifier = scripted_verifier(&getter, RetryBudget::new(2, Duration::from_secs(1)));
        let err = verifier
            .verify(URL, &ExpectedStatus::ok())
            .await
            .unwrap_err();
        assert_eq!(
            err.last(),
            Some(&ProbeError::Transport("refused".to_owned()))
        );
        assert_eq!(err.last_status(), None);
    }

    #[test(tokio::test(start_paused = true))]
    async fn empty_body_retried() {
        let getter = Arc::new(ScriptedGetter::new().script(
            URL,
            vec![status(200), response(200, "text/html", "<h1>Ready</h1>")],
        ));
        let verifier = scripted_verifier(&getter, RetryBudget::new(3, Duration::from_secs(1)));

        let result = verifier
            .verify(URL, &ExpectedStatus::ok().with_body())
            .await
            .unwrap();
        assert_eq!(result.body, "<h1>Ready</h1>");
        assert_eq!(getter.calls(URL), 2);
    }

    #[test(tokio::test(start_paused = true))]
    async fn request_timeout() {
        // No script, requests never complete
        let getter = Arc::new(ScriptedGetter::new());
        let budget = RetryBudget::new(2, Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(15));
        let verifier = scripted_verifier(&getter, budget);

        let start = Instant::now();
        let err = verifier
            .verify(URL, &ExpectedStatus::ok())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerifyError::BudgetExhausted {
                last: ProbeError::Transport(_),
                attempts: 2,
                ..
            }
        ));
        assert_eq!(start.elapsed(), Duration::from_secs(31));
    }

    #[test(tokio::test(start_paused = true))]
    async fn deadline() {
        let getter = Arc::new(ScriptedGetter::new().script(URL, vec![status(503)]));
        let budget = RetryBudget::new(100, Duration::from_secs(10))
            .with_deadline(Duration::from_secs(25));
        let verifier = scripted_verifier(&getter, budget);

        let start = Instant::now();
        let err = verifier
            .verify(URL, &ExpectedStatus::ok())
            .await
            .unwrap_err();
        assert!(matches!(err, VerifyError::DeadlineExceeded { .. }));
        assert_eq!(err.attempts(), 3);
        assert_eq!(getter.calls(URL), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(25));
    }

    #[test(tokio::test(start_paused = true))]
    async fn deadline_clamps_request_timeout() {
        let getter = Arc::new(ScriptedGetter::new());
        let budget = RetryBudget::new(10, Duration::from_secs(1))
            .with_request_timeout(Duration::from_secs(15))
            .with_deadline(Duration::from_secs(20));
        let verifier = scripted_verifier(&getter, budget);

        let start = Instant::now();
        let err = verifier
            .verify(URL, &ExpectedStatus::ok())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VerifyError::DeadlineExceeded {
                last: ProbeError::Transport(_),
                attempts: 2,
                ..
            }
        ));
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[test]
    fn invalid_budget() {
        let getter = Arc::new(ScriptedGetter::new());
        assert!(matches!(
            Verifier::new(getter, RetryBudget::new(0, Duration::ZERO)),
            Err(VerifyError::InvalidBudget(_))
        ));
    }

    #[test(tokio::test(start_paused = true))]
    async fn parallel_in_order() {
        let getter = Arc::new(
            ScriptedGetter::new()
                .script("/slow", vec![status(503), status(503), status(200)])
                .script("/fast", vec![status(200)])
                .script("/missing", vec![status(404)])
                .script("/broken", vec![status(500)]),
        );
        let verifier = scripted_verifier(&getter, RetryBudget::new(3, Duration::from_secs(10)));

        let results = verifier
            .verify_all(vec![
                ("/slow".to_owned(), ExpectedStatus::ok()),
                ("/fast".to_owned(), ExpectedStatus::ok()),
                ("/missing".to_owned(), ExpectedStatus::not_found()),
                ("/broken".to_owned(), ExpectedStatus::ok()),
            ])
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().status, StatusCode::OK);
        assert_eq!(results[1].as_ref().unwrap().status, StatusCode::OK);
        assert_eq!(results[2].as_ref().unwrap().status, StatusCode::NOT_FOUND);
        assert_eq!(
            results[3].as_ref().unwrap_err().last_status(),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        );
        assert_eq!(getter.calls("/slow"), 3);
        assert_eq!(getter.calls("/fast"), 1);
        assert_eq!(getter.calls("/broken"), 3);
    }
}
