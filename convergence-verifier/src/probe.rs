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

//! Single HTTP probes and the expectations they are checked against

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::fmt::{Debug, Display};
use std::time::Duration;

use crate::error::VerifyError;

/// Response observed by a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    /// Response status code
    pub status: StatusCode,
    /// Response body
    pub body: Bytes,
    /// Response headers
    pub headers: HeaderMap,
}

impl ProbeResult {
    /// Value of the `Content-Type` header, empty if missing or not valid text
    pub fn content_type(&self) -> &str {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
    }
}

/// Reason a single probe didn’t match the expectation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    /// The request failed before a response was received, e.g. connection error or timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// A response was received but its status code wasn’t expected
    #[error("expected {expected}, got {actual}")]
    UnexpectedStatus {
        /// Expected status codes
        expected: ExpectedStatus,
        /// Status code received
        actual: StatusCode,
    },

    /// The status code was expected but the response body was required to be non-empty
    #[error("status {0} with empty body")]
    EmptyBody(StatusCode),
}

impl ProbeError {
    /// Status code observed by the probe if a response was received
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Transport(_) => None,
            Self::UnexpectedStatus { actual, .. } => Some(*actual),
            Self::EmptyBody(status) => Some(*status),
        }
    }
}

/// Set of acceptable status codes for a probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedStatus {
    codes: Vec<StatusCode>,
    require_body: bool,
}

impl ExpectedStatus {
    /// Expects exactly the given status code.
    pub fn single(status: StatusCode) -> Self {
        Self {
            codes: vec![status],
            require_body: false,
        }
    }

    /// Expects any of the given status codes. Returns `None` if the list is empty.
    pub fn any_of(codes: impl IntoIterator<Item = StatusCode>) -> Option<Self> {
        let mut codes: Vec<_> = codes.into_iter().collect();
        codes.sort();
        codes.dedup();
        if codes.is_empty() {
            None
        } else {
            Some(Self {
                codes,
                require_body: false,
            })
        }
    }

    /// Expects `200 OK`.
    pub fn ok() -> Self {
        Self::single(StatusCode::OK)
    }

    /// Expects a not-found class status: `403 Forbidden` or `404 Not Found`.
    pub fn not_found() -> Self {
        Self {
            codes: vec![StatusCode::FORBIDDEN, StatusCode::NOT_FOUND],
            require_body: false,
        }
    }

    /// Additionally requires the response body to be non-empty.
    pub fn with_body(mut self) -> Self {
        self.require_body = true;
        self
    }

    /// Acceptable status codes
    pub fn codes(&self) -> &[StatusCode] {
        &self.codes
    }

    /// Checks whether a status code is acceptable.
    pub fn contains(&self, status: StatusCode) -> bool {
        self.codes.contains(&status)
    }

    /// Checks a response against the expectation.
    pub fn check(&self, result: &ProbeResult) -> Result<(), ProbeError> {
        if !self.contains(result.status) {
            Err(ProbeError::UnexpectedStatus {
                expected: self.clone(),
                actual: result.status,
            })
        } else if self.require_body && result.body.is_empty() {
            Err(ProbeError::EmptyBody(result.status))
        } else {
            Ok(())
        }
    }
}

impl Display for ExpectedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, code) in self.codes.iter().enumerate() {
            if index > 0 {
                f.write_str(" or ")?;
            }
            write!(f, "{}", code.as_u16())?;
        }
        Ok(())
    }
}

/// HTTP client performing the GET requests of the verifier
#[async_trait]
pub trait HttpGetter: Debug + Send + Sync {
    /// Issues a single GET request, giving up after `timeout`. Any failure to receive a complete
    /// response is reported as [`ProbeError::Transport`].
    async fn get(&self, url: &str, timeout: Duration) -> Result<ProbeResult, ProbeError>;
}

/// [`HttpGetter`] implementation based on `reqwest`. Redirects are never followed, each request
/// is sent without cookies.
#[derive(Debug, Clone)]
pub struct ReqwestGetter {
    client: reqwest::Client,
}

impl ReqwestGetter {
    /// Creates a new HTTP client.
    pub fn new() -> Result<Self, VerifyError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("site-verify/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpGetter for ReqwestGetter {
    async fn get(&self, url: &str, timeout: Duration) -> Result<ProbeResult, ProbeError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| ProbeError::Transport(err.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| ProbeError::Transport(err.to_string()))?;

        Ok(ProbeResult {
            status,
            body,
            headers,
        })
    }
}
