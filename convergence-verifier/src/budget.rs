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

//! Retry budget: how often and how long a URL is probed

use std::time::Duration;

use crate::error::VerifyError;

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
/// Default delay between attempts
pub const DEFAULT_DELAY: Duration = Duration::from_secs(10);
/// Default timeout of a single request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Limits of a verification: how often and how long a URL is probed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Maximum number of attempts, at least 1
    pub max_attempts: u32,
    /// Delay between two attempts
    pub delay: Duration,
    /// Timeout of each individual request, non-zero
    pub request_timeout: Duration,
    /// Overall time limit of a verification, non-zero if set
    pub deadline: Option<Duration>,
}

impl RetryBudget {
    /// Creates a budget with given attempts and delay, default request timeout and no deadline.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            ..Default::default()
        }
    }

    /// Sets the timeout of each individual request.
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Sets the overall time limit.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Checks the budget invariants.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.max_attempts == 0 {
            return Err(VerifyError::InvalidBudget("at least one attempt is required"));
        }
        if self.request_timeout.is_zero() {
            return Err(VerifyError::InvalidBudget("request timeout has to be non-zero"));
        }
        if self.deadline.is_some_and(|deadline| deadline.is_zero()) {
            return Err(VerifyError::InvalidBudget("deadline has to be non-zero"));
        }
        Ok(())
    }
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_DELAY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            deadline: None,
        }
    }
}
