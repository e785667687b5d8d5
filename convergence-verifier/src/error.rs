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

//! Error types of the verifier

use http::StatusCode;
use std::path::PathBuf;

use crate::probe::ProbeError;

/// Terminal failure of a verification
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// All attempts were used up without a matching response
    #[error("GET {url} failed after {attempts} attempts: last error: {last}")]
    BudgetExhausted {
        /// URL probed
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Outcome of the final attempt
        last: ProbeError,
    },

    /// The overall deadline passed without a matching response
    #[error("GET {url} did not succeed before the deadline, {attempts} attempts made: last error: {last}")]
    DeadlineExceeded {
        /// URL probed
        url: String,
        /// Number of attempts made
        attempts: u32,
        /// Outcome of the final attempt
        last: ProbeError,
    },

    /// The retry budget violates its invariants
    #[error("invalid retry budget: {0}")]
    InvalidBudget(&'static str),

    /// The HTTP client could not be created
    #[error("failed creating HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    /// A parallel verification task didn’t complete
    #[error("verification of {url} was aborted: {message}")]
    Aborted {
        /// URL probed
        url: String,
        /// Reason for the abort
        message: String,
    },
}

impl VerifyError {
    /// Outcome of the final attempt, if any attempt was made
    pub fn last(&self) -> Option<&ProbeError> {
        match self {
            Self::BudgetExhausted { last, .. } | Self::DeadlineExceeded { last, .. } => Some(last),
            _ => None,
        }
    }

    /// Status code received by the final attempt, if any
    pub fn last_status(&self) -> Option<StatusCode> {
        self.last().and_then(ProbeError::status)
    }

    /// Number of attempts made
    pub fn attempts(&self) -> u32 {
        match self {
            Self::BudgetExhausted { attempts, .. } | Self::DeadlineExceeded { attempts, .. } => {
                *attempts
            }
            _ => 0,
        }
    }
}

/// Configuration problem preventing the verifier from running
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration or plan file could not be read
    #[error("failed reading {path:?}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A configuration or plan file is not valid
    #[error("failed parsing {path:?}: {source}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: serde_yaml::Error,
    },

    /// A configuration file doesn’t contain a mapping at the top level
    #[error("{0:?} does not contain a mapping")]
    NotAMapping(PathBuf),

    /// No base URL was given
    #[error("no base URL configured, use --base-url or the base_url setting")]
    MissingBaseUrl,

    /// A site plan is malformed or doesn’t verify anything
    #[error("invalid site plan: {0}")]
    InvalidPlan(String),

    /// A setting has an invalid value
    #[error("invalid setting {name}: {message}")]
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// Problem description
        message: String,
    },

    /// The resulting retry budget is invalid
    #[error(transparent)]
    Budget(#[from] VerifyError),
}
