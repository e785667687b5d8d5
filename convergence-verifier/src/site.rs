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

//! Verification of a whole site: groups of equivalent paths and paths that must be missing

use bytes::Bytes;
use http::StatusCode;
use log::{debug, info};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ConfigError, VerifyError};
use crate::probe::{ExpectedStatus, ProbeResult};
use crate::verifier::Verifier;

/// Paths that have to produce identical successful responses
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathGroup {
    /// Name used in reports
    pub name: String,
    /// Request paths, e.g. `/about/` and `/about/index.html`
    pub paths: Vec<String>,
    /// Text the response bodies have to contain
    #[serde(default)]
    pub body_contains: Option<String>,
}

/// Description of the expected site behavior
///
/// Settings missing from a YAML plan are empty, only an empty plan file results in the default
/// plan. Unknown settings are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SitePlan {
    /// Groups of paths producing the same document
    #[serde(default)]
    pub groups: Vec<PathGroup>,
    /// Paths that have to result in `403 Forbidden` or `404 Not Found`
    #[serde(default)]
    pub missing: Vec<String>,
    /// Text the `Content-Type` header of successful responses has to contain
    #[serde(default)]
    pub content_type: Option<String>,
}

impl Default for SitePlan {
    fn default() -> Self {
        fn paths(paths: &[&str]) -> Vec<String> {
            paths.iter().map(|path| (*path).to_owned()).collect()
        }

        Self {
            groups: vec![
                PathGroup {
                    name: "root".to_owned(),
                    paths: paths(&["/", "/index.html"]),
                    body_contains: None,
                },
                PathGroup {
                    name: "subdirectory".to_owned(),
                    paths: paths(&["/about/", "/about", "/about/index.html"]),
                    body_contains: None,
                },
            ],
            missing: paths(&["/nonexistent/", "/nonexistent/index.html"]),
            content_type: Some("text/html".to_owned()),
        }
    }
}

impl SitePlan {
    fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            Ok(Self::default())
        } else {
            serde_yaml::from_str(yaml)
        }
    }

    /// Parses and validates a plan given as YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let plan = Self::parse(yaml).map_err(|err| ConfigError::InvalidPlan(err.to_string()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Loads and validates a plan from a YAML file.
    pub fn load_from_yaml(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let plan = Self::parse(&yaml).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        plan.validate()?;
        Ok(plan)
    }

    /// Makes sure that the plan verifies something: it needs at least one path, no group can be
    /// empty and all paths have to start with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::InvalidPlan(
                "plan does not contain any paths".to_owned(),
            ));
        }

        for group in &self.groups {
            if group.paths.is_empty() {
                return Err(ConfigError::InvalidPlan(format!(
                    "group {} does not contain any paths",
                    group.name
                )));
            }
        }

        let paths = self.groups.iter().flat_map(|group| &group.paths);
        if let Some(path) = paths
            .chain(&self.missing)
            .find(|path| !path.starts_with('/'))
        {
            return Err(ConfigError::InvalidPlan(format!(
                "path {path:?} does not start with a slash"
            )));
        }

        Ok(())
    }

    /// Number of requests verified by the plan
    pub fn len(&self) -> usize {
        self.groups
            .iter()
            .map(|group| group.paths.len())
            .sum::<usize>()
            + self.missing.len()
    }

    /// Checks whether the plan verifies nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A failed site check
#[derive(Debug, thiserror::Error)]
pub enum SiteFailure {
    /// Path never produced the expected response
    #[error("{path}: {error}")]
    Unreachable {
        /// Request path
        path: String,
        /// Verification error
        error: VerifyError,
    },

    /// Path responded with a redirect
    #[error("{path}: unexpected redirect with status {status}")]
    Redirect {
        /// Request path
        path: String,
        /// Redirect status
        status: StatusCode,
    },

    /// Response has an unexpected content type
    #[error("{path}: expected content type containing {expected:?}, got {actual:?}")]
    ContentType {
        /// Request path
        path: String,
        /// Expected content type fragment
        expected: String,
        /// Actual `Content-Type` header
        actual: String,
    },

    /// Response body doesn’t contain the expected text
    #[error("{path}: body does not contain {expected:?}")]
    BodyContent {
        /// Request path
        path: String,
        /// Expected text
        expected: String,
    },

    /// Response body differs from the body of the first path in the group
    #[error("{path}: body differs from {reference} ({actual} vs. {expected} bytes)")]
    BodyMismatch {
        /// Request path
        path: String,
        /// Path the body is compared to
        reference: String,
        /// Body size of the reference path
        expected: usize,
        /// Body size of this path
        actual: usize,
    },
}

/// Outcome of a site verification
#[derive(Debug, Default)]
pub struct SiteReport {
    /// Number of requests verified
    pub checked: usize,
    /// All failed checks
    pub failures: Vec<SiteFailure>,
}

impl SiteReport {
    /// Checks whether all checks succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

fn unreachable(path: &str, error: VerifyError) -> SiteFailure {
    match error.last_status() {
        Some(status) if status.is_redirection() => SiteFailure::Redirect {
            path: path.to_owned(),
            status,
        },
        _ => SiteFailure::Unreachable {
            path: path.to_owned(),
            error,
        },
    }
}

/// Verifies a site against a plan. All requests are made in parallel, every failing check is
/// reported.
pub async fn verify_site(verifier: &Verifier, base_url: &str, plan: &SitePlan) -> SiteReport {
    let mut targets = Vec::with_capacity(plan.len());
    for group in &plan.groups {
        for path in &group.paths {
            targets.push((join_url(base_url, path), ExpectedStatus::ok().with_body()));
        }
    }
    for path in &plan.missing {
        targets.push((join_url(base_url, path), ExpectedStatus::not_found()));
    }

    info!("verifying {} URLs of {base_url}", targets.len());
    let mut results = verifier.verify_all(targets).await.into_iter();

    let mut report = SiteReport::default();
    for group in &plan.groups {
        let mut reference: Option<(&str, Bytes)> = None;
        for path in &group.paths {
            report.checked += 1;
            let result: ProbeResult = match results.next() {
                Some(Ok(result)) => result,
                Some(Err(error)) => {
                    report.failures.push(unreachable(path, error));
                    continue;
                }
                None => continue,
            };
            debug!(
                "{path}: {} {} ({} bytes)",
                result.status,
                result.content_type(),
                result.body.len()
            );

            if let Some(expected) = &plan.content_type {
                if !result.content_type().contains(expected.as_str()) {
                    report.failures.push(SiteFailure::ContentType {
                        path: path.clone(),
                        expected: expected.clone(),
                        actual: result.content_type().to_owned(),
                    });
                }
            }

            if let Some(expected) = &group.body_contains {
                if !String::from_utf8_lossy(&result.body).contains(expected.as_str()) {
                    report.failures.push(SiteFailure::BodyContent {
                        path: path.clone(),
                        expected: expected.clone(),
                    });
                }
            }

            if let Some((reference_path, body)) = &reference {
                if *body != result.body {
                    report.failures.push(SiteFailure::BodyMismatch {
                        path: path.clone(),
                        reference: (*reference_path).to_owned(),
                        expected: body.len(),
                        actual: result.body.len(),
                    });
                }
            } else {
                reference = Some((path.as_str(), result.body));
            }
        }
        debug!("group {} verified", group.name);
    }

    for path in &plan.missing {
        report.checked += 1;
        if let Some(Err(error)) = results.next() {
            report.failures.push(unreachable(path, error));
        }
    }

    report
}
