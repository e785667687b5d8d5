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

//! # Convergence Verifier
//!
//! Changes to a site published through a content delivery network take a while to become
//! visible. This crate polls a published site until it converges to the expected state and then
//! verifies its responses.
//!
//! [`Verifier::verify`] issues `GET` requests against a URL until the response status matches an
//! [`ExpectedStatus`] or the [`RetryBudget`] is exhausted. Transport errors and unexpected
//! responses count as failed attempts, redirects are never followed. The first matching response
//! is returned as [`ProbeResult`], otherwise the outcome of the final attempt is reported via
//! [`VerifyError`].
//!
//! On top of that, [`verify_site`] checks a whole [`SitePlan`]: paths expected to produce the
//! same document (e.g. `/about/`, `/about` and `/about/index.html`) and paths expected to be
//! missing. All URLs are verified in parallel, the [`SiteReport`] lists every failed check.
//!
//! ## Code example
//!
//! ```rust,no_run
//! use convergence_verifier::{verify_site, ReqwestGetter, RetryBudget, SitePlan, Verifier};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let getter = Arc::new(ReqwestGetter::new()?);
//! let verifier = Verifier::new(getter, RetryBudget::new(30, Duration::from_secs(10)))?;
//! let report = verify_site(
//!     &verifier,
//!     "https://d111111abcdef8.cloudfront.net",
//!     &SitePlan::default(),
//! )
//! .await;
//! for failure in &report.failures {
//!     eprintln!("{failure}");
//! }
//! # Ok(())
//! # }
//! ```

mod budget;
mod config;
mod error;
mod probe;
mod site;
#[cfg(test)]
mod testing;
mod verifier;

pub use budget::{RetryBudget, DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT};
pub use config::{VerifierConf, VerifierOpt};
pub use error::{ConfigError, VerifyError};
pub use probe::{ExpectedStatus, HttpGetter, ProbeError, ProbeResult, ReqwestGetter};
pub use site::{verify_site, PathGroup, SiteFailure, SitePlan, SiteReport};
pub use verifier::Verifier;
