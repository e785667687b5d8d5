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

//! Command line options and configuration file settings of the verifier

use clap::Parser;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::budget::{RetryBudget, DEFAULT_MAX_ATTEMPTS};
use crate::error::ConfigError;
use crate::site::SitePlan;

/// Verify that a published static site serves the expected responses
#[derive(Debug, Default, Parser)]
pub struct VerifierOpt {
    /// Base URL of the site, e.g. https://d111111abcdef8.cloudfront.net
    #[clap(short, long)]
    pub base_url: Option<String>,
    /// The path to the configuration file. This command line flag can be specified multiple times.
    #[clap(short, long)]
    pub conf: Option<Vec<PathBuf>>,
    /// The path to a YAML file describing the expected site behavior
    #[clap(short, long)]
    pub plan: Option<PathBuf>,
    /// Maximum number of requests per URL
    #[clap(long)]
    pub max_attempts: Option<u32>,
    /// Delay between two requests to the same URL, in seconds
    #[clap(long)]
    pub delay: Option<f64>,
    /// Timeout of each individual request, in seconds
    #[clap(long)]
    pub request_timeout: Option<f64>,
    /// Overall time limit per URL, in seconds
    #[clap(long)]
    pub deadline: Option<f64>,
}

/// Configuration file settings of the verifier
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VerifierConf {
    /// Base URL of the site
    pub base_url: Option<String>,
    /// The path to a YAML file describing the expected site behavior
    pub plan: Option<PathBuf>,
    /// Maximum number of requests per URL
    pub max_attempts: u32,
    /// Delay between two requests to the same URL, in seconds
    pub delay: f64,
    /// Timeout of each individual request, in seconds
    pub request_timeout: f64,
    /// Overall time limit per URL, in seconds
    pub deadline: Option<f64>,
}

impl Default for VerifierConf {
    fn default() -> Self {
        let budget = RetryBudget::default();
        Self {
            base_url: None,
            plan: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: budget.delay.as_secs_f64(),
            request_timeout: budget.request_timeout.as_secs_f64(),
            deadline: None,
        }
    }
}

fn read_mapping(path: &Path) -> Result<Mapping, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })?;
    let value: Value =
        serde_yaml::from_reader(BufReader::new(file)).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
    match value {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        _ => Err(ConfigError::NotAMapping(path.to_owned())),
    }
}

fn seconds(name: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|err| ConfigError::InvalidSetting {
        name,
        message: err.to_string(),
    })
}

impl VerifierConf {
    /// Loads configuration from a list of YAML files. Top-level settings of later files override
    /// the ones found in earlier files. An empty list produces the configuration defaults.
    pub fn load_from_files<P: AsRef<Path>>(paths: &[P]) -> Result<Self, ConfigError> {
        let mut merged = Mapping::new();
        let mut last_path = PathBuf::new();
        for path in paths {
            for (key, value) in read_mapping(path.as_ref())? {
                merged.insert(key, value);
            }
            last_path = path.as_ref().to_owned();
        }
        serde_yaml::from_value(Value::Mapping(merged)).map_err(|source| ConfigError::Parse {
            path: last_path,
            source,
        })
    }

    /// Merges the command line options into the current configuration. Any command line options
    /// present overwrite existing settings.
    pub fn merge_with_opt(&mut self, opt: VerifierOpt) {
        if opt.base_url.is_some() {
            self.base_url = opt.base_url;
        }

        if opt.plan.is_some() {
            self.plan = opt.plan;
        }

        if let Some(max_attempts) = opt.max_attempts {
            self.max_attempts = max_attempts;
        }

        if let Some(delay) = opt.delay {
            self.delay = delay;
        }

        if let Some(request_timeout) = opt.request_timeout {
            self.request_timeout = request_timeout;
        }

        if opt.deadline.is_some() {
            self.deadline = opt.deadline;
        }
    }

    /// Base URL of the site, required
    pub fn base_url(&self) -> Result<&str, ConfigError> {
        match self.base_url.as_deref() {
            Some(base_url) if !base_url.is_empty() => Ok(base_url),
            _ => Err(ConfigError::MissingBaseUrl),
        }
    }

    /// Produces the validated retry budget.
    pub fn budget(&self) -> Result<RetryBudget, ConfigError> {
        let mut budget = RetryBudget::new(self.max_attempts, seconds("delay", self.delay)?)
            .with_request_timeout(seconds("request_timeout", self.request_timeout)?);
        if let Some(deadline) = self.deadline {
            budget = budget.with_deadline(seconds("deadline", deadline)?);
        }
        budget.validate()?;
        Ok(budget)
    }

    /// Loads the configured site plan or produces the default plan.
    pub fn site_plan(&self) -> Result<SitePlan, ConfigError> {
        match &self.plan {
            Some(path) => SitePlan::load_from_yaml(path),
            None => Ok(SitePlan::default()),
        }
    }
}
