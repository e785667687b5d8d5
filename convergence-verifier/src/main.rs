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

//! `site-verify` polls a published static site until it converges and verifies its responses.

use clap::Parser;
use convergence_verifier::{
    verify_site, ConfigError, ReqwestGetter, SitePlan, Verifier, VerifierConf, VerifierOpt,
};
use log::{error, info};
use std::process::ExitCode;
use std::sync::Arc;

struct Setup {
    base_url: String,
    plan: SitePlan,
    verifier: Verifier,
}

fn setup(opt: VerifierOpt) -> Result<Setup, ConfigError> {
    let mut conf = VerifierConf::load_from_files(opt.conf.as_deref().unwrap_or(&[]))?;
    conf.merge_with_opt(opt);

    let base_url = conf.base_url()?.to_owned();
    let plan = conf.site_plan()?;
    let getter = Arc::new(ReqwestGetter::new()?);
    let verifier = Verifier::new(getter, conf.budget()?)?;
    Ok(Setup {
        base_url,
        plan,
        verifier,
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let setup = match setup(VerifierOpt::parse()) {
        Ok(setup) => setup,
        Err(err) => {
            error!("{err}");
            return ExitCode::from(2);
        }
    };

    let report = verify_site(&setup.verifier, &setup.base_url, &setup.plan).await;
    if report.is_success() {
        info!("all {} checks of {} passed", report.checked, setup.base_url);
        ExitCode::SUCCESS
    } else {
        for failure in &report.failures {
            error!("{failure}");
        }
        error!(
            "{} of {} checks of {} failed",
            report.failures.len(),
            report.checked,
            setup.base_url
        );
        ExitCode::FAILURE
    }
}
