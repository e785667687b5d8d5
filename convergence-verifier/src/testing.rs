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

//! Scripted HTTP client for tests

use async_trait::async_trait;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::probe::{HttpGetter, ProbeError, ProbeResult};

pub(crate) type Outcome = Result<ProbeResult, ProbeError>;

pub(crate) fn response(status: u16, content_type: &str, body: &'static str) -> Outcome {
    let mut headers = HeaderMap::new();
    if !content_type.is_empty() {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_str(content_type).unwrap(),
        );
    }
    Ok(ProbeResult {
        status: StatusCode::from_u16(status).unwrap(),
        body: Bytes::from_static(body.as_bytes()),
        headers,
    })
}

pub(crate) fn status(status: u16) -> Outcome {
    response(status, "", "")
}

pub(crate) fn transport(message: &str) -> Outcome {
    Err(ProbeError::Transport(message.to_owned()))
}

/// Answers each URL with a scripted sequence of outcomes, the last one repeating forever.
/// URLs without a script never respond.
#[derive(Debug, Default)]
pub(crate) struct ScriptedGetter {
    scripts: Mutex<HashMap<String, Vec<Outcome>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGetter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn script(self, url: &str, outcomes: Vec<Outcome>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_owned(), outcomes);
        self
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| *call == url)
            .count()
    }
}

#[async_trait]
impl HttpGetter for ScriptedGetter {
    async fn get(&self, url: &str, _timeout: Duration) -> Outcome {
        self.calls.lock().unwrap().push(url.to_owned());

        let outcome = {
            let mut scripts = self.scripts.lock().unwrap();
            scripts.get_mut(url).map(|script| {
                if script.len() > 1 {
                    script.remove(0)
                } else {
                    script[0].clone()
                }
            })
        };

        match outcome {
            Some(outcome) => outcome,
            None => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                transport("no response")
            }
        }
    }
}
