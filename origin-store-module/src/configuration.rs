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

//! Data structures required for `OriginStoreHandler` configuration

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command line options of the origin store module
#[derive(Debug, Default, Parser)]
pub struct OriginOpt {
    /// The directory holding the site contents.
    #[clap(long)]
    pub origin_root: Option<PathBuf>,

    /// Status code to respond with if an object doesn’t exist, either 404 or 403.
    #[clap(long)]
    pub missing_object_status: Option<u16>,

    /// Cache-Control header to send with objects that don’t define their own.
    #[clap(long)]
    pub cache_control: Option<String>,
}

/// Configuration file settings of the origin store module
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OriginConf {
    /// The directory holding the site contents.
    pub origin_root: Option<PathBuf>,

    /// Status code to respond with if an object doesn’t exist, either 404 or 403. The latter
    /// mirrors the behavior of a private storage bucket.
    pub missing_object_status: u16,

    /// Cache-Control header to send with objects that don’t define their own.
    pub cache_control: Option<String>,
}

impl OriginConf {
    /// Merges the command line options into the current configuration. Any command line options
    /// present overwrite existing settings.
    pub fn merge_with_opt(&mut self, opt: OriginOpt) {
        if opt.origin_root.is_some() {
            self.origin_root = opt.origin_root;
        }

        if let Some(missing_object_status) = opt.missing_object_status {
            self.missing_object_status = missing_object_status;
        }

        if opt.cache_control.is_some() {
            self.cache_control = opt.cache_control;
        }
    }
}

impl Default for OriginConf {
    fn default() -> Self {
        Self {
            origin_root: None,
            missing_object_status: 404,
            cache_control: None,
        }
    }
}
