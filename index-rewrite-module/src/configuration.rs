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

//! Command line options and configuration file settings of the index rewrite module

use clap::Parser;
use serde::Deserialize;

/// Default document served for directory-style requests
pub const DEFAULT_INDEX_DOCUMENT: &str = "index.html";

/// Command line options of the index rewrite module
#[derive(Debug, Default, Parser)]
pub struct IndexRewriteOpt {
    /// File name to serve when a directory is requested, e.g. index.html
    #[clap(long)]
    pub index_document: Option<String>,
}

/// Configuration file settings of the index rewrite module
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IndexRewriteConf {
    /// File name to serve when a directory is requested. It has to be a single path segment
    /// containing a dot, so that rewritten paths are never rewritten again.
    pub index_document: String,
}

impl IndexRewriteConf {
    /// Merges the command line options into the current configuration. Any command line options
    /// present overwrite existing settings.
    pub fn merge_with_opt(&mut self, opt: IndexRewriteOpt) {
        if let Some(index_document) = opt.index_document {
            self.index_document = index_document;
        }
    }
}

impl Default for IndexRewriteConf {
    fn default() -> Self {
        Self {
            index_document: DEFAULT_INDEX_DOCUMENT.to_owned(),
        }
    }
}
