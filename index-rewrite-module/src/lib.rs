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

//! # Index Rewrite Module for the static site edge
//!
//! This crate maps directory-style request paths onto the default document of the directory
//! before the origin store is consulted. The rewrite is internal: the client never sees a
//! redirect, the request URI is merely changed for the handlers running afterwards.
//!
//! The decision is made by [`normalize_path`], evaluated in this order:
//!
//! * `/` (or an empty path) becomes `/index.html`
//! * a path ending with `/` gets the default document appended: `/about/` → `/about/index.html`
//! * a path whose final segment has no `.` is treated as a directory: `/about` →
//!   `/about/index.html`
//! * anything else names a file and stays unchanged: `/style.css`, `/about/index.html`
//!
//! Whether the resulting object exists is not this module’s concern. A missing object is reported
//! by the origin store as usual.
//!
//! The default document can be changed in the configuration file:
//!
//! ```yaml
//! index_document: default.htm
//! ```
//!
//! ## Code example
//!
//! The handler is normally chained before the origin store handler:
//!
//! ```rust
//! use edge_module_utils::{FromYaml, RequestFilter};
//! use index_rewrite_module::IndexRewriteHandler;
//!
//! let conf = <IndexRewriteHandler as RequestFilter>::Conf::from_yaml("index_document: index.htm")
//!     .unwrap();
//! let handler: IndexRewriteHandler = conf.try_into().unwrap();
//! assert_eq!(handler.rewrite("/docs/"), "/docs/index.htm");
//! ```

mod configuration;
mod handler;
mod normalize;

pub use configuration::{IndexRewriteConf, IndexRewriteOpt, DEFAULT_INDEX_DOCUMENT};
pub use handler::IndexRewriteHandler;
pub use normalize::normalize_path;
