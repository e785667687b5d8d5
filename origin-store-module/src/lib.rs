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

//! # Origin Store Module for the static site edge
//!
//! This crate serves the site contents held by an origin store. The request path, typically
//! already rewritten by `index-rewrite-module`, is translated into an object key by removing the
//! leading slash and percent-decoding it. The object is looked up in an [`OriginStore`]:
//!
//! * [`DirectoryStore`] serves regular files from a directory, configured via the `origin_root`
//!   setting.
//! * [`MemoryStore`] keeps objects in memory, typically filled via [`seed_html_objects`].
//!
//! ## Supported functionality
//!
//! * `GET` and `HEAD` requests, other methods result in `405 Method Not Allowed`
//! * Conditional requests via `If-None-Match` and `If-Modified-Since` HTTP headers
//! * Configurable status for missing objects: `404 Not Found` by default, `403 Forbidden` to
//!   behave like a private storage bucket
//! * Default `Cache-Control` header for objects that don’t define their own
//!
//! Unlike a regular web server this handler never redirects and never looks for index files,
//! directories are not objects.
//!
//! ## Code example
//!
//! ```rust
//! use edge_module_utils::FromYaml;
//! use origin_store_module::{
//!     seed_html_objects, MemoryStore, OriginConf, OriginStoreHandler, SeedItem,
//! };
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! seed_html_objects(
//!     store.as_ref(),
//!     [SeedItem::new("index.html", "<h1>Hello</h1>")],
//! )
//! .unwrap();
//!
//! let conf = OriginConf::from_yaml("missing_object_status: 403").unwrap();
//! let handler = OriginStoreHandler::with_store(conf, store).unwrap();
//! assert_eq!(handler.conf().missing_object_status, 403);
//! ```

mod configuration;
mod directory;
mod handler;
mod key;
mod memory;
mod seed;
mod store;

pub use configuration::{OriginConf, OriginOpt};
pub use directory::DirectoryStore;
pub use handler::{OriginResponse, OriginStoreHandler};
pub use key::object_key;
pub use memory::MemoryStore;
pub use seed::{seed_html_objects, SeedItem, SEED_CACHE_CONTROL, SEED_CONTENT_TYPE};
pub use store::{OriginStore, StoredObject};
