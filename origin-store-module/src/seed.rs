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

//! Seeding HTML content into an origin store

use bytes::Bytes;
use log::info;
use std::io::Error;
use std::time::SystemTime;

use crate::store::{OriginStore, StoredObject};

/// Content type of seeded objects
pub const SEED_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// `Cache-Control` header of seeded objects, keeps edge caches from serving stale content
pub const SEED_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";

/// An HTML document to be written into an origin store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedItem {
    /// Object key, e.g. `about/index.html`
    pub key: String,
    /// Document contents
    pub html: Bytes,
}

impl SeedItem {
    /// Creates a new seed item.
    pub fn new(key: impl Into<String>, html: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            html: html.into(),
        }
    }
}

/// Writes HTML documents into the store, replacing existing objects with the same keys.
///
/// Stops at the first store error.
pub fn seed_html_objects<S>(
    store: &S,
    items: impl IntoIterator<Item = SeedItem>,
) -> Result<usize, Error>
where
    S: OriginStore + ?Sized,
{
    let now = SystemTime::now();
    let mut count = 0;
    for item in items {
        info!("seeding object {} ({} bytes)", item.key, item.html.len());
        let object = StoredObject::new(item.html, SEED_CONTENT_TYPE)
            .with_cache_control(SEED_CACHE_CONTROL)
            .with_last_modified(now);
        store.put(&item.key, object)?;
        count += 1;
    }
    info!("seed complete: {count} objects written");
    Ok(count)
}
