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

//! Origin store abstraction and stored object metadata

use bytes::Bytes;
use http::{header, HeaderMap};
use httpdate::fmt_http_date;
use sha2::{Digest, Sha256};
use std::fmt::Debug;
use std::io::Error;
use std::time::SystemTime;

/// An object held by an origin store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object contents
    pub body: Bytes,
    /// Value of the `Content-Type` header sent along with the object
    pub content_type: String,
    /// Value of the `Cache-Control` header sent along with the object, if any
    pub cache_control: Option<String>,
    /// Time of the last modification if known
    pub last_modified: Option<SystemTime>,
}

impl StoredObject {
    /// Creates a new object with given contents and content type.
    pub fn new(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            content_type: content_type.into(),
            cache_control: None,
            last_modified: None,
        }
    }

    /// Sets the `Cache-Control` header value for the object.
    pub fn with_cache_control(mut self, cache_control: impl Into<String>) -> Self {
        self.cache_control = Some(cache_control.into());
        self
    }

    /// Sets the last modification time of the object.
    pub fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Object size in bytes
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }

    /// Last modified time in the format `Fri, 15 May 2015 15:34:21 GMT` if known
    pub fn modified(&self) -> Option<String> {
        self.last_modified.map(fmt_http_date)
    }

    /// ETag header for the object, derived from the object contents. Replacing an object changes
    /// its ETag even if size and modification time stay the same.
    pub fn etag(&self) -> String {
        let digest = Sha256::digest(&self.body);
        format!("\"{}\"", hex::encode(&digest[..16]))
    }

    /// Checks `If-None-Match` and `If-Modified-Since` request headers to determine whether
    /// a `304 Not Modified` response should be produced.
    pub fn is_not_modified(&self, headers: &HeaderMap) -> bool {
        if let Some(value) = headers
            .get(header::IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok())
        {
            let etag = self.etag();
            value == "*" || value.split(',').map(str::trim).any(|value| value == etag)
        } else if let Some(value) = headers
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|value| value.to_str().ok())
        {
            self.modified().is_some_and(|modified| modified == value)
        } else {
            false
        }
    }
}

/// Key-value store holding the site contents
///
/// Keys are object keys as produced by [`object_key`](crate::object_key), e.g. `index.html` or
/// `about/index.html`.
pub trait OriginStore: Debug + Send + Sync {
    /// Looks up an object. Returns `Ok(None)` if there is no object with this key.
    fn get(&self, key: &str) -> Result<Option<StoredObject>, Error>;

    /// Stores an object, replacing any existing object with the same key.
    fn put(&self, key: &str, object: StoredObject) -> Result<(), Error>;
}
