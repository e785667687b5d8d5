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

//! Translation of request paths into object keys

use percent_encoding::percent_decode_str;
use std::io::{Error, ErrorKind};

/// Derives the object key from a (rewritten) request path: the leading slash is removed and each
/// path segment is percent-decoded.
///
/// This will result in an [`ErrorKind::InvalidInput`] error if the path doesn’t start with a
/// slash, names no object at all or contains empty, `.` or `..` segments. Segments that don’t
/// decode to valid UTF-8 or that contain a slash after decoding are rejected the same way.
pub fn object_key(path: &str) -> Result<String, Error> {
    let path = path.strip_prefix('/').ok_or(ErrorKind::InvalidInput)?;

    let mut key = String::with_capacity(path.len());
    for segment in path.split('/') {
        let decoded = percent_decode_str(segment)
            .decode_utf8()
            .map_err(|_| Error::from(ErrorKind::InvalidInput))?;
        if decoded.is_empty() || decoded == "." || decoded == ".." || decoded.contains('/') {
            return Err(ErrorKind::InvalidInput.into());
        }

        if !key.is_empty() {
            key.push('/');
        }
        key.push_str(&decoded);
    }
    Ok(key)
}
