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

//! Mapping of request paths to default documents

use std::borrow::Cow;

/// Determines the path to be requested from the origin store for the given request path.
///
/// `index_document` is the file name served for directory-style requests, usually `index.html`.
/// The path is expected to start with `/` and to have query string and fragment removed already.
/// Paths without the leading slash are treated as relative to the root. The function never fails
/// and only allocates if the path actually changes.
pub fn normalize_path<'a>(path: &'a str, index_document: &str) -> Cow<'a, str> {
    if path.is_empty() || path == "/" {
        return format!("/{index_document}").into();
    }

    let mut result = if path.starts_with('/') {
        Cow::Borrowed(path)
    } else {
        Cow::Owned(format!("/{path}"))
    };

    if result.ends_with('/') {
        result.to_mut().push_str(index_document);
        return result;
    }

    let last_segment = match result.rfind('/') {
        Some(pos) => &result[pos + 1..],
        None => &result[..],
    };
    if !last_segment.contains('.') {
        let result = result.to_mut();
        result.push('/');
        result.push_str(index_document);
    }

    result
}
