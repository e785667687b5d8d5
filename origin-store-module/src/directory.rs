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

//! Origin store backed by a directory

use log::trace;
use mime_guess::MimeGuess;
use std::fs;
use std::io::{Error, ErrorKind};
use std::path::{Path, PathBuf};

use crate::store::{OriginStore, StoredObject};

/// Origin store serving regular files below a root directory
///
/// Directories are never objects, only the files within them are. The content type of an object
/// is guessed from its file extension. Content type and `Cache-Control` values passed to
/// [`OriginStore::put`] are not persisted.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Creates a new store for the given root directory. This will canonicalize the path to the
    /// root directory and might result in an error if that path isn’t accessible.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("{root:?} is not a directory"),
            ));
        }
        Ok(Self { root })
    }

    /// Canonical path of the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_to_path(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path
    }
}

impl OriginStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        let path = match self.key_to_path(key).canonicalize() {
            Ok(path) => path,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            // A file in place of a parent directory
            Err(err) if err.raw_os_error() == Some(20) => return Ok(None),
            Err(err) => return Err(err),
        };

        if !path.starts_with(&self.root) {
            trace!("path {path:?} for key {key} is outside the root directory");
            return Err(ErrorKind::InvalidData.into());
        }

        let meta = path.metadata()?;
        if !meta.is_file() {
            trace!("path {path:?} for key {key} is not a regular file");
            return Ok(None);
        }

        let content_type = MimeGuess::from_path(&path)
            .first_or_octet_stream()
            .to_string();
        let mut object = StoredObject::new(fs::read(&path)?, content_type);
        object.last_modified = meta.modified().ok();
        Ok(Some(object))
    }

    fn put(&self, key: &str, object: StoredObject) -> Result<(), Error> {
        let path = self.key_to_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &object.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    fn root_path() -> PathBuf {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("testdata");
        path.push("root");
        path
    }

    #[test]
    fn reads_files() {
        let store = DirectoryStore::new(root_path()).unwrap();

        let object = store.get("file.txt").unwrap().unwrap();
        assert_eq!(object.body, "Hi!\n");
        assert_eq!(object.content_type, "text/plain");
        assert!(object.last_modified.is_some());
        assert!(object.cache_control.is_none());

        let object = store.get("about/index.html").unwrap().unwrap();
        assert_eq!(object.content_type, "text/html");
        assert!(object.body.starts_with(b"<!doctype html>"));

        let object = store.get("style.css").unwrap().unwrap();
        assert_eq!(object.content_type, "text/css");
    }

    #[test]
    fn missing_objects() {
        let store = DirectoryStore::new(root_path()).unwrap();

        assert!(store.get("missing.txt").unwrap().is_none());
        assert!(store.get("nonexistent/index.html").unwrap().is_none());
        assert!(store.get("about").unwrap().is_none());
        assert!(store.get("empty").unwrap().is_none());
        assert!(store.get("file.txt/index.html").unwrap().is_none());
    }

    #[test]
    fn root_must_be_directory() {
        assert!(DirectoryStore::new(root_path().join("file.txt")).is_err());
        assert!(DirectoryStore::new(root_path().join("missing")).is_err());
    }

    #[test]
    fn writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirectoryStore::new(dir.path()).unwrap();

        store
            .put(
                "about/index.html",
                StoredObject::new("<p>About</p>", "text/html; charset=utf-8"),
            )
            .unwrap();
        assert_eq!(
            fs::read_to_string(dir.path().join("about").join("index.html")).unwrap(),
            "<p>About</p>"
        );

        let object = store.get("about/index.html").unwrap().unwrap();
        assert_eq!(object.body, "<p>About</p>");
        assert_eq!(object.content_type, "text/html");
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_outside_root() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "secret").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret.txt"),
            dir.path().join("link.txt"),
        )
        .unwrap();

        let store = DirectoryStore::new(dir.path()).unwrap();
        assert_eq!(
            store.get("link.txt").unwrap_err().kind(),
            ErrorKind::InvalidData
        );
    }
}
