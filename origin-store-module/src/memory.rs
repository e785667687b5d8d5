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

//! In-memory origin store

use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::sync::RwLock;

use crate::store::{OriginStore, StoredObject};

/// Origin store keeping all objects in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the store
    pub fn len(&self) -> usize {
        self.objects.read().map_or(0, |objects| objects.len())
    }

    /// Checks whether the store holds no objects
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> Error {
    Error::new(ErrorKind::Other, "memory store lock poisoned")
}

impl OriginStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<StoredObject>, Error> {
        Ok(self.objects.read().map_err(poisoned)?.get(key).cloned())
    }

    fn put(&self, key: &str, object: StoredObject) -> Result<(), Error> {
        self.objects
            .write()
            .map_err(poisoned)?
            .insert(key.to_owned(), object);
        Ok(())
    }
}
