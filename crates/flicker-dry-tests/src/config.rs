// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config store kept in memory, for assertion-config tests that should not
//! touch the user's config directory.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use flicker_config::{ConfigError, ConfigStore};

/// [`ConfigStore`] backed by a shared map. Clones see the same documents
/// and counters, so a test can hand one clone to `ConfigService` and
/// inspect the other.
#[derive(Clone, Default)]
pub struct InMemoryConfigStore {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    documents: HashMap<String, Vec<u8>>,
    loads: usize,
    saves: usize,
    fail_on_load: bool,
}

impl InMemoryConfigStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Seeds `key` with raw bytes, bypassing the counters. Used for
    /// documents `save` would never write, such as blank or malformed JSON.
    pub fn set_raw(&self, key: &str, bytes: &[u8]) {
        self.state().documents.insert(key.to_owned(), bytes.to_vec());
    }

    /// Makes every following `load_raw` fail with [`ConfigError::Other`].
    pub fn set_fail_on_load(&self, fail: bool) {
        self.state().fail_on_load = fail;
    }

    /// `load_raw` calls so far, failed ones included.
    pub fn load_count(&self) -> usize {
        self.state().loads
    }

    /// `save_raw` calls so far.
    pub fn save_count(&self) -> usize {
        self.state().saves
    }
}

impl ConfigStore for InMemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        let mut state = self.state();
        state.loads += 1;
        if state.fail_on_load {
            return Err(ConfigError::Other(format!("store unavailable for {key}")));
        }
        state.documents.get(key).cloned().ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let mut state = self.state();
        state.saves += 1;
        state.documents.insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}
