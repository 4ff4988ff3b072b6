//! In-memory group store.
//!
//! Holds the configured groups as read from the groups file together with the
//! effective configuration the pipeline works from. The resync loop is the
//! only writer of the derived pool set; readers always get cloned snapshots.

use crate::error::{AppError, AppResult};
use buybot_core::{normalize_address, ChainId, GroupConfig, GroupId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct StoredGroup {
    /// As read from the groups file.
    configured: GroupConfig,
    /// `configured` plus the derived pool set.
    effective: GroupConfig,
}

impl StoredGroup {
    fn new(configured: GroupConfig) -> Self {
        Self {
            effective: configured.clone(),
            configured,
        }
    }

    /// Take `next` from the file, keeping the derived pool set when the
    /// group still points at the same chain, token and configured pools.
    fn refreshed(&self, next: GroupConfig) -> Self {
        let mut effective = next.clone();
        if self.configured.source_key() == next.source_key()
            && self.configured.pool_set() == next.pool_set()
        {
            effective.pair_address = self.effective.pair_address.clone();
            effective.all_pair_addresses = self.effective.all_pair_addresses.clone();
        }
        Self {
            configured: next,
            effective,
        }
    }
}

/// Parse a groups file: a JSON object keyed by group (chat) id.
pub fn parse_groups(content: &str) -> AppResult<Vec<GroupConfig>> {
    let raw: BTreeMap<String, GroupConfig> = serde_json::from_str(content)?;
    raw.into_iter()
        .map(|(key, mut group)| {
            group.group_id = key
                .trim()
                .parse()
                .map_err(|_| AppError::Config(format!("Invalid group id: {key}")))?;
            Ok(group)
        })
        .collect()
}

pub struct GroupStore {
    path: Option<PathBuf>,
    groups: RwLock<BTreeMap<GroupId, StoredGroup>>,
}

impl GroupStore {
    /// Store backed by no file; `reload` is a no-op.
    pub fn from_groups(groups: Vec<GroupConfig>) -> Self {
        let groups = groups
            .into_iter()
            .map(|g| (g.group_id, StoredGroup::new(g)))
            .collect();
        Self {
            path: None,
            groups: RwLock::new(groups),
        }
    }

    /// Load the groups file. Read and parse errors are fatal here.
    pub fn load_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            AppError::Config(format!("Failed to read groups file {}: {e}", path.display()))
        })?;
        let groups = parse_groups(&content)?;
        info!(path = %path.display(), groups = groups.len(), "Groups loaded");

        let mut store = Self::from_groups(groups);
        store.path = Some(path);
        Ok(store)
    }

    /// Re-read the groups file.
    ///
    /// Groups that fail validation are skipped and keep their previous
    /// version if they had one. On read or parse errors the store is left
    /// untouched and the error returned.
    pub fn reload(&self) -> AppResult<usize> {
        let Some(path) = &self.path else {
            return Ok(self.len());
        };
        let content = std::fs::read_to_string(path)?;
        let next = parse_groups(&content)?;

        let mut groups = self.groups.write();
        let mut updated = BTreeMap::new();
        for group in next {
            let id = group.group_id;
            let previous = groups.remove(&id);
            if let Err(e) = group.validate() {
                warn!(group_id = id, error = %e, "Skipping invalid group config");
                if let Some(previous) = previous {
                    updated.insert(id, previous);
                }
                continue;
            }
            let stored = match previous {
                Some(previous) => previous.refreshed(group),
                None => {
                    info!(group_id = id, chain = %group.chain, token = %group.token_key(), "Group added");
                    StoredGroup::new(group)
                }
            };
            updated.insert(id, stored);
        }
        for id in groups.keys() {
            info!(group_id = *id, "Group removed");
        }
        *groups = updated;
        debug!(groups = groups.len(), "Groups reloaded");
        Ok(groups.len())
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    pub fn get(&self, id: GroupId) -> Option<GroupConfig> {
        self.groups.read().get(&id).map(|g| g.effective.clone())
    }

    pub fn snapshot(&self) -> Vec<GroupConfig> {
        self.groups
            .read()
            .values()
            .map(|g| g.effective.clone())
            .collect()
    }

    /// Group ids per chain, both in ascending order.
    pub fn ids_by_chain(&self) -> BTreeMap<ChainId, Vec<GroupId>> {
        let mut by_chain: BTreeMap<ChainId, Vec<GroupId>> = BTreeMap::new();
        for (id, group) in self.groups.read().iter() {
            by_chain
                .entry(group.effective.chain.clone())
                .or_default()
                .push(*id);
        }
        by_chain
    }

    /// Group ids on `chain`, ascending.
    pub fn ids_for_chain(&self, chain: &ChainId) -> Vec<GroupId> {
        self.groups
            .read()
            .iter()
            .filter(|(_, group)| group.effective.chain == *chain)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Replace a group's derived pool set. Returns false for unknown groups
    /// and empty lists.
    pub fn set_pool_set(&self, id: GroupId, pools: Vec<String>) -> bool {
        if pools.is_empty() {
            return false;
        }
        match self.groups.write().get_mut(&id) {
            Some(group) => {
                group.effective.set_pool_set(pools);
                true
            }
            None => false,
        }
    }

    /// Groups on `chain` whose pool set contains `pool`.
    pub fn groups_for_pool(&self, chain: &ChainId, pool: &str) -> Vec<GroupConfig> {
        let pool = normalize_address(pool);
        self.groups
            .read()
            .values()
            .filter(|g| g.effective.chain == *chain && g.effective.tracks_pool(&pool))
            .map(|g| g.effective.clone())
            .collect()
    }
}
