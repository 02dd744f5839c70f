//! Persisted envelope store.
//!
//! One envelope per relationship with a target service: alias + card +
//! identity + enrollment URL, keyed by a human-chosen context name.
//! Envelopes are written before browser automation starts, so a crashed
//! run never strands an unrecorded alias or card. Tombstoning marks a
//! deliberately terminated envelope without erasing its history.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{PaneError, Result};
use crate::identity::Identity;
use crate::providers::{AliasResult, CardResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub name: String,
    pub identity: Identity,
    pub alias: AliasResult,
    pub card: CardResult,
    #[serde(default)]
    pub enrollment_url: Option<String>,
    pub created_at: u64,
    #[serde(default)]
    pub tombstoned: bool,
}

/// JSON-file backed store. The envelope set for one user is tiny, so the
/// whole map is rewritten on every mutation.
pub struct ContextStore {
    path: PathBuf,
}

impl ContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the platform data dir.
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pane")
            .join("contexts.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Envelope>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_all(&self, envelopes: &BTreeMap<String, Envelope>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(envelopes)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Persist a new envelope. The name must be unused.
    pub fn save(
        &self,
        name: &str,
        identity: Identity,
        alias: AliasResult,
        card: CardResult,
        enrollment_url: Option<String>,
    ) -> Result<Envelope> {
        let mut envelopes = self.read_all()?;
        if envelopes.contains_key(name) {
            return Err(PaneError::ContextExists(name.to_string()));
        }
        let envelope = Envelope {
            name: name.to_string(),
            identity,
            alias,
            card,
            enrollment_url,
            created_at: unix_now(),
            tombstoned: false,
        };
        envelopes.insert(name.to_string(), envelope.clone());
        self.write_all(&envelopes)?;
        Ok(envelope)
    }

    /// Apply a mutation to an existing envelope.
    pub fn update(&self, name: &str, f: impl FnOnce(&mut Envelope)) -> Result<Envelope> {
        let mut envelopes = self.read_all()?;
        let envelope = envelopes
            .get_mut(name)
            .ok_or_else(|| PaneError::ContextNotFound(name.to_string()))?;
        f(envelope);
        let updated = envelope.clone();
        self.write_all(&envelopes)?;
        Ok(updated)
    }

    pub fn get(&self, name: &str) -> Result<Envelope> {
        self.read_all()?
            .remove(name)
            .ok_or_else(|| PaneError::ContextNotFound(name.to_string()))
    }

    /// All envelopes, tombstoned included, in name order.
    pub fn list(&self) -> Result<Vec<Envelope>> {
        Ok(self.read_all()?.into_values().collect())
    }

    /// Mark an envelope terminated (alias burned, card frozen).
    pub fn tombstone(&self, name: &str) -> Result<Envelope> {
        self.update(name, |envelope| envelope.tombstoned = true)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity;

    fn sample(name: &str) -> (Identity, AliasResult, CardResult) {
        let id = identity::generate(Some(name));
        let alias = AliasResult {
            id: format!("alias-{name}"),
            email: format!("{name}@alias.example"),
        };
        let card = CardResult {
            token: format!("card-{name}"),
            last_four: "4242".to_string(),
        };
        (id, alias, card)
    }

    fn temp_store() -> (tempfile::TempDir, ContextStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContextStore::new(dir.path().join("contexts.json"));
        (dir, store)
    }

    #[test]
    fn save_get_list_round_trip() {
        let (_dir, store) = temp_store();
        let (id, alias, card) = sample("maple-circuit");
        store
            .save("maple-circuit", id, alias, card, Some("https://example.com".into()))
            .unwrap();

        let envelope = store.get("maple-circuit").unwrap();
        assert_eq!(envelope.alias.email, "maple-circuit@alias.example");
        assert!(!envelope.tombstoned);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_name_rejected() {
        let (_dir, store) = temp_store();
        let (id, alias, card) = sample("frost-anvil");
        store.save("frost-anvil", id.clone(), alias.clone(), card.clone(), None).unwrap();
        let err = store.save("frost-anvil", id, alias, card, None).unwrap_err();
        assert!(matches!(err, PaneError::ContextExists(_)));
    }

    #[test]
    fn tombstone_preserves_envelope() {
        let (_dir, store) = temp_store();
        let (id, alias, card) = sample("cobalt-weir");
        store.save("cobalt-weir", id, alias, card, None).unwrap();

        let envelope = store.tombstone("cobalt-weir").unwrap();
        assert!(envelope.tombstoned);
        assert_eq!(store.list().unwrap().len(), 1, "tombstoned stays listed");
    }

    #[test]
    fn update_missing_context_errors() {
        let (_dir, store) = temp_store();
        let err = store.update("nope", |_| {}).unwrap_err();
        assert!(matches!(err, PaneError::ContextNotFound(_)));
    }
}
