//! File-backed relationship store
//!
//! Records live in one JSON document keyed by scope reference:
//!
//! ```json
//! {
//!   "scopes": {
//!     "o:workspace:41": [
//!       { "subject": "o:user:7", "role": "editor", "qualifier": "o:dataset:42" }
//!     ]
//!   }
//! }
//! ```
//!
//! The document is rewritten after every record, so an interrupted batch
//! leaves the records applied so far on disk and nothing half-written.

use anyhow::{Context, Result};
use oid::{Oid, TypeRegistry};
use reconcile::{
    Applied, BackendError, CancelToken, Grant, GrantSpec, MutationOutcome, RelationshipBackend,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// On-disk shape of the store
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    scopes: BTreeMap<String, Vec<GrantSpec>>,
}

/// Relationship backend persisting to a JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    registry: TypeRegistry,
    /// Serializes read-modify-write cycles between threads
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, registry: TypeRegistry) -> Self {
        Self {
            path: path.into(),
            registry,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scopes that hold at least one record
    pub fn scopes(&self) -> Result<Vec<Oid>> {
        let document = self.read()?;
        document
            .scopes
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(scope, _)| {
                Oid::parse(&self.registry, scope)
                    .with_context(|| format!("Corrupt store {}", self.path.display()))
            })
            .collect()
    }

    /// Records held under `scope`
    pub fn records(&self, scope: &Oid) -> Result<BTreeSet<Grant>> {
        let document = self.read()?;
        self.resolve(scope, &document)
    }

    fn resolve(&self, scope: &Oid, document: &StoreDocument) -> Result<BTreeSet<Grant>> {
        let key = scope.to_string();
        let Some(specs) = document.scopes.get(&key) else {
            return Ok(BTreeSet::new());
        };
        specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                spec.resolve(&self.registry, &format!("scopes[{key:?}][{i}]"))
                    .with_context(|| format!("Corrupt store {}", self.path.display()))
            })
            .collect()
    }

    fn read(&self) -> Result<StoreDocument> {
        if !self.path.exists() {
            log::debug!("Store {} does not exist yet", self.path.display());
            return Ok(StoreDocument::default());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read store: {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse store: {}", self.path.display()))
    }

    fn write(&self, document: &StoreDocument) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
        }
        let content =
            serde_json::to_string_pretty(document).context("Failed to serialize store")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write store: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace store: {}", self.path.display()))?;
        Ok(())
    }

    fn store_records(document: &mut StoreDocument, scope: &Oid, records: &BTreeSet<Grant>) {
        document
            .scopes
            .insert(scope.to_string(), records.iter().map(GrantSpec::from).collect());
    }

    /// Apply creates then deletes, flushing after each record.
    ///
    /// `on_record` runs once a record is on disk.
    fn apply_batch(
        &self,
        scope: &Oid,
        creates: &[Grant],
        deletes: &[Grant],
        cancel: &CancelToken,
        mut on_record: impl FnMut(&Grant),
    ) -> MutationOutcome {
        let mut applied = Applied::default();
        let Ok(_guard) = self.lock.lock() else {
            return MutationOutcome::failure(
                applied,
                BackendError::Unavailable("store lock poisoned".to_string()),
            );
        };

        let loaded = self
            .read()
            .and_then(|document| self.resolve(scope, &document).map(|r| (document, r)));
        let (mut document, mut records) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return MutationOutcome::failure(applied, unavailable(&e)),
        };

        let operations = creates
            .iter()
            .map(|g| (true, g))
            .chain(deletes.iter().map(|g| (false, g)));
        for (create, grant) in operations {
            if let Err(e) = cancel.check() {
                return MutationOutcome::failure(applied, e);
            }

            if create {
                records.insert(grant.clone());
            } else {
                records.remove(grant);
            }
            Self::store_records(&mut document, scope, &records);
            if let Err(e) = self.write(&document) {
                return MutationOutcome::failure(applied, unavailable(&e));
            }

            log::trace!("{scope}: {} {grant}", if create { "created" } else { "deleted" });
            if create {
                applied.created.push(grant.clone());
            } else {
                applied.deleted.push(grant.clone());
            }
            on_record(grant);
        }
        MutationOutcome::success(applied)
    }
}

fn unavailable(err: &anyhow::Error) -> BackendError {
    BackendError::Unavailable(format!("{err:#}"))
}

impl RelationshipBackend for FileStore {
    fn list(&self, scope: &Oid, cancel: &CancelToken) -> Result<Vec<Grant>, BackendError> {
        cancel.check()?;
        let records = self.records(scope).map_err(|e| unavailable(&e))?;
        Ok(records.into_iter().collect())
    }

    fn mutate_batch(
        &self,
        scope: &Oid,
        creates: &[Grant],
        deletes: &[Grant],
        cancel: &CancelToken,
    ) -> MutationOutcome {
        self.apply_batch(scope, creates, deletes, cancel, |_| {})
    }
}
