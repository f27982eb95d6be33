use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crm_core::TenantId;

use crate::StoreError;

/// Durable home of the "last selected tenant id".
///
/// A store holds exactly one value. `save(None)` records that the selection
/// was cleared.
pub trait TenantStore: Send + Sync {
    fn load(&self) -> Result<Option<TenantId>, StoreError>;
    fn save(&self, tenant_id: Option<&TenantId>) -> Result<(), StoreError>;
}

impl<S> TenantStore for Arc<S>
where
    S: TenantStore + ?Sized,
{
    fn load(&self) -> Result<Option<TenantId>, StoreError> {
        (**self).load()
    }

    fn save(&self, tenant_id: Option<&TenantId>) -> Result<(), StoreError> {
        (**self).save(tenant_id)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    value: Option<TenantId>,
    writes: usize,
    fail_writes: bool,
}

/// In-memory store for tests/dev.
///
/// Clones share the same cell, which lets a test simulate a reload by
/// bootstrapping a second scope over a clone.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTenantStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(tenant_id: TenantId) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.inner.write() {
            state.value = Some(tenant_id);
        }
        store
    }

    /// Make every subsequent `save` fail (storage unavailable / quota).
    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut state) = self.inner.write() {
            state.fail_writes = fail;
        }
    }

    pub fn value(&self) -> Option<TenantId> {
        self.inner.read().ok().and_then(|s| s.value.clone())
    }

    /// Number of successful writes.
    pub fn writes(&self) -> usize {
        self.inner.read().map(|s| s.writes).unwrap_or_default()
    }
}

impl TenantStore for InMemoryTenantStore {
    fn load(&self) -> Result<Option<TenantId>, StoreError> {
        let state = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        Ok(state.value.clone())
    }

    fn save(&self, tenant_id: Option<&TenantId>) -> Result<(), StoreError> {
        let mut state = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))?;
        if state.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        state.value = tenant_id.cloned();
        state.writes += 1;
        Ok(())
    }
}

/// On-disk layout of [`FileTenantStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTenant {
    pub tenant_id: Option<TenantId>,
    pub saved_at: DateTime<Utc>,
}

/// JSON-file store, one small document per user profile directory.
#[derive(Debug, Clone)]
pub struct FileTenantStore {
    path: PathBuf,
}

impl FileTenantStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full persisted record, including when it was written.
    pub fn load_record(&self) -> Result<Option<PersistedTenant>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

impl TenantStore for FileTenantStore {
    fn load(&self) -> Result<Option<TenantId>, StoreError> {
        Ok(self.load_record()?.and_then(|r| r.tenant_id))
    }

    fn save(&self, tenant_id: Option<&TenantId>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let record = PersistedTenant {
            tenant_id: tenant_id.cloned(),
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;

        // Write-then-rename so a crash never leaves a half-written file.
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
