//! Store wrapper whose saves can be made to fail on demand

use super::{GraphStore, OpenStore, SqliteStore, StorageError, StorageResult};
use crate::graph::{Context, ContextId};
use std::sync::atomic::{AtomicBool, Ordering};

pub(crate) struct FailingStore {
    inner: SqliteStore,
    fail_saves: AtomicBool,
}

impl FailingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            fail_saves: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl GraphStore for FailingStore {
    fn save_context(&self, context: &Context) -> StorageResult<u64> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")));
        }
        self.inner.save_context(context)
    }

    fn load_context(&self, id: &ContextId) -> StorageResult<Option<Context>> {
        self.inner.load_context(id)
    }

    fn delete_context(&self, id: &ContextId) -> StorageResult<bool> {
        self.inner.delete_context(id)
    }

    fn list_contexts(&self) -> StorageResult<Vec<ContextId>> {
        self.inner.list_contexts()
    }

    fn context_version(&self, id: &ContextId) -> StorageResult<Option<u64>> {
        self.inner.context_version(id)
    }
}
