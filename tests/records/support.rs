//! Shared fixtures: registry, handles, and a failure-injecting store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cabinet::{
    BackingStore, Cabinet, CabinetConfig, ChangeOp, InMemoryStore, Predicate, Registry, Row,
    StoreError, StoreResult, Uuid,
};

use super::models::{Comment, Invoice, LineItem, Payment, Ticket};

pub fn registry() -> Registry {
    Registry::builder()
        .register::<Invoice>()
        .register::<LineItem>()
        .register::<Payment>()
        .build()
        .expect("invoice registry is valid")
}

pub fn ticket_cabinet() -> Cabinet<InMemoryStore> {
    let registry = Registry::builder()
        .register::<Ticket>()
        .register::<Comment>()
        .build()
        .expect("ticket registry is valid");
    Cabinet::with_store(InMemoryStore::new(), CabinetConfig::default(), registry)
}

pub fn memory_cabinet() -> Cabinet<InMemoryStore> {
    Cabinet::with_store(InMemoryStore::new(), CabinetConfig::default(), registry())
}

/// In-memory store with switchable failures and an optional query delay.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: InMemoryStore,
    fail_query: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
    fail_delete_of: Arc<Mutex<Option<String>>>,
    query_delay: Arc<Mutex<Option<Duration>>>,
}

impl FaultyStore {
    pub fn fail_queries(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commit.store(fail, Ordering::SeqCst);
    }

    pub fn fail_batch_delete_of(&self, entity: Option<&str>) {
        *self.fail_delete_of.lock().unwrap() = entity.map(str::to_string);
    }

    pub fn delay_queries(&self, delay: Duration) {
        *self.query_delay.lock().unwrap() = Some(delay);
    }
}

impl BackingStore for FaultyStore {
    fn query(&self, entity: &str, predicate: &Predicate) -> StoreResult<Vec<Row>> {
        let delay = *self.query_delay.lock().unwrap();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(StoreError::Io("read error".into()));
        }
        self.inner.query(entity, predicate)
    }

    fn batch_delete(&self, entity: &str, field: &str, ids: &[Uuid]) -> StoreResult<usize> {
        if self.fail_delete_of.lock().unwrap().as_deref() == Some(entity) {
            return Err(StoreError::Backend(format!("cannot delete from {}", entity)));
        }
        self.inner.batch_delete(entity, field, ids)
    }

    fn commit(&self, ops: &[ChangeOp]) -> StoreResult<()> {
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("disk full".into()));
        }
        self.inner.commit(ops)
    }
}

pub fn faulty_cabinet(config: CabinetConfig) -> (Cabinet<FaultyStore>, FaultyStore) {
    let store = FaultyStore::default();
    (Cabinet::with_store(store.clone(), config, registry()), store)
}
