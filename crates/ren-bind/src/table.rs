//! Per-signature dispatch tables.
//!
//! One table exists per `(arguments, output)` type pair. Ids index into the
//! table, are handed out in insertion order and never change.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::trace;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use ren_abi::{RenCell, RenEngineHandle, RenResult};
use ren_engine::{Engine, NativeFailure};
use ren_values::IntoCell;

use crate::identity::{Dispatch, ShimId};
use crate::invoke::invoke;
use crate::signature::FromStack;

pub type HostCallable<Args, R> = Arc<dyn Fn(Args) -> Result<R, NativeFailure> + Send + Sync>;

pub struct TableEntry<Args, R> {
    pub engine: RenEngineHandle,
    /// Resolved once at registration so calls skip the engine directory.
    pub home: Weak<Engine>,
    pub fun: HostCallable<Args, R>,
}

impl<Args, R> TableEntry<Args, R> {
    /// The owning engine while it is alive and open.
    pub fn live_engine(&self) -> Option<Arc<Engine>> {
        self.home.upgrade().filter(|engine| !engine.is_closed())
    }
}

impl<Args, R> Clone for TableEntry<Args, R> {
    fn clone(&self) -> Self {
        TableEntry {
            engine: self.engine,
            home: Weak::clone(&self.home),
            fun: Arc::clone(&self.fun),
        }
    }
}

pub struct SignatureTable<Args, R> {
    entries: Mutex<Vec<TableEntry<Args, R>>>,
}

static TABLES: Lazy<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

impl<Args: 'static, R: 'static> SignatureTable<Args, R> {
    /// The process-wide table for this signature, created on first use.
    pub fn shared() -> Arc<Self> {
        let key = TypeId::of::<(Args, R)>();
        if let Some(table) = TABLES.read().get(&key) {
            if let Ok(table) = Arc::clone(table).downcast::<Self>() {
                return table;
            }
        }

        let mut tables = TABLES.write();
        if let Some(table) = tables.get(&key) {
            if let Ok(table) = Arc::clone(table).downcast::<Self>() {
                return table;
            }
        }
        trace!(
            "created signature table {}",
            std::any::type_name::<(Args, R)>()
        );
        let table = Arc::new(SignatureTable::<Args, R> {
            entries: Mutex::new(Vec::new()),
        });
        tables.insert(key, table.clone());
        table
    }

    /// Append an entry and return its id. Only called inside a capture
    /// window, which keeps ids in step with captured shims.
    pub(crate) fn insert(&self, engine: &Engine, fun: HostCallable<Args, R>) -> ShimId {
        let mut entries = self.entries.lock();
        entries.push(TableEntry {
            engine: engine.handle(),
            home: engine.downgrade(),
            fun,
        });
        ShimId((entries.len() - 1) as u32)
    }

    /// Id the next `insert` will return.
    pub(crate) fn next_id(&self) -> ShimId {
        ShimId(self.entries.lock().len() as u32)
    }

    /// Copy of entry `id`; the lock is released before this returns.
    pub fn lookup(&self, id: ShimId) -> Option<TableEntry<Args, R>> {
        self.entries.lock().get(id.0 as usize).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Args, R> Dispatch for SignatureTable<Args, R>
where
    Args: FromStack + 'static,
    R: IntoCell + 'static,
{
    unsafe fn dispatch(&self, id: ShimId, stack: *mut RenCell) -> RenResult {
        invoke(self, id, stack)
    }
}
