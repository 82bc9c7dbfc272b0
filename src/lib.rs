pub mod config;
pub mod error;
pub mod events;
pub mod keys;
pub mod ledger;
pub mod model;
pub mod parser;
pub mod server;
pub mod symptoms;
pub mod views;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags, RoTransaction, RwTransaction, Transaction};
use tracing::debug;

pub use crate::error::{Result, StoreError};
pub use crate::events::EventStore;
pub use crate::ledger::Ledger;
pub use crate::model::{Event, EventKind, Symptom};
pub use crate::symptoms::SymptomStore;

/// Namespace holding the symptom records.
pub const RECORDS: &str = "records";
/// Namespace holding the audit log.
pub const EVENTS: &str = "events";
/// Namespace holding per-namespace sequence counters.
pub const META: &str = "meta";

const MAX_NAMESPACES: u32 = 3;

/// Tuning knobs for the underlying LMDB environment.
#[derive(Debug, Clone, Copy)]
pub struct DbOptions {
    /// Upper bound on the size of the store file, in bytes.
    pub map_size: usize,
    /// Maximum number of concurrent read transactions.
    pub max_readers: u32,
}

impl Default for DbOptions {
    fn default() -> Self {
        Self {
            map_size: 1024 * 1024 * 1024,
            max_readers: 126,
        }
    }
}

/// Shared handle to the single-file embedded store.
///
/// Cloning is cheap; every clone refers to the same environment, so all
/// repositories built from it share one writer lock.
#[derive(Clone)]
pub struct Db {
    env: Arc<Environment>,
    path: PathBuf,
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
        .field("path", &self.path)
        .finish()
    }
}

impl Db {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, DbOptions::default())
    }

    pub fn open_with(path: &Path, options: DbOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Reader slots are held per transaction, not per thread.
        let mut flags = EnvironmentFlags::NO_SUB_DIR;
        flags.insert(EnvironmentFlags::NO_TLS);

        let mut builder = Environment::new();
        builder.set_flags(flags);
        builder.set_max_dbs(MAX_NAMESPACES);
        builder.set_map_size(options.map_size);
        builder.set_max_readers(options.max_readers);

        let env = builder.open_with_permissions(path, 0o600)?;
        debug!(path = %path.display(), map_size = options.map_size, "opened store");

        Ok(Self {
            env: Arc::new(env),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the named namespace, creating it first if it does not exist.
    pub fn namespace(&self, name: &str) -> Result<Database> {
        let db = self.env.create_db(Some(name), DatabaseFlags::empty())?;
        Ok(db)
    }

    /// Runs `f` inside a read-only snapshot.
    pub fn read<T, F>(&self, f: F) -> Result<T>
    where
    F: FnOnce(&RoTransaction<'_>) -> Result<T>,
    {
        let txn = self.env.begin_ro_txn()?;
        let out = f(&txn);
        txn.abort();
        out
    }

    /// Runs `f` inside the exclusive write transaction.
    ///
    /// The transaction commits only when `f` returns `Ok`; any error aborts
    /// every write made inside it.
    pub fn write<T, F>(&self, f: F) -> Result<T>
    where
    F: FnOnce(&mut RwTransaction<'_>) -> Result<T>,
    {
        let mut txn = self.env.begin_rw_txn()?;
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }

    /// Flushes buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.env.sync(true)?;
        Ok(())
    }
}

/// Advances and returns the sequence counter for `namespace`.
///
/// The first value handed out is 1. Counters live in the `meta` namespace as
/// 8-byte big-endian integers.
pub(crate) fn next_sequence(txn: &mut RwTransaction<'_>, meta: Database, namespace: &str) -> Result<u64> {
    let current = match txn.get(meta, &namespace) {
        Ok(bytes) => keys::decode_id(bytes)?,
        Err(lmdb::Error::NotFound) => 0,
        Err(e) => return Err(e.into()),
    };

    let next = current + 1;
    txn.put(meta, &namespace, &keys::encode_id(next), lmdb::WriteFlags::empty())?;
    Ok(next)
}
