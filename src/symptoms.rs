use lmdb::{Cursor, Database, RwTransaction, Transaction, WriteFlags};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::keys::encode_id;
use crate::model::Symptom;
use crate::{next_sequence, Db, META, RECORDS};

/// CRUD over the `records` namespace.
#[derive(Clone, Debug)]
pub struct SymptomStore {
    db: Db,
    records: Database,
    meta: Database,
}

impl SymptomStore {
    pub fn new(db: &Db) -> Result<Self> {
        let records = db.namespace(RECORDS)?;
        let meta = db.namespace(META)?;
        Ok(Self {
            db: db.clone(),
            records,
            meta,
        })
    }

    /// Every symptom in ascending id order.
    pub fn all(&self) -> Result<Vec<Symptom>> {
        self.db.read(|txn| self.all_in(txn))
    }

    pub fn one(&self, id: u64) -> Result<Symptom> {
        self.db.read(|txn| self.one_in(txn, id))
    }

    /// Stores a new symptom under the next id in the sequence.
    pub fn create(&self, title: &str, author: &str, description: &str) -> Result<Symptom> {
        self.db.write(|txn| self.create_in(txn, title, author, description))
    }

    /// Overwrites the symptom stored under `symptom.id`.
    ///
    /// There is no existence check: an unknown id is written as a new entry
    /// without touching the sequence.
    pub fn update(&self, symptom: &Symptom) -> Result<()> {
        self.db.write(|txn| self.update_in(txn, symptom))
    }

    /// Removes the symptom if present. Missing ids are not an error.
    pub fn delete(&self, id: u64) -> Result<()> {
        self.db.write(|txn| self.delete_in(txn, id))
    }

    pub(crate) fn all_in<T: Transaction>(&self, txn: &T) -> Result<Vec<Symptom>> {
        let mut cursor = txn.open_ro_cursor(self.records)?;
        let mut symptoms = Vec::new();
        for (_key, value) in cursor.iter() {
            symptoms.push(decode(value)?);
        }
        Ok(symptoms)
    }

    pub(crate) fn one_in<T: Transaction>(&self, txn: &T, id: u64) -> Result<Symptom> {
        match txn.get(self.records, &encode_id(id)) {
            Ok(bytes) => decode(bytes),
            Err(lmdb::Error::NotFound) => Err(StoreError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn create_in(
        &self,
        txn: &mut RwTransaction<'_>,
        title: &str,
        author: &str,
        description: &str,
    ) -> Result<Symptom> {
        let id = next_sequence(txn, self.meta, RECORDS)?;
        let symptom = Symptom {
            id,
            title: title.to_string(),
            author: author.to_string(),
            description: description.to_string(),
        };
        self.put(txn, &symptom)?;
        debug!(id, "created symptom");
        Ok(symptom)
    }

    pub(crate) fn update_in(&self, txn: &mut RwTransaction<'_>, symptom: &Symptom) -> Result<()> {
        self.put(txn, symptom)?;
        debug!(id = symptom.id, "updated symptom");
        Ok(())
    }

    pub(crate) fn delete_in(&self, txn: &mut RwTransaction<'_>, id: u64) -> Result<()> {
        match txn.del(self.records, &encode_id(id), None) {
            Ok(()) => {
                debug!(id, "deleted symptom");
                Ok(())
            }
            Err(lmdb::Error::NotFound) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, txn: &mut RwTransaction<'_>, symptom: &Symptom) -> Result<()> {
        let bytes = serde_json::to_vec(symptom).map_err(|e| StoreError::Encode(e.to_string()))?;
        txn.put(self.records, &encode_id(symptom.id), &bytes, WriteFlags::empty())?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> Result<Symptom> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))
}
