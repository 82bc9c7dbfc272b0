use chrono::Utc;
use tracing::info;

use crate::error::Result;
use crate::events::EventStore;
use crate::model::{EventKind, Symptom};
use crate::symptoms::SymptomStore;
use crate::Db;

/// Pairs each symptom mutation with its audit entry in one write transaction.
///
/// Either both the record change and the event are committed, or neither is.
/// Callers that want the looser two-step behaviour use the stores directly.
#[derive(Clone, Debug)]
pub struct Ledger {
    db: Db,
    symptoms: SymptomStore,
    events: EventStore,
}

impl Ledger {
    pub fn new(db: &Db) -> Result<Self> {
        Ok(Self {
            db: db.clone(),
            symptoms: SymptomStore::new(db)?,
            events: EventStore::new(db)?,
        })
    }

    pub fn symptoms(&self) -> &SymptomStore {
        &self.symptoms
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn create(&self, title: &str, author: &str, description: &str) -> Result<Symptom> {
        let symptom = self.db.write(|txn| {
            let symptom = self.symptoms.create_in(txn, title, author, description)?;
            self.events.append_in(txn, EventKind::RecordAdded, symptom.id, Utc::now())?;
            Ok(symptom)
        })?;
        info!(id = symptom.id, "symptom added");
        Ok(symptom)
    }

    /// Upserts like [`SymptomStore::update`], logging an update event.
    pub fn update(&self, symptom: &Symptom) -> Result<()> {
        self.db.write(|txn| {
            self.symptoms.update_in(txn, symptom)?;
            self.events.append_in(txn, EventKind::RecordUpdated, symptom.id, Utc::now())?;
            Ok(())
        })?;
        info!(id = symptom.id, "symptom updated");
        Ok(())
    }

    /// Deletes the symptom and logs the removal, even when it was already gone.
    pub fn remove(&self, id: u64) -> Result<()> {
        self.db.write(|txn| {
            self.symptoms.delete_in(txn, id)?;
            self.events.append_in(txn, EventKind::RecordRemoved, id, Utc::now())?;
            Ok(())
        })?;
        info!(id, "symptom removed");
        Ok(())
    }
}
