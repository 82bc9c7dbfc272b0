use chrono::{DateTime, Duration, Utc};
use lmdb::{Cursor, Database, RwTransaction, Transaction, WriteFlags};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::keys::{event_key, parse_event_key};
use crate::model::{Event, EventKind, StoredEvent};
use crate::{Db, EVENTS};

/// Append-only audit log over the `events` namespace, keyed by timestamp.
#[derive(Clone, Debug)]
pub struct EventStore {
    db: Db,
    events: Database,
}

impl EventStore {
    pub fn new(db: &Db) -> Result<Self> {
        let events = db.namespace(EVENTS)?;
        Ok(Self {
            db: db.clone(),
            events,
        })
    }

    /// The whole log, oldest first.
    pub fn all(&self) -> Result<Vec<Event>> {
        self.db.read(|txn| self.scan(txn, |_| true))
    }

    /// Events referencing `record_id`, oldest first. Scans the full log.
    pub fn all_for_symptom(&self, record_id: u64) -> Result<Vec<Event>> {
        self.db.read(|txn| self.scan(txn, |e| e.record_id == record_id))
    }

    pub fn record_added(&self, record_id: u64) -> Result<()> {
        self.append(EventKind::RecordAdded, record_id).map(|_| ())
    }

    pub fn record_removed(&self, record_id: u64) -> Result<()> {
        self.append(EventKind::RecordRemoved, record_id).map(|_| ())
    }

    pub fn record_updated(&self, record_id: u64) -> Result<()> {
        self.append(EventKind::RecordUpdated, record_id).map(|_| ())
    }

    /// Appends an event stamped with the current time.
    pub fn append(&self, kind: EventKind, record_id: u64) -> Result<Event> {
        self.append_at(kind, record_id, Utc::now())
    }

    /// Appends an event stamped with `time`.
    ///
    /// If another event already owns that instant the stamp is moved forward
    /// one nanosecond at a time until a free key is found, so no entry is ever
    /// overwritten. The returned event carries the stamp actually stored.
    pub fn append_at(&self, kind: EventKind, record_id: u64, time: DateTime<Utc>) -> Result<Event> {
        self.db.write(|txn| self.append_in(txn, kind, record_id, time))
    }

    pub(crate) fn append_in(
        &self,
        txn: &mut RwTransaction<'_>,
        kind: EventKind,
        record_id: u64,
        time: DateTime<Utc>,
    ) -> Result<Event> {
        let stored = StoredEvent { kind, record_id };
        let bytes = serde_json::to_vec(&stored).map_err(|e| StoreError::Encode(e.to_string()))?;

        let mut time = time;
        loop {
            let key = event_key(&time);
            match txn.put(self.events, &key, &bytes, WriteFlags::NO_OVERWRITE) {
                Ok(()) => {
                    debug!(%key, ?kind, record_id, "appended event");
                    return Ok(Event::from_stored(time, stored));
                }
                Err(lmdb::Error::KeyExist) => {
                    debug!(%key, "event key taken, nudging timestamp");
                    time = time + Duration::nanoseconds(1);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn scan<T, P>(&self, txn: &T, keep: P) -> Result<Vec<Event>>
    where
    T: Transaction,
    P: Fn(&StoredEvent) -> bool,
    {
        let mut cursor = txn.open_ro_cursor(self.events)?;
        let mut events = Vec::new();
        for (key, value) in cursor.iter() {
            let stored: StoredEvent =
                serde_json::from_slice(value).map_err(|e| StoreError::Decode(e.to_string()))?;
            if !keep(&stored) {
                continue;
            }
            let time = parse_event_key(key)?;
            events.push(Event::from_stored(time, stored));
        }
        Ok(events)
    }
}
