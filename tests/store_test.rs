//! Integration tests for the symptom and event stores

use std::sync::{Arc, Barrier, Mutex};

use chrono::Utc;
use symptoms::{Db, DbOptions, EventKind, EventStore, StoreError, Symptom, SymptomStore};
use tempfile::TempDir;

/// Helper to open both stores over one fresh store file
fn create_stores() -> (SymptomStore, EventStore, TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = Db::open(&temp_dir.path().join("data.db")).unwrap();
    let symptoms = SymptomStore::new(&db).unwrap();
    let events = EventStore::new(&db).unwrap();
    (symptoms, events, temp_dir)
}

#[test]
fn test_create_then_one_returns_same_record() {
    let (symptoms, _, _temp) = create_stores();

    let inputs = [
        ("Headache", "Alice", "Throbbing pain"),
        ("", "", ""),
        ("Ünïcödé 🤒", "李", "line one\nline two \"quoted\""),
    ];
    for (title, author, description) in inputs {
        let created = symptoms.create(title, author, description).unwrap();
        assert_eq!(created.title, title);
        assert_eq!(created.author, author);
        assert_eq!(created.description, description);
        assert_eq!(symptoms.one(created.id).unwrap(), created);
    }
}

#[test]
fn test_all_is_in_ascending_id_order() {
    let (symptoms, _, _temp) = create_stores();

    // Enough ids to cross a byte boundary in the key encoding
    for i in 0..300 {
        symptoms.create(&format!("s{}", i), "a", "d").unwrap();
    }
    // Upserts at ids out of sequence land in order too
    for id in [1000, 500, 301] {
        symptoms
            .update(&Symptom { id, title: "late".into(), author: "a".into(), description: "d".into() })
            .unwrap();
    }

    let ids: Vec<u64> = symptoms.all().unwrap().iter().map(|s| s.id).collect();
    assert_eq!(ids.len(), 303);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(ids[0], 1);
    assert_eq!(*ids.last().unwrap(), 1000);
}

#[test]
fn test_update_touches_only_target() {
    let (symptoms, _, _temp) = create_stores();
    let a = symptoms.create("Headache", "Alice", "Throbbing pain").unwrap();
    let b = symptoms.create("Fatigue", "Bob", "Low energy").unwrap();

    let changed = Symptom {
        title: "Migraine".into(),
        description: "Worse with light".into(),
        ..a.clone()
    };
    symptoms.update(&changed).unwrap();

    assert_eq!(symptoms.one(a.id).unwrap(), changed);
    assert_eq!(symptoms.one(b.id).unwrap(), b);
    assert_eq!(symptoms.all().unwrap().len(), 2);
}

#[test]
fn test_update_of_missing_id_creates_it() {
    let (symptoms, _, _temp) = create_stores();
    let ghost = Symptom { id: 42, title: "t".into(), author: "a".into(), description: "d".into() };

    symptoms.update(&ghost).unwrap();

    assert_eq!(symptoms.one(42).unwrap(), ghost);
    // The sequence is untouched by the upsert
    assert_eq!(symptoms.create("next", "a", "d").unwrap().id, 1);
}

#[test]
fn test_delete_then_one_is_not_found() {
    let (symptoms, _, _temp) = create_stores();
    let s = symptoms.create("Headache", "Alice", "Throbbing pain").unwrap();

    symptoms.delete(s.id).unwrap();

    let err = symptoms.one(s.id).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(err, StoreError::NotFound(id) if id == s.id));
}

#[test]
fn test_delete_missing_is_ok() {
    let (symptoms, _, _temp) = create_stores();
    symptoms.delete(7).unwrap();
    symptoms.delete(7).unwrap();
}

#[test]
fn test_one_on_empty_store_is_not_found() {
    let (symptoms, _, _temp) = create_stores();
    assert!(symptoms.one(1).unwrap_err().is_not_found());
}

#[test]
fn test_record_added_is_visible_for_symptom() {
    let (_, events, _temp) = create_stores();
    events.record_added(9).unwrap();
    events.record_removed(3).unwrap();

    let before = Utc::now();
    events.record_added(3).unwrap();
    let after = Utc::now();

    let for_three = events.all_for_symptom(3).unwrap();
    assert_eq!(for_three.len(), 2);
    let added: Vec<_> = for_three.iter().filter(|e| e.kind == EventKind::RecordAdded).collect();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].record_id, 3);
    assert!(added[0].time >= before);
    assert!(added[0].time <= after);
}

#[test]
fn test_event_log_is_in_ascending_time_order() {
    let (_, events, _temp) = create_stores();

    for i in 0..50 {
        if i % 3 == 0 {
            events.record_removed(i).unwrap();
        } else {
            events.record_added(i).unwrap();
        }
    }

    let all = events.all().unwrap();
    assert_eq!(all.len(), 50);
    assert!(all.windows(2).all(|w| w[0].time < w[1].time));
    // Insertion order is preserved by the time ordering
    let ids: Vec<u64> = all.iter().map(|e| e.record_id).collect();
    assert_eq!(ids, (0..50).collect::<Vec<u64>>());
}

#[test]
fn test_event_for_deleted_symptom_survives() {
    let (symptoms, events, _temp) = create_stores();
    let s = symptoms.create("Cough", "Carol", "Dry").unwrap();
    events.record_added(s.id).unwrap();

    symptoms.delete(s.id).unwrap();

    assert_eq!(events.all_for_symptom(s.id).unwrap().len(), 1);
}

#[test]
fn test_data_survives_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("data.db");

    {
        let db = Db::open(&path).unwrap();
        let symptoms = SymptomStore::new(&db).unwrap();
        let events = EventStore::new(&db).unwrap();
        let s = symptoms.create("Headache", "Alice", "Throbbing pain").unwrap();
        events.record_added(s.id).unwrap();
        db.sync().unwrap();
    }

    let db = Db::open(&path).unwrap();
    let symptoms = SymptomStore::new(&db).unwrap();
    let events = EventStore::new(&db).unwrap();
    assert_eq!(symptoms.all().unwrap().len(), 1);
    assert_eq!(events.all().unwrap().len(), 1);
    // The sequence is persisted, not recomputed
    assert_eq!(symptoms.create("Fatigue", "Bob", "Low energy").unwrap().id, 2);
}

#[test]
fn test_end_to_end_scenario() {
    let (symptoms, events, _temp) = create_stores();

    let headache = symptoms.create("Headache", "Alice", "Throbbing pain").unwrap();
    assert_eq!(headache.id, 1);
    events.record_added(1).unwrap();

    let fatigue = symptoms.create("Fatigue", "Bob", "Low energy").unwrap();
    assert_eq!(fatigue.id, 2);
    events.record_added(2).unwrap();

    let for_one = events.all_for_symptom(1).unwrap();
    assert_eq!(for_one.len(), 1);
    assert_eq!(for_one[0].record_id, 1);
    assert_eq!(for_one[0].kind, EventKind::RecordAdded);

    let ids: Vec<u64> = symptoms.all().unwrap().iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![1, 2]);

    symptoms.delete(1).unwrap();
    assert!(symptoms.one(1).unwrap_err().is_not_found());
    assert_eq!(symptoms.all().unwrap(), vec![fatigue]);
}

#[test]
fn test_more_reader_threads_than_reader_slots() {
    let temp_dir = tempfile::tempdir().unwrap();
    let options = DbOptions { max_readers: 8, ..DbOptions::default() };
    let db = Db::open_with(&temp_dir.path().join("data.db"), options).unwrap();
    let symptoms = SymptomStore::new(&db).unwrap();
    symptoms.create("Headache", "Alice", "Throbbing pain").unwrap();

    // One read at a time, and every thread stays alive until all have read,
    // so only slots pinned to finished reads could run out.
    let threads = 40;
    let barrier = Arc::new(Barrier::new(threads));
    let turn = Arc::new(Mutex::new(()));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let symptoms = symptoms.clone();
            let barrier = Arc::clone(&barrier);
            let turn = Arc::clone(&turn);
            std::thread::spawn(move || {
                let res = {
                    let _turn = turn.lock().unwrap();
                    symptoms.all().map(|all| all.len())
                };
                barrier.wait();
                res
            })
        })
        .collect();

    for h in handles {
        assert_eq!(h.join().unwrap().unwrap(), 1);
    }
}

#[test]
fn test_concurrent_writers_get_distinct_ids() {
    let (symptoms, events, _temp) = create_stores();

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let symptoms = symptoms.clone();
            let events = events.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    let s = symptoms.create(&format!("t{}-{}", t, i), "a", "d").unwrap();
                    events.record_added(s.id).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let ids: Vec<u64> = symptoms.all().unwrap().iter().map(|s| s.id).collect();
    assert_eq!(ids, (1..=200).collect::<Vec<u64>>());
    assert_eq!(events.all().unwrap().len(), 200);
}
