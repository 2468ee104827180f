//! End-to-end persistence and recovery tests for the memory store.
//!
//! Covers alignment across restarts, journal replay, crash windows
//! between snapshot renames and journal truncation, and corrupt files.

use std::fs::OpenOptions;
use std::io::Write;

use pretty_assertions::assert_eq;

use e2e_tests::{insert_vectors, random_vectors, TestHarness, TEST_DIMENSION};
use memory_embeddings::Embedding;
use memory_vector::{
    write_vector_snapshot, FlatIndex, MemoryStore, MetadataTable, VectorError, JOURNAL_FILE,
    METADATA_SNAPSHOT_FILE, VECTOR_SNAPSHOT_FILE,
};

fn assert_aligned(store: &MemoryStore) {
    assert_eq!(store.vector_count(), store.metadata_count());
    for (expected, record) in store.records().enumerate() {
        assert_eq!(record.position, expected as u64);
        assert!(store.vector(record.position).is_some());
    }
}

#[test]
fn test_alignment_survives_restarts_at_every_interval() {
    for interval in [0, 1, 3, 64] {
        let harness = TestHarness::new();
        let vectors = random_vectors(20, TEST_DIMENSION, 7);
        {
            let mut store = harness.open_store(interval);
            insert_vectors(&mut store, &vectors[..12]);
            assert_aligned(&store);
        }
        {
            let mut store = harness.open_store(interval);
            assert_eq!(store.len(), 12, "interval {}", interval);
            insert_vectors(&mut store, &vectors[..20]);
            // First 12 paths are duplicates
            assert_eq!(store.len(), 20);
        }
        let store = harness.open_store(interval);
        assert_aligned(&store);
        assert_eq!(store.len(), 20);
    }
}

#[test]
fn test_round_trip_preserves_vectors_and_rankings() {
    let harness = TestHarness::new();
    let vectors = random_vectors(50, TEST_DIMENSION, 42);
    let queries = random_vectors(5, TEST_DIMENSION, 99);

    let before: Vec<_> = {
        let mut store = harness.open_store(16);
        insert_vectors(&mut store, &vectors);
        store.checkpoint().unwrap();
        queries
            .iter()
            .map(|q| store.search_vector(q, 5).unwrap())
            .collect()
    };

    let store = harness.open_store(16);
    for (position, original) in vectors.iter().enumerate() {
        let stored = store.vector(position as u64).unwrap();
        let stored_bits: Vec<u32> = stored.iter().map(|v| v.to_bits()).collect();
        let original_bits: Vec<u32> = original.iter().map(|v| v.to_bits()).collect();
        assert_eq!(stored_bits, original_bits);
    }
    let after: Vec<_> = queries
        .iter()
        .map(|q| store.search_vector(q, 5).unwrap())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn test_crash_after_vector_snapshot_before_metadata_snapshot() {
    let harness = TestHarness::new();
    let vectors = random_vectors(3, TEST_DIMENSION, 1);
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &vectors);
    }

    // Vector snapshot renamed into place; metadata snapshot and journal
    // truncation never happened.
    let data: Vec<f32> = vectors.iter().flatten().copied().collect();
    let index = FlatIndex::from_parts(TEST_DIMENSION, data).unwrap();
    write_vector_snapshot(&harness.store_file(VECTOR_SNAPSHOT_FILE), &index).unwrap();

    let store = harness.open_store(0);
    assert_aligned(&store);
    assert_eq!(store.len(), 3);
    assert_eq!(store.get(2).unwrap().path, "/bulk/2.txt");
}

#[test]
fn test_crash_after_both_snapshots_before_journal_truncate() {
    let harness = TestHarness::new();
    let vectors = random_vectors(4, TEST_DIMENSION, 2);
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &vectors);
    }
    let journal = std::fs::read(harness.store_file(JOURNAL_FILE)).unwrap();
    {
        let mut store = harness.open_store(0);
        store.checkpoint().unwrap();
    }
    // Put the already-compacted frames back
    std::fs::write(harness.store_file(JOURNAL_FILE), &journal).unwrap();

    let mut store = harness.open_store(0);
    assert_eq!(store.len(), 4);
    assert_aligned(&store);

    let outcome = store
        .insert_with("/bulk/new.txt", "fresh", |_, _| {
            Ok(Embedding::from_values(vec![0.5; TEST_DIMENSION]))
        })
        .unwrap();
    assert_eq!(outcome.position(), 4);
}

#[test]
fn test_torn_journal_tail_loses_only_last_insert() {
    let harness = TestHarness::new();
    let vectors = random_vectors(3, TEST_DIMENSION, 3);
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &vectors);
    }
    let path = harness.store_file(JOURNAL_FILE);
    let len = std::fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 10)
        .unwrap();

    let store = harness.open_store(0);
    assert_eq!(store.len(), 2);
    assert_aligned(&store);
}

#[test]
fn test_garbage_appended_to_journal_is_discarded() {
    let harness = TestHarness::new();
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &random_vectors(2, TEST_DIMENSION, 4));
    }
    let mut file = OpenOptions::new()
        .append(true)
        .open(harness.store_file(JOURNAL_FILE))
        .unwrap();
    file.write_all(b"\x10\x00\x00\x00garbage-bytes").unwrap();
    drop(file);

    let store = harness.open_store(0);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_unrecoverable_misalignment_is_fatal() {
    let harness = TestHarness::new();
    std::fs::create_dir_all(&harness.store_dir).unwrap();

    let index = FlatIndex::from_parts(TEST_DIMENSION, vec![0.1; TEST_DIMENSION]).unwrap();
    write_vector_snapshot(&harness.store_file(VECTOR_SNAPSHOT_FILE), &index).unwrap();
    let mut table = MetadataTable::new();
    table.put(0, "/a", "first").unwrap();
    table.put(1, "/b", "second").unwrap();
    table.save(&harness.store_file(METADATA_SNAPSHOT_FILE)).unwrap();

    let result = MemoryStore::open(harness.config(0), TEST_DIMENSION);
    assert!(matches!(
        result,
        Err(VectorError::Misaligned {
            vectors: 1,
            records: 2
        })
    ));
}

fn damage_metadata_line(harness: &TestHarness, position: usize) {
    let path = harness.store_file(METADATA_SNAPSHOT_FILE);
    let content = std::fs::read_to_string(&path).unwrap();
    let needle = format!("|doc {}\n", position);
    assert!(content.contains(&needle));
    let damaged = content.replace(&needle, &format!("|doc \\q {}\n", position));
    std::fs::write(&path, damaged).unwrap();
}

#[test]
fn test_unreadable_metadata_line_leaves_searchable_store() {
    let harness = TestHarness::new();
    let vectors = random_vectors(10, TEST_DIMENSION, 11);
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &vectors);
        store.checkpoint().unwrap();
    }
    damage_metadata_line(&harness, 4);

    let mut store = harness.open_store(0);
    assert_eq!(store.vector_count(), 10);
    assert_eq!(store.metadata_count(), 9);
    assert_eq!(store.stats().missing_records, 1);
    assert!(store.get(4).is_none());
    assert_eq!(store.get(9).unwrap().path, "/bulk/9.txt");

    let hits = store.search_vector(&vectors[4], 3).unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|hit| hit.path != "/bulk/4.txt"));
    assert_eq!(
        hits.iter().map(|hit| hit.rank).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    // The lost path is no longer known, so it indexes at the next position
    let outcome = store
        .insert_with("/bulk/4.txt", "doc 4 again", |_, _| {
            Ok(Embedding::from_values(vectors[4].clone()))
        })
        .unwrap();
    assert_eq!(outcome.position(), 10);
    store.checkpoint().unwrap();
    drop(store);

    let store = harness.open_store(0);
    assert_eq!(store.vector_count(), 11);
    assert_eq!(store.stats().missing_records, 1);
    assert_eq!(store.find_by_path("/bulk/4.txt").unwrap(), Some(10));
}

#[test]
fn test_journal_fills_unreadable_metadata_line() {
    let harness = TestHarness::new();
    let vectors = random_vectors(6, TEST_DIMENSION, 12);
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &vectors);
    }
    let journal = std::fs::read(harness.store_file(JOURNAL_FILE)).unwrap();
    {
        let mut store = harness.open_store(0);
        store.checkpoint().unwrap();
    }
    damage_metadata_line(&harness, 2);
    std::fs::write(harness.store_file(JOURNAL_FILE), &journal).unwrap();

    let store = harness.open_store(0);
    assert_aligned(&store);
    assert_eq!(store.stats().missing_records, 0);
    assert_eq!(store.get(2).unwrap().summary, "doc 2");
}

#[test]
fn test_corrupt_vector_snapshot_is_fatal() {
    let harness = TestHarness::new();
    {
        let mut store = harness.open_store(0);
        insert_vectors(&mut store, &random_vectors(2, TEST_DIMENSION, 5));
        store.checkpoint().unwrap();
    }
    let path = harness.store_file(VECTOR_SNAPSHOT_FILE);
    let mut bytes = std::fs::read(&path).unwrap();
    let middle = bytes.len() / 2;
    bytes[middle] ^= 0xff;
    std::fs::write(&path, &bytes).unwrap();

    let result = MemoryStore::open(harness.config(0), TEST_DIMENSION);
    assert!(matches!(result, Err(VectorError::Corrupt { .. })));
}

#[test]
fn test_legacy_metadata_lines_load() {
    let harness = TestHarness::new();
    std::fs::create_dir_all(&harness.store_dir).unwrap();
    let index = FlatIndex::from_parts(TEST_DIMENSION, vec![0.2; TEST_DIMENSION * 2]).unwrap();
    write_vector_snapshot(&harness.store_file(VECTOR_SNAPSHOT_FILE), &index).unwrap();
    std::fs::write(
        harness.store_file(METADATA_SNAPSHOT_FILE),
        "0|/home/u/notes.txt|Content Snippet: 'a | b...'\n\
         1|/home/u/log.txt|plain summary\n",
    )
    .unwrap();

    let store = harness.open_store(0);
    assert_eq!(store.get(0).unwrap().summary, "Content Snippet: 'a | b...'");
    assert_eq!(store.find_by_path("/home/u/log.txt").unwrap(), Some(1));
}

#[test]
fn test_legacy_metadata_with_backslashes_survives_checkpoint() {
    let harness = TestHarness::new();
    std::fs::create_dir_all(&harness.store_dir).unwrap();
    let index = FlatIndex::from_parts(TEST_DIMENSION, vec![0.3; TEST_DIMENSION * 2]).unwrap();
    write_vector_snapshot(&harness.store_file(VECTOR_SNAPSHOT_FILE), &index).unwrap();
    std::fs::write(
        harness.store_file(METADATA_SNAPSHOT_FILE),
        "0|/home/u/a.py|Content Snippet: 'print(\"a\\n\")...'\n\
         1|/home/u/re.txt|Content Snippet: '\\d+\\s\\t...'\n",
    )
    .unwrap();

    let expected = [
        r#"Content Snippet: 'print("a\n")...'"#,
        r"Content Snippet: '\d+\s\t...'",
    ];
    {
        let mut store = harness.open_store(0);
        assert_aligned(&store);
        assert_eq!(store.get(0).unwrap().summary, expected[0]);
        assert_eq!(store.get(1).unwrap().summary, expected[1]);
        store.checkpoint().unwrap();
    }

    // Rewritten in the escaped format, same content
    let store = harness.open_store(0);
    assert_aligned(&store);
    assert_eq!(store.get(0).unwrap().summary, expected[0]);
    assert_eq!(store.get(1).unwrap().summary, expected[1]);
}

#[test]
fn test_store_directory_is_exclusive() {
    let harness = TestHarness::new();
    let _store = harness.open_store(0);
    let second = MemoryStore::open(harness.config(0), TEST_DIMENSION);
    assert!(matches!(second, Err(VectorError::Locked(_))));
}
