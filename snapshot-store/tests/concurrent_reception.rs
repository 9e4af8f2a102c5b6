mod common;

use snapshot_store::{FileBasedSnapshotStoreFactory, SnapshotId};

#[tokio::test]
async fn concurrent_reception_uses_distinct_pending_dirs() {
    let (_sender_dir, chunks) =
        common::sender_chunks(1, 0, &[("a.txt", "hello"), ("b.txt", "world")]).await;

    let receiver_dir = tempfile::tempdir().unwrap();
    let factory = FileBasedSnapshotStoreFactory::new("receiver", receiver_dir.path());
    let store = factory.create_receivable_snapshot_store(0).unwrap();

    let id = SnapshotId::new(1, 0, 0, 0);
    let receiver_a = store.new_received_snapshot(id).await;
    let receiver_b = store.new_received_snapshot(id).await;

    for chunk in &chunks {
        assert!(receiver_a.apply(chunk.clone()).await);
        assert!(receiver_b.apply(chunk.clone()).await);
    }

    let pending_dir = receiver_dir.path().join("partition-0").join("pending");
    let mut entries: Vec<_> = std::fs::read_dir(&pending_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["1-0-0-0-1".to_string(), "1-0-0-0-2".to_string()]);

    for name in &entries {
        let mut files: Vec<_> = std::fs::read_dir(pending_dir.join(name))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();
        assert_eq!(files, vec!["a.txt".to_string(), "b.txt".to_string()]);
    }

    let first = receiver_a.persist().await.unwrap();
    let second = receiver_b.persist().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.id(), id);

    let snapshots_dir = receiver_dir.path().join("partition-0").join("snapshots");
    let entries: Vec<_> = std::fs::read_dir(&snapshots_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["1-0-0-0".to_string()]);
    assert!(std::fs::read_dir(&pending_dir).unwrap().next().is_none());
}

#[tokio::test]
async fn persist_order_is_independent() {
    for first_wins in [true, false] {
        let (_sender_dir, chunks) = common::sender_chunks(1, 0, &[("only.txt", "content")]).await;

        let receiver_dir = tempfile::tempdir().unwrap();
        let factory = FileBasedSnapshotStoreFactory::new("receiver", receiver_dir.path());
        let store = factory.create_receivable_snapshot_store(0).unwrap();

        let id = SnapshotId::new(1, 0, 0, 0);
        let receiver_a = store.new_received_snapshot(id).await;
        let receiver_b = store.new_received_snapshot(id).await;
        for chunk in &chunks {
            assert!(receiver_a.apply(chunk.clone()).await);
            assert!(receiver_b.apply(chunk.clone()).await);
        }

        let (winner, loser) = if first_wins {
            (receiver_a, receiver_b)
        } else {
            (receiver_b, receiver_a)
        };

        let winner_result = winner.persist().await.unwrap();
        let loser_result = loser.persist().await.unwrap();
        assert_eq!(winner_result, loser_result);

        let snapshots_dir = receiver_dir.path().join("partition-0").join("snapshots");
        let entries: Vec<_> = std::fs::read_dir(&snapshots_dir).unwrap().collect();
        assert_eq!(entries.len(), 1);

        let pending_dir = receiver_dir.path().join("partition-0").join("pending");
        assert!(std::fs::read_dir(&pending_dir).unwrap().next().is_none());
    }
}
