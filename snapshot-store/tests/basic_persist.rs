mod common;

use snapshot_store::{FileBasedSnapshotStoreFactory, SnapshotId};

#[tokio::test]
async fn basic_receive_and_persist() {
    let (_sender_dir, chunks) = common::sender_chunks(1, 0, &[("file1.txt", "This is the content")]).await;

    let receiver_dir = tempfile::tempdir().unwrap();
    let factory = FileBasedSnapshotStoreFactory::new("receiver", receiver_dir.path());
    let store = factory.create_receivable_snapshot_store(0).unwrap();

    let received = store.new_received_snapshot(SnapshotId::new(1, 0, 0, 0)).await;
    for chunk in chunks {
        assert!(received.apply(chunk).await);
    }
    let persisted = received.persist().await.unwrap();

    assert_eq!(persisted.id(), SnapshotId::new(1, 0, 0, 0));

    let snapshots_dir = receiver_dir.path().join("partition-0").join("snapshots");
    let entries: Vec<_> = std::fs::read_dir(&snapshots_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["1-0-0-0".to_string()]);

    let snapshot_dir = snapshots_dir.join("1-0-0-0");
    assert_eq!(
        std::fs::read_to_string(snapshot_dir.join("file1.txt")).unwrap(),
        "This is the content"
    );
    assert!(snapshot_dir.join("1-0-0-0.checksum").exists());

    let pending_dir = receiver_dir.path().join("partition-0").join("pending");
    let pending_entries: Vec<_> = std::fs::read_dir(&pending_dir).unwrap().collect();
    assert!(pending_entries.is_empty());
}

#[tokio::test]
async fn replace_on_next_snapshot() {
    let receiver_dir = tempfile::tempdir().unwrap();
    let factory = FileBasedSnapshotStoreFactory::new("receiver", receiver_dir.path());
    let store = factory.create_receivable_snapshot_store(0).unwrap();

    let (_dir1, chunks1) = common::sender_chunks(1, 0, &[("a.txt", "first")]).await;
    let received1 = store.new_received_snapshot(SnapshotId::new(1, 0, 0, 0)).await;
    for chunk in chunks1 {
        assert!(received1.apply(chunk).await);
    }
    let first = received1.persist().await.unwrap();
    assert_eq!(first.id(), SnapshotId::new(1, 0, 0, 0));

    let (_dir2, chunks2) = common::sender_chunks(2, 0, &[("b.txt", "second")]).await;
    let received2 = store.new_received_snapshot(SnapshotId::new(2, 0, 0, 0)).await;
    for chunk in chunks2 {
        assert!(received2.apply(chunk).await);
    }
    let second = received2.persist().await.unwrap();
    assert_eq!(second.id(), SnapshotId::new(2, 0, 0, 0));

    let snapshots_dir = receiver_dir.path().join("partition-0").join("snapshots");
    let mut entries: Vec<_> = std::fs::read_dir(&snapshots_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    entries.sort();
    assert_eq!(entries, vec!["2-0-0-0".to_string()]);

    let pending_dir = receiver_dir.path().join("partition-0").join("pending");
    assert!(std::fs::read_dir(&pending_dir).unwrap().next().is_none());

    assert_eq!(
        store.current_snapshot().await.unwrap().id(),
        SnapshotId::new(2, 0, 0, 0)
    );
}

#[tokio::test]
async fn fsync_can_be_disabled_for_tests() {
    let receiver_dir = tempfile::tempdir().unwrap();
    let factory =
        FileBasedSnapshotStoreFactory::new_without_fsync("receiver", receiver_dir.path());
    let store = factory.create_receivable_snapshot_store(0).unwrap();

    let (_sender_dir, chunks) = common::sender_chunks(1, 0, &[("state", "v1")]).await;
    let received = store.new_received_snapshot(SnapshotId::new(1, 0, 0, 0)).await;
    for chunk in chunks {
        assert!(received.apply(chunk).await);
    }
    let persisted = received.persist().await.unwrap();
    assert_eq!(persisted.id(), SnapshotId::new(1, 0, 0, 0));
}
