use std::collections::HashMap;
use std::sync::Once;

use snapshot_store::{Chunk, FileBasedSnapshotStoreFactory};

static LOG_INIT: Once = Once::new();

/// Installs an `env_logger` subscriber reading `RUST_LOG`, once per test
/// binary, so `cargo test -- --nocapture` shows the store's own logging.
fn init_logging() {
    LOG_INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .is_test(true)
            .try_init();
    });
}

/// Builds a sender-side persisted snapshot under its own temp partition and
/// returns every chunk it would transmit, in order.
pub async fn sender_chunks(
    index: u64,
    term: u64,
    files: &[(&str, &str)],
) -> (tempfile::TempDir, Vec<Chunk>) {
    init_logging();

    let dir = tempfile::tempdir().unwrap();
    let factory = FileBasedSnapshotStoreFactory::new("sender", dir.path());
    let store = factory.get_constructable_snapshot_store(0).unwrap();

    let files_owned: HashMap<String, String> = files
        .iter()
        .map(|(n, c)| (n.to_string(), c.to_string()))
        .collect();

    let transient = store
        .new_transient_snapshot(index, term, 0, 0)
        .await
        .expect("snapshot should be newer than empty store");

    transient
        .take(move |path| {
            for (name, content) in &files_owned {
                if std::fs::write(path.join(name), content.as_bytes()).is_err() {
                    return false;
                }
            }
            true
        })
        .await;

    let persisted = transient.persist().await.unwrap();
    let chunks: Vec<Chunk> = persisted
        .new_chunk_reader()
        .unwrap()
        .map(|c| c.unwrap())
        .collect();

    (dir, chunks)
}
