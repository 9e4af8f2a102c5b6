//! Exports configuration data from the build system.

pub const SNAPSHOT_STORE_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default run-directory convention for a broker node; the bootstrap layer
/// (out of scope here) is expected to pass the real partition root in.
pub const DEFAULT_RUN_DIR: &str = "/run/workflow-broker";

/// Name of the committed-snapshots directory under a partition root.
pub const SNAPSHOTS_DIR: &str = "snapshots";

/// Name of the in-flight pending-reception directory under a partition root.
pub const PENDING_DIR: &str = "pending";
