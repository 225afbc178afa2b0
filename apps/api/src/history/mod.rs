// Append-only version history of (content, layout parameters) pairs.

pub mod snapshots;

pub use snapshots::{
    apply_layout, create_snapshot, describe, get_snapshot, list_snapshots, restore, SnapshotSummary,
    VersionSnapshot,
};
