pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod sync;

pub use connection::{connect, connect_with_config, connect_with_settings, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult};
pub use sync::{run_sync, SyncError};
