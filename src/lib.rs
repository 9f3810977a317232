// Data model shared by the snapshot service and the analytics engine
pub mod models;

// Seat-history analytics engine
pub mod analytics;

// Ticketing widget connector
pub mod connector;

// Snapshot service appending the seat-history ledger
pub mod snapshot;

// Runtime settings
pub mod config;


// Re-export commonly used types for convenience
pub use config::Settings;
pub use models::{group_key, SeatHistoryRecord, Show};
