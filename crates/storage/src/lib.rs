#![forbid(unsafe_code)]

mod coordinator;
mod entry;
mod generator;
mod memory;
mod sqlite;
mod store;
pub mod sweeper;

pub use coordinator::{MappingCoordinator, Outcome, normalize_destination};
pub use entry::{Expiry, MappingEntry, unix_now};
pub use generator::ShortKeyGenerator;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::MappingStore;
pub use sweeper::{ExpirySweeper, sweep_once};
