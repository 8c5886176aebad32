pub mod chunker;
pub mod stats;
pub mod store;
pub mod types;

pub use store::{IngestReport, MemoryStore, StoreSettings};
pub use types::{MemoryRecord, RecordBody, SourceKind};
