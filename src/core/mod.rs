pub mod editor;
pub mod import;
pub mod line_items;
pub mod normalizer;
pub mod orchestrator;
pub mod record_editor;
pub mod records;
pub mod render;
pub mod staging;

pub use crate::domain::model::{LineItem, PendingRecord, PersistedPart, PersistedRecord};
pub use crate::domain::ports::{ImportSource, KeyValueStore, Notifier, RecordBackend};
pub use crate::utils::error::Result;
