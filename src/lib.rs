pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{ApiClient, FileKeyValueStore, MemoryKeyValueStore};
pub use config::AppConfig;
pub use core::normalizer::Normalizer;
pub use core::orchestrator::{SaveOrchestrator, SaveOutcome, Selection};
pub use core::staging::{BatchEvent, ChangeWatcher, StagingStore};
pub use domain::model::{LineItem, PendingRecord, PersistedPart, PersistedRecord};
pub use utils::error::{AppError, Result};
