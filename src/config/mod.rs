pub mod settings;

pub use settings::{AppConfig, PointsSettings, ScheduleSettings, StorageBackend, StorageSettings};
