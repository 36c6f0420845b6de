pub mod config;
pub mod json_ops;
pub mod marks;
pub mod path;
pub mod session;
pub mod settings;
pub mod store;
pub mod validate;

pub use json_ops::JsonOperations;
pub use marks::MarkSet;
pub use path::{JsonPath, Segment};
pub use session::{DocumentSession, SavePlan, ToggleOutcome};
pub use settings::{Settings, SettingsEntry};
pub use store::{BackupEntry, Document, FileEntry, FileStore, SaveReceipt};
pub use validate::{Validation, validate};
