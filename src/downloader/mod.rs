pub mod error;
pub mod group;
pub mod manager;
pub mod models;
pub mod notify;
pub mod observer;
pub mod persistence;
pub mod profile;
pub mod progress;
pub mod task;
pub mod transport;

pub use error::{DownloadError, Result};
pub use group::{GroupOrchestrator, InstallReport};
pub use manager::{Collaborators, DownloadManager, ManagerSettings, TaskWatch, TrackedRequest};
pub use models::{InstallFile, TaskOutcome};
pub use task::{DownloadTask, GroupMeasure, TaskStatus};
