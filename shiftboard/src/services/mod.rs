//! Services module
//!
//! Writer-side coordination between the entity model and the shared
//! reports directory, plus the watched display settings.

pub mod report_writer;
pub mod settings;
pub mod store;
pub mod workforce;

pub use report_writer::{build_report, ReportWriter};
pub use settings::{AppSettings, SettingsService, SyncSettings};
pub use store::WorkforceStore;
pub use workforce::{ChangeEvent, ChangeObserver, WorkforceService};
