//! Application configuration constants
//!
//! Central location for defaults, resource limits, and validation
//! boundaries used throughout the crate.

// ===== Shift Model =====

/// Slots per shift when a group is created without an explicit capacity
pub const DEFAULT_SHIFT_CAPACITY: usize = 15;

/// Upper bound on a single shift's capacity.
/// Guards against a typo allocating thousands of empty slots.
pub const MAX_SHIFT_CAPACITY: usize = 500;

/// Identifier of the group that always exists
pub const DEFAULT_GROUP_ID: &str = "default";

/// Identifier of the built-in role given to new employees
pub const DEFAULT_ROLE_ID: &str = "employee";

/// Role priority sanity bounds
pub const MIN_ROLE_PRIORITY: i32 = 0;
pub const MAX_ROLE_PRIORITY: i32 = 1000;

// ===== Snapshot Files =====

/// Prefix of every snapshot file name (`report_<date>.json`)
pub const REPORT_FILE_PREFIX: &str = "report_";

/// Extension of snapshot files
pub const REPORT_FILE_EXTENSION: &str = "json";

/// Any file whose name contains this marker is a backup and never "latest"
pub const BACKUP_MARKER: &str = "backup";

/// Extension of the sentinel created next to a file while it is being written
pub const LOCK_FILE_EXTENSION: &str = "lock";

/// Age after which a leftover sentinel is treated as released.
/// A save holds the sentinel for milliseconds; an older one belongs to a
/// writer that died mid-save.
pub const STALE_LOCK_SECS: u64 = 30;

/// Extension of in-progress temp files
pub const TEMP_FILE_EXTENSION: &str = "tmp";

/// File name of the writer's private entity store
pub const WORKFORCE_STORE_FILE: &str = "workforce.json";

/// File name of the watched display settings
pub const SETTINGS_FILE: &str = "settings.json";

/// Sub-directory of the data directory holding snapshots
pub const REPORTS_DIR_NAME: &str = "reports";

// ===== Sync Engine =====

/// Interval between snapshot polls
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Quiet period before a burst of config writes is reloaded
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// How often the watcher samples the file's metadata
pub const DEFAULT_WATCH_SAMPLE_MS: u64 = 100;

/// Read attempts against a locked file before deferring
pub const LOCK_RETRY_ATTEMPTS: u32 = 3;

/// First backoff delay; doubles on every attempt
pub const LOCK_RETRY_BASE_DELAY_MS: u64 = 100;

/// Ceiling on a single backoff delay
pub const LOCK_RETRY_MAX_DELAY_MS: u64 = 5_000;

/// Bounds for user-editable intervals
pub const MIN_POLL_INTERVAL_SECS: u64 = 1;
pub const MAX_POLL_INTERVAL_SECS: u64 = 3_600;
pub const MIN_DEBOUNCE_MS: u64 = 50;
pub const MAX_DEBOUNCE_MS: u64 = 10_000;

// ===== Report Normalization =====

/// Role prefixes that mark an employee as a manager when a snapshot has no
/// explicit `managers` list. Matched case-insensitively.
pub const DEFAULT_MANAGER_ROLE_PREFIXES: &[&str] = &["manager"];

/// How many times an embedded JSON string is unwrapped before giving up
pub const MAX_EMBEDDED_JSON_DEPTH: usize = 4;
