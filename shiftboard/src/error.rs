//! Error types for the shiftboard crate
//!
//! All errors use thiserror for structured error handling.
//! They serialize to their display string so a UI layer can show them as-is.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Snapshot is locked by another process: {0}")]
    Locked(PathBuf),

    #[error("Snapshot is partially written: {0}")]
    PartialWrite(PathBuf),

    #[error("Employee not found: {0}")]
    EmployeeNotFound(String),

    #[error("Shift group not found: {0}")]
    GroupNotFound(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Task not found: {0}")]
    TaskNotFound(u64),

    #[error("Slot index {index} out of range for capacity {capacity}")]
    InvalidSlot { index: usize, capacity: usize },

    #[error("Invalid shift capacity: {0}")]
    InvalidCapacity(usize),

    #[error("Role {0} is still assigned to employees")]
    RoleInUse(String),

    #[error("Shift group {0} cannot be deleted")]
    GroupProtected(String),

    #[error("Duplicate identifier: {0}")]
    Duplicate(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Errors caused by another process holding the file mid-write.
    ///
    /// These are retried with backoff; everything else fails immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::Locked(_) | AppError::PartialWrite(_) => true,
            AppError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::PermissionDenied
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
