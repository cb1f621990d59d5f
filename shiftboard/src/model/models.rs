//! Entity models
//!
//! Plain value types for employees, roles, absences and tasks.
//! All models use serde so they can be persisted and embedded in reports.

use crate::config::{DEFAULT_GROUP_ID, DEFAULT_ROLE_ID, MAX_ROLE_PRIORITY, MIN_ROLE_PRIORITY};
use crate::error::{AppError, Result};
use crate::model::calendar::BusinessDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A member of staff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default = "default_role_id")]
    pub role_id: String,
    #[serde(default = "default_group_id")]
    pub shift_group_id: String,
    #[serde(default)]
    pub is_manager: bool,
    #[serde(default)]
    pub photo_path: Option<String>,
}

pub(crate) fn default_role_id() -> String {
    DEFAULT_ROLE_ID.to_string()
}

pub(crate) fn default_group_id() -> String {
    DEFAULT_GROUP_ID.to_string()
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Create employee request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewEmployee {
    /// Caller-supplied id; a fresh one is generated when absent
    pub employee_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role_id: Option<String>,
    pub shift_group_id: Option<String>,
    #[serde(default)]
    pub is_manager: bool,
    pub photo_path: Option<String>,
}

/// Update employee request; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEmployee {
    pub employee_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role_id: Option<String>,
    pub shift_group_id: Option<String>,
    pub is_manager: Option<bool>,
    /// `Some(None)` clears the photo
    pub photo_path: Option<Option<String>>,
}

/// Job role with display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub priority: i32,
}

impl Role {
    pub fn new(role_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            role_id: role_id.into(),
            name: name.into(),
            description: String::new(),
            color: String::new(),
            priority: 0,
        }
    }

    /// The role every fresh store starts with
    pub fn builtin() -> Self {
        Self {
            role_id: DEFAULT_ROLE_ID.to_string(),
            name: "Employee".to_string(),
            description: "Default role".to_string(),
            color: "#4A90D9".to_string(),
            priority: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.role_id.trim().is_empty() {
            return Err(AppError::Validation("Role id must not be empty".to_string()));
        }
        if !(MIN_ROLE_PRIORITY..=MAX_ROLE_PRIORITY).contains(&self.priority) {
            return Err(AppError::Validation(format!(
                "Role priority {} outside {}..={}",
                self.priority, MIN_ROLE_PRIORITY, MAX_ROLE_PRIORITY
            )));
        }
        Ok(())
    }
}

/// The three fixed absence categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceCategory {
    Leave,
    Sick,
    Absent,
}

impl AbsenceCategory {
    pub const ALL: [AbsenceCategory; 3] = [
        AbsenceCategory::Leave,
        AbsenceCategory::Sick,
        AbsenceCategory::Absent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AbsenceCategory::Leave => "leave",
            AbsenceCategory::Sick => "sick",
            AbsenceCategory::Absent => "absent",
        }
    }
}

impl fmt::Display for AbsenceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbsenceCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "leave" | "on_leave" | "vacation" => Ok(AbsenceCategory::Leave),
            "sick" | "sick_leave" => Ok(AbsenceCategory::Sick),
            "absent" | "unauthorized" | "unauthorized_absent" | "unauthorized_absence" => {
                Ok(AbsenceCategory::Absent)
            }
            other => Err(format!("Unknown absence category: {}", other)),
        }
    }
}

/// One employee absent on one business date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    pub employee_id: String,
    pub category: AbsenceCategory,
    pub date: BusinessDate,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl FromStr for TaskPriority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" | "normal" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(format!("Unknown task priority: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

/// Work item assignable to several employees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    #[serde(default)]
    pub target_date: Option<BusinessDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub assigned_employees: BTreeSet<String>,
}

/// Create task request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub estimated_hours: f64,
    pub target_date: Option<BusinessDate>,
    #[serde(default)]
    pub notes: String,
}

/// Update task request; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    pub task_id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub target_date: Option<Option<BusinessDate>>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_priority_bounds() {
        let mut role = Role::new("lead", "Team Lead");
        role.priority = 1000;
        assert!(role.validate().is_ok());

        role.priority = 1001;
        assert!(matches!(role.validate(), Err(AppError::Validation(_))));

        role.priority = -1;
        assert!(role.validate().is_err());
    }

    #[test]
    fn test_absence_category_parsing() {
        assert_eq!("Leave".parse::<AbsenceCategory>(), Ok(AbsenceCategory::Leave));
        assert_eq!("sick-leave".parse::<AbsenceCategory>(), Ok(AbsenceCategory::Sick));
        assert_eq!(
            "Unauthorized Absent".parse::<AbsenceCategory>(),
            Ok(AbsenceCategory::Absent)
        );
        assert!("holiday".parse::<AbsenceCategory>().is_err());
    }

    #[test]
    fn test_task_status_parsing() {
        assert_eq!("In Progress".parse::<TaskStatus>(), Ok(TaskStatus::InProgress));
        assert_eq!("done".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn test_employee_defaults_on_deserialize() {
        let employee: Employee = serde_json::from_str(
            r#"{"employee_id":"7","first_name":"Sara","last_name":"Moradi"}"#,
        )
        .unwrap();

        assert_eq!(employee.role_id, DEFAULT_ROLE_ID);
        assert_eq!(employee.shift_group_id, DEFAULT_GROUP_ID);
        assert!(!employee.is_manager);
        assert_eq!(employee.full_name(), "Sara Moradi");
    }
}
