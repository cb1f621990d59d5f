//! Loose record shapes
//!
//! Serde mirrors of the persisted records that accept both the current
//! snake_case names and the capitalized names older writers used
//! (`EmployeeId`, `FirstName`, ...). Scalars are read leniently: ids may be
//! numbers, booleans may be strings.

use crate::config::{DEFAULT_GROUP_ID, DEFAULT_ROLE_ID};
use crate::model::{BusinessDate, Employee, Role, Task, TaskPriority, TaskStatus};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Deserialize)]
pub(crate) struct RawEmployee {
    #[serde(
        alias = "EmployeeId",
        alias = "employeeId",
        alias = "Id",
        alias = "id",
        deserialize_with = "id_string"
    )]
    pub employee_id: String,
    #[serde(default, alias = "FirstName", alias = "firstName", deserialize_with = "loose_string")]
    pub first_name: String,
    #[serde(default, alias = "LastName", alias = "lastName", deserialize_with = "loose_string")]
    pub last_name: String,
    #[serde(default, alias = "RoleId", alias = "roleId", deserialize_with = "opt_id_string")]
    pub role_id: Option<String>,
    /// Role display name; only old writers stored it on the employee
    #[serde(
        default,
        alias = "Role",
        alias = "role",
        alias = "RoleName",
        deserialize_with = "opt_id_string"
    )]
    pub role_name: Option<String>,
    #[serde(
        default,
        alias = "ShiftGroupId",
        alias = "shiftGroupId",
        deserialize_with = "opt_id_string"
    )]
    pub shift_group_id: Option<String>,
    #[serde(default, alias = "IsManager", alias = "isManager", deserialize_with = "loose_bool")]
    pub is_manager: bool,
    #[serde(default, alias = "PhotoPath", alias = "photoPath", deserialize_with = "opt_id_string")]
    pub photo_path: Option<String>,
}

impl RawEmployee {
    pub fn into_employee(self) -> (Employee, Option<String>) {
        let role_id = self
            .role_id
            .or_else(|| self.role_name.clone())
            .unwrap_or_else(|| DEFAULT_ROLE_ID.to_string());
        let employee = Employee {
            employee_id: self.employee_id,
            first_name: self.first_name,
            last_name: self.last_name,
            role_id,
            shift_group_id: self
                .shift_group_id
                .unwrap_or_else(|| DEFAULT_GROUP_ID.to_string()),
            is_manager: self.is_manager,
            photo_path: self.photo_path,
        };
        (employee, self.role_name)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRole {
    #[serde(alias = "RoleId", alias = "roleId", alias = "Id", alias = "id", deserialize_with = "id_string")]
    pub role_id: String,
    #[serde(default, alias = "Name", deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, alias = "Description", deserialize_with = "loose_string")]
    pub description: String,
    #[serde(default, alias = "Color", deserialize_with = "loose_string")]
    pub color: String,
    #[serde(default, alias = "Priority", deserialize_with = "loose_i32")]
    pub priority: i32,
}

impl From<RawRole> for Role {
    fn from(raw: RawRole) -> Self {
        let name = if raw.name.is_empty() {
            raw.role_id.clone()
        } else {
            raw.name
        };
        Role {
            role_id: raw.role_id,
            name,
            description: raw.description,
            color: raw.color,
            priority: raw.priority,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAbsence {
    #[serde(
        default,
        alias = "EmployeeId",
        alias = "employeeId",
        deserialize_with = "opt_id_string"
    )]
    pub employee_id: Option<String>,
    /// Some writers embedded the whole employee instead of the id
    #[serde(default, alias = "Employee")]
    pub employee: Option<Value>,
    #[serde(default, alias = "FirstName", alias = "firstName", deserialize_with = "loose_string")]
    pub first_name: String,
    #[serde(default, alias = "LastName", alias = "lastName", deserialize_with = "loose_string")]
    pub last_name: String,
    #[serde(default, alias = "Date", deserialize_with = "loose_string")]
    pub date: String,
    #[serde(default, alias = "Notes", alias = "Note", deserialize_with = "loose_string")]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTask {
    #[serde(alias = "TaskId", alias = "taskId", alias = "Id", alias = "id", deserialize_with = "loose_u64")]
    pub task_id: u64,
    #[serde(default, alias = "Title", deserialize_with = "loose_string")]
    pub title: String,
    #[serde(default, alias = "Description", deserialize_with = "loose_string")]
    pub description: String,
    #[serde(default, alias = "Priority", deserialize_with = "loose_string")]
    pub priority: String,
    #[serde(default, alias = "Status", deserialize_with = "loose_string")]
    pub status: String,
    #[serde(default, alias = "EstimatedHours", deserialize_with = "loose_f64")]
    pub estimated_hours: f64,
    #[serde(default, alias = "ActualHours", deserialize_with = "loose_f64")]
    pub actual_hours: f64,
    #[serde(default, alias = "TargetDate", deserialize_with = "opt_id_string")]
    pub target_date: Option<String>,
    #[serde(default, alias = "Notes", deserialize_with = "loose_string")]
    pub notes: String,
    #[serde(
        default,
        alias = "AssignedEmployees",
        alias = "AssignedEmployeeIds",
        alias = "assigned_employee_ids"
    )]
    pub assigned_employees: Value,
}

impl RawTask {
    pub fn into_task(self) -> Task {
        let assigned_employees: BTreeSet<String> = match &self.assigned_employees {
            Value::Array(items) => items.iter().filter_map(assignee_id).collect(),
            Value::String(_) => super::encoded::materialize_array(&self.assigned_employees)
                .map(|items| items.iter().filter_map(assignee_id).collect())
                .unwrap_or_default(),
            _ => BTreeSet::new(),
        };

        Task {
            task_id: self.task_id,
            title: self.title,
            description: self.description,
            priority: self.priority.parse().unwrap_or(TaskPriority::Medium),
            status: self.status.parse().unwrap_or(TaskStatus::Pending),
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
            target_date: self.target_date.map(BusinessDate::new),
            notes: self.notes,
            assigned_employees,
        }
    }
}

/// Id of a task assignee given as an id or an employee record
fn assignee_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => super::encoded::field(map, &["employee_id", "EmployeeId", "id"])
            .and_then(super::encoded::scalar_string),
        other => super::encoded::scalar_string(other),
    }
}

// ===== Lenient scalar readers =====

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected an id, found {}", other))),
    }
}

fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn loose_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}

fn loose_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    })
}

fn loose_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

fn loose_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| de::Error::custom(format!("expected a task id, found {}", n))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a task id, found {:?}", s))),
        other => Err(de::Error::custom(format!("expected a task id, found {}", other))),
    }
}
