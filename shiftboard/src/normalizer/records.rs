//! Absence and task sections

use super::encoded::{field, materialize, materialize_object, Encoded};
use super::legacy::{RawAbsence, RawEmployee, RawTask};
use super::EmployeeIndex;
use crate::model::{AbsenceCategory, ReportAbsence, ReportAbsences, Task};
use serde::Deserialize;
use serde_json::Value;

fn category_keys(category: AbsenceCategory) -> &'static [&'static str] {
    match category {
        AbsenceCategory::Leave => &["leave", "Leave", "on_leave", "OnLeave", "vacation"],
        AbsenceCategory::Sick => &["sick", "Sick", "sick_leave", "SickLeave"],
        AbsenceCategory::Absent => &[
            "absent",
            "Absent",
            "unauthorized_absent",
            "UnauthorizedAbsent",
            "unauthorized",
        ],
    }
}

/// Partition absences into the three fixed categories.
///
/// Missing or malformed categories come back as empty lists.
pub fn normalize_absences(
    value: Option<&Value>,
    report_date: &str,
    employees: &EmployeeIndex<'_>,
) -> ReportAbsences {
    let mut absences = ReportAbsences::default();
    let Some(section) = value.and_then(materialize_object) else {
        if value.is_some() {
            tracing::warn!("Skipping malformed absences section");
        }
        return absences;
    };

    for category in AbsenceCategory::ALL {
        let Some(entries) = field(&section, category_keys(category)) else {
            continue;
        };
        let Some(entries) = materialize(entries) else {
            tracing::warn!("Skipping malformed {} absence list", category);
            continue;
        };
        let items: Vec<&Value> = match entries.as_ref() {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };

        let bucket = absences.get_mut(category);
        for item in items {
            match normalize_absence(item, category, report_date, employees) {
                Some(absence) => bucket.push(absence),
                None => tracing::warn!("Skipping malformed {} absence entry", category),
            }
        }
    }
    absences
}

fn normalize_absence(
    value: &Value,
    category: AbsenceCategory,
    report_date: &str,
    employees: &EmployeeIndex<'_>,
) -> Option<ReportAbsence> {
    let raw = match Encoded::classify(value) {
        Encoded::Record(map) => RawAbsence::deserialize(&Value::Object(map.into_owned()))
            .map_err(|e| tracing::warn!("Malformed absence: {}", e))
            .ok()?,
        Encoded::Reference(employee_id) => RawAbsence {
            employee_id: Some(employee_id),
            employee: None,
            first_name: String::new(),
            last_name: String::new(),
            date: String::new(),
            notes: String::new(),
        },
        Encoded::Empty => return None,
    };

    let embedded = raw
        .employee
        .as_ref()
        .and_then(materialize_object)
        .and_then(|map| RawEmployee::deserialize(&Value::Object(map.into_owned())).ok())
        .map(|r| r.into_employee().0);
    let employee_id = raw
        .employee_id
        .or_else(|| embedded.as_ref().map(|e| e.employee_id.clone()))?;

    let known = employees.get(&employee_id).or(embedded.as_ref());
    let fill = |own: String, fallback: Option<&str>| {
        if own.is_empty() {
            fallback.unwrap_or_default().to_string()
        } else {
            own
        }
    };

    Some(ReportAbsence {
        first_name: fill(raw.first_name, known.map(|e| e.first_name.as_str())),
        last_name: fill(raw.last_name, known.map(|e| e.last_name.as_str())),
        employee_id,
        category,
        date: if raw.date.is_empty() {
            report_date.to_string()
        } else {
            raw.date
        },
        notes: raw.notes,
    })
}

/// Tasks as a list, an id-keyed map, or wrapped with their id counter
pub fn normalize_tasks(value: Option<&Value>) -> Vec<Task> {
    let Some(section) = value.and_then(materialize) else {
        if value.is_some_and(|v| !v.is_null()) {
            tracing::warn!("Skipping malformed tasks section");
        }
        return Vec::new();
    };

    let items: Vec<&Value> = match section.as_ref() {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match field(map, &["items", "tasks", "Tasks"]) {
            Some(inner) => return normalize_tasks(Some(inner)),
            None => map
                .iter()
                .filter(|(key, _)| !is_counter_key(key))
                .map(|(_, v)| v)
                .collect(),
        },
        _ => Vec::new(),
    };

    let mut tasks: Vec<Task> = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = materialize_object(item) else {
            tracing::warn!("Skipping malformed task entry");
            continue;
        };
        match RawTask::deserialize(&Value::Object(obj.into_owned())) {
            Ok(raw) if tasks.iter().any(|t| t.task_id == raw.task_id) => {
                tracing::warn!("Duplicate task {} skipped", raw.task_id);
            }
            Ok(raw) => tasks.push(raw.into_task()),
            Err(e) => tracing::warn!("Skipping malformed task entry: {}", e),
        }
    }
    tasks.sort_by_key(|t| t.task_id);
    tasks
}

fn is_counter_key(key: &str) -> bool {
    matches!(key, "next_id" | "next_task_id" | "NextTaskId" | "NextId")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Employee;
    use serde_json::json;

    fn staff() -> Vec<Employee> {
        vec![Employee {
            employee_id: "5".to_string(),
            first_name: "Leila".to_string(),
            last_name: "Nouri".to_string(),
            role_id: "employee".to_string(),
            shift_group_id: "default".to_string(),
            is_manager: false,
            photo_path: None,
        }]
    }

    #[test]
    fn test_missing_categories_are_empty() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let absences = normalize_absences(Some(&json!({"sick": []})), "d", &index);
        assert_eq!(absences.total(), 0);

        let absences = normalize_absences(None, "d", &index);
        assert_eq!(absences.total(), 0);
    }

    #[test]
    fn test_legacy_string_entries_and_name_fill() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let section = json!({
            "Leave": ["{\"EmployeeId\":\"5\",\"Date\":\"1405/07/27\",\"Notes\":\"trip\"}"],
            "Sick": "[{\"EmployeeId\":\"5\"}]",
            "Absent": ["5", "{broken"]
        });

        let absences = normalize_absences(Some(&section), "1405/07/28", &index);

        assert_eq!(absences.leave.len(), 1);
        assert_eq!(absences.leave[0].first_name, "Leila");
        assert_eq!(absences.leave[0].date, "1405/07/27");
        assert_eq!(absences.leave[0].notes, "trip");
        assert_eq!(absences.sick.len(), 1);
        assert_eq!(absences.sick[0].date, "1405/07/28");
        assert_eq!(absences.sick[0].category, AbsenceCategory::Sick);
        // "{broken" cannot be decoded and falls back to an id lookup
        assert_eq!(absences.absent.len(), 2);
        assert_eq!(absences.absent[0].last_name, "Nouri");
    }

    #[test]
    fn test_embedded_employee_object() {
        let employees = Vec::new();
        let index = EmployeeIndex::new(&employees);
        let section = json!({
            "leave": [{"Employee": {"EmployeeId": "8", "FirstName": "Omid", "LastName": "Saberi"}}]
        });

        let absences = normalize_absences(Some(&section), "d", &index);

        assert_eq!(absences.leave[0].employee_id, "8");
        assert_eq!(absences.leave[0].first_name, "Omid");
    }

    #[test]
    fn test_tasks_wrapped_map_with_counter() {
        let section = json!({
            "next_task_id": 9,
            "Tasks": {
                "2": "{\"TaskId\":2,\"Title\":\"Second\"}",
                "1": {"task_id": 1, "title": "First"}
            }
        });

        let tasks = normalize_tasks(Some(&section));

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "First");
        assert_eq!(tasks[1].title, "Second");
    }

    #[test]
    fn test_malformed_task_skipped() {
        let section = json!([{"title": "no id"}, {"task_id": 3, "title": "ok"}]);
        let tasks = normalize_tasks(Some(&section));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_id, 3);
    }
}
