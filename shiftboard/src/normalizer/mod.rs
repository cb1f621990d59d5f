//! Report normalizer
//!
//! Turns a snapshot in any historical schema into the canonical [`Report`].
//! Malformed sections degrade to empty defaults with a warning; only a
//! document that is not a JSON object at all is rejected.

mod encoded;
mod legacy;
mod records;
mod rosters;

pub use encoded::{decode_embedded, strip_escape_artifacts, Encoded};
pub use rosters::{detect_shape, ShiftsShape};

use crate::config::DEFAULT_MANAGER_ROLE_PREFIXES;
use crate::model::{Employee, Report, Role};
use encoded::{field, materialize, materialize_object, scalar_string};
use legacy::{RawEmployee, RawRole};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Employee lookup by id over an already-normalized list
pub struct EmployeeIndex<'a> {
    by_id: HashMap<&'a str, &'a Employee>,
}

impl<'a> EmployeeIndex<'a> {
    pub fn new(employees: &'a [Employee]) -> Self {
        Self {
            by_id: employees
                .iter()
                .map(|e| (e.employee_id.as_str(), e))
                .collect(),
        }
    }

    pub fn get(&self, employee_id: &str) -> Option<&'a Employee> {
        self.by_id.get(employee_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Decides who counts as a manager when a snapshot has no explicit list.
///
/// An employee qualifies through the `is_manager` flag or when its role id
/// or role name starts with one of the configured prefixes
/// (case-insensitive). An empty prefix list leaves only the flag.
#[derive(Debug, Clone)]
pub struct ManagerClassifier {
    prefixes: Vec<String>,
}

impl Default for ManagerClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_MANAGER_ROLE_PREFIXES.iter().copied())
    }
}

impl ManagerClassifier {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Flag-only classification
    pub fn flag_only() -> Self {
        Self {
            prefixes: Vec::new(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_manager(&self, employee: &Employee, role_name: Option<&str>) -> bool {
        employee.is_manager
            || self.matches(&employee.role_id)
            || role_name.is_some_and(|name| self.matches(name))
    }

    fn matches(&self, role: &str) -> bool {
        let role = role.trim().to_lowercase();
        !role.is_empty() && self.prefixes.iter().any(|p| role.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportNormalizer {
    classifier: ManagerClassifier,
}

impl ReportNormalizer {
    pub fn new(classifier: ManagerClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &ManagerClassifier {
        &self.classifier
    }

    /// Normalize raw snapshot text. `None` when it is not a JSON document.
    pub fn normalize_str(&self, content: &str) -> Option<Report> {
        match serde_json::from_str::<Value>(content) {
            Ok(value) => self.normalize(&value),
            Err(e) => {
                tracing::warn!("Snapshot is not valid JSON: {}", e);
                None
            }
        }
    }

    /// Normalize a parsed snapshot. `None` when the root is not an object
    /// (after unwrapping an embedded document).
    pub fn normalize(&self, value: &Value) -> Option<Report> {
        let Some(root) = materialize_object(value) else {
            tracing::warn!("Snapshot root is not an object");
            return None;
        };
        let root: &Map<String, Value> = &root;

        let date = field(root, &["date", "Date"])
            .and_then(scalar_string)
            .unwrap_or_default();
        let last_modified = field(root, &["last_modified", "LastModified", "lastModified"])
            .and_then(scalar_string)
            .unwrap_or_default();

        let (employees, role_names) = normalize_employees(field(root, &["employees", "Employees"]));
        let roles = normalize_roles(field(root, &["roles", "Roles"]));
        let index = EmployeeIndex::new(&employees);

        let managers = self.resolve_managers(
            field(root, &["managers", "Managers"]),
            &employees,
            &index,
            &role_names,
            &roles,
        );
        let shifts = rosters::normalize_shifts(
            field(root, &["shifts", "Shifts"]),
            field(root, &["shift_groups", "ShiftGroups"]),
            &index,
        );
        let absences =
            records::normalize_absences(field(root, &["absences", "Absences"]), &date, &index);
        let tasks = records::normalize_tasks(field(root, &["tasks", "Tasks"]));

        tracing::debug!(
            "Normalized snapshot {}: {} employees, {} managers, {} groups, {} absences, {} tasks",
            date,
            employees.len(),
            managers.len(),
            shifts.shift_groups.len(),
            absences.total(),
            tasks.len()
        );

        Some(Report {
            date,
            employees,
            managers,
            roles,
            shifts,
            absences,
            tasks,
            last_modified,
        })
    }

    /// Persisted list when it yields anyone, otherwise derived
    fn resolve_managers(
        &self,
        persisted: Option<&Value>,
        employees: &[Employee],
        index: &EmployeeIndex<'_>,
        role_names: &HashMap<String, String>,
        roles: &[Role],
    ) -> Vec<Employee> {
        let explicit = persisted
            .map(|value| resolve_employee_list(value, index))
            .unwrap_or_default();
        if !explicit.is_empty() {
            return explicit;
        }

        let derived: Vec<Employee> = employees
            .iter()
            .filter(|e| {
                let role_name = role_names
                    .get(&e.employee_id)
                    .map(String::as_str)
                    .or_else(|| {
                        roles
                            .iter()
                            .find(|r| r.role_id == e.role_id)
                            .map(|r| r.name.as_str())
                    });
                self.classifier.is_manager(e, role_name)
            })
            .cloned()
            .collect();
        if !derived.is_empty() {
            tracing::debug!("Derived {} managers from employee roles", derived.len());
        }
        derived
    }
}

/// Employees in file order, first occurrence of each id wins.
/// Also returns role names that legacy writers stored on the employee.
fn normalize_employees(value: Option<&Value>) -> (Vec<Employee>, HashMap<String, String>) {
    let mut employees = Vec::new();
    let mut role_names = HashMap::new();
    let Some(items) = value.and_then(materialize) else {
        if value.is_some_and(|v| !v.is_null()) {
            tracing::warn!("Skipping malformed employees section");
        }
        return (employees, role_names);
    };

    let items: Vec<&Value> = match items.as_ref() {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    let mut seen = HashSet::new();
    for item in items {
        let Some(obj) = materialize_object(item) else {
            tracing::warn!("Skipping malformed employee entry");
            continue;
        };
        match RawEmployee::deserialize(&Value::Object(obj.into_owned())) {
            Ok(raw) => {
                let (employee, role_name) = raw.into_employee();
                if !seen.insert(employee.employee_id.clone()) {
                    tracing::warn!("Duplicate employee {} skipped", employee.employee_id);
                    continue;
                }
                if let Some(name) = role_name {
                    role_names.insert(employee.employee_id.clone(), name);
                }
                employees.push(employee);
            }
            Err(e) => tracing::warn!("Skipping malformed employee entry: {}", e),
        }
    }
    (employees, role_names)
}

fn normalize_roles(value: Option<&Value>) -> Vec<Role> {
    let Some(items) = value.and_then(materialize) else {
        return Vec::new();
    };
    let items: Vec<&Value> = match items.as_ref() {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => map.values().collect(),
        _ => Vec::new(),
    };

    let mut roles: Vec<Role> = Vec::new();
    for item in items {
        let Some(obj) = materialize_object(item) else {
            tracing::warn!("Skipping malformed role entry");
            continue;
        };
        match RawRole::deserialize(&Value::Object(obj.into_owned())) {
            Ok(raw) if roles.iter().any(|r| r.role_id == raw.role_id) => {
                tracing::warn!("Duplicate role {} skipped", raw.role_id);
            }
            Ok(raw) => roles.push(raw.into()),
            Err(e) => tracing::warn!("Skipping malformed role entry: {}", e),
        }
    }
    roles
}

/// A list of employee records or ids, resolved against the index
fn resolve_employee_list(value: &Value, index: &EmployeeIndex<'_>) -> Vec<Employee> {
    let Some(items) = materialize(value) else {
        return Vec::new();
    };
    let Value::Array(items) = items.as_ref() else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(|item| match Encoded::classify(item) {
            Encoded::Record(map) => RawEmployee::deserialize(&Value::Object(map.into_owned()))
                .ok()
                .map(|raw| {
                    let employee = raw.into_employee().0;
                    index.get(&employee.employee_id).cloned().unwrap_or(employee)
                }),
            Encoded::Reference(id) => index.get(&id).cloned(),
            Encoded::Empty => None,
        })
        .filter(|e| seen.insert(e.employee_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AbsenceCategory, ShiftType};
    use serde_json::json;

    fn employee(id: &str, role_id: &str, is_manager: bool) -> Employee {
        Employee {
            employee_id: id.to_string(),
            first_name: format!("First{}", id),
            last_name: format!("Last{}", id),
            role_id: role_id.to_string(),
            shift_group_id: "default".to_string(),
            is_manager,
            photo_path: None,
        }
    }

    #[test]
    fn test_classifier_prefixes() {
        let classifier = ManagerClassifier::new(["Manager", " shift_lead "]);
        assert!(classifier.is_manager(&employee("1", "manager_floor", false), None));
        assert!(classifier.is_manager(&employee("2", "SHIFT_LEAD", false), None));
        assert!(classifier.is_manager(&employee("3", "cashier", false), Some("Manager")));
        assert!(classifier.is_manager(&employee("4", "cashier", true), None));
        assert!(!classifier.is_manager(&employee("5", "cashier", false), Some("Cashier")));
    }

    #[test]
    fn test_flag_only_classifier_ignores_roles() {
        let classifier = ManagerClassifier::flag_only();
        assert!(!classifier.is_manager(&employee("1", "manager", false), Some("Manager")));
        assert!(classifier.is_manager(&employee("2", "employee", true), None));
    }

    #[test]
    fn test_rejects_non_object_root() {
        let normalizer = ReportNormalizer::default();
        assert!(normalizer.normalize(&json!([1, 2])).is_none());
        assert!(normalizer.normalize_str("not json").is_none());
    }

    #[test]
    fn test_embedded_root_document() {
        let inner = json!({"date": "1405/07/28", "employees": [{"employee_id": "1"}]}).to_string();
        let report = ReportNormalizer::default()
            .normalize(&Value::String(inner))
            .unwrap();
        assert_eq!(report.date, "1405/07/28");
        assert_eq!(report.employees.len(), 1);
    }

    #[test]
    fn test_minimal_document_gets_defaults() {
        let report = ReportNormalizer::default().normalize(&json!({})).unwrap();

        assert!(report.employees.is_empty());
        assert!(report.managers.is_empty());
        for category in AbsenceCategory::ALL {
            assert_eq!(report.absences.count(category), 0);
        }
        assert_eq!(report.shifts.shift_groups.len(), 1);
        assert_eq!(report.shifts.shift_groups[0].group_id, "default");
    }

    #[test]
    fn test_duplicate_and_malformed_employees_skipped() {
        let value = json!({
            "employees": [
                {"employee_id": "1", "first_name": "A"},
                {"employee_id": "1", "first_name": "Again"},
                {"first_name": "No id"},
                "{\"EmployeeId\":\"2\",\"FirstName\":\"B\"}",
                42
            ]
        });

        let report = ReportNormalizer::default().normalize(&value).unwrap();

        assert_eq!(report.employees.len(), 2);
        assert_eq!(report.employees[0].first_name, "A");
        assert_eq!(report.employees[1].first_name, "B");
    }

    #[test]
    fn test_managers_derived_when_missing() {
        let value = json!({
            "employees": [
                {"employee_id": "1", "role_id": "employee"},
                {"employee_id": "2", "role_id": "employee", "is_manager": true},
                {"employee_id": "3", "Role": "Manager"},
                {"employee_id": "4", "role_id": "boss"}
            ],
            "roles": [{"role_id": "boss", "name": "Manager of floor"}],
            "managers": []
        });

        let report = ReportNormalizer::default().normalize(&value).unwrap();
        let ids: Vec<&str> = report
            .managers
            .iter()
            .map(|m| m.employee_id.as_str())
            .collect();
        assert_eq!(ids, vec!["2", "3", "4"]);

        let strict = ReportNormalizer::new(ManagerClassifier::flag_only());
        let report = strict.normalize(&value).unwrap();
        assert_eq!(report.managers.len(), 1);
    }

    #[test]
    fn test_persisted_managers_resolved_by_id() {
        let value = json!({
            "employees": [
                {"employee_id": "1", "first_name": "Full"},
                {"employee_id": "2", "is_manager": true}
            ],
            "managers": ["1", "ghost"]
        });

        let report = ReportNormalizer::default().normalize(&value).unwrap();
        assert_eq!(report.managers.len(), 1);
        assert_eq!(report.managers[0].first_name, "Full");
    }

    #[test]
    fn test_top_level_shift_groups_and_legacy_dates() {
        let value = json!({
            "Date": "1405/07/28",
            "LastModified": "2026-10-19T08:00:00",
            "employees": [{"employee_id": "1"}],
            "shift_groups": [{
                "group_id": "north",
                "name": "North",
                "morning_shift": {"capacity": 2, "assigned_employees": ["1"]}
            }]
        });

        let report = ReportNormalizer::default().normalize(&value).unwrap();

        assert_eq!(report.last_modified, "2026-10-19T08:00:00");
        let north = report.shift_group("north").unwrap();
        assert_eq!(north.shift(ShiftType::Morning).capacity, 2);
        assert_eq!(north.shift(ShiftType::Morning).occupancy(), 1);
    }
}
