//! Shift and shift-group reconstruction
//!
//! Rosters arrive either as full employee records or as id lists
//! (`AssignedEmployeeIds`), and whole shifts or groups may be embedded as
//! JSON strings. Ids are resolved against the already-normalized employee
//! list; unresolvable ids leave their slot empty.

use super::encoded::{
    field, materialize, materialize_array, materialize_object, scalar_string, scalar_usize,
    Encoded,
};
use super::legacy::RawEmployee;
use super::EmployeeIndex;
use crate::config::{DEFAULT_GROUP_ID, DEFAULT_SHIFT_CAPACITY};
use crate::model::report::synthesized_default_group;
use crate::model::{ReportShift, ReportShiftGroup, ReportShifts, ShiftType};
use serde::Deserialize;
use serde_json::{Map, Value};

const MORNING_KEYS: &[&str] = &["morning", "morning_shift", "MorningShift", "Morning"];
const EVENING_KEYS: &[&str] = &["evening", "evening_shift", "EveningShift", "Evening"];
const ROSTER_KEYS: &[&str] = &[
    "assigned_employees",
    "AssignedEmployees",
    "AssignedEmployeeIds",
    "assigned_employee_ids",
    "employees",
];
const GROUP_CONTAINER_KEYS: &[&str] = &["ShiftGroups", "shift_groups", "groups"];

/// Which generation of writer produced the `shifts` object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftsShape {
    /// `morning` / `evening` objects
    Current,
    /// `MorningShift` / `EveningShift`, usually embedded strings
    Legacy,
    /// Neither present
    Missing,
}

pub fn detect_shape(shifts: &Map<String, Value>) -> ShiftsShape {
    if shifts.contains_key("morning") || shifts.contains_key("evening") {
        ShiftsShape::Current
    } else if shifts.contains_key("MorningShift") || shifts.contains_key("EveningShift") {
        ShiftsShape::Legacy
    } else {
        ShiftsShape::Missing
    }
}

fn shift_keys(shift_type: ShiftType) -> &'static [&'static str] {
    match shift_type {
        ShiftType::Morning => MORNING_KEYS,
        ShiftType::Evening => EVENING_KEYS,
    }
}

/// Build the canonical `shifts` section.
///
/// `shifts` is the persisted `shifts` value; `top_level_groups` is a
/// `shift_groups` key found at the report root, which some writers used
/// instead of nesting it under `shifts`.
pub fn normalize_shifts(
    shifts: Option<&Value>,
    top_level_groups: Option<&Value>,
    employees: &EmployeeIndex<'_>,
) -> ReportShifts {
    let shifts_obj = shifts.and_then(|value| {
        let decoded = materialize_object(value);
        if decoded.is_none() {
            tracing::warn!("Skipping malformed shifts section");
        }
        decoded
    });

    let shape = shifts_obj
        .as_deref()
        .map(detect_shape)
        .unwrap_or(ShiftsShape::Missing);
    tracing::debug!("Shifts section shape: {:?}", shape);

    let read_top = |shift_type: ShiftType| -> Option<ReportShift> {
        let obj = shifts_obj.as_deref()?;
        let value = field(obj, shift_keys(shift_type))?;
        let shift = normalize_shift(value, employees);
        if shift.is_none() {
            tracing::warn!("Skipping malformed {} shift", shift_type);
        }
        shift
    };
    let morning = read_top(ShiftType::Morning);
    let evening = read_top(ShiftType::Evening);

    let groups_value = shifts_obj
        .as_deref()
        .and_then(|obj| field(obj, &["shift_groups", "ShiftGroups"]))
        .or(top_level_groups);
    let mut shift_groups = groups_value
        .map(|value| normalize_groups(value, employees))
        .unwrap_or_default();

    let default_group = shift_groups
        .iter()
        .find(|g| g.group_id == DEFAULT_GROUP_ID)
        .cloned();
    let morning = morning
        .or_else(|| default_group.as_ref().map(|g| g.morning_shift.clone()))
        .unwrap_or_default();
    let evening = evening
        .or_else(|| default_group.as_ref().map(|g| g.evening_shift.clone()))
        .unwrap_or_default();

    if shift_groups.is_empty() {
        shift_groups.push(synthesized_default_group(&morning, &evening));
    }

    ReportShifts {
        morning,
        evening,
        shift_groups,
    }
}

/// One shift in any encoding
pub fn normalize_shift(value: &Value, employees: &EmployeeIndex<'_>) -> Option<ReportShift> {
    let obj = materialize_object(value)?;

    let declared = field(&obj, &["capacity", "Capacity", "MaxCapacity"]).and_then(scalar_usize);
    let mut assigned_employees: Vec<_> = match field(&obj, ROSTER_KEYS) {
        Some(roster) => match materialize_array(roster) {
            Some(items) => items.iter().map(|entry| resolve_entry(entry, employees)).collect(),
            None => {
                tracing::warn!("Skipping malformed roster");
                Vec::new()
            }
        },
        None => Vec::new(),
    };

    let capacity = match declared {
        Some(capacity) if capacity > 0 => capacity,
        _ if !assigned_employees.is_empty() => assigned_employees.len(),
        _ => DEFAULT_SHIFT_CAPACITY,
    };
    if assigned_employees.len() > capacity {
        // Keep everyone: dropping rostered people would hide them from the board
        tracing::warn!(
            "Roster of {} exceeds capacity {}",
            assigned_employees.len(),
            capacity
        );
    } else {
        assigned_employees.resize(capacity, None);
    }

    let team_leader_id = field(&obj, &["team_leader_id", "TeamLeaderId", "TeamLeader"])
        .and_then(|v| match Encoded::classify(v) {
            Encoded::Record(map) => field(&map, &["employee_id", "EmployeeId"]).and_then(scalar_string),
            Encoded::Reference(id) => Some(id),
            Encoded::Empty => None,
        });
    let team_leader_name = team_leader_id
        .as_deref()
        .and_then(|id| employees.get(id))
        .map(|leader| leader.full_name())
        .or_else(|| {
            field(&obj, &["team_leader_name", "TeamLeaderName"])
                .and_then(scalar_string)
        });

    Some(ReportShift {
        capacity,
        team_leader_id,
        team_leader_name,
        assigned_employees,
    })
}

/// Resolve one roster slot
fn resolve_entry(
    entry: &Value,
    employees: &EmployeeIndex<'_>,
) -> Option<crate::model::Employee> {
    match Encoded::classify(entry) {
        Encoded::Record(map) => {
            let value = Value::Object(map.into_owned());
            match RawEmployee::deserialize(&value) {
                Ok(raw) => Some(raw.into_employee().0),
                Err(e) => {
                    tracing::warn!("Skipping malformed roster entry: {}", e);
                    None
                }
            }
        }
        Encoded::Reference(id) => {
            let found = employees.get(&id).cloned();
            if found.is_none() {
                tracing::warn!("Roster references unknown employee {}", id);
            }
            found
        }
        Encoded::Empty => None,
    }
}

/// The `shift_groups` section in any of its container forms
pub fn normalize_groups(value: &Value, employees: &EmployeeIndex<'_>) -> Vec<ReportShiftGroup> {
    let Some(container) = materialize(value) else {
        tracing::warn!("Skipping malformed shift_groups section");
        return Vec::new();
    };

    let mut groups = Vec::new();
    match container.as_ref() {
        Value::Array(items) => {
            for item in items {
                push_group(&mut groups, None, item, employees);
            }
        }
        Value::Object(map) => {
            // `{ "ShiftGroups": {...} }` wraps the real map
            if let Some(inner) = field(map, GROUP_CONTAINER_KEYS) {
                return normalize_groups(inner, employees);
            }
            for (key, item) in map {
                push_group(&mut groups, Some(key), item, employees);
            }
        }
        _ => {}
    }
    groups
}

fn push_group(
    groups: &mut Vec<ReportShiftGroup>,
    key: Option<&str>,
    value: &Value,
    employees: &EmployeeIndex<'_>,
) {
    match normalize_group(key, value, employees) {
        Some(group) if groups.iter().any(|g| g.group_id == group.group_id) => {
            tracing::warn!("Duplicate shift group {} skipped", group.group_id);
        }
        Some(group) => groups.push(group),
        None => tracing::warn!("Skipping malformed shift group {}", key.unwrap_or("?")),
    }
}

fn normalize_group(
    key: Option<&str>,
    value: &Value,
    employees: &EmployeeIndex<'_>,
) -> Option<ReportShiftGroup> {
    let obj = materialize_object(value)?;
    let group_id = field(&obj, &["group_id", "GroupId", "Id", "id"])
        .and_then(scalar_string)
        .or_else(|| key.map(str::to_string))?;

    let text = |keys: &[&str]| field(&obj, keys).and_then(scalar_string).unwrap_or_default();
    let shift = |shift_type: ShiftType| {
        field(&obj, shift_keys(shift_type))
            .and_then(|v| {
                let shift = normalize_shift(v, employees);
                if shift.is_none() {
                    tracing::warn!("Skipping malformed {} shift of group {}", shift_type, group_id);
                }
                shift
            })
            .unwrap_or_default()
    };

    let name = text(&["name", "Name"]);
    Some(ReportShiftGroup {
        name: if name.is_empty() { group_id.clone() } else { name },
        description: text(&["description", "Description"]),
        color: text(&["color", "Color"]),
        supervisor_name: text(&["supervisor_name", "SupervisorName", "Supervisor"]),
        morning_shift: shift(ShiftType::Morning),
        evening_shift: shift(ShiftType::Evening),
        group_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Employee;
    use serde_json::json;

    fn staff() -> Vec<Employee> {
        ["1", "2", "3"]
            .iter()
            .map(|id| Employee {
                employee_id: id.to_string(),
                first_name: format!("First{}", id),
                last_name: format!("Last{}", id),
                role_id: "employee".to_string(),
                shift_group_id: "default".to_string(),
                is_manager: false,
                photo_path: None,
            })
            .collect()
    }

    #[test]
    fn test_detect_shape() {
        let current = json!({"morning": {}, "evening": {}});
        let legacy = json!({"MorningShift": "{}", "EveningShift": "{}"});
        assert_eq!(detect_shape(current.as_object().unwrap()), ShiftsShape::Current);
        assert_eq!(detect_shape(legacy.as_object().unwrap()), ShiftsShape::Legacy);
        assert_eq!(detect_shape(&Map::new()), ShiftsShape::Missing);
    }

    #[test]
    fn test_legacy_shift_ids_resolved() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let value = json!("{\"Capacity\":4,\"AssignedEmployeeIds\":[\"2\",null,\"9\",\"1\"],\"TeamLeaderId\":\"3\"}");

        let shift = normalize_shift(&value, &index).unwrap();

        assert_eq!(shift.capacity, 4);
        assert_eq!(shift.assigned_employees.len(), 4);
        assert_eq!(shift.assigned_employees[0].as_ref().unwrap().employee_id, "2");
        assert!(shift.assigned_employees[1].is_none());
        assert!(shift.assigned_employees[2].is_none(), "unknown id leaves slot empty");
        assert_eq!(shift.team_leader_id.as_deref(), Some("3"));
        assert_eq!(shift.team_leader_name.as_deref(), Some("First3 Last3"));
    }

    #[test]
    fn test_current_shift_with_records_kept() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let value = json!({
            "capacity": 2,
            "assigned_employees": [
                {"employee_id": "7", "first_name": "Only", "last_name": "Here"},
                null
            ]
        });

        let shift = normalize_shift(&value, &index).unwrap();

        let first = shift.assigned_employees[0].as_ref().unwrap();
        assert_eq!(first.employee_id, "7");
        assert_eq!(first.first_name, "Only");
        assert_eq!(shift.occupancy(), 1);
    }

    #[test]
    fn test_missing_capacity_pads_to_default() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let shift = normalize_shift(&json!({"assigned_employees": []}), &index).unwrap();
        assert_eq!(shift.capacity, DEFAULT_SHIFT_CAPACITY);
        assert_eq!(shift.assigned_employees.len(), DEFAULT_SHIFT_CAPACITY);
    }

    #[test]
    fn test_groups_from_wrapped_map_of_strings() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let group = json!({
            "GroupId": "g1",
            "Name": "Kitchen",
            "SupervisorName": "Reza",
            "MorningShift": "{\"Capacity\":2,\"AssignedEmployeeIds\":[\"1\"]}",
            "EveningShift": {"Capacity": 1, "AssignedEmployeeIds": ["2"]}
        });
        let value = json!({"ShiftGroups": {"g1": group.to_string()}});

        let groups = normalize_groups(&value, &index);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "Kitchen");
        assert_eq!(groups[0].supervisor_name, "Reza");
        assert_eq!(groups[0].morning_shift.occupancy(), 1);
        assert_eq!(groups[0].evening_shift.capacity, 1);
    }

    #[test]
    fn test_bad_group_skipped_not_fatal() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let value = json!({"ShiftGroups": {"bad": "{not json", "good": {"name": "Good"}}});

        let groups = normalize_groups(&value, &index);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].group_id, "good");
    }

    #[test]
    fn test_missing_groups_synthesize_default() {
        let employees = staff();
        let index = EmployeeIndex::new(&employees);
        let shifts = json!({"morning": {"capacity": 3, "assigned_employees": ["1"]}});

        let section = normalize_shifts(Some(&shifts), None, &index);

        assert_eq!(section.shift_groups.len(), 1);
        let group = &section.shift_groups[0];
        assert_eq!(group.group_id, DEFAULT_GROUP_ID);
        assert_eq!(group.morning_shift, section.morning);
        assert_eq!(section.evening.capacity, DEFAULT_SHIFT_CAPACITY);
    }
}
