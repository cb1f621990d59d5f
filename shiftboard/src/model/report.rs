//! Canonical report
//!
//! The schema-unified shape every snapshot is normalized into, and the exact
//! shape the report writer persists. Rosters hold full employee records in
//! slot order; `None` marks an empty slot.

use crate::config::DEFAULT_SHIFT_CAPACITY;
use crate::model::models::{AbsenceCategory, Employee, Role, Task};
use crate::model::shifts::ShiftType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub date: String,
    pub employees: Vec<Employee>,
    pub managers: Vec<Employee>,
    #[serde(default)]
    pub roles: Vec<Role>,
    pub shifts: ReportShifts,
    pub absences: ReportAbsences,
    pub tasks: Vec<Task>,
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportShifts {
    /// Morning roster of the default group
    pub morning: ReportShift,
    /// Evening roster of the default group
    pub evening: ReportShift,
    pub shift_groups: Vec<ReportShiftGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportShift {
    pub capacity: usize,
    #[serde(default)]
    pub team_leader_id: Option<String>,
    #[serde(default)]
    pub team_leader_name: Option<String>,
    pub assigned_employees: Vec<Option<Employee>>,
}

impl Default for ReportShift {
    fn default() -> Self {
        Self::empty(DEFAULT_SHIFT_CAPACITY)
    }
}

impl ReportShift {
    pub fn empty(capacity: usize) -> Self {
        Self {
            capacity,
            team_leader_id: None,
            team_leader_name: None,
            assigned_employees: vec![None; capacity],
        }
    }

    /// Seated employees in slot order
    pub fn roster(&self) -> impl Iterator<Item = &Employee> {
        self.assigned_employees.iter().flatten()
    }

    pub fn occupancy(&self) -> usize {
        self.roster().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportShiftGroup {
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub supervisor_name: String,
    pub morning_shift: ReportShift,
    pub evening_shift: ReportShift,
}

impl ReportShiftGroup {
    pub fn shift(&self, shift_type: ShiftType) -> &ReportShift {
        match shift_type {
            ShiftType::Morning => &self.morning_shift,
            ShiftType::Evening => &self.evening_shift,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportAbsence {
    pub employee_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub category: AbsenceCategory,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportAbsences {
    #[serde(default)]
    pub leave: Vec<ReportAbsence>,
    #[serde(default)]
    pub sick: Vec<ReportAbsence>,
    #[serde(default)]
    pub absent: Vec<ReportAbsence>,
}

impl ReportAbsences {
    pub fn get(&self, category: AbsenceCategory) -> &[ReportAbsence] {
        match category {
            AbsenceCategory::Leave => &self.leave,
            AbsenceCategory::Sick => &self.sick,
            AbsenceCategory::Absent => &self.absent,
        }
    }

    pub fn get_mut(&mut self, category: AbsenceCategory) -> &mut Vec<ReportAbsence> {
        match category {
            AbsenceCategory::Leave => &mut self.leave,
            AbsenceCategory::Sick => &mut self.sick,
            AbsenceCategory::Absent => &mut self.absent,
        }
    }

    pub fn count(&self, category: AbsenceCategory) -> usize {
        self.get(category).len()
    }

    pub fn total(&self) -> usize {
        AbsenceCategory::ALL.iter().map(|c| self.count(*c)).sum()
    }
}

impl Report {
    /// The "no data yet" report: schema-valid, every list empty.
    pub fn empty() -> Self {
        let morning = ReportShift::default();
        let evening = ReportShift::default();
        Self {
            date: String::new(),
            employees: Vec::new(),
            managers: Vec::new(),
            roles: Vec::new(),
            shifts: ReportShifts {
                shift_groups: vec![synthesized_default_group(&morning, &evening)],
                morning,
                evening,
            },
            absences: ReportAbsences::default(),
            tasks: Vec::new(),
            last_modified: String::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.employees.is_empty() && self.tasks.is_empty() && self.absences.total() == 0
    }

    pub fn employee(&self, employee_id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.employee_id == employee_id)
    }

    pub fn shift_group(&self, group_id: &str) -> Option<&ReportShiftGroup> {
        self.shifts
            .shift_groups
            .iter()
            .find(|g| g.group_id == group_id)
    }
}

/// Default group built from the top-level morning/evening rosters
pub(crate) fn synthesized_default_group(
    morning: &ReportShift,
    evening: &ReportShift,
) -> ReportShiftGroup {
    ReportShiftGroup {
        group_id: crate::config::DEFAULT_GROUP_ID.to_string(),
        name: "Default".to_string(),
        description: String::new(),
        color: String::new(),
        supervisor_name: String::new(),
        morning_shift: morning.clone(),
        evening_shift: evening.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_shape() {
        let report = Report::empty();

        assert!(report.is_empty());
        assert!(report.managers.is_empty());
        for category in AbsenceCategory::ALL {
            assert_eq!(report.absences.count(category), 0);
        }
        assert_eq!(report.shifts.shift_groups.len(), 1);
        assert_eq!(report.shifts.morning.assigned_employees.len(), DEFAULT_SHIFT_CAPACITY);
    }

    #[test]
    fn test_empty_report_serializes_all_top_level_keys() {
        let value = serde_json::to_value(Report::empty()).unwrap();
        let object = value.as_object().unwrap();

        for key in [
            "date",
            "employees",
            "managers",
            "shifts",
            "absences",
            "tasks",
            "last_modified",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
        assert!(value["absences"]["sick"].as_array().unwrap().is_empty());
    }
}
