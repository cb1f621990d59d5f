//! Workforce entity store
//!
//! Owns employees, roles, absences, tasks and the shift registry, and keeps
//! the cross-entity rules: deleting an employee cascades out of slots,
//! team-leader references and task assignments; marking someone absent for
//! today evicts them from their slot.

use crate::config::DEFAULT_GROUP_ID;
use crate::error::{AppError, Result};
use crate::model::calendar::BusinessDate;
use crate::model::models::*;
use crate::model::shifts::{
    Assignment, ShiftGroup, ShiftManager, ShiftType, SlotRef, UpdateShiftGroup,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Tasks plus the counter that hands out their ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskBook {
    pub next_id: u64,
    pub items: Vec<Task>,
}

impl Default for TaskBook {
    fn default() -> Self {
        Self {
            next_id: 1,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workforce {
    #[serde(default)]
    employees: Vec<Employee>,
    #[serde(default = "default_roles")]
    roles: Vec<Role>,
    #[serde(default)]
    shifts: ShiftManager,
    #[serde(default)]
    absences: Vec<AbsenceRecord>,
    #[serde(default)]
    tasks: TaskBook,
}

fn default_roles() -> Vec<Role> {
    vec![Role::builtin()]
}

impl Default for Workforce {
    fn default() -> Self {
        Self {
            employees: Vec::new(),
            roles: default_roles(),
            shifts: ShiftManager::new(),
            absences: Vec::new(),
            tasks: TaskBook::default(),
        }
    }
}

impl Workforce {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-establish invariants on a store read back from disk.
    pub fn restore(mut self) -> Self {
        self.shifts = ShiftManager::from_groups(self.shifts.groups().to_vec());

        let known: BTreeSet<String> = self.employees.iter().map(|e| e.employee_id.clone()).collect();
        for stale in self.shifts.assigned_employee_ids().difference(&known) {
            tracing::warn!("Dropping slot held by unknown employee {}", stale);
            self.shifts.unassign_everywhere(stale);
        }

        let max_task_id = self.tasks.items.iter().map(|t| t.task_id).max().unwrap_or(0);
        if self.tasks.next_id <= max_task_id {
            self.tasks.next_id = max_task_id + 1;
        }
        self
    }

    // ===== Accessors =====

    pub fn employees(&self) -> &[Employee] {
        &self.employees
    }

    pub fn employee(&self, employee_id: &str) -> Option<&Employee> {
        self.employees.iter().find(|e| e.employee_id == employee_id)
    }

    fn require_employee(&self, employee_id: &str) -> Result<&Employee> {
        self.employee(employee_id)
            .ok_or_else(|| AppError::EmployeeNotFound(employee_id.to_string()))
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn role(&self, role_id: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.role_id == role_id)
    }

    pub fn shifts(&self) -> &ShiftManager {
        &self.shifts
    }

    pub fn absences(&self) -> &[AbsenceRecord] {
        &self.absences
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks.items
    }

    pub fn task(&self, task_id: u64) -> Option<&Task> {
        self.tasks.items.iter().find(|t| t.task_id == task_id)
    }

    pub fn next_task_id(&self) -> u64 {
        self.tasks.next_id
    }

    // ===== Employees =====

    pub fn add_employee(&mut self, req: NewEmployee) -> Result<Employee> {
        let employee_id = match req.employee_id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => Uuid::new_v4().to_string(),
        };
        if self.employee(&employee_id).is_some() {
            return Err(AppError::Duplicate(employee_id));
        }

        let role_id = req.role_id.unwrap_or_else(default_role_id);
        if self.role(&role_id).is_none() {
            return Err(AppError::RoleNotFound(role_id));
        }
        let shift_group_id = req.shift_group_id.unwrap_or_else(default_group_id);
        if self.shifts.group(&shift_group_id).is_none() {
            return Err(AppError::GroupNotFound(shift_group_id));
        }

        let employee = Employee {
            employee_id,
            first_name: req.first_name.trim().to_string(),
            last_name: req.last_name.trim().to_string(),
            role_id,
            shift_group_id,
            is_manager: req.is_manager,
            photo_path: req.photo_path.filter(|p| !p.trim().is_empty()),
        };

        tracing::debug!("Created employee: {}", employee.employee_id);
        self.employees.push(employee.clone());
        Ok(employee)
    }

    /// Apply an edit. Moving an employee to another group vacates any slot
    /// they hold outside the new group.
    pub fn update_employee(&mut self, req: UpdateEmployee) -> Result<Employee> {
        self.require_employee(&req.employee_id)?;
        if let Some(role_id) = &req.role_id {
            if self.role(role_id).is_none() {
                return Err(AppError::RoleNotFound(role_id.clone()));
            }
        }
        if let Some(group_id) = &req.shift_group_id {
            if self.shifts.group(group_id).is_none() {
                return Err(AppError::GroupNotFound(group_id.clone()));
            }
        }

        if let Some(group_id) = &req.shift_group_id {
            let outside = self
                .shifts
                .find_assignment(&req.employee_id)
                .filter(|slot| &slot.group_id != group_id);
            if outside.is_some() {
                self.shifts.unassign_everywhere(&req.employee_id);
            }
        }

        let employee = self
            .employees
            .iter_mut()
            .find(|e| e.employee_id == req.employee_id)
            .ok_or_else(|| AppError::EmployeeNotFound(req.employee_id.clone()))?;
        if let Some(first_name) = req.first_name {
            employee.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = req.last_name {
            employee.last_name = last_name.trim().to_string();
        }
        if let Some(role_id) = req.role_id {
            employee.role_id = role_id;
        }
        if let Some(group_id) = req.shift_group_id {
            employee.shift_group_id = group_id;
        }
        if let Some(is_manager) = req.is_manager {
            employee.is_manager = is_manager;
        }
        if let Some(photo_path) = req.photo_path {
            employee.photo_path = photo_path.filter(|p| !p.trim().is_empty());
        }

        Ok(employee.clone())
    }

    /// Remove the live record and every reference to it
    pub fn delete_employee(&mut self, employee_id: &str) -> Result<Employee> {
        let index = self
            .employees
            .iter()
            .position(|e| e.employee_id == employee_id)
            .ok_or_else(|| AppError::EmployeeNotFound(employee_id.to_string()))?;

        self.shifts.unassign_everywhere(employee_id);
        self.shifts.clear_team_leader_references(employee_id);
        for task in &mut self.tasks.items {
            task.assigned_employees.remove(employee_id);
        }
        self.absences.retain(|a| a.employee_id != employee_id);

        let employee = self.employees.remove(index);
        tracing::info!("Deleted employee {}", employee_id);
        Ok(employee)
    }

    // ===== Roles =====

    pub fn add_role(&mut self, role: Role) -> Result<()> {
        role.validate()?;
        if self.role(&role.role_id).is_some() {
            return Err(AppError::Duplicate(role.role_id));
        }
        self.roles.push(role);
        Ok(())
    }

    /// Replace a role's display fields; the id itself never changes
    pub fn update_role(&mut self, role: Role) -> Result<()> {
        role.validate()?;
        let existing = self
            .roles
            .iter_mut()
            .find(|r| r.role_id == role.role_id)
            .ok_or_else(|| AppError::RoleNotFound(role.role_id.clone()))?;
        *existing = role;
        Ok(())
    }

    pub fn delete_role(&mut self, role_id: &str) -> Result<()> {
        let index = self
            .roles
            .iter()
            .position(|r| r.role_id == role_id)
            .ok_or_else(|| AppError::RoleNotFound(role_id.to_string()))?;
        if self.employees.iter().any(|e| e.role_id == role_id) {
            return Err(AppError::RoleInUse(role_id.to_string()));
        }
        self.roles.remove(index);
        Ok(())
    }

    // ===== Shift Groups =====

    pub fn add_group(&mut self, group: ShiftGroup) -> Result<()> {
        self.shifts.add_group(group)
    }

    pub fn update_group(&mut self, req: UpdateShiftGroup) -> Result<ShiftGroup> {
        self.shifts.update_group(req).cloned()
    }

    /// Delete a group; its members move to the default group
    pub fn remove_group(&mut self, group_id: &str) -> Result<Vec<String>> {
        let released = self.shifts.remove_group(group_id)?;
        for employee in &mut self.employees {
            if employee.shift_group_id == group_id {
                employee.shift_group_id = DEFAULT_GROUP_ID.to_string();
            }
        }
        Ok(released)
    }

    pub fn assign_employee_to_shift(
        &mut self,
        employee_id: &str,
        shift_type: ShiftType,
        slot_index: usize,
        group_id: &str,
    ) -> Result<Assignment> {
        self.require_employee(employee_id)?;
        self.shifts
            .assign_employee_to_shift(employee_id, shift_type, slot_index, group_id)
    }

    pub fn remove_employee_from_shift(
        &mut self,
        employee_id: &str,
        shift_type: ShiftType,
        group_id: &str,
    ) -> bool {
        self.shifts
            .remove_employee_from_shift(employee_id, shift_type, group_id)
    }

    pub fn set_shift_capacity(&mut self, capacity: usize) -> Result<Vec<String>> {
        self.shifts.set_shift_capacity(capacity)
    }

    pub fn set_group_shift_capacity(
        &mut self,
        group_id: &str,
        shift_type: ShiftType,
        capacity: usize,
    ) -> Result<Vec<String>> {
        self.shifts
            .set_group_shift_capacity(group_id, shift_type, capacity)
    }

    pub fn clear_shift(&mut self, shift_type: ShiftType, group_id: &str) -> Result<Vec<String>> {
        self.shifts.clear_shift(shift_type, group_id)
    }

    /// Set or clear (`""`) a shift's team leader
    pub fn set_team_leader(
        &mut self,
        shift_type: ShiftType,
        employee_id: &str,
        group_id: &str,
    ) -> Result<()> {
        if !employee_id.trim().is_empty() {
            self.require_employee(employee_id.trim())?;
        }
        self.shifts.set_team_leader(shift_type, employee_id, group_id)
    }

    // ===== Absences =====

    /// Record an absence, replacing any record for the same employee and
    /// date. If the date is today the employee loses their slot.
    pub fn mark_absent(
        &mut self,
        employee_id: &str,
        category: AbsenceCategory,
        date: BusinessDate,
        notes: impl Into<String>,
        today: &BusinessDate,
    ) -> Result<Option<SlotRef>> {
        self.require_employee(employee_id)?;

        self.absences
            .retain(|a| !(a.employee_id == employee_id && a.date == date));
        let evicted = if &date == today {
            self.shifts.unassign_everywhere(employee_id)
        } else {
            None
        };

        tracing::debug!("Marked {} as {} on {}", employee_id, category, date);
        self.absences.push(AbsenceRecord {
            employee_id: employee_id.to_string(),
            category,
            date,
            notes: notes.into(),
        });
        Ok(evicted)
    }

    pub fn clear_absence(&mut self, employee_id: &str, date: &BusinessDate) -> bool {
        let before = self.absences.len();
        self.absences
            .retain(|a| !(a.employee_id == employee_id && &a.date == date));
        before != self.absences.len()
    }

    pub fn absence_for(&self, employee_id: &str, date: &BusinessDate) -> Option<&AbsenceRecord> {
        self.absences
            .iter()
            .find(|a| a.employee_id == employee_id && &a.date == date)
    }

    pub fn is_absent(&self, employee_id: &str, date: &BusinessDate) -> bool {
        self.absence_for(employee_id, date).is_some()
    }

    pub fn absences_on(&self, date: &BusinessDate) -> Vec<&AbsenceRecord> {
        self.absences.iter().filter(|a| &a.date == date).collect()
    }

    pub fn absences_by_category(
        &self,
        date: &BusinessDate,
        category: AbsenceCategory,
    ) -> Vec<&AbsenceRecord> {
        self.absences
            .iter()
            .filter(|a| &a.date == date && a.category == category)
            .collect()
    }

    /// Evict everyone absent on `today` from their slots. Returns who moved.
    pub fn enforce_absences(&mut self, today: &BusinessDate) -> Vec<String> {
        let absent: Vec<String> = self
            .absences_on(today)
            .into_iter()
            .map(|a| a.employee_id.clone())
            .collect();
        absent
            .into_iter()
            .filter(|id| self.shifts.unassign_everywhere(id).is_some())
            .collect()
    }

    /// Employees not absent on `date`
    pub fn present_employees(&self, date: &BusinessDate) -> Vec<&Employee> {
        self.employees
            .iter()
            .filter(|e| !self.is_absent(&e.employee_id, date))
            .collect()
    }

    /// The assignable pool: present on `date` and not seated anywhere
    pub fn available_employees(&self, date: &BusinessDate) -> Vec<&Employee> {
        let assigned = self.shifts.assigned_employee_ids();
        self.present_employees(date)
            .into_iter()
            .filter(|e| !assigned.contains(&e.employee_id))
            .collect()
    }

    // ===== Tasks =====

    pub fn add_task(&mut self, req: NewTask) -> Result<Task> {
        if req.title.trim().is_empty() {
            return Err(AppError::Validation("Task title must not be empty".to_string()));
        }
        let task = Task {
            task_id: self.tasks.next_id,
            title: req.title.trim().to_string(),
            description: req.description,
            priority: req.priority,
            status: TaskStatus::Pending,
            estimated_hours: req.estimated_hours,
            actual_hours: 0.0,
            target_date: req.target_date,
            notes: req.notes,
            assigned_employees: BTreeSet::new(),
        };
        self.tasks.next_id += 1;
        self.tasks.items.push(task.clone());
        Ok(task)
    }

    fn task_mut(&mut self, task_id: u64) -> Result<&mut Task> {
        self.tasks
            .items
            .iter_mut()
            .find(|t| t.task_id == task_id)
            .ok_or(AppError::TaskNotFound(task_id))
    }

    pub fn update_task(&mut self, req: UpdateTask) -> Result<Task> {
        let task = self.task_mut(req.task_id)?;
        if let Some(title) = req.title {
            task.title = title;
        }
        if let Some(description) = req.description {
            task.description = description;
        }
        if let Some(priority) = req.priority {
            task.priority = priority;
        }
        if let Some(status) = req.status {
            task.status = status;
        }
        if let Some(estimated_hours) = req.estimated_hours {
            task.estimated_hours = estimated_hours;
        }
        if let Some(actual_hours) = req.actual_hours {
            task.actual_hours = actual_hours;
        }
        if let Some(target_date) = req.target_date {
            task.target_date = target_date;
        }
        if let Some(notes) = req.notes {
            task.notes = notes;
        }
        Ok(task.clone())
    }

    pub fn set_task_status(&mut self, task_id: u64, status: TaskStatus) -> Result<()> {
        self.task_mut(task_id)?.status = status;
        Ok(())
    }

    pub fn delete_task(&mut self, task_id: u64) -> Result<Task> {
        let index = self
            .tasks
            .items
            .iter()
            .position(|t| t.task_id == task_id)
            .ok_or(AppError::TaskNotFound(task_id))?;
        Ok(self.tasks.items.remove(index))
    }

    /// Add employees to a task. Unknown employees fail the whole call.
    pub fn assign_task(&mut self, task_id: u64, employee_ids: &[String]) -> Result<()> {
        for employee_id in employee_ids {
            self.require_employee(employee_id)?;
        }
        let task = self.task_mut(task_id)?;
        task.assigned_employees.extend(employee_ids.iter().cloned());
        Ok(())
    }

    pub fn unassign_task(&mut self, task_id: u64, employee_id: &str) -> Result<bool> {
        Ok(self.task_mut(task_id)?.assigned_employees.remove(employee_id))
    }

    pub fn tasks_for_employee(&self, employee_id: &str) -> Vec<&Task> {
        self.tasks
            .items
            .iter()
            .filter(|t| t.assigned_employees.contains(employee_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> BusinessDate {
        BusinessDate::new("2026-10-19")
    }

    fn new_employee(id: &str, first: &str) -> NewEmployee {
        NewEmployee {
            employee_id: Some(id.to_string()),
            first_name: first.to_string(),
            last_name: "Test".to_string(),
            ..NewEmployee::default()
        }
    }

    fn populated() -> Workforce {
        let mut workforce = Workforce::new();
        for (id, name) in [("e1", "Ali"), ("e2", "Bita"), ("e3", "Cyrus")] {
            workforce.add_employee(new_employee(id, name)).unwrap();
        }
        workforce
    }

    #[test]
    fn test_add_employee_defaults_and_generated_id() {
        let mut workforce = Workforce::new();
        let employee = workforce
            .add_employee(NewEmployee {
                first_name: " Dana ".to_string(),
                last_name: "Rahimi".to_string(),
                ..NewEmployee::default()
            })
            .unwrap();

        assert!(!employee.employee_id.is_empty());
        assert_eq!(employee.first_name, "Dana");
        assert_eq!(employee.role_id, "employee");
        assert_eq!(employee.shift_group_id, DEFAULT_GROUP_ID);
    }

    #[test]
    fn test_add_employee_rejects_duplicates_and_unknown_refs() {
        let mut workforce = populated();

        assert!(matches!(
            workforce.add_employee(new_employee("e1", "Again")),
            Err(AppError::Duplicate(_))
        ));

        let mut req = new_employee("e9", "Role");
        req.role_id = Some("pilot".to_string());
        assert!(matches!(workforce.add_employee(req), Err(AppError::RoleNotFound(_))));

        let mut req = new_employee("e9", "Group");
        req.shift_group_id = Some("nowhere".to_string());
        assert!(matches!(workforce.add_employee(req), Err(AppError::GroupNotFound(_))));
    }

    #[test]
    fn test_assign_unknown_employee_fails() {
        let mut workforce = populated();
        let err = workforce
            .assign_employee_to_shift("ghost", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap_err();
        assert!(matches!(err, AppError::EmployeeNotFound(_)));
    }

    #[test]
    fn test_delete_employee_cascades() {
        let mut workforce = populated();
        workforce
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();
        workforce
            .set_team_leader(ShiftType::Evening, "e1", DEFAULT_GROUP_ID)
            .unwrap();
        let task = workforce
            .add_task(NewTask {
                title: "Inventory".to_string(),
                ..NewTask::default()
            })
            .unwrap();
        workforce
            .assign_task(task.task_id, &["e1".to_string(), "e2".to_string()])
            .unwrap();

        workforce.delete_employee("e1").unwrap();

        assert!(workforce.employee("e1").is_none());
        assert!(!workforce.shifts().is_assigned("e1"));
        assert_eq!(
            workforce.shifts().default_group().evening_shift.team_leader_id(),
            None
        );
        let task = workforce.task(task.task_id).unwrap();
        assert_eq!(task.assigned_employees.len(), 1);
        assert!(task.assigned_employees.contains("e2"));
    }

    #[test]
    fn test_role_in_use_cannot_be_deleted() {
        let mut workforce = populated();
        assert!(matches!(
            workforce.delete_role("employee"),
            Err(AppError::RoleInUse(_))
        ));

        workforce.add_role(Role::new("cashier", "Cashier")).unwrap();
        workforce.delete_role("cashier").unwrap();
        assert!(workforce.role("cashier").is_none());
    }

    #[test]
    fn test_mark_absent_today_evicts_from_slot() {
        let mut workforce = populated();
        workforce
            .assign_employee_to_shift("e2", ShiftType::Evening, 4, DEFAULT_GROUP_ID)
            .unwrap();

        let evicted = workforce
            .mark_absent("e2", AbsenceCategory::Sick, today(), "flu", &today())
            .unwrap();

        assert_eq!(evicted.map(|s| s.slot_index), Some(4));
        assert!(!workforce.shifts().is_assigned("e2"));
        let available: Vec<&str> = workforce
            .available_employees(&today())
            .iter()
            .map(|e| e.employee_id.as_str())
            .collect();
        assert!(!available.contains(&"e2"));
    }

    #[test]
    fn test_mark_absent_other_day_keeps_slot() {
        let mut workforce = populated();
        workforce
            .assign_employee_to_shift("e2", ShiftType::Evening, 4, DEFAULT_GROUP_ID)
            .unwrap();

        let tomorrow = BusinessDate::new("2026-10-20");
        let evicted = workforce
            .mark_absent("e2", AbsenceCategory::Leave, tomorrow.clone(), "", &today())
            .unwrap();

        assert!(evicted.is_none());
        assert!(workforce.shifts().is_assigned("e2"));
        assert!(workforce.is_absent("e2", &tomorrow));

        // Day rolls over
        let moved = workforce.enforce_absences(&tomorrow);
        assert_eq!(moved, vec!["e2".to_string()]);
    }

    #[test]
    fn test_same_date_absence_replaces_previous() {
        let mut workforce = populated();
        workforce
            .mark_absent("e3", AbsenceCategory::Leave, today(), "", &today())
            .unwrap();
        workforce
            .mark_absent("e3", AbsenceCategory::Sick, today(), "doctor", &today())
            .unwrap();

        let records = workforce.absences_on(&today());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, AbsenceCategory::Sick);
        assert_eq!(records[0].notes, "doctor");
        assert!(workforce
            .absences_by_category(&today(), AbsenceCategory::Leave)
            .is_empty());
    }

    #[test]
    fn test_available_excludes_assigned_and_absent() {
        let mut workforce = populated();
        workforce
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();
        workforce
            .mark_absent("e3", AbsenceCategory::Absent, today(), "", &today())
            .unwrap();

        let available: Vec<&str> = workforce
            .available_employees(&today())
            .iter()
            .map(|e| e.employee_id.as_str())
            .collect();
        assert_eq!(available, vec!["e2"]);
        assert_eq!(workforce.present_employees(&today()).len(), 2);
    }

    #[test]
    fn test_group_change_vacates_slot_in_other_group() {
        let mut workforce = populated();
        workforce
            .add_group(ShiftGroup::new("bakery", "Bakery"))
            .unwrap();
        workforce
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();

        workforce
            .update_employee(UpdateEmployee {
                employee_id: "e1".to_string(),
                shift_group_id: Some("bakery".to_string()),
                ..UpdateEmployee::default()
            })
            .unwrap();

        assert!(!workforce.shifts().is_assigned("e1"));
        assert_eq!(workforce.employee("e1").unwrap().shift_group_id, "bakery");
    }

    #[test]
    fn test_remove_group_rehomes_members() {
        let mut workforce = populated();
        workforce
            .add_group(ShiftGroup::new("bakery", "Bakery"))
            .unwrap();
        workforce
            .update_employee(UpdateEmployee {
                employee_id: "e2".to_string(),
                shift_group_id: Some("bakery".to_string()),
                ..UpdateEmployee::default()
            })
            .unwrap();
        workforce
            .assign_employee_to_shift("e2", ShiftType::Evening, 1, "bakery")
            .unwrap();

        let released = workforce.remove_group("bakery").unwrap();

        assert_eq!(released, vec!["e2".to_string()]);
        assert_eq!(workforce.employee("e2").unwrap().shift_group_id, DEFAULT_GROUP_ID);
    }

    #[test]
    fn test_task_ids_are_monotonic() {
        let mut workforce = Workforce::new();
        let first = workforce
            .add_task(NewTask {
                title: "A".to_string(),
                ..NewTask::default()
            })
            .unwrap();
        workforce.delete_task(first.task_id).unwrap();
        let second = workforce
            .add_task(NewTask {
                title: "B".to_string(),
                ..NewTask::default()
            })
            .unwrap();

        assert_eq!(first.task_id, 1);
        assert_eq!(second.task_id, 2);
        assert_eq!(workforce.next_task_id(), 3);
    }

    #[test]
    fn test_task_update_and_status() {
        let mut workforce = populated();
        let task = workforce
            .add_task(NewTask {
                title: "Restock".to_string(),
                priority: TaskPriority::High,
                estimated_hours: 2.5,
                ..NewTask::default()
            })
            .unwrap();

        workforce
            .set_task_status(task.task_id, TaskStatus::InProgress)
            .unwrap();
        let updated = workforce
            .update_task(UpdateTask {
                task_id: task.task_id,
                actual_hours: Some(3.0),
                status: Some(TaskStatus::Completed),
                ..UpdateTask::default()
            })
            .unwrap();

        assert_eq!(updated.status, TaskStatus::Completed);
        assert_eq!(updated.actual_hours, 3.0);
        assert_eq!(updated.priority, TaskPriority::High);
        assert!(matches!(
            workforce.assign_task(task.task_id, &["ghost".to_string()]),
            Err(AppError::EmployeeNotFound(_))
        ));
    }

    #[test]
    fn test_restore_repairs_counter_and_stale_slots() {
        let mut workforce = populated();
        workforce
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();
        workforce
            .add_task(NewTask {
                title: "A".to_string(),
                ..NewTask::default()
            })
            .unwrap();

        let mut json = serde_json::to_value(&workforce).unwrap();
        json["employees"] = serde_json::json!([]);
        json["tasks"]["next_id"] = serde_json::json!(0);

        let restored: Workforce = serde_json::from_value(json).unwrap();
        let restored = restored.restore();

        assert!(!restored.shifts().is_assigned("e1"));
        assert_eq!(restored.next_task_id(), 2);
    }
}
