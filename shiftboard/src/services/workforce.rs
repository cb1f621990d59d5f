//! Workforce service
//!
//! The writing side. Every mutation runs against a draft of the entity
//! model; only when it succeeds and the store is saved does the draft
//! replace the live model. Nobody absent today is left seated by a commit,
//! including one that crosses midnight. After a commit the day's report is
//! republished and observers are told which kinds of entities changed.

use super::report_writer::ReportWriter;
use super::store::WorkforceStore;
use crate::error::Result;
use crate::model::{
    AbsenceCategory, AbsenceRecord, Assignment, BusinessCalendar, BusinessDate, Employee,
    NewEmployee, NewTask, Report, Role, ShiftGroup, ShiftType, SlotRef, Task, TaskStatus,
    UpdateEmployee, UpdateShiftGroup, UpdateTask, Workforce,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

/// What a committed mutation touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    EmployeesUpdated,
    RolesUpdated,
    ShiftsUpdated,
    GroupsUpdated,
    AbsencesUpdated,
    TasksUpdated,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Observer callback; runs after the commit, must not block
pub type ChangeObserver = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

use ChangeEvent::*;

#[derive(Clone)]
pub struct WorkforceService {
    workforce: Arc<RwLock<Workforce>>,
    store: WorkforceStore,
    writer: ReportWriter,
    calendar: Arc<dyn BusinessCalendar>,
    observers: Arc<RwLock<Vec<ChangeObserver>>>,
}

impl WorkforceService {
    /// Load the store, evict anyone absent today, and publish today's report
    pub async fn open(
        store: WorkforceStore,
        writer: ReportWriter,
        calendar: Arc<dyn BusinessCalendar>,
    ) -> Result<Self> {
        let mut workforce = store.load().await?;
        let today = calendar.today();
        let evicted = workforce.enforce_absences(&today);
        if !evicted.is_empty() {
            tracing::info!("Removed {} absent employees from today's shifts", evicted.len());
            store.save(&workforce).await?;
        }
        writer.publish(&workforce, &today).await?;

        Ok(Self {
            workforce: Arc::new(RwLock::new(workforce)),
            store,
            writer,
            calendar,
            observers: Arc::new(RwLock::new(Vec::new())),
        })
    }

    pub fn today(&self) -> BusinessDate {
        self.calendar.today()
    }

    pub async fn subscribe<F>(&self, observer: F)
    where
        F: Fn(ChangeEvent) + Send + Sync + 'static,
    {
        self.observers.write().await.push(Arc::new(observer));
    }

    /// Apply `f` to a draft and commit it atomically
    async fn commit<T, F>(&self, events: &[ChangeEvent], f: F) -> Result<T>
    where
        F: FnOnce(&mut Workforce, &BusinessDate) -> Result<T>,
    {
        let today = self.calendar.today();
        let mut live = self.workforce.write().await;

        let mut draft = live.clone();
        let value = f(&mut draft, &today)?;
        let evicted = draft.enforce_absences(&today);
        if !evicted.is_empty() {
            tracing::info!("Kept {} absent employees off today's shifts", evicted.len());
        }
        self.store.save(&draft).await?;
        *live = draft;

        if let Err(e) = self.writer.publish(&live, &today).await {
            tracing::error!("Failed to publish report for {}: {}", today, e);
        }
        drop(live);

        let mut events = events.to_vec();
        if !evicted.is_empty() && !events.contains(&ShiftsUpdated) {
            events.push(ShiftsUpdated);
        }

        let observers = self.observers.read().await;
        for event in &events {
            tracing::debug!("{}", event);
            for observer in observers.iter() {
                observer(*event);
            }
        }
        Ok(value)
    }

    // ===== Views =====

    /// Copy of the live model
    pub async fn snapshot(&self) -> Workforce {
        self.workforce.read().await.clone()
    }

    pub async fn employees(&self) -> Vec<Employee> {
        self.workforce.read().await.employees().to_vec()
    }

    pub async fn employee(&self, employee_id: &str) -> Option<Employee> {
        self.workforce.read().await.employee(employee_id).cloned()
    }

    pub async fn roles(&self) -> Vec<Role> {
        self.workforce.read().await.roles().to_vec()
    }

    pub async fn groups(&self) -> Vec<ShiftGroup> {
        self.workforce.read().await.shifts().groups().to_vec()
    }

    pub async fn find_assignment(&self, employee_id: &str) -> Option<SlotRef> {
        self.workforce
            .read()
            .await
            .shifts()
            .find_assignment(employee_id)
    }

    /// Employees who can be seated on `date`
    pub async fn available_employees(&self, date: &BusinessDate) -> Vec<Employee> {
        self.workforce
            .read()
            .await
            .available_employees(date)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn absences_on(&self, date: &BusinessDate) -> Vec<AbsenceRecord> {
        self.workforce
            .read()
            .await
            .absences_on(date)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn tasks(&self) -> Vec<Task> {
        self.workforce.read().await.tasks().to_vec()
    }

    pub async fn tasks_for_employee(&self, employee_id: &str) -> Vec<Task> {
        self.workforce
            .read()
            .await
            .tasks_for_employee(employee_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Today's report as it would be published now
    pub async fn report(&self) -> Report {
        let workforce = self.workforce.read().await;
        self.writer.build(&workforce, &self.calendar.today())
    }

    // ===== Employees =====

    pub async fn add_employee(&self, req: NewEmployee) -> Result<Employee> {
        let employee = self
            .commit(&[EmployeesUpdated], |w, _| w.add_employee(req))
            .await?;
        tracing::info!("Employee added: {} ({})", employee.full_name(), employee.employee_id);
        Ok(employee)
    }

    pub async fn update_employee(&self, req: UpdateEmployee) -> Result<Employee> {
        self.commit(&[EmployeesUpdated, ShiftsUpdated], |w, _| w.update_employee(req))
            .await
    }

    /// Delete an employee along with their slot, task assignments and absences
    pub async fn delete_employee(&self, employee_id: &str) -> Result<Employee> {
        let employee = self
            .commit(
                &[EmployeesUpdated, ShiftsUpdated, TasksUpdated, AbsencesUpdated],
                |w, _| w.delete_employee(employee_id),
            )
            .await?;
        tracing::info!("Employee deleted: {}", employee_id);
        Ok(employee)
    }

    // ===== Roles =====

    pub async fn add_role(&self, role: Role) -> Result<()> {
        self.commit(&[RolesUpdated], |w, _| w.add_role(role)).await
    }

    pub async fn update_role(&self, role: Role) -> Result<()> {
        self.commit(&[RolesUpdated], |w, _| w.update_role(role)).await
    }

    pub async fn delete_role(&self, role_id: &str) -> Result<()> {
        self.commit(&[RolesUpdated], |w, _| w.delete_role(role_id))
            .await
    }

    // ===== Groups and shifts =====

    pub async fn add_group(&self, group: ShiftGroup) -> Result<()> {
        self.commit(&[GroupsUpdated, ShiftsUpdated], |w, _| w.add_group(group))
            .await
    }

    pub async fn update_group(&self, req: UpdateShiftGroup) -> Result<ShiftGroup> {
        self.commit(&[GroupsUpdated], |w, _| w.update_group(req))
            .await
    }

    /// Delete a group; returns the employees that lost their slot
    pub async fn remove_group(&self, group_id: &str) -> Result<Vec<String>> {
        self.commit(
            &[GroupsUpdated, ShiftsUpdated, EmployeesUpdated],
            |w, _| w.remove_group(group_id),
        )
        .await
    }

    pub async fn assign_employee_to_shift(
        &self,
        employee_id: &str,
        shift_type: ShiftType,
        slot_index: usize,
        group_id: &str,
    ) -> Result<Assignment> {
        self.commit(&[ShiftsUpdated], |w, _| {
            w.assign_employee_to_shift(employee_id, shift_type, slot_index, group_id)
        })
        .await
    }

    pub async fn remove_employee_from_shift(
        &self,
        employee_id: &str,
        shift_type: ShiftType,
        group_id: &str,
    ) -> Result<bool> {
        self.commit(&[ShiftsUpdated], |w, _| {
            Ok(w.remove_employee_from_shift(employee_id, shift_type, group_id))
        })
        .await
    }

    pub async fn set_shift_capacity(&self, capacity: usize) -> Result<Vec<String>> {
        self.commit(&[ShiftsUpdated], |w, _| w.set_shift_capacity(capacity))
            .await
    }

    pub async fn set_group_shift_capacity(
        &self,
        group_id: &str,
        shift_type: ShiftType,
        capacity: usize,
    ) -> Result<Vec<String>> {
        self.commit(&[ShiftsUpdated], |w, _| {
            w.set_group_shift_capacity(group_id, shift_type, capacity)
        })
        .await
    }

    pub async fn set_team_leader(
        &self,
        shift_type: ShiftType,
        employee_id: &str,
        group_id: &str,
    ) -> Result<()> {
        self.commit(&[ShiftsUpdated], |w, _| {
            w.set_team_leader(shift_type, employee_id, group_id)
        })
        .await
    }

    pub async fn clear_shift(&self, shift_type: ShiftType, group_id: &str) -> Result<Vec<String>> {
        self.commit(&[ShiftsUpdated], |w, _| w.clear_shift(shift_type, group_id))
            .await
    }

    // ===== Absences =====

    /// Record an absence; for today this also vacates the employee's slot
    pub async fn mark_absent(
        &self,
        employee_id: &str,
        category: AbsenceCategory,
        date: BusinessDate,
        notes: &str,
    ) -> Result<Option<SlotRef>> {
        let evicted = self
            .commit(&[AbsencesUpdated, ShiftsUpdated], |w, today| {
                w.mark_absent(employee_id, category, date, notes, today)
            })
            .await?;
        if let Some(slot) = &evicted {
            tracing::info!(
                "{} marked absent, removed from {} {} slot {}",
                employee_id,
                slot.group_id,
                slot.shift_type,
                slot.slot_index
            );
        }
        Ok(evicted)
    }

    pub async fn clear_absence(&self, employee_id: &str, date: &BusinessDate) -> Result<bool> {
        self.commit(&[AbsencesUpdated], |w, _| Ok(w.clear_absence(employee_id, date)))
            .await
    }

    // ===== Tasks =====

    pub async fn add_task(&self, req: NewTask) -> Result<Task> {
        self.commit(&[TasksUpdated], |w, _| w.add_task(req)).await
    }

    pub async fn update_task(&self, req: UpdateTask) -> Result<Task> {
        self.commit(&[TasksUpdated], |w, _| w.update_task(req)).await
    }

    pub async fn set_task_status(&self, task_id: u64, status: TaskStatus) -> Result<()> {
        self.commit(&[TasksUpdated], |w, _| w.set_task_status(task_id, status))
            .await
    }

    pub async fn delete_task(&self, task_id: u64) -> Result<Task> {
        self.commit(&[TasksUpdated], |w, _| w.delete_task(task_id))
            .await
    }

    pub async fn assign_task(&self, task_id: u64, employee_ids: &[String]) -> Result<()> {
        self.commit(&[TasksUpdated], |w, _| w.assign_task(task_id, employee_ids))
            .await
    }

    pub async fn unassign_task(&self, task_id: u64, employee_id: &str) -> Result<bool> {
        self.commit(&[TasksUpdated], |w, _| w.unassign_task(task_id, employee_id))
            .await
    }
}
