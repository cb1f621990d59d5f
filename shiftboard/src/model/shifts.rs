//! Shift groups and the slot registry
//!
//! Every group owns a morning and an evening shift, each a fixed-length
//! array of slots. The registry guarantees that an employee id occupies at
//! most one slot across all groups and both shift types, and that no
//! mutation leaves a half-applied state behind: every operation validates
//! its inputs before touching a slot.

use crate::config::{DEFAULT_GROUP_ID, DEFAULT_SHIFT_CAPACITY, MAX_SHIFT_CAPACITY};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftType {
    Morning,
    Evening,
}

impl ShiftType {
    pub const ALL: [ShiftType; 2] = [ShiftType::Morning, ShiftType::Evening];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftType::Morning => "morning",
            ShiftType::Evening => "evening",
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One capacity-bounded roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    capacity: usize,
    #[serde(default)]
    team_leader_id: Option<String>,
    slots: Vec<Option<String>>,
}

impl Default for Shift {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SHIFT_CAPACITY)
    }
}

impl Shift {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            team_leader_id: None,
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn team_leader_id(&self) -> Option<&str> {
        self.team_leader_id.as_deref()
    }

    pub fn slots(&self) -> &[Option<String>] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&str> {
        self.slots.get(index).and_then(|s| s.as_deref())
    }

    /// Occupied slot count
    pub fn occupancy(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn position_of(&self, employee_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_deref() == Some(employee_id))
    }

    /// Employee ids in slot order, skipping empty slots
    pub fn occupants(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    /// Resize the slot array. Occupants beyond the new capacity are returned.
    fn resize(&mut self, capacity: usize) -> Vec<String> {
        let displaced = if capacity < self.slots.len() {
            self.slots.drain(capacity..).flatten().collect()
        } else {
            self.slots.resize(capacity, None);
            Vec::new()
        };
        self.capacity = capacity;
        displaced
    }

    fn clear(&mut self) -> Vec<String> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }

    fn vacate(&mut self, employee_id: &str) -> bool {
        match self.position_of(employee_id) {
            Some(index) => {
                self.slots[index] = None;
                true
            }
            None => false,
        }
    }

    /// Repair a shift loaded from disk whose slot array drifted from its capacity
    fn normalize_len(&mut self) -> Vec<String> {
        if self.slots.len() == self.capacity {
            return Vec::new();
        }
        let capacity = self.capacity;
        self.resize(capacity)
    }
}

/// A named group with its two shifts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftGroup {
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub supervisor_name: String,
    #[serde(default)]
    pub morning_shift: Shift,
    #[serde(default)]
    pub evening_shift: Shift,
}

impl ShiftGroup {
    pub fn new(group_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            name: name.into(),
            description: String::new(),
            color: String::new(),
            supervisor_name: String::new(),
            morning_shift: Shift::default(),
            evening_shift: Shift::default(),
        }
    }

    pub fn default_group() -> Self {
        Self::new(DEFAULT_GROUP_ID, "Default")
    }

    pub fn is_default(&self) -> bool {
        self.group_id == DEFAULT_GROUP_ID
    }

    pub fn shift(&self, shift_type: ShiftType) -> &Shift {
        match shift_type {
            ShiftType::Morning => &self.morning_shift,
            ShiftType::Evening => &self.evening_shift,
        }
    }

    fn shift_mut(&mut self, shift_type: ShiftType) -> &mut Shift {
        match shift_type {
            ShiftType::Morning => &mut self.morning_shift,
            ShiftType::Evening => &mut self.evening_shift,
        }
    }
}

/// Group metadata edit; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShiftGroup {
    pub group_id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub supervisor_name: Option<String>,
}

/// Where an employee currently sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRef {
    pub group_id: String,
    pub shift_type: ShiftType,
    pub slot_index: usize,
}

/// Outcome of a successful assignment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    /// Slot the employee left, if they were assigned elsewhere
    pub previous: Option<SlotRef>,
    /// Occupant pushed out of the target slot
    pub displaced: Option<String>,
    /// True when the employee already held the target slot
    pub unchanged: bool,
}

/// Registry of all shift groups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftManager {
    groups: Vec<ShiftGroup>,
}

impl Default for ShiftManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShiftManager {
    pub fn new() -> Self {
        Self {
            groups: vec![ShiftGroup::default_group()],
        }
    }

    /// Rebuild a registry from persisted groups, restoring its invariants.
    ///
    /// A missing default group is recreated, slot arrays are fitted to their
    /// capacity and any employee found in more than one slot keeps only the
    /// first occurrence.
    pub fn from_groups(groups: Vec<ShiftGroup>) -> Self {
        let mut manager = Self { groups };
        if manager.group(DEFAULT_GROUP_ID).is_none() {
            manager.groups.insert(0, ShiftGroup::default_group());
        }

        let mut seen = BTreeSet::new();
        for group in &mut manager.groups {
            for shift_type in ShiftType::ALL {
                let shift = group.shift_mut(shift_type);
                if shift.capacity == 0 {
                    shift.capacity = DEFAULT_SHIFT_CAPACITY;
                }
                for dropped in shift.normalize_len() {
                    tracing::warn!("Slot beyond capacity dropped for employee {}", dropped);
                }
                for slot in shift.slots.iter_mut() {
                    let Some(id) = slot.as_deref() else { continue };
                    if !seen.insert(id.to_string()) {
                        tracing::warn!("Duplicate assignment removed for employee {}", id);
                        *slot = None;
                    }
                }
            }
        }
        manager
    }

    pub fn groups(&self) -> &[ShiftGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Option<&ShiftGroup> {
        self.groups.iter().find(|g| g.group_id == group_id)
    }

    fn group_mut(&mut self, group_id: &str) -> Result<&mut ShiftGroup> {
        self.groups
            .iter_mut()
            .find(|g| g.group_id == group_id)
            .ok_or_else(|| AppError::GroupNotFound(group_id.to_string()))
    }

    pub fn default_group(&self) -> &ShiftGroup {
        // from_groups/new always keep the default group at some index
        self.group(DEFAULT_GROUP_ID)
            .unwrap_or_else(|| &self.groups[0])
    }

    // ===== Group Registry =====

    pub fn add_group(&mut self, group: ShiftGroup) -> Result<()> {
        if group.group_id.trim().is_empty() {
            return Err(AppError::Validation("Group id must not be empty".to_string()));
        }
        if self.group(&group.group_id).is_some() {
            return Err(AppError::Duplicate(group.group_id));
        }

        // A new group may not smuggle in employees already seated elsewhere
        let mut group = group;
        for shift_type in ShiftType::ALL {
            let shift = group.shift_mut(shift_type);
            validate_capacity(shift.capacity)?;
            shift.normalize_len();
            for slot in shift.slots.iter_mut() {
                if slot.as_deref().is_some_and(|id| self.find_assignment(id).is_some()) {
                    *slot = None;
                }
            }
        }

        tracing::info!("Adding shift group {}", group.group_id);
        self.groups.push(group);
        Ok(())
    }

    pub fn update_group(&mut self, req: UpdateShiftGroup) -> Result<&ShiftGroup> {
        let group = self.group_mut(&req.group_id)?;
        if let Some(name) = req.name {
            group.name = name;
        }
        if let Some(description) = req.description {
            group.description = description;
        }
        if let Some(color) = req.color {
            group.color = color;
        }
        if let Some(supervisor_name) = req.supervisor_name {
            group.supervisor_name = supervisor_name;
        }
        Ok(group)
    }

    /// Delete a group. Its occupants return to the unassigned pool.
    pub fn remove_group(&mut self, group_id: &str) -> Result<Vec<String>> {
        if group_id == DEFAULT_GROUP_ID {
            return Err(AppError::GroupProtected(group_id.to_string()));
        }
        let index = self
            .groups
            .iter()
            .position(|g| g.group_id == group_id)
            .ok_or_else(|| AppError::GroupNotFound(group_id.to_string()))?;

        let group = self.groups.remove(index);
        let released: Vec<String> = ShiftType::ALL
            .iter()
            .flat_map(|t| group.shift(*t).occupants().map(str::to_string).collect::<Vec<_>>())
            .collect();

        tracing::info!(
            "Removed shift group {} ({} employees unassigned)",
            group_id,
            released.len()
        );
        Ok(released)
    }

    // ===== Slot Operations =====

    /// Seat an employee in one slot.
    ///
    /// Any slot the employee already holds is vacated first; whoever held the
    /// target slot is displaced to the unassigned pool.
    pub fn assign_employee_to_shift(
        &mut self,
        employee_id: &str,
        shift_type: ShiftType,
        slot_index: usize,
        group_id: &str,
    ) -> Result<Assignment> {
        if employee_id.trim().is_empty() {
            return Err(AppError::EmployeeNotFound(employee_id.to_string()));
        }

        let capacity = self
            .group(group_id)
            .ok_or_else(|| AppError::GroupNotFound(group_id.to_string()))?
            .shift(shift_type)
            .capacity;
        if slot_index >= capacity {
            return Err(AppError::InvalidSlot {
                index: slot_index,
                capacity,
            });
        }

        let target = SlotRef {
            group_id: group_id.to_string(),
            shift_type,
            slot_index,
        };
        let previous = self.find_assignment(employee_id);
        if previous.as_ref() == Some(&target) {
            return Ok(Assignment {
                unchanged: true,
                ..Assignment::default()
            });
        }

        if let Some(prev) = &previous {
            let shift = self.group_mut(&prev.group_id)?.shift_mut(prev.shift_type);
            shift.slots[prev.slot_index] = None;
        }

        let shift = self.group_mut(group_id)?.shift_mut(shift_type);
        let displaced = shift.slots[slot_index].replace(employee_id.to_string());

        tracing::debug!(
            "Assigned {} to {}/{}[{}]",
            employee_id,
            group_id,
            shift_type,
            slot_index
        );

        Ok(Assignment {
            previous,
            displaced,
            unchanged: false,
        })
    }

    /// Remove an employee from one shift of one group. Returns whether a slot
    /// was vacated; unknown groups and unassigned employees are no-ops.
    pub fn remove_employee_from_shift(
        &mut self,
        employee_id: &str,
        shift_type: ShiftType,
        group_id: &str,
    ) -> bool {
        match self.group_mut(group_id) {
            Ok(group) => group.shift_mut(shift_type).vacate(employee_id),
            Err(_) => false,
        }
    }

    /// Vacate whatever slot the employee holds, anywhere.
    pub fn unassign_everywhere(&mut self, employee_id: &str) -> Option<SlotRef> {
        let slot = self.find_assignment(employee_id)?;
        if let Ok(group) = self.group_mut(&slot.group_id) {
            group.shift_mut(slot.shift_type).slots[slot.slot_index] = None;
        }
        Some(slot)
    }

    /// Vacate all slots in one shift. Returns the released employee ids.
    pub fn clear_shift(&mut self, shift_type: ShiftType, group_id: &str) -> Result<Vec<String>> {
        let released = self.group_mut(group_id)?.shift_mut(shift_type).clear();
        tracing::info!(
            "Cleared {}/{} ({} employees unassigned)",
            group_id,
            shift_type,
            released.len()
        );
        Ok(released)
    }

    /// Resize every shift of every group.
    pub fn set_shift_capacity(&mut self, capacity: usize) -> Result<Vec<String>> {
        validate_capacity(capacity)?;
        let mut displaced = Vec::new();
        for group in &mut self.groups {
            for shift_type in ShiftType::ALL {
                displaced.extend(group.shift_mut(shift_type).resize(capacity));
            }
        }
        tracing::info!(
            "Shift capacity set to {} ({} employees displaced)",
            capacity,
            displaced.len()
        );
        Ok(displaced)
    }

    /// Resize one shift of one group. Occupants beyond the new capacity are
    /// returned to the caller and become unassigned.
    pub fn set_group_shift_capacity(
        &mut self,
        group_id: &str,
        shift_type: ShiftType,
        capacity: usize,
    ) -> Result<Vec<String>> {
        validate_capacity(capacity)?;
        let displaced = self.group_mut(group_id)?.shift_mut(shift_type).resize(capacity);
        tracing::info!(
            "Capacity of {}/{} set to {} ({} employees displaced)",
            group_id,
            shift_type,
            capacity,
            displaced.len()
        );
        Ok(displaced)
    }

    /// Set the team leader of one shift; an empty id clears it.
    pub fn set_team_leader(
        &mut self,
        shift_type: ShiftType,
        employee_id: &str,
        group_id: &str,
    ) -> Result<()> {
        let shift = self.group_mut(group_id)?.shift_mut(shift_type);
        let employee_id = employee_id.trim();
        shift.team_leader_id = if employee_id.is_empty() {
            None
        } else {
            Some(employee_id.to_string())
        };
        Ok(())
    }

    /// Drop the employee from every team-leader reference
    pub fn clear_team_leader_references(&mut self, employee_id: &str) {
        for group in &mut self.groups {
            for shift_type in ShiftType::ALL {
                let shift = group.shift_mut(shift_type);
                if shift.team_leader_id.as_deref() == Some(employee_id) {
                    shift.team_leader_id = None;
                }
            }
        }
    }

    // ===== Queries =====

    pub fn find_assignment(&self, employee_id: &str) -> Option<SlotRef> {
        self.groups.iter().find_map(|group| {
            ShiftType::ALL.iter().find_map(|shift_type| {
                group
                    .shift(*shift_type)
                    .position_of(employee_id)
                    .map(|slot_index| SlotRef {
                        group_id: group.group_id.clone(),
                        shift_type: *shift_type,
                        slot_index,
                    })
            })
        })
    }

    pub fn is_assigned(&self, employee_id: &str) -> bool {
        self.find_assignment(employee_id).is_some()
    }

    /// Every employee id currently holding a slot
    pub fn assigned_employee_ids(&self) -> BTreeSet<String> {
        self.groups
            .iter()
            .flat_map(|g| {
                ShiftType::ALL
                    .iter()
                    .flat_map(move |t| g.shift(*t).occupants())
            })
            .map(str::to_string)
            .collect()
    }
}

fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 || capacity > MAX_SHIFT_CAPACITY {
        return Err(AppError::InvalidCapacity(capacity));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager_with_group() -> ShiftManager {
        let mut manager = ShiftManager::new();
        manager.add_group(ShiftGroup::new("kitchen", "Kitchen")).unwrap();
        manager
    }

    fn slot_count(manager: &ShiftManager, employee_id: &str) -> usize {
        manager
            .groups()
            .iter()
            .flat_map(|g| ShiftType::ALL.iter().map(move |t| g.shift(*t)))
            .map(|s| s.occupants().filter(|id| *id == employee_id).count())
            .sum()
    }

    #[test]
    fn test_default_group_exists() {
        let manager = ShiftManager::new();
        let group = manager.default_group();

        assert!(group.is_default());
        assert_eq!(group.morning_shift.capacity(), DEFAULT_SHIFT_CAPACITY);
        assert_eq!(group.evening_shift.slots().len(), DEFAULT_SHIFT_CAPACITY);
    }

    #[test]
    fn test_assign_moves_employee_between_groups() {
        let mut manager = manager_with_group();

        manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 2, DEFAULT_GROUP_ID)
            .unwrap();
        let outcome = manager
            .assign_employee_to_shift("e1", ShiftType::Evening, 0, "kitchen")
            .unwrap();

        assert_eq!(
            outcome.previous,
            Some(SlotRef {
                group_id: DEFAULT_GROUP_ID.to_string(),
                shift_type: ShiftType::Morning,
                slot_index: 2,
            })
        );
        assert_eq!(slot_count(&manager, "e1"), 1);
        assert_eq!(manager.default_group().morning_shift.slot(2), None);
        assert_eq!(
            manager.group("kitchen").unwrap().evening_shift.slot(0),
            Some("e1")
        );
    }

    #[test]
    fn test_assign_same_slot_is_noop() {
        let mut manager = ShiftManager::new();
        manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 1, DEFAULT_GROUP_ID)
            .unwrap();
        let before = manager.clone();

        let outcome = manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 1, DEFAULT_GROUP_ID)
            .unwrap();

        assert!(outcome.unchanged);
        assert_eq!(manager, before);
    }

    #[test]
    fn test_assign_displaces_occupant() {
        let mut manager = ShiftManager::new();
        manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();

        let outcome = manager
            .assign_employee_to_shift("e2", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();

        assert_eq!(outcome.displaced.as_deref(), Some("e1"));
        assert!(!manager.is_assigned("e1"));
        assert!(manager.is_assigned("e2"));
    }

    #[test]
    fn test_invalid_assignment_leaves_state_unchanged() {
        let mut manager = ShiftManager::new();
        manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();
        let before = manager.clone();

        let err = manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 15, DEFAULT_GROUP_ID)
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidSlot { index: 15, capacity: 15 }));

        let err = manager
            .assign_employee_to_shift("e1", ShiftType::Evening, 0, "missing")
            .unwrap_err();
        assert!(matches!(err, AppError::GroupNotFound(_)));

        assert_eq!(manager, before);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut manager = ShiftManager::new();
        manager
            .assign_employee_to_shift("e1", ShiftType::Evening, 3, DEFAULT_GROUP_ID)
            .unwrap();

        assert!(manager.remove_employee_from_shift("e1", ShiftType::Evening, DEFAULT_GROUP_ID));
        assert!(!manager.remove_employee_from_shift("e1", ShiftType::Evening, DEFAULT_GROUP_ID));
        assert!(!manager.remove_employee_from_shift("e1", ShiftType::Evening, "missing"));
    }

    #[test]
    fn test_shrinking_capacity_displaces_exactly_the_excess() {
        let mut manager = ShiftManager::new();
        for i in 0..6 {
            manager
                .assign_employee_to_shift(&format!("e{}", i), ShiftType::Morning, i, DEFAULT_GROUP_ID)
                .unwrap();
        }

        let displaced = manager
            .set_group_shift_capacity(DEFAULT_GROUP_ID, ShiftType::Morning, 4)
            .unwrap();

        assert_eq!(displaced, vec!["e4".to_string(), "e5".to_string()]);
        let shift = &manager.default_group().morning_shift;
        assert_eq!(shift.capacity(), 4);
        assert_eq!(shift.slots().len(), 4);
        assert_eq!(shift.occupancy(), 4);
    }

    #[test]
    fn test_growing_capacity_appends_empty_slots() {
        let mut manager = ShiftManager::new();
        manager
            .assign_employee_to_shift("e1", ShiftType::Evening, 14, DEFAULT_GROUP_ID)
            .unwrap();

        let displaced = manager.set_shift_capacity(20).unwrap();

        assert!(displaced.is_empty());
        let shift = &manager.default_group().evening_shift;
        assert_eq!(shift.slots().len(), 20);
        assert_eq!(shift.slot(14), Some("e1"));
        assert!(shift.slots()[15..].iter().all(Option::is_none));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut manager = ShiftManager::new();
        assert!(matches!(
            manager.set_shift_capacity(0),
            Err(AppError::InvalidCapacity(0))
        ));
        assert_eq!(manager.default_group().morning_shift.capacity(), DEFAULT_SHIFT_CAPACITY);
    }

    #[test]
    fn test_clear_shift_releases_everyone() {
        let mut manager = ShiftManager::new();
        manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, DEFAULT_GROUP_ID)
            .unwrap();
        manager
            .assign_employee_to_shift("e2", ShiftType::Morning, 5, DEFAULT_GROUP_ID)
            .unwrap();
        manager
            .assign_employee_to_shift("e3", ShiftType::Evening, 0, DEFAULT_GROUP_ID)
            .unwrap();

        let released = manager.clear_shift(ShiftType::Morning, DEFAULT_GROUP_ID).unwrap();

        assert_eq!(released.len(), 2);
        assert_eq!(manager.default_group().morning_shift.occupancy(), 0);
        assert!(manager.is_assigned("e3"));
    }

    #[test]
    fn test_team_leader_set_and_clear() {
        let mut manager = ShiftManager::new();

        manager
            .set_team_leader(ShiftType::Morning, "lead", DEFAULT_GROUP_ID)
            .unwrap();
        assert_eq!(manager.default_group().morning_shift.team_leader_id(), Some("lead"));
        assert!(!manager.is_assigned("lead"));

        manager
            .set_team_leader(ShiftType::Morning, "", DEFAULT_GROUP_ID)
            .unwrap();
        assert_eq!(manager.default_group().morning_shift.team_leader_id(), None);
    }

    #[test]
    fn test_default_group_cannot_be_removed() {
        let mut manager = manager_with_group();
        assert!(matches!(
            manager.remove_group(DEFAULT_GROUP_ID),
            Err(AppError::GroupProtected(_))
        ));

        manager
            .assign_employee_to_shift("e1", ShiftType::Morning, 0, "kitchen")
            .unwrap();
        let released = manager.remove_group("kitchen").unwrap();
        assert_eq!(released, vec!["e1".to_string()]);
        assert!(manager.group("kitchen").is_none());
    }

    #[test]
    fn test_from_groups_repairs_invariants() {
        let mut a = ShiftGroup::new("a", "A");
        a.morning_shift.slots[0] = Some("e1".to_string());
        let mut b = ShiftGroup::new("b", "B");
        b.evening_shift.slots[1] = Some("e1".to_string());
        b.evening_shift.slots.truncate(3);

        let manager = ShiftManager::from_groups(vec![a, b]);

        assert!(manager.group(DEFAULT_GROUP_ID).is_some());
        assert_eq!(slot_count(&manager, "e1"), 1);
        assert_eq!(
            manager.group("b").unwrap().evening_shift.slots().len(),
            DEFAULT_SHIFT_CAPACITY
        );
    }
}
