//! Entity model
//!
//! This module provides the in-memory workforce model:
//! - Value types (employees, roles, absences, tasks)
//! - The shift group registry with its slot invariants
//! - The writer-side entity store tying them together
//! - The canonical report shape exchanged between processes

pub mod calendar;
pub mod models;
pub mod report;
pub mod shifts;
pub mod workforce;

pub use calendar::{BusinessCalendar, BusinessDate, FixedCalendar, GregorianCalendar};
pub use models::*;
pub use report::{Report, ReportAbsence, ReportAbsences, ReportShift, ReportShiftGroup, ReportShifts};
pub use shifts::{Assignment, Shift, ShiftGroup, ShiftManager, ShiftType, SlotRef, UpdateShiftGroup};
pub use workforce::{TaskBook, Workforce};
