//! Report writer
//!
//! Builds the canonical report from the live entity model and publishes it
//! as `report_<date>.json`. Output is always the current schema: materialized
//! objects, full employee records in rosters, no embedded JSON strings.

use crate::config::{BACKUP_MARKER, REPORT_FILE_EXTENSION, REPORT_FILE_PREFIX};
use crate::error::Result;
use crate::model::{
    AbsenceCategory, BusinessDate, Report, ReportAbsence, ReportAbsences, ReportShift,
    ReportShiftGroup, ReportShifts, Shift, ShiftGroup, ShiftType, Workforce,
};
use crate::normalizer::ManagerClassifier;
use crate::storage::snapshot_file;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Timestamp format of `last_modified`
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn timestamp_now() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Build the report for `date` from the entity model.
///
/// Managers are computed with the same classifier readers use, so a report
/// read back yields the same list.
pub fn build_report(
    workforce: &Workforce,
    classifier: &ManagerClassifier,
    date: &BusinessDate,
    last_modified: &str,
) -> Report {
    let employees = workforce.employees().to_vec();
    let role_name = |role_id: &str| workforce.role(role_id).map(|r| r.name.as_str());
    let managers = employees
        .iter()
        .filter(|e| classifier.is_manager(e, role_name(&e.role_id)))
        .cloned()
        .collect();

    let shift_groups: Vec<ReportShiftGroup> = workforce
        .shifts()
        .groups()
        .iter()
        .map(|group| report_group(workforce, group))
        .collect();
    let default_group = workforce.shifts().default_group();

    let mut absences = ReportAbsences::default();
    for record in workforce.absences_on(date) {
        let employee = workforce.employee(&record.employee_id);
        absences.get_mut(record.category).push(ReportAbsence {
            employee_id: record.employee_id.clone(),
            first_name: employee.map(|e| e.first_name.clone()).unwrap_or_default(),
            last_name: employee.map(|e| e.last_name.clone()).unwrap_or_default(),
            category: record.category,
            date: record.date.as_str().to_string(),
            notes: record.notes.clone(),
        });
    }

    let mut tasks = workforce.tasks().to_vec();
    tasks.sort_by_key(|t| t.task_id);

    Report {
        date: date.as_str().to_string(),
        employees,
        managers,
        roles: workforce.roles().to_vec(),
        shifts: ReportShifts {
            morning: report_shift(workforce, default_group.shift(ShiftType::Morning)),
            evening: report_shift(workforce, default_group.shift(ShiftType::Evening)),
            shift_groups,
        },
        absences,
        tasks,
        last_modified: last_modified.to_string(),
    }
}

fn report_group(workforce: &Workforce, group: &ShiftGroup) -> ReportShiftGroup {
    ReportShiftGroup {
        group_id: group.group_id.clone(),
        name: if group.name.trim().is_empty() {
            group.group_id.clone()
        } else {
            group.name.clone()
        },
        description: group.description.clone(),
        color: group.color.clone(),
        supervisor_name: group.supervisor_name.clone(),
        morning_shift: report_shift(workforce, group.shift(ShiftType::Morning)),
        evening_shift: report_shift(workforce, group.shift(ShiftType::Evening)),
    }
}

fn report_shift(workforce: &Workforce, shift: &Shift) -> ReportShift {
    let team_leader = shift.team_leader_id().and_then(|id| workforce.employee(id));
    ReportShift {
        capacity: shift.capacity(),
        team_leader_id: shift.team_leader_id().map(str::to_string),
        team_leader_name: team_leader.map(|e| e.full_name()),
        assigned_employees: shift
            .slots()
            .iter()
            .map(|slot| slot.as_deref().and_then(|id| workforce.employee(id)).cloned())
            .collect(),
    }
}

/// Writes snapshots into the shared reports directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    reports_dir: PathBuf,
    classifier: ManagerClassifier,
}

impl ReportWriter {
    pub fn new(reports_dir: PathBuf, classifier: ManagerClassifier) -> Self {
        Self {
            reports_dir,
            classifier,
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn snapshot_path(&self, date: &BusinessDate) -> PathBuf {
        self.reports_dir.join(format!(
            "{}{}.{}",
            REPORT_FILE_PREFIX,
            date.file_stem(),
            REPORT_FILE_EXTENSION
        ))
    }

    pub fn backup_path(&self, date: &BusinessDate) -> PathBuf {
        self.reports_dir.join(format!(
            "{}{}_{}.{}",
            REPORT_FILE_PREFIX,
            date.file_stem(),
            BACKUP_MARKER,
            REPORT_FILE_EXTENSION
        ))
    }

    pub fn build(&self, workforce: &Workforce, date: &BusinessDate) -> Report {
        build_report(workforce, &self.classifier, date, &timestamp_now())
    }

    /// Persist a report, keeping the previous same-day file as a backup
    pub async fn write(&self, report: &Report) -> Result<PathBuf> {
        let date = BusinessDate::new(report.date.clone());
        let path = self.snapshot_path(&date);

        if fs::try_exists(&path).await.unwrap_or(false) {
            let backup = self.backup_path(&date);
            if let Err(e) = fs::copy(&path, &backup).await {
                tracing::warn!("Failed to back up {:?}: {}", path, e);
            }
        }

        let content = serde_json::to_vec_pretty(report)?;
        snapshot_file::write_atomic(&path, &content).await?;

        tracing::info!(
            "Published report {:?} ({} employees, {} absences)",
            path,
            report.employees.len(),
            report.absences.total()
        );
        Ok(path)
    }

    /// Build and write in one step
    pub async fn publish(&self, workforce: &Workforce, date: &BusinessDate) -> Result<Report> {
        let report = self.build(workforce, date);
        self.write(&report).await?;
        Ok(report)
    }
}

/// Absence counts per category, for log lines and summaries
pub fn absence_summary(absences: &ReportAbsences) -> String {
    AbsenceCategory::ALL
        .iter()
        .map(|c| format!("{}={}", c, absences.count(*c)))
        .collect::<Vec<_>>()
        .join(" ")
}
