//! Status reporting

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::definitions::{Migration, MigrationDirection, MigrationRecord};
use super::planner::Planner;
use crate::error::MigrationResult;

/// Whether a migration has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationState {
    Applied,
    Pending,
}

/// One line of the status view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub id: String,
    pub state: MigrationState,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Applied migrations in application order, then pending ones by ID
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub entries: Vec<StatusEntry>,
    pub warnings: Vec<String>,
}

impl StatusReport {
    /// Build the report without executing anything
    pub fn build(migrations: &[Migration], applied: &[MigrationRecord]) -> MigrationResult<Self> {
        let plan = Planner::new(migrations, applied).plan(MigrationDirection::Up, 0)?;

        let applied_entries = applied.iter().map(|record| StatusEntry {
            id: record.id.clone(),
            state: MigrationState::Applied,
            applied_at: Some(record.applied_at),
        });
        let pending_entries = plan.migrations.into_iter().map(|migration| StatusEntry {
            id: migration.id,
            state: MigrationState::Pending,
            applied_at: None,
        });

        Ok(Self {
            entries: applied_entries.chain(pending_entries).collect(),
            warnings: plan.warnings,
        })
    }

    pub fn applied(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(|e| e.state == MigrationState::Applied)
    }

    pub fn pending(&self) -> impl Iterator<Item = &StatusEntry> {
        self.entries.iter().filter(|e| e.state == MigrationState::Pending)
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<25}Migration", "Applied At")?;
        writeln!(f, "{}", "=".repeat(80))?;

        for entry in &self.entries {
            let left = match entry.applied_at {
                Some(at) => at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
                None => "Pending".to_string(),
            };
            writeln!(f, "{:<22}-  {}", left, entry.id)?;
        }

        for warning in &self.warnings {
            writeln!(f, "Warning: {}", warning)?;
        }
        Ok(())
    }
}
