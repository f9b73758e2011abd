//! Migration Planner - decides what to run
//!
//! Pure computation over the discovered migrations and the applied records;
//! nothing here touches the database.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::definitions::{Migration, MigrationDirection, MigrationRecord};
use crate::error::{MigrationError, MigrationResult};

/// Ordered migrations selected for one invocation
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub direction: MigrationDirection,
    pub migrations: Vec<Migration>,
    /// Inconsistencies that did not prevent planning
    pub warnings: Vec<String>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn ids(&self) -> Vec<String> {
        self.migrations.iter().map(|m| m.id.clone()).collect()
    }
}

/// Computes plans from a discovered set and an applied set
pub struct Planner<'a> {
    migrations: &'a [Migration],
    applied: &'a [MigrationRecord],
}

impl<'a> Planner<'a> {
    /// `migrations` must be sorted by ID and `applied` by application order
    pub fn new(migrations: &'a [Migration], applied: &'a [MigrationRecord]) -> Self {
        Self {
            migrations,
            applied,
        }
    }

    /// Applied records without a matching migration
    pub fn unknown_applied(&self) -> Vec<&'a MigrationRecord> {
        let known: HashSet<&str> = self.migrations.iter().map(|m| m.id.as_str()).collect();
        self.applied
            .iter()
            .filter(|record| !known.contains(record.id.as_str()))
            .collect()
    }

    /// Plan at most `max_count` migrations in `direction`; 0 means no limit
    pub fn plan(&self, direction: MigrationDirection, max_count: usize) -> MigrationResult<Plan> {
        let limit = if max_count == 0 { usize::MAX } else { max_count };

        let warnings: Vec<String> = self
            .unknown_applied()
            .into_iter()
            .map(|record| {
                format!(
                    "migration {} is recorded as applied but no migration file was found",
                    record.id
                )
            })
            .collect();
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let migrations = match direction {
            MigrationDirection::Up => self.plan_up(limit),
            MigrationDirection::Down => self.plan_down(limit)?,
        };

        Ok(Plan {
            direction,
            migrations,
            warnings,
        })
    }

    fn plan_up(&self, limit: usize) -> Vec<Migration> {
        let applied: HashSet<&str> = self.applied.iter().map(|r| r.id.as_str()).collect();
        self.migrations
            .iter()
            .filter(|m| !applied.contains(m.id.as_str()))
            .take(limit)
            .cloned()
            .collect()
    }

    fn plan_down(&self, limit: usize) -> MigrationResult<Vec<Migration>> {
        let by_id: HashMap<&str, &Migration> =
            self.migrations.iter().map(|m| (m.id.as_str(), m)).collect();

        self.applied
            .iter()
            .rev()
            .take(limit)
            .map(|record| {
                by_id.get(record.id.as_str()).map(|m| (*m).clone()).ok_or_else(|| {
                    MigrationError::Plan(format!(
                        "cannot revert migration {}: no migration file found",
                        record.id
                    ))
                })
            })
            .collect()
    }
}
