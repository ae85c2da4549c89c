//! Runs the copy phases in order and aggregates their reports

use std::fmt;

use backend::Project;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use tracing::info;

use super::{
    auth_copier::{AuthCopier, AuthCopyReport},
    collection_copier::{CollectionCopier, CollectionCopyReport},
    config::MigrationConfig,
    storage_copier::{StorageCopier, StorageCopyReport},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MigrationPhase {
    #[default]
    Full,
    Firestore,
    Storage,
    Auth,
}

impl MigrationPhase {
    fn runs(self, phase: MigrationPhase) -> bool {
        self == MigrationPhase::Full || self == phase
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub phase: MigrationPhase,
    pub collections: Option<Vec<CollectionCopyReport>>,
    pub storage: Option<StorageCopyReport>,
    pub auth: Option<AuthCopyReport>,
}

impl MigrationReport {
    /// Number of collections, prefixes, objects and users that did not make it
    pub fn failures(&self) -> usize {
        let collections = self
            .collections
            .iter()
            .flatten()
            .filter(|c| !c.is_success())
            .count();
        let storage = self.storage.as_ref().map_or(0, StorageCopyReport::failures);
        let auth = self
            .auth
            .as_ref()
            .map_or(0, |a| a.failed.len() + usize::from(a.error.is_some()));
        collections + storage + auth
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration summary ({})", self.phase)?;
        if let Some(collections) = &self.collections {
            writeln!(f, "Firestore:")?;
            for report in collections {
                writeln!(f, "  {}", report)?;
            }
        }
        if let Some(storage) = &self.storage {
            writeln!(f, "Storage:")?;
            for report in &storage.prefixes {
                writeln!(f, "  {}", report)?;
            }
        }
        if let Some(auth) = &self.auth {
            writeln!(f, "Auth:")?;
            writeln!(f, "  {}", auth)?;
        }
        write!(f, "{} failure(s)", self.failures())
    }
}

pub struct MigrationRunner<'a> {
    source: &'a Project,
    target: &'a Project,
    config: &'a MigrationConfig,
}

impl<'a> MigrationRunner<'a> {
    pub fn new(source: &'a Project, target: &'a Project, config: &'a MigrationConfig) -> Self {
        Self {
            source,
            target,
            config,
        }
    }

    /// Firestore, then Storage, then Auth; a single phase runs alone
    pub async fn run(&self, phase: MigrationPhase) -> MigrationReport {
        info!(
            phase = %phase,
            from = %self.source.project_id,
            to = %self.target.project_id,
            "Starting migration"
        );
        let mut report = MigrationReport {
            phase,
            collections: None,
            storage: None,
            auth: None,
        };

        if phase.runs(MigrationPhase::Firestore) {
            let copier =
                CollectionCopier::new(self.source, self.target, self.config.batch_size());
            report.collections = Some(copier.copy_all(&self.config.collections).await);
        }
        if phase.runs(MigrationPhase::Storage) {
            let copier = StorageCopier::new(self.source, self.target);
            report.storage = Some(copier.copy_all(&self.config.storage_prefixes).await);
        }
        if phase.runs(MigrationPhase::Auth) {
            let copier = AuthCopier::new(self.source, self.target, self.config.auth_page_size());
            report.auth = Some(copier.copy_all().await);
        }

        info!(phase = %phase, failures = report.failures(), "Migration finished");
        report
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_phase_parsing() {
        assert_eq!(MigrationPhase::from_str("storage").unwrap(), MigrationPhase::Storage);
        assert_eq!(MigrationPhase::default().to_string(), "full");
        assert!(MigrationPhase::from_str("users").is_err());
    }

    #[test]
    fn test_full_runs_everything() {
        assert!(MigrationPhase::Full.runs(MigrationPhase::Auth));
        assert!(MigrationPhase::Auth.runs(MigrationPhase::Auth));
        assert!(!MigrationPhase::Storage.runs(MigrationPhase::Firestore));
    }
}
