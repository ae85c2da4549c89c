//! Copies Cloud Storage objects between buckets under identical paths

use std::fmt;

use backend::{
    BackendResult, ObjectStore, Project,
    models::{ObjectMetadata, StorageObject},
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Outcome of copying every object under one prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixCopyReport {
    pub prefix: String,
    pub objects_found: usize,
    pub objects_copied: usize,
    pub bytes_copied: u64,
    /// Paths of objects that could not be copied
    pub failed: Vec<String>,
    /// Set when the prefix could not be listed at all
    pub error: Option<String>,
}

impl PrefixCopyReport {
    fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            objects_found: 0,
            objects_copied: 0,
            bytes_copied: 0,
            failed: Vec::new(),
            error: None,
        }
    }
}

impl fmt::Display for PrefixCopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(e) = &self.error {
            return write!(f, "{}: listing FAILED ({})", self.prefix, e);
        }
        write!(
            f,
            "{}: {} of {} objects copied ({} bytes)",
            self.prefix, self.objects_copied, self.objects_found, self.bytes_copied
        )?;
        if !self.failed.is_empty() {
            write!(f, ", {} failed", self.failed.len())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageCopyReport {
    pub prefixes: Vec<PrefixCopyReport>,
}

impl StorageCopyReport {
    pub fn objects_copied(&self) -> usize {
        self.prefixes.iter().map(|p| p.objects_copied).sum()
    }

    pub fn failures(&self) -> usize {
        self.prefixes
            .iter()
            .map(|p| p.failed.len() + usize::from(p.error.is_some()))
            .sum()
    }
}

pub struct StorageCopier<'a> {
    source: &'a dyn ObjectStore,
    target: &'a dyn ObjectStore,
}

impl<'a> StorageCopier<'a> {
    pub fn new(source: &'a Project, target: &'a Project) -> Self {
        Self {
            source: source.objects.as_ref(),
            target: target.objects.as_ref(),
        }
    }

    pub async fn copy_all(&self, prefixes: &[String]) -> StorageCopyReport {
        let mut report = StorageCopyReport::default();
        for prefix in prefixes {
            info!(
                prefix = %prefix,
                from = %self.source.bucket(),
                to = %self.target.bucket(),
                "Copying storage prefix"
            );
            let prefix_report = self.copy_prefix(prefix).await;
            if let Some(e) = &prefix_report.error {
                error!(prefix = %prefix, error = %e, "Listing failed, continuing with next prefix");
            } else {
                info!(
                    prefix = %prefix,
                    copied = prefix_report.objects_copied,
                    failed = prefix_report.failed.len(),
                    "Storage prefix copied"
                );
            }
            report.prefixes.push(prefix_report);
        }
        report
    }

    pub async fn copy_prefix(&self, prefix: &str) -> PrefixCopyReport {
        let mut report = PrefixCopyReport::new(prefix);

        let objects = match self.source.list_objects(prefix).await {
            Ok(objects) => objects,
            Err(e) => {
                report.error = Some(e.to_string());
                return report;
            }
        };
        report.objects_found = objects.len();

        for metadata in objects {
            let path = metadata.name.clone();
            match self.copy_object(metadata).await {
                Ok(bytes) => {
                    debug!(path = %path, bytes, "Copied object");
                    report.objects_copied += 1;
                    report.bytes_copied += bytes;
                }
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to copy object");
                    report.failed.push(path);
                }
            }
        }

        report
    }

    /// Download into memory and re-upload with the listed metadata as-is
    async fn copy_object(&self, metadata: ObjectMetadata) -> BackendResult<u64> {
        let data = self.source.download(&metadata.name).await?;
        let len = data.len() as u64;
        self.target
            .upload(&StorageObject::new(metadata, data))
            .await?;
        Ok(len)
    }
}
