//! Counts what a project holds: documents per collection, objects per
//! storage prefix and Auth users

use std::fmt;

use backend::Project;
use serde::Serialize;
use tracing::{info, warn};

/// A count, or the reason it could not be taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub name: String,
    pub count: usize,
    pub bytes: Option<u64>,
    pub error: Option<String>,
}

impl Tally {
    fn counted(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            count,
            bytes: None,
            error: None,
        }
    }

    fn failed(name: &str, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            count: 0,
            bytes: None,
            error: Some(error.to_string()),
        }
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.bytes) {
            (Some(e), _) => write!(f, "{}: error ({})", self.name, e),
            (None, Some(bytes)) => write!(f, "{}: {} ({} bytes)", self.name, self.count, bytes),
            (None, None) => write!(f, "{}: {}", self.name, self.count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InspectionReport {
    pub project_id: String,
    pub bucket: String,
    pub collections: Vec<Tally>,
    pub prefixes: Vec<Tally>,
    pub users: Tally,
}

impl InspectionReport {
    pub fn total_documents(&self) -> usize {
        self.collections.iter().map(|t| t.count).sum()
    }
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Project {}", self.project_id)?;
        writeln!(f, "  Firestore ({} documents):", self.total_documents())?;
        for tally in &self.collections {
            writeln!(f, "    {}", tally)?;
        }
        writeln!(f, "  Storage bucket {}:", self.bucket)?;
        for tally in &self.prefixes {
            writeln!(f, "    {}", tally)?;
        }
        write!(f, "  Auth {}", self.users)
    }
}

/// Inspects one project; the same component serves source and target
pub struct ProjectInspector<'a> {
    project: &'a Project,
    collections: &'a [String],
    prefixes: &'a [String],
    page_size: usize,
}

impl<'a> ProjectInspector<'a> {
    pub fn new(
        project: &'a Project,
        collections: &'a [String],
        prefixes: &'a [String],
        page_size: usize,
    ) -> Self {
        Self {
            project,
            collections,
            prefixes,
            page_size,
        }
    }

    pub async fn inspect(&self) -> InspectionReport {
        info!(project_id = %self.project.project_id, "Inspecting project");

        let mut collections = Vec::with_capacity(self.collections.len());
        for collection in self.collections {
            let tally = match self.project.documents.list_documents(collection).await {
                Ok(documents) => Tally::counted(collection, documents.len()),
                Err(e) => {
                    warn!(collection = %collection, error = %e, "Cannot count collection");
                    Tally::failed(collection, e)
                }
            };
            collections.push(tally);
        }

        let mut prefixes = Vec::with_capacity(self.prefixes.len());
        for prefix in self.prefixes {
            let tally = match self.project.objects.list_objects(prefix).await {
                Ok(objects) => Tally {
                    bytes: Some(objects.iter().filter_map(|o| o.size_bytes()).sum()),
                    ..Tally::counted(prefix, objects.len())
                },
                Err(e) => {
                    warn!(prefix = %prefix, error = %e, "Cannot count storage prefix");
                    Tally::failed(prefix, e)
                }
            };
            prefixes.push(tally);
        }

        let users = self.count_users().await;

        InspectionReport {
            project_id: self.project.project_id.clone(),
            bucket: self.project.objects.bucket().to_string(),
            collections,
            prefixes,
            users,
        }
    }

    async fn count_users(&self) -> Tally {
        let mut count = 0;
        let mut page_token: Option<String> = None;
        loop {
            match self
                .project
                .users
                .list_users(self.page_size, page_token.as_deref())
                .await
            {
                Ok(page) => {
                    count += page.users.len();
                    match page.next_page_token {
                        Some(token) => page_token = Some(token),
                        None => return Tally::counted("users", count),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Cannot count users");
                    return Tally {
                        count,
                        ..Tally::failed("users", e)
                    };
                }
            }
        }
    }
}
