//! Recreates Auth users of one project in another under the same uid

use std::fmt;

use backend::{
    BackendError, Project, UserDirectory,
    models::{AuthUser, NewUser},
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthCopyReport {
    pub pages: usize,
    pub users_seen: usize,
    pub created: usize,
    /// Users whose uid was already present in the target
    pub already_existed: usize,
    /// Uids that could not be created
    pub failed: Vec<String>,
    /// Set when a page could not be listed, which ends the phase early
    pub error: Option<String>,
}

impl fmt::Display for AuthCopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "auth: {} users seen, {} created, {} already migrated, {} failed",
            self.users_seen,
            self.created,
            self.already_existed,
            self.failed.len()
        )?;
        if let Some(e) = &self.error {
            write!(f, " (listing stopped: {})", e)?;
        }
        Ok(())
    }
}

enum CopyOutcome {
    Created,
    AlreadyExists,
    Failed(BackendError),
}

pub struct AuthCopier<'a> {
    source: &'a dyn UserDirectory,
    target: &'a dyn UserDirectory,
    page_size: usize,
}

impl<'a> AuthCopier<'a> {
    pub fn new(source: &'a Project, target: &'a Project, page_size: usize) -> Self {
        Self {
            source: source.users.as_ref(),
            target: target.users.as_ref(),
            page_size,
        }
    }

    /// Page through every source user until a page comes back without a
    /// continuation token
    pub async fn copy_all(&self) -> AuthCopyReport {
        let mut report = AuthCopyReport::default();
        let mut page_token: Option<String> = None;

        loop {
            let page = match self
                .source
                .list_users(self.page_size, page_token.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    error!(page = report.pages + 1, error = %e, "Failed to list users");
                    report.error = Some(e.to_string());
                    break;
                }
            };
            report.pages += 1;
            debug!(page = report.pages, users = page.users.len(), "Fetched user page");

            for user in &page.users {
                report.users_seen += 1;
                match self.copy_user(user).await {
                    CopyOutcome::Created => report.created += 1,
                    CopyOutcome::AlreadyExists => report.already_existed += 1,
                    CopyOutcome::Failed(e) => {
                        warn!(uid = %user.uid, error = %e, "Failed to create user, skipping");
                        report.failed.push(user.uid.clone());
                    }
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        info!(
            seen = report.users_seen,
            created = report.created,
            already_existed = report.already_existed,
            failed = report.failed.len(),
            "Auth users copied"
        );
        report
    }

    async fn copy_user(&self, user: &AuthUser) -> CopyOutcome {
        let new_user = NewUser::from(user);
        match self.target.create_user(&new_user).await {
            Ok(()) => {
                debug!(
                    uid = %user.uid,
                    with_password = new_user.password.is_some(),
                    "Created user"
                );
                CopyOutcome::Created
            }
            Err(BackendError::UidAlreadyExists(_)) => {
                info!(uid = %user.uid, "User already exists in target, skipping");
                CopyOutcome::AlreadyExists
            }
            Err(e) => CopyOutcome::Failed(e),
        }
    }
}
