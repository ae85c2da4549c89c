#![allow(dead_code)]

use std::{io, sync::Mutex};

use backend::{
    ProjectConfig,
    memory::MemoryProject,
    models::{AuthUser, Document},
};
use serde_json::{Map, json};
use services::services::{cleanup::Confirmation, config::MigrationConfig};

/// Answers every prompt with a fixed string and remembers the prompts
pub struct ScriptedAnswer {
    answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedAnswer {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

impl Confirmation for ScriptedAnswer {
    fn ask(&self, prompt: &str) -> io::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

pub fn config() -> MigrationConfig {
    MigrationConfig::new(
        ProjectConfig::new("old-project", "old-project.appspot.com"),
        ProjectConfig::new("new-project", "new-project.firebasestorage.app"),
    )
}

pub fn document(collection: &str, id: &str) -> Document {
    let mut fields = Map::new();
    fields.insert(
        "title".to_string(),
        json!({ "stringValue": format!("{} {}", collection, id) }),
    );
    fields.insert("count".to_string(), json!({ "integerValue": "3" }));
    Document::new(collection, id, fields)
}

pub fn seed_documents(project: &MemoryProject, collection: &str, count: usize) {
    for i in 0..count {
        project.insert_document(document(collection, &format!("doc-{:05}", i)));
    }
}

pub fn seed_users(project: &MemoryProject, count: usize) {
    for i in 0..count {
        let mut user = AuthUser::new(format!("uid-{:05}", i));
        user.email = Some(format!("user{}@example.com", i));
        user.email_verified = i % 2 == 0;
        project.insert_user(user);
    }
}
