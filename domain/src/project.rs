use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Error;
use crate::store::{Id, Store};
use crate::user::{self, normalize_skills};

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = domain::project::Project)]
pub struct Project {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    #[schema(value_type = String, format = Uuid)]
    pub owner_id: Id,
    pub owner_name: String,
    pub title: String,
    pub description: String,
    pub needed_skills: Vec<String>,
    /// Room id clients join to discuss this project.
    pub chat_room: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = domain::project::NewProject)]
pub struct NewProject {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub needed_skills: Vec<String>,
}

pub fn create(store: &Store, owner_id: Id, new_project: NewProject) -> Result<Project, Error> {
    let title = new_project.title.trim().to_string();
    if title.is_empty() {
        return Err(Error::invalid("project title is required"));
    }

    let owner = user::find_by_id(store, owner_id)?;
    let id = Id::new_v4();
    let project = Project {
        id,
        owner_id,
        owner_name: owner.username,
        title,
        description: new_project.description.trim().to_string(),
        needed_skills: normalize_skills(new_project.needed_skills),
        chat_room: format!("project-{id}"),
        created_at: Utc::now(),
    };
    store.projects.insert(id, project.clone());

    info!("User {owner_id} created project {id}");
    Ok(project)
}

/// All projects, newest first.
pub fn list(store: &Store) -> Vec<Project> {
    let mut projects: Vec<Project> = store
        .projects
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    projects
}

pub fn find_by_id(store: &Store, id: Id) -> Result<Project, Error> {
    store
        .projects
        .get(&id)
        .map(|project| project.clone())
        .ok_or_else(Error::not_found)
}
