use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use log::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::Error;
use crate::store::{Id, Store};

#[derive(Debug, Clone)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    password_hash: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> Profile {
        Profile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            bio: self.bio.clone(),
            skills: self.skills.clone(),
            created_at: self.created_at,
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
        }
    }
}

/// The public view of a user, without the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(as = domain::user::Profile)]
pub struct Profile {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(as = domain::user::UserSummary)]
pub struct UserSummary {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(as = domain::user::Registration)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(as = domain::user::Credentials)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Fields left out of the request keep their current value.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[schema(as = domain::user::ProfileUpdate)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
}

pub fn register(store: &Store, registration: Registration) -> Result<User, Error> {
    let username = registration.username.trim().to_string();
    let email = registration.email.trim().to_lowercase();

    if username.is_empty() || email.is_empty() || registration.password.is_empty() {
        return Err(Error::invalid("username, email and password are required"));
    }

    let id = Id::new_v4();

    match store.users_by_email.entry(email.clone()) {
        Entry::Occupied(_) => return Err(Error::conflict("email already registered")),
        Entry::Vacant(vacant) => {
            vacant.insert(id);
        }
    }

    match store.users_by_username.entry(username.clone()) {
        Entry::Occupied(_) => {
            store.users_by_email.remove(&email);
            return Err(Error::conflict("username already taken"));
        }
        Entry::Vacant(vacant) => {
            vacant.insert(id);
        }
    }

    let user = User {
        id,
        username,
        email,
        password_hash: password_auth::generate_hash(registration.password),
        bio: String::new(),
        skills: Vec::new(),
        created_at: Utc::now(),
    };
    store.users.insert(id, user.clone());

    info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

pub fn authenticate(store: &Store, credentials: Credentials) -> Result<User, Error> {
    let email = credentials.email.trim().to_lowercase();
    let user = find_by_email(store, &email).ok_or_else(|| {
        debug!("Login attempt for unknown email");
        Error::unauthenticated()
    })?;

    match password_auth::verify_password(credentials.password, &user.password_hash) {
        Ok(_) => Ok(user),
        Err(_) => {
            debug!("Password mismatch for user {}", user.id);
            Err(Error::unauthenticated())
        }
    }
}

pub fn find_by_id(store: &Store, id: Id) -> Result<User, Error> {
    store
        .users
        .get(&id)
        .map(|user| user.clone())
        .ok_or_else(Error::not_found)
}

pub fn find_by_email(store: &Store, email: &str) -> Option<User> {
    let id = *store.users_by_email.get(email)?;
    store.users.get(&id).map(|user| user.clone())
}

pub fn update_profile(store: &Store, id: Id, update: ProfileUpdate) -> Result<User, Error> {
    let mut user = store.users.get_mut(&id).ok_or_else(Error::not_found)?;

    if let Some(bio) = update.bio {
        user.bio = bio.trim().to_string();
    }
    if let Some(skills) = update.skills {
        user.skills = normalize_skills(skills);
    }

    debug!("Updated profile for user {id}");
    Ok(user.clone())
}

/// Trims each skill, drops blanks and keeps the first occurrence of duplicates.
pub fn normalize_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for skill in skills {
        let skill = skill.as_ref().trim();
        if !skill.is_empty() && !normalized.iter().any(|existing| existing == skill) {
            normalized.push(skill.to_string());
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{DomainErrorKind, EntityErrorKind};

    fn alice() -> Registration {
        Registration {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn register_then_authenticate() {
        let store = Store::new();
        let user = register(&store, alice()).unwrap();

        let authenticated = authenticate(
            &store,
            Credentials {
                email: "Alice@Example.com ".to_string(),
                password: "password123".to_string(),
            },
        )
        .unwrap();
        assert_eq!(authenticated.id, user.id);
        assert_ne!(authenticated.password_hash, "password123");
    }

    #[test]
    fn wrong_password_is_unauthenticated() {
        let store = Store::new();
        register(&store, alice()).unwrap();

        let err = authenticate(
            &store,
            Credentials {
                email: "alice@example.com".to_string(),
                password: "nope".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Entity(EntityErrorKind::Unauthenticated)
        );
    }

    #[test]
    fn duplicate_email_and_username_conflict() {
        let store = Store::new();
        register(&store, alice()).unwrap();

        let err = register(&store, alice()).unwrap_err();
        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Entity(EntityErrorKind::Conflict(_))
        ));

        let err = register(
            &store,
            Registration {
                email: "other@example.com".to_string(),
                ..alice()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Entity(EntityErrorKind::Conflict(_))
        ));
        // The failed username claim must not leave its email reserved.
        assert!(find_by_email(&store, "other@example.com").is_none());
        assert!(!store.users_by_email.contains_key("other@example.com"));
        assert_eq!(store.user_count(), 1);
    }

    #[test]
    fn blank_fields_are_invalid() {
        let store = Store::new();
        let err = register(
            &store,
            Registration {
                username: "  ".to_string(),
                ..alice()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.error_kind,
            DomainErrorKind::Entity(EntityErrorKind::Invalid(_))
        ));
    }

    #[test]
    fn update_profile_changes_only_provided_fields() {
        let store = Store::new();
        let user = register(&store, alice()).unwrap();

        let updated = update_profile(
            &store,
            user.id,
            ProfileUpdate {
                bio: Some("Rustacean".to_string()),
                skills: Some(vec![" rust ".into(), "".into(), "tokio".into(), "rust".into()]),
            },
        )
        .unwrap();
        assert_eq!(updated.bio, "Rustacean");
        assert_eq!(updated.skills, vec!["rust", "tokio"]);

        let updated = update_profile(
            &store,
            user.id,
            ProfileUpdate {
                bio: None,
                skills: Some(vec!["axum".into()]),
            },
        )
        .unwrap();
        assert_eq!(updated.bio, "Rustacean");
        assert_eq!(updated.skills, vec!["axum"]);
    }

    #[test]
    fn update_profile_for_unknown_user_is_not_found() {
        let store = Store::new();
        let err = update_profile(&store, Id::new_v4(), ProfileUpdate::default()).unwrap_err();
        assert_eq!(
            err.error_kind,
            DomainErrorKind::Entity(EntityErrorKind::NotFound)
        );
    }

    #[test]
    fn profile_serializes_without_the_password_hash() {
        let store = Store::new();
        let user = register(&store, alice()).unwrap();

        let json = serde_json::to_value(user.profile()).unwrap();
        assert_eq!(json["username"], "alice");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
