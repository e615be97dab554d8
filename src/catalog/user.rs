use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{page, require, Catalog, CatalogError};
use crate::store::{Record, RecordId, RecordStore, TablesExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    #[serde(alias = "user")]
    User,
    #[serde(alias = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CatalogError;

    /// Case-insensitive, so `"admin"` and `"ADMIN"` both parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(CatalogError::Validation(format!("unknown role {:?}", s))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: RecordId,
    pub username: String,
    pub credential_hash: String,
    /// Number of reviews this user has written.
    #[serde(default)]
    pub review_count: u64,
    #[serde(default)]
    pub role: Role,
}

impl Record for User {
    const TABLE: &'static str = "users";

    fn id(&self) -> RecordId {
        self.user_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.user_id = id;
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("username", self.username.clone())]
    }
}

/// A user without the credential hash, for responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub user_id: RecordId,
    pub username: String,
    pub review_count: u64,
    pub role: Role,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id,
            username: user.username,
            review_count: user.review_count,
            role: user.role,
        }
    }
}

/// The credential arrives already hashed by the authentication collaborator.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub credential_hash: String,
    #[serde(default)]
    pub role: Role,
}

/// `review_count` is derived and cannot be edited.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub credential_hash: Option<String>,
    pub role: Option<Role>,
}

impl<S: RecordStore> Catalog<S> {
    pub fn create_user(&self, input: NewUser) -> Result<User, CatalogError> {
        require("username", &input.username)?;
        require("credential", &input.credential_hash)?;

        let saved = self.store().table::<User>().insert(User {
            user_id: 0,
            username: input.username,
            credential_hash: input.credential_hash,
            review_count: 0,
            role: input.role,
        })?;
        Ok(saved.data)
    }

    pub fn get_user(&self, user_id: RecordId) -> Result<Option<User>, CatalogError> {
        Ok(self.store().table::<User>().get(user_id)?.map(|row| row.data))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>, CatalogError> {
        Ok(self
            .store()
            .table::<User>()
            .find_one(&|user| user.username == username)?
            .map(|row| row.data))
    }

    pub fn list_users(&self, skip: usize, limit: usize) -> Result<Vec<User>, CatalogError> {
        Ok(page(self.store().table::<User>().all()?, skip, limit))
    }

    /// Returns `Ok(None)` when the user does not exist.
    pub fn update_user(
        &self,
        user_id: RecordId,
        update: UserUpdate,
    ) -> Result<Option<User>, CatalogError> {
        let Some(current) = self.store().table::<User>().get(user_id)? else {
            return Ok(None);
        };

        let mut user = current.data;
        if let Some(username) = update.username {
            require("username", &username)?;
            user.username = username;
        }
        if let Some(credential_hash) = update.credential_hash {
            require("credential", &credential_hash)?;
            user.credential_hash = credential_hash;
        }
        if let Some(role) = update.role {
            user.role = role;
        }

        let saved = self.store().table::<User>().update(user, current.version)?;
        Ok(Some(saved.data))
    }

    /// Returns false when the user did not exist. Their reviews are kept.
    pub fn delete_user(&self, user_id: RecordId) -> Result<bool, CatalogError> {
        Ok(self.store().table::<User>().delete(user_id)?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::InMemoryRecordStore;

    fn catalog() -> Catalog<InMemoryRecordStore> {
        Catalog::new(Arc::new(InMemoryRecordStore::new()))
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            credential_hash: "$2b$12$hash".into(),
            role: Role::User,
        }
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("USER".parse::<Role>().unwrap(), Role::User);
        assert!("owner".parse::<Role>().is_err());
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"ADMIN\"");
    }

    #[test]
    fn create_and_lookup_by_username() {
        let catalog = catalog();
        let created = catalog.create_user(new_user("ada")).unwrap();
        assert_eq!(created.review_count, 0);

        let found = catalog.get_user_by_username("ada").unwrap().unwrap();
        assert_eq!(found.user_id, created.user_id);
        assert!(catalog.get_user_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let catalog = catalog();
        catalog.create_user(new_user("ada")).unwrap();
        assert!(matches!(
            catalog.create_user(new_user("ada")),
            Err(CatalogError::Persistence(_))
        ));
    }

    #[test]
    fn missing_credential_is_rejected() {
        let catalog = catalog();
        let err = catalog
            .create_user(NewUser {
                credential_hash: String::new(),
                ..new_user("ada")
            })
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
    }

    #[test]
    fn update_and_delete() {
        let catalog = catalog();
        let created = catalog.create_user(new_user("ada")).unwrap();

        let updated = catalog
            .update_user(
                created.user_id,
                UserUpdate {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.username, "ada");

        assert!(catalog.delete_user(created.user_id).unwrap());
        assert!(!catalog.delete_user(created.user_id).unwrap());
        assert!(catalog.update_user(created.user_id, UserUpdate::default()).unwrap().is_none());
    }

    #[test]
    fn view_hides_credential() {
        let catalog = catalog();
        let created = catalog.create_user(new_user("ada")).unwrap();
        let json = serde_json::to_value(UserView::from(created)).unwrap();
        assert!(json.get("credential_hash").is_none());
        assert_eq!(json["role"], "USER");
    }
}
