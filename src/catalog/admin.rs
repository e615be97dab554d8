use serde::{Deserialize, Serialize};

use super::{page, require, Catalog, CatalogError, Role};
use crate::store::{Record, RecordId, RecordStore, TablesExt};

pub const DEFAULT_ADMIN_NAME: &str = "Captain";

fn default_name() -> String {
    DEFAULT_ADMIN_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub admin_id: RecordId,
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub credential_hash: String,
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "admin_role")]
    pub role: Role,
}

fn admin_role() -> Role {
    Role::Admin
}

impl Record for Admin {
    const TABLE: &'static str = "admins";

    fn id(&self) -> RecordId {
        self.admin_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.admin_id = id;
    }

    fn unique_keys(&self) -> Vec<(&'static str, String)> {
        vec![("username", self.username.clone())]
    }
}

impl Admin {
    /// This admin without the credential hash, for responses.
    pub fn redacted(mut self) -> Self {
        self.credential_hash.clear();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAdmin {
    pub username: String,
    pub credential_hash: String,
    #[serde(default = "default_name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUpdate {
    pub username: Option<String>,
    pub credential_hash: Option<String>,
    pub name: Option<String>,
}

impl<S: RecordStore> Catalog<S> {
    pub fn create_admin(&self, input: NewAdmin) -> Result<Admin, CatalogError> {
        require("username", &input.username)?;
        require("credential", &input.credential_hash)?;

        let name = if input.name.trim().is_empty() {
            default_name()
        } else {
            input.name
        };
        let saved = self.store().table::<Admin>().insert(Admin {
            admin_id: 0,
            username: input.username,
            credential_hash: input.credential_hash,
            name,
            role: Role::Admin,
        })?;
        Ok(saved.data)
    }

    pub fn get_admin(&self, admin_id: RecordId) -> Result<Option<Admin>, CatalogError> {
        Ok(self.store().table::<Admin>().get(admin_id)?.map(|row| row.data))
    }

    pub fn get_admin_by_username(&self, username: &str) -> Result<Option<Admin>, CatalogError> {
        Ok(self
            .store()
            .table::<Admin>()
            .find_one(&|admin| admin.username == username)?
            .map(|row| row.data))
    }

    pub fn list_admins(&self, skip: usize, limit: usize) -> Result<Vec<Admin>, CatalogError> {
        Ok(page(self.store().table::<Admin>().all()?, skip, limit))
    }

    pub fn update_admin(&self, admin_id: RecordId, update: AdminUpdate) -> Result<Admin, CatalogError> {
        let current = self
            .store()
            .table::<Admin>()
            .get(admin_id)?
            .ok_or_else(|| CatalogError::not_found("admin", admin_id))?;

        let mut admin = current.data;
        if let Some(username) = update.username {
            require("username", &username)?;
            admin.username = username;
        }
        if let Some(credential_hash) = update.credential_hash {
            require("credential", &credential_hash)?;
            admin.credential_hash = credential_hash;
        }
        if let Some(name) = update.name {
            require("name", &name)?;
            admin.name = name;
        }

        Ok(self.store().table::<Admin>().update(admin, current.version)?.data)
    }

    pub fn delete_admin(&self, admin_id: RecordId) -> Result<(), CatalogError> {
        if self.store().table::<Admin>().delete(admin_id)? {
            Ok(())
        } else {
            Err(CatalogError::not_found("admin", admin_id))
        }
    }
}
