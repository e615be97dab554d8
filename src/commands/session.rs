//! Session variables forwarded by the authentication gateway.
//!
//! Nothing here verifies a token: the identity is whatever `x-user-id` and
//! `x-user-role` say. The service must only be reachable through a gateway
//! that strips these headers from client requests and sets them itself.

use std::collections::HashMap;

use super::error::CommandError;
use crate::catalog::Role;
use crate::pipeline::Identity;

pub const USER_ID_VAR: &str = "x-user-id";
pub const USER_ROLE_VAR: &str = "x-user-role";

/// Variables from the incoming request.
///
/// The gateway verifies the bearer token and forwards its claims:
///
/// ```json
/// {
///   "x-user-id": "42",
///   "x-user-role": "USER"
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Session {
    variables: HashMap<String, String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    /// A session for an already verified caller.
    pub fn for_identity(identity: Identity) -> Self {
        let mut session = Self::new();
        session.set(USER_ID_VAR, identity.user_id.to_string());
        session.set(USER_ROLE_VAR, identity.role.as_str());
        session
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(|v| v.as_str())
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// The verified caller. A missing role means an ordinary user.
    pub fn identity(&self) -> Result<Identity, CommandError> {
        let raw = self
            .get(USER_ID_VAR)
            .ok_or_else(|| CommandError::Unauthorized("missing user id in session".into()))?;
        let user_id = raw
            .trim()
            .parse()
            .map_err(|_| CommandError::Unauthorized(format!("malformed user id {:?}", raw)))?;
        let role = match self.get(USER_ROLE_VAR) {
            Some(role) => role
                .parse::<Role>()
                .map_err(|_| CommandError::Unauthorized(format!("unknown role {:?}", role)))?,
            None => Role::User,
        };
        Ok(Identity { user_id, role })
    }
}
