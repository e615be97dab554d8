//! Context passed to command handlers.

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::CommandError;
use super::session::Session;
use crate::pipeline::Identity;
use crate::store::RecordId;

/// Everything a handler can see: the input payload, the session and the backend.
pub struct Context<'a, B> {
    command_name: &'a str,
    input: Value,
    session: Session,
    backend: &'a B,
}

impl<'a, B> Context<'a, B> {
    pub(crate) fn new(command_name: &'a str, input: Value, session: Session, backend: &'a B) -> Self {
        Self {
            command_name,
            input,
            session,
            backend,
        }
    }

    /// Deserialize the input payload into a typed struct.
    pub fn input<T: DeserializeOwned>(&self) -> Result<T, CommandError> {
        serde_json::from_value(self.input.clone())
            .map_err(|e| CommandError::DecodeFailed(e.to_string()))
    }

    pub fn backend(&self) -> &B {
        self.backend
    }

    /// The verified caller, or `Unauthorized`.
    pub fn identity(&self) -> Result<Identity, CommandError> {
        self.session.identity()
    }

    /// The verified caller if it is an admin; `Forbidden` otherwise.
    pub fn require_admin(&self) -> Result<Identity, CommandError> {
        let identity = self.identity()?;
        if !identity.is_admin() {
            return Err(CommandError::Forbidden(format!(
                "{} requires the admin role",
                self.command_name
            )));
        }
        Ok(identity)
    }

    /// The verified caller if it is `user_id` or an admin.
    pub fn require_self_or_admin(&self, user_id: RecordId) -> Result<Identity, CommandError> {
        let identity = self.identity()?;
        if identity.user_id != user_id && !identity.is_admin() {
            return Err(CommandError::Forbidden(format!(
                "{} may only act on the caller's own records",
                self.command_name
            )));
        }
        Ok(identity)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.input.get(field).is_some()
    }

    pub fn has_fields(&self, fields: &[&str]) -> bool {
        fields.iter().all(|f| self.has_field(f))
    }
}
