use serde::Deserialize;
use serde_json::json;

use super::{Backend, Paging};
use crate::catalog::{AdminUpdate, NewAdmin};
use crate::commands::{CommandError, Service};
use crate::ranking::RankingStore;
use crate::store::{EventLog, RecordId, RecordStore};

pub const CREATE: &str = "admin.create";
pub const GET: &str = "admin.get";
pub const BY_USERNAME: &str = "admin.by_username";
pub const LIST: &str = "admin.list";
pub const UPDATE: &str = "admin.update";
pub const DELETE: &str = "admin.delete";

#[derive(Deserialize)]
struct AdminId {
    admin_id: RecordId,
}

#[derive(Deserialize)]
struct Username {
    username: String,
}

#[derive(Deserialize)]
struct UpdateInput {
    admin_id: RecordId,
    #[serde(flatten)]
    update: AdminUpdate,
}

impl<S, K> Service<Backend<S, K>>
where
    S: RecordStore + EventLog + 'static,
    K: RankingStore + 'static,
{
    /// Admin accounts. Every command requires the admin role.
    pub fn admin_commands(self) -> Self {
        self.command(CREATE, |ctx| {
            ctx.require_admin()?;
            let input: NewAdmin = ctx.input()?;
            Ok(json!(ctx.backend().catalog().create_admin(input)?.redacted()))
        })
        .command(GET, |ctx| {
            ctx.require_admin()?;
            let input: AdminId = ctx.input()?;
            let admin = ctx
                .backend()
                .catalog()
                .get_admin(input.admin_id)?
                .ok_or_else(|| CommandError::not_found("admin", input.admin_id))?;
            Ok(json!(admin.redacted()))
        })
        .command(BY_USERNAME, |ctx| {
            ctx.require_admin()?;
            let input: Username = ctx.input()?;
            let admin = ctx
                .backend()
                .catalog()
                .get_admin_by_username(&input.username)?
                .ok_or_else(|| CommandError::not_found("admin", &input.username))?;
            Ok(json!(admin.redacted()))
        })
        .command(LIST, |ctx| {
            ctx.require_admin()?;
            let paging: Paging = ctx.input()?;
            let admins: Vec<_> = ctx
                .backend()
                .catalog()
                .list_admins(paging.skip, paging.limit)?
                .into_iter()
                .map(|admin| admin.redacted())
                .collect();
            Ok(json!(admins))
        })
        .command_guarded(
            UPDATE,
            |ctx| ctx.has_field("admin_id"),
            |ctx| {
                ctx.require_admin()?;
                let input: UpdateInput = ctx.input()?;
                let admin = ctx
                    .backend()
                    .catalog()
                    .update_admin(input.admin_id, input.update)?;
                Ok(json!(admin.redacted()))
            },
        )
        .command(DELETE, |ctx| {
            ctx.require_admin()?;
            let input: AdminId = ctx.input()?;
            ctx.backend().catalog().delete_admin(input.admin_id)?;
            Ok(json!({ "deleted": true, "admin_id": input.admin_id }))
        })
    }
}
