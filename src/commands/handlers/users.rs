use serde::Deserialize;
use serde_json::json;

use super::{Backend, Paging};
use crate::catalog::{NewUser, Role, UserUpdate, UserView};
use crate::commands::{CommandError, Service};
use crate::ranking::RankingStore;
use crate::store::{EventLog, RecordId, RecordStore};

pub const CREATE: &str = "user.create";
pub const GET: &str = "user.get";
pub const BY_USERNAME: &str = "user.by_username";
pub const LIST: &str = "user.list";
pub const UPDATE: &str = "user.update";
pub const DELETE: &str = "user.delete";

#[derive(Deserialize)]
struct UserId {
    user_id: RecordId,
}

#[derive(Deserialize)]
struct Username {
    username: String,
}

#[derive(Deserialize)]
struct UpdateInput {
    user_id: RecordId,
    #[serde(flatten)]
    update: UserUpdate,
}

impl<S, K> Service<Backend<S, K>>
where
    S: RecordStore + EventLog + 'static,
    K: RankingStore + 'static,
{
    /// User accounts. Registration is open; only admins grant the admin role.
    pub fn user_commands(self) -> Self {
        self.command(CREATE, |ctx| {
            let input: NewUser = ctx.input()?;
            if input.role == Role::Admin {
                ctx.require_admin()?;
            }
            let user = ctx.backend().catalog().create_user(input)?;
            Ok(json!(UserView::from(user)))
        })
        .command(GET, |ctx| {
            ctx.identity()?;
            let input: UserId = ctx.input()?;
            let user = ctx
                .backend()
                .catalog()
                .get_user(input.user_id)?
                .ok_or_else(|| CommandError::not_found("user", input.user_id))?;
            Ok(json!(UserView::from(user)))
        })
        .command(BY_USERNAME, |ctx| {
            ctx.identity()?;
            let input: Username = ctx.input()?;
            let user = ctx
                .backend()
                .catalog()
                .get_user_by_username(&input.username)?
                .ok_or_else(|| CommandError::not_found("user", &input.username))?;
            Ok(json!(UserView::from(user)))
        })
        .command(LIST, |ctx| {
            ctx.identity()?;
            let paging: Paging = ctx.input()?;
            let users: Vec<UserView> = ctx
                .backend()
                .catalog()
                .list_users(paging.skip, paging.limit)?
                .into_iter()
                .map(UserView::from)
                .collect();
            Ok(json!(users))
        })
        .command_guarded(
            UPDATE,
            |ctx| ctx.has_field("user_id"),
            |ctx| {
                let input: UpdateInput = ctx.input()?;
                let identity = ctx.require_self_or_admin(input.user_id)?;
                if input.update.role.is_some() && !identity.is_admin() {
                    return Err(CommandError::Forbidden("only admins may change roles".into()));
                }
                let user = ctx
                    .backend()
                    .catalog()
                    .update_user(input.user_id, input.update)?
                    .ok_or_else(|| CommandError::not_found("user", input.user_id))?;
                Ok(json!(UserView::from(user)))
            },
        )
        .command(DELETE, |ctx| {
            ctx.require_admin()?;
            let input: UserId = ctx.input()?;
            if !ctx.backend().catalog().delete_user(input.user_id)? {
                return Err(CommandError::not_found("user", input.user_id));
            }
            Ok(json!({ "deleted": true, "user_id": input.user_id }))
        })
    }
}
