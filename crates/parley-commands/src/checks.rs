//! Invocation checks
//!
//! A check runs before the callback; any error it returns aborts the
//! invocation and reaches the error hook.

use futures::future::BoxFuture;
use futures::FutureExt;
use parley_core::{Permissions, Snowflake};
use std::future::Future;
use std::sync::Arc;

use crate::context::CommandContext;
use crate::error::{CommandError, CommandResult};

type Predicate = Arc<dyn Fn(CommandContext) -> BoxFuture<'static, CommandResult<()>> + Send + Sync>;

#[derive(Clone)]
pub struct Check {
    name: String,
    predicate: Predicate,
}

impl Check {
    /// A check that reports its own error
    pub fn new<F, Fut>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(move |ctx| predicate(ctx).boxed()),
        }
    }

    /// A yes/no check; `false` becomes a `CheckFailure`
    pub fn custom<F, Fut>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let name = name.into();
        let message = format!("The check {name} failed");
        Self::new(name, move |ctx| {
            let passed = predicate(ctx);
            let message = message.clone();
            async move {
                if passed.await {
                    Ok(())
                } else {
                    Err(CommandError::CheckFailure(message))
                }
            }
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run(&self, ctx: &CommandContext) -> CommandResult<()> {
        (self.predicate)(ctx.clone()).await
    }
}

impl std::fmt::Debug for Check {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish_non_exhaustive()
    }
}

pub fn guild_only() -> Check {
    Check::new("guild_only", |ctx| async move {
        if ctx.is_private() {
            Err(CommandError::NoPrivateMessage)
        } else {
            Ok(())
        }
    })
}

pub fn dm_only() -> Check {
    Check::new("dm_only", |ctx| async move {
        if ctx.is_private() {
            Ok(())
        } else {
            Err(CommandError::PrivateMessageOnly)
        }
    })
}

pub fn is_owner() -> Check {
    Check::new("is_owner", |ctx| async move {
        if ctx.is_owner(ctx.author().id) {
            Ok(())
        } else {
            Err(CommandError::check_failure("You do not own this bot."))
        }
    })
}

/// The author holds `required` in the invoking channel
///
/// Always passes in private messages.
pub fn has_permissions(required: Permissions) -> Check {
    Check::new("has_permissions", move |ctx| async move {
        let Some(guild_id) = ctx.guild_id() else {
            return Ok(());
        };
        let granted = ctx
            .cache
            .with_guild(guild_id, |guild| {
                let member = guild.member(ctx.author().id)?;
                Some(match guild.channel(ctx.channel_id()) {
                    Some(channel) => guild.permissions_for(member, channel),
                    None => guild.guild_permissions(member),
                })
            })
            .flatten()
            .unwrap_or_else(Permissions::empty);

        if granted.has(required) {
            return Ok(());
        }
        let missing = required - granted;
        Err(CommandError::check_failure(format!(
            "You are missing {} permission(s) to run this command.",
            missing.list().join(", ")
        )))
    })
}

/// A role by id or by exact name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRef {
    Id(Snowflake),
    Name(String),
}

impl From<Snowflake> for RoleRef {
    fn from(id: Snowflake) -> Self {
        Self::Id(id)
    }
}

impl From<u64> for RoleRef {
    fn from(id: u64) -> Self {
        Self::Id(Snowflake::new(id))
    }
}

impl From<&str> for RoleRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

pub fn has_role(role: impl Into<RoleRef>) -> Check {
    let role = role.into();
    Check::new("has_role", move |ctx| {
        let role = role.clone();
        async move {
            let guild_id = ctx.guild_id().ok_or(CommandError::NoPrivateMessage)?;
            let holds = ctx
                .cache
                .with_guild(guild_id, |guild| {
                    let member = guild.member(ctx.author().id)?;
                    let role_id = match &role {
                        RoleRef::Id(id) => *id,
                        RoleRef::Name(name) => guild.role_by_name(name)?.id,
                    };
                    Some(member.has_role(role_id))
                })
                .flatten()
                .unwrap_or(false);

            if holds {
                Ok(())
            } else {
                let role = match role {
                    RoleRef::Id(id) => id.to_string(),
                    RoleRef::Name(name) => name,
                };
                Err(CommandError::check_failure(format!(
                    "Role {role:?} is required to run this command."
                )))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{self, ALICE, BOB, ME};
    use std::collections::HashSet;

    fn command_context(author: u64, in_guild: bool) -> (CommandContext, parley_gateway::Shard) {
        let (ctx, shard) = test_utils::context(test_utils::cache());
        let owners: HashSet<Snowflake> = [Snowflake::new(ME)].into_iter().collect();
        let ctx = CommandContext {
            ctx,
            message: test_utils::message("!cmd", author, in_guild),
            prefix: "!".into(),
            invoked_with: "cmd".into(),
            command: "cmd".into(),
            owners: Arc::new(owners),
        };
        (ctx, shard)
    }

    #[tokio::test]
    async fn test_guild_and_dm_only() {
        let (guild, _g) = command_context(ALICE, true);
        let (dm, _d) = command_context(ALICE, false);

        guild_only().run(&guild).await.unwrap();
        assert!(matches!(guild_only().run(&dm).await, Err(CommandError::NoPrivateMessage)));
        dm_only().run(&dm).await.unwrap();
        assert!(matches!(dm_only().run(&guild).await, Err(CommandError::PrivateMessageOnly)));
    }

    #[tokio::test]
    async fn test_is_owner() {
        let (owner, _o) = command_context(ME, true);
        let (other, _x) = command_context(BOB, true);
        is_owner().run(&owner).await.unwrap();
        assert!(matches!(is_owner().run(&other).await, Err(CommandError::CheckFailure(_))));
    }

    #[tokio::test]
    async fn test_has_permissions() {
        let check = has_permissions(Permissions::MANAGE_MESSAGES);
        let (alice, _a) = command_context(ALICE, true);
        let (bob, _b) = command_context(BOB, true);
        let (dm, _d) = command_context(BOB, false);

        check.run(&alice).await.unwrap();
        check.run(&dm).await.unwrap();
        match check.run(&bob).await {
            Err(CommandError::CheckFailure(message)) => assert_eq!(
                message,
                "You are missing MANAGE_MESSAGES permission(s) to run this command."
            ),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_has_role() {
        let (alice, _a) = command_context(ALICE, true);
        let (bob, _b) = command_context(BOB, true);
        let (dm, _d) = command_context(ALICE, false);

        has_role("mod").run(&alice).await.unwrap();
        has_role(Snowflake::new(20)).run(&alice).await.unwrap();
        assert!(has_role("mod").run(&bob).await.is_err());
        assert!(has_role("missing").run(&alice).await.is_err());
        assert!(matches!(has_role("mod").run(&dm).await, Err(CommandError::NoPrivateMessage)));
    }

    #[tokio::test]
    async fn test_custom() {
        let (ctx, _s) = command_context(ALICE, true);
        let short = Check::custom("short", |ctx: CommandContext| async move {
            ctx.message.content.len() < 3
        });
        assert_eq!(short.name(), "short");
        match short.run(&ctx).await {
            Err(CommandError::CheckFailure(message)) => assert_eq!(message, "The check short failed"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
