use parley_core::{Member, Role, Snowflake};
use validator::Validate;

use super::MEMBERS_PAGE_SIZE;
use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::requests::{CreateBan, EditMember, EditRole};
use crate::responses::Ban;
use crate::route::Route;

fn fill_guild(mut member: Member, guild_id: Snowflake) -> Member {
    member.guild_id.get_or_insert(guild_id);
    member
}

impl Http {
    pub async fn get_member(&self, guild_id: Snowflake, user_id: Snowflake) -> HttpResult<Member> {
        let member = self
            .request(
                Route::get("/guilds/{guild_id}/members/{user_id}")
                    .with("guild_id", guild_id)
                    .with("user_id", user_id),
                RequestOptions::new(),
            )
            .await?;
        Ok(fill_guild(member, guild_id))
    }

    /// List members by ascending id; bot only
    pub async fn get_members(&self, guild_id: Snowflake, limit: usize) -> HttpResult<Vec<Member>> {
        let mut members: Vec<Member> = Vec::new();
        let mut after = Snowflake::default();

        while members.len() < limit {
            let wanted = (limit - members.len()).min(MEMBERS_PAGE_SIZE);
            let page: Vec<Member> = self
                .request(
                    Route::get("/guilds/{guild_id}/members").with("guild_id", guild_id),
                    RequestOptions::new()
                        .query("limit", wanted)
                        .query("after", after),
                )
                .await?;
            let count = page.len();
            match page.iter().map(Member::id).max() {
                Some(last) => after = last,
                None => break,
            }
            members.extend(page.into_iter().map(|m| fill_guild(m, guild_id)));
            if count < wanted {
                break;
            }
        }
        Ok(members)
    }

    pub async fn edit_member(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        edit: &EditMember,
        reason: Option<&str>,
    ) -> HttpResult<Member> {
        edit.validate()?;
        edit.check_nick()?;
        let member = self
            .request(
                Route::patch("/guilds/{guild_id}/members/{user_id}")
                    .with("guild_id", guild_id)
                    .with("user_id", user_id),
                RequestOptions::json(edit)?.reason(reason),
            )
            .await?;
        Ok(fill_guild(member, guild_id))
    }

    /// Set or clear the current account's nickname
    pub async fn change_nickname(&self, guild_id: Snowflake, nick: Option<&str>) -> HttpResult<()> {
        let edit = EditMember {
            nick: Some(nick.map(str::to_string)),
            ..EditMember::default()
        };
        edit.check_nick()?;
        self.request_empty(
            Route::patch("/guilds/{guild_id}/members/@me").with("guild_id", guild_id),
            RequestOptions::json(&edit)?,
        )
        .await
    }

    pub async fn kick(&self, guild_id: Snowflake, user_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/guilds/{guild_id}/members/{user_id}")
                .with("guild_id", guild_id)
                .with("user_id", user_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    pub async fn ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        ban: &CreateBan,
        reason: Option<&str>,
    ) -> HttpResult<()> {
        ban.validate()?;
        self.request_empty(
            Route::put("/guilds/{guild_id}/bans/{user_id}")
                .with("guild_id", guild_id)
                .with("user_id", user_id),
            RequestOptions::json(ban)?.reason(reason),
        )
        .await
    }

    pub async fn unban(&self, guild_id: Snowflake, user_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/guilds/{guild_id}/bans/{user_id}")
                .with("guild_id", guild_id)
                .with("user_id", user_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    pub async fn get_bans(&self, guild_id: Snowflake) -> HttpResult<Vec<Ban>> {
        self.request(
            Route::get("/guilds/{guild_id}/bans").with("guild_id", guild_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn add_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> HttpResult<()> {
        self.request_empty(
            Route::put("/guilds/{guild_id}/members/{user_id}/roles/{role_id}")
                .with("guild_id", guild_id)
                .with("user_id", user_id)
                .with("role_id", role_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    pub async fn remove_role(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        role_id: Snowflake,
        reason: Option<&str>,
    ) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/guilds/{guild_id}/members/{user_id}/roles/{role_id}")
                .with("guild_id", guild_id)
                .with("user_id", user_id)
                .with("role_id", role_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    pub async fn create_role(&self, guild_id: Snowflake, role: &EditRole, reason: Option<&str>) -> HttpResult<Role> {
        role.validate()?;
        self.request(
            Route::post("/guilds/{guild_id}/roles").with("guild_id", guild_id),
            RequestOptions::json(role)?.reason(reason),
        )
        .await
    }

    pub async fn edit_role(
        &self,
        guild_id: Snowflake,
        role_id: Snowflake,
        role: &EditRole,
        reason: Option<&str>,
    ) -> HttpResult<Role> {
        role.validate()?;
        self.request(
            Route::patch("/guilds/{guild_id}/roles/{role_id}")
                .with("guild_id", guild_id)
                .with("role_id", role_id),
            RequestOptions::json(role)?.reason(reason),
        )
        .await
    }

    pub async fn delete_role(&self, guild_id: Snowflake, role_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/guilds/{guild_id}/roles/{role_id}")
                .with("guild_id", guild_id)
                .with("role_id", role_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }
}
