use parley_core::{Channel, Guild, Snowflake};
use tracing::debug;
use validator::Validate;

use super::GUILDS_PAGE_SIZE;
use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::requests::{CreateChannel, CreateGuild, EditGuild};
use crate::responses::PartialGuild;
use crate::route::Route;

impl Http {
    pub async fn get_guild(&self, guild_id: Snowflake) -> HttpResult<Guild> {
        let mut guild: Guild = self
            .request(
                Route::get("/guilds/{guild_id}").with("guild_id", guild_id),
                RequestOptions::new().query("with_counts", true),
            )
            .await?;
        guild.fill_guild_ids();
        Ok(guild)
    }

    /// Guilds the account is in, following pages until `limit` or the end
    pub async fn get_guilds(&self, limit: Option<usize>) -> HttpResult<Vec<PartialGuild>> {
        let mut guilds = Vec::new();
        let mut after: Option<Snowflake> = None;

        loop {
            let wanted = limit.map_or(GUILDS_PAGE_SIZE, |l| l.saturating_sub(guilds.len()).min(GUILDS_PAGE_SIZE));
            if wanted == 0 {
                break;
            }
            let mut options = RequestOptions::new().query("limit", wanted);
            if let Some(after) = after {
                options = options.query("after", after);
            }
            let page: Vec<PartialGuild> = self
                .request(Route::get("/users/@me/guilds"), options)
                .await?;
            let count = page.len();
            after = page.iter().map(|g| g.id).max();
            guilds.extend(page);
            debug!(fetched = guilds.len(), "fetched guild page");

            if count < wanted {
                break;
            }
        }
        Ok(guilds)
    }

    pub async fn create_guild(&self, request: &CreateGuild) -> HttpResult<Guild> {
        request.validate()?;
        let mut guild: Guild = self
            .request(Route::post("/guilds"), RequestOptions::json(request)?)
            .await?;
        guild.fill_guild_ids();
        Ok(guild)
    }

    pub async fn edit_guild(
        &self,
        guild_id: Snowflake,
        request: &EditGuild,
        reason: Option<&str>,
    ) -> HttpResult<Guild> {
        request.validate()?;
        let mut guild: Guild = self
            .request(
                Route::patch("/guilds/{guild_id}").with("guild_id", guild_id),
                RequestOptions::json(request)?.reason(reason),
            )
            .await?;
        guild.fill_guild_ids();
        Ok(guild)
    }

    pub async fn leave_guild(&self, guild_id: Snowflake) -> HttpResult<()> {
        let body = serde_json::json!({ "lurking": false });
        self.request_empty(
            Route::delete("/users/@me/guilds/{guild_id}").with("guild_id", guild_id),
            RequestOptions::json(&body)?,
        )
        .await
    }

    /// Delete a guild the account owns
    pub async fn delete_guild(&self, guild_id: Snowflake) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/guilds/{guild_id}").with("guild_id", guild_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn get_guild_channels(&self, guild_id: Snowflake) -> HttpResult<Vec<Channel>> {
        let mut channels: Vec<Channel> = self
            .request(
                Route::get("/guilds/{guild_id}/channels").with("guild_id", guild_id),
                RequestOptions::new(),
            )
            .await?;
        for channel in &mut channels {
            channel.guild_id.get_or_insert(guild_id);
        }
        Ok(channels)
    }

    pub async fn create_channel(
        &self,
        guild_id: Snowflake,
        request: &CreateChannel,
        reason: Option<&str>,
    ) -> HttpResult<Channel> {
        request.validate()?;
        self.request(
            Route::post("/guilds/{guild_id}/channels").with("guild_id", guild_id),
            RequestOptions::json(request)?.reason(reason),
        )
        .await
    }
}
