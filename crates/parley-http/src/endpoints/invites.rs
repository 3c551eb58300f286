use parley_core::{Invite, Snowflake};
use tracing::info;
use validator::Validate;

use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::requests::CreateInvite;
use crate::route::Route;

impl Http {
    pub async fn create_invite(
        &self,
        channel_id: Snowflake,
        request: &CreateInvite,
        reason: Option<&str>,
    ) -> HttpResult<Invite> {
        request.validate()?;
        self.request(
            Route::post("/channels/{channel_id}/invites").with("channel_id", channel_id),
            RequestOptions::json(request)?.reason(reason),
        )
        .await
    }

    /// Look up an invite by code or URL
    pub async fn get_invite(&self, url_or_code: &str) -> HttpResult<Invite> {
        self.request(
            Route::get("/invites/{code}").with("code", Invite::resolve_code(url_or_code)),
            RequestOptions::new().query("with_counts", true),
        )
        .await
    }

    /// Join the guild behind an invite; user accounts only
    pub async fn accept_invite(&self, url_or_code: &str) -> HttpResult<Invite> {
        let invite: Invite = self
            .request(
                Route::post("/invites/{code}").with("code", Invite::resolve_code(url_or_code)),
                RequestOptions::json(&serde_json::json!({}))?,
            )
            .await?;
        info!(
            code = %invite.code,
            guild_id = ?invite.guild.as_ref().map(|g| g.id),
            "accepted invite"
        );
        Ok(invite)
    }

    pub async fn delete_invite(&self, url_or_code: &str, reason: Option<&str>) -> HttpResult<Invite> {
        self.request(
            Route::delete("/invites/{code}").with("code", Invite::resolve_code(url_or_code)),
            RequestOptions::new().reason(reason),
        )
        .await
    }
}
