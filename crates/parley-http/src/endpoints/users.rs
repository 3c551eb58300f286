use parley_core::{CurrentUser, Snowflake, User};
use tracing::info;
use validator::Validate;

use crate::client::{Http, RequestOptions};
use crate::error::{HttpError, HttpResult};
use crate::requests::EditProfile;
use crate::responses::{BotGatewayInfo, GatewayInfo, SessionStartLimit};
use crate::route::Route;

impl Http {
    /// Verify the token and fetch the account it belongs to
    ///
    /// Any 401 is reported as [`HttpError::Unauthorized`].
    pub async fn static_login(&self) -> HttpResult<CurrentUser> {
        match self
            .request::<CurrentUser>(Route::get("/users/@me"), RequestOptions::new())
            .await
        {
            Ok(user) => {
                info!(user_id = %user.user.id, bot = self.is_bot(), "logged in");
                Ok(user)
            }
            Err(err) if err.status() == Some(401) => Err(HttpError::Unauthorized),
            Err(err) => Err(err),
        }
    }

    pub async fn get_user(&self, user_id: Snowflake) -> HttpResult<User> {
        self.request(
            Route::get("/users/{user_id}").with("user_id", user_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn edit_profile(&self, profile: &EditProfile) -> HttpResult<CurrentUser> {
        profile.validate()?;
        if profile.username.is_some() && !self.is_bot() && profile.password.is_none() {
            return Err(parley_core::ModelError::Validation(
                "Password is required to change the username".to_string(),
            )
            .into());
        }
        self.request(Route::patch("/users/@me"), RequestOptions::json(profile)?)
            .await
    }

    /// Gateway URL, plus the recommended shard count for bots
    ///
    /// User accounts always get one shard and an unlimited session budget.
    pub async fn get_gateway(&self) -> HttpResult<BotGatewayInfo> {
        if self.is_bot() {
            return self
                .request(Route::get("/gateway/bot"), RequestOptions::new())
                .await;
        }

        let info: GatewayInfo = self
            .request(Route::get("/gateway"), RequestOptions::new())
            .await?;
        Ok(BotGatewayInfo {
            url: info.url,
            shards: 1,
            session_start_limit: SessionStartLimit {
                total: u32::MAX,
                remaining: u32::MAX,
                reset_after: 0,
                max_concurrency: 1,
            },
        })
    }

    /// Invalidate a user token
    pub async fn logout(&self) -> HttpResult<()> {
        let body = serde_json::json!({ "provider": null, "voip_provider": null });
        self.request_empty(Route::post("/auth/logout"), RequestOptions::json(&body)?)
            .await
    }
}
