use parley_core::models::{ExperimentsResponse, PremiumGuildSubscription};
use parley_core::{Snowflake, Subscription};

use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::route::Route;

impl Http {
    /// Experiment fingerprint and assignments
    pub async fn get_experiments(&self) -> HttpResult<ExperimentsResponse> {
        self.request(
            Route::get("/experiments"),
            RequestOptions::new().query("with_guild_experiments", true),
        )
        .await
    }

    pub async fn get_subscriptions(&self) -> HttpResult<Vec<Subscription>> {
        self.request(Route::get("/users/@me/billing/subscriptions"), RequestOptions::new())
            .await
    }

    /// Cancel at the end of the current period
    pub async fn cancel_subscription(&self, subscription_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/users/@me/billing/subscriptions/{subscription_id}")
                .with("subscription_id", subscription_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    /// Boosts applied to a guild
    pub async fn get_guild_premium_subscriptions(
        &self,
        guild_id: Snowflake,
    ) -> HttpResult<Vec<PremiumGuildSubscription>> {
        self.request(
            Route::get("/guilds/{guild_id}/premium/subscriptions").with("guild_id", guild_id),
            RequestOptions::new(),
        )
        .await
    }
}
