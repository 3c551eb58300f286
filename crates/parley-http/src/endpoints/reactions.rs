use parley_core::{PartialEmoji, Snowflake, User};

use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::route::Route;

fn reaction_route(
    route: Route,
    channel_id: Snowflake,
    message_id: Snowflake,
    emoji: &PartialEmoji,
) -> Route {
    route
        .with("channel_id", channel_id)
        .with("message_id", message_id)
        .with("emoji", emoji.url_encoded())
}

impl Http {
    pub async fn add_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &PartialEmoji,
    ) -> HttpResult<()> {
        self.request_empty(
            reaction_route(
                Route::put("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
                channel_id,
                message_id,
                emoji,
            ),
            RequestOptions::new().query("location", "Message"),
        )
        .await
    }

    pub async fn remove_own_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &PartialEmoji,
    ) -> HttpResult<()> {
        self.request_empty(
            reaction_route(
                Route::delete("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/@me"),
                channel_id,
                message_id,
                emoji,
            ),
            RequestOptions::new(),
        )
        .await
    }

    /// Remove another user's reaction; needs `MANAGE_MESSAGES`
    pub async fn remove_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &PartialEmoji,
        user_id: Snowflake,
    ) -> HttpResult<()> {
        self.request_empty(
            reaction_route(
                Route::delete("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}/{user_id}"),
                channel_id,
                message_id,
                emoji,
            )
            .with("user_id", user_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn get_reaction_users(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &PartialEmoji,
        limit: u8,
        after: Option<Snowflake>,
    ) -> HttpResult<Vec<User>> {
        let mut options = RequestOptions::new().query("limit", limit.clamp(1, 100));
        if let Some(after) = after {
            options = options.query("after", after);
        }
        self.request(
            reaction_route(
                Route::get("/channels/{channel_id}/messages/{message_id}/reactions/{emoji}"),
                channel_id,
                message_id,
                emoji,
            ),
            options,
        )
        .await
    }

    pub async fn clear_reactions(&self, channel_id: Snowflake, message_id: Snowflake) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/channels/{channel_id}/messages/{message_id}/reactions")
                .with("channel_id", channel_id)
                .with("message_id", message_id),
            RequestOptions::new(),
        )
        .await
    }
}
