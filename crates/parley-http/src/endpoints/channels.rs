use parley_core::{Channel, Message, Snowflake};
use validator::Validate;

use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::requests::{CreateDm, EditChannel};
use crate::route::Route;

impl Http {
    pub async fn get_channel(&self, channel_id: Snowflake) -> HttpResult<Channel> {
        self.request(
            Route::get("/channels/{channel_id}").with("channel_id", channel_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn edit_channel(
        &self,
        channel_id: Snowflake,
        request: &EditChannel,
        reason: Option<&str>,
    ) -> HttpResult<Channel> {
        request.validate()?;
        self.request(
            Route::patch("/channels/{channel_id}").with("channel_id", channel_id),
            RequestOptions::json(request)?.reason(reason),
        )
        .await
    }

    /// Delete a guild channel, or close a DM
    pub async fn delete_channel(&self, channel_id: Snowflake, reason: Option<&str>) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/channels/{channel_id}").with("channel_id", channel_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    /// Open (or fetch the existing) DM with one user, or a group DM with several
    pub async fn create_dm(&self, recipients: &[Snowflake]) -> HttpResult<Channel> {
        if recipients.is_empty() {
            return Err(parley_core::ModelError::Validation(
                "A DM needs at least one recipient".to_string(),
            )
            .into());
        }
        let body = CreateDm {
            recipients: recipients.to_vec(),
        };
        self.request(Route::post("/users/@me/channels"), RequestOptions::json(&body)?)
            .await
    }

    pub async fn trigger_typing(&self, channel_id: Snowflake) -> HttpResult<()> {
        self.request_empty(
            Route::post("/channels/{channel_id}/typing").with("channel_id", channel_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn get_pins(&self, channel_id: Snowflake) -> HttpResult<Vec<Message>> {
        self.request(
            Route::get("/channels/{channel_id}/pins").with("channel_id", channel_id),
            RequestOptions::new(),
        )
        .await
    }

    pub async fn pin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> HttpResult<()> {
        self.request_empty(
            Route::put("/channels/{channel_id}/pins/{message_id}")
                .with("channel_id", channel_id)
                .with("message_id", message_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    pub async fn unpin_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/channels/{channel_id}/pins/{message_id}")
                .with("channel_id", channel_id)
                .with("message_id", message_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }
}
