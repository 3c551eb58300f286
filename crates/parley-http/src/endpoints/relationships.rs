use parley_core::{Relationship, RelationshipType, Snowflake};
use validator::Validate;

use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::requests::SendFriendRequest;
use crate::route::Route;

impl Http {
    pub async fn get_relationships(&self) -> HttpResult<Vec<Relationship>> {
        self.request(Route::get("/users/@me/relationships"), RequestOptions::new())
            .await
    }

    /// Send a friend request by username, with a discriminator for unmigrated accounts
    pub async fn send_friend_request(&self, username: &str, discriminator: Option<u16>) -> HttpResult<()> {
        let body = SendFriendRequest {
            username: username.to_string(),
            discriminator,
        };
        body.validate()?;
        self.request_empty(Route::post("/users/@me/relationships"), RequestOptions::json(&body)?)
            .await
    }

    /// Friend (accepting a pending request) or block a user
    ///
    /// Only `Friend` and `Blocked` are accepted.
    pub async fn add_relationship(&self, user_id: Snowflake, kind: RelationshipType) -> HttpResult<()> {
        let body = match kind {
            RelationshipType::Friend => serde_json::json!({}),
            RelationshipType::Blocked => serde_json::json!({ "type": u8::from(kind) }),
            other => {
                return Err(parley_core::ModelError::Validation(format!(
                    "Cannot set relationship type {other:?}"
                ))
                .into())
            }
        };
        self.request_empty(
            Route::put("/users/@me/relationships/{user_id}").with("user_id", user_id),
            RequestOptions::json(&body)?,
        )
        .await
    }

    /// Unfriend, unblock, or decline a request
    pub async fn remove_relationship(&self, user_id: Snowflake) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/users/@me/relationships/{user_id}").with("user_id", user_id),
            RequestOptions::new(),
        )
        .await
    }
}
