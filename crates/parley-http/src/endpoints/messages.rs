use parley_core::{Message, Snowflake};
use tracing::debug;
use validator::Validate;

use super::MESSAGES_PAGE_SIZE;
use crate::client::{Http, RequestOptions};
use crate::error::HttpResult;
use crate::requests::{check_content, BulkDeleteMessages, CreateMessage, EditMessage, HistoryAnchor};
use crate::route::Route;

impl Http {
    pub async fn send_message(&self, channel_id: Snowflake, message: &CreateMessage) -> HttpResult<Message> {
        message.validate()?;
        check_content(&message.content)?;
        if message.is_empty() {
            return Err(parley_core::ModelError::Validation(
                "Cannot send an empty message".to_string(),
            )
            .into());
        }
        self.request(
            Route::post("/channels/{channel_id}/messages").with("channel_id", channel_id),
            RequestOptions::json(message)?,
        )
        .await
    }

    pub async fn get_message(&self, channel_id: Snowflake, message_id: Snowflake) -> HttpResult<Message> {
        self.request(
            Route::get("/channels/{channel_id}/messages/{message_id}")
                .with("channel_id", channel_id)
                .with("message_id", message_id),
            RequestOptions::new(),
        )
        .await
    }

    /// Message history, newest first
    ///
    /// Fetches pages of at most 100 until `limit` messages are collected or the
    /// channel runs out. `Around` is a single page.
    pub async fn logs_from(
        &self,
        channel_id: Snowflake,
        limit: usize,
        anchor: HistoryAnchor,
    ) -> HttpResult<Vec<Message>> {
        let mut messages: Vec<Message> = Vec::with_capacity(limit.min(MESSAGES_PAGE_SIZE));
        let mut anchor = anchor;

        while messages.len() < limit {
            let wanted = (limit - messages.len()).min(MESSAGES_PAGE_SIZE);
            let mut options = RequestOptions::new().query("limit", wanted);
            if let Some((key, value)) = anchor.query() {
                options = options.query(key, value);
            }

            let page: Vec<Message> = self
                .request(
                    Route::get("/channels/{channel_id}/messages").with("channel_id", channel_id),
                    options,
                )
                .await?;
            let count = page.len();
            debug!(channel_id = %channel_id, count, "fetched history page");

            anchor = match anchor {
                HistoryAnchor::Around(_) => {
                    messages.extend(page);
                    break;
                }
                HistoryAnchor::After(_) => match page.iter().map(|m| m.id).max() {
                    Some(newest) => HistoryAnchor::After(newest),
                    None => break,
                },
                HistoryAnchor::Latest | HistoryAnchor::Before(_) => {
                    match page.iter().map(|m| m.id).min() {
                        Some(oldest) => HistoryAnchor::Before(oldest),
                        None => break,
                    }
                }
            };
            messages.extend(page);

            if count < wanted {
                break;
            }
        }

        messages.sort_by(|a, b| b.id.cmp(&a.id));
        messages.truncate(limit);
        Ok(messages)
    }

    pub async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        edit: &EditMessage,
    ) -> HttpResult<Message> {
        edit.validate()?;
        if let Some(content) = &edit.content {
            check_content(content)?;
        }
        self.request(
            Route::patch("/channels/{channel_id}/messages/{message_id}")
                .with("channel_id", channel_id)
                .with("message_id", message_id),
            RequestOptions::json(edit)?,
        )
        .await
    }

    pub async fn delete_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        reason: Option<&str>,
    ) -> HttpResult<()> {
        self.request_empty(
            Route::delete("/channels/{channel_id}/messages/{message_id}")
                .with("channel_id", channel_id)
                .with("message_id", message_id),
            RequestOptions::new().reason(reason),
        )
        .await
    }

    /// Bulk delete 2 to 100 messages
    ///
    /// A single id falls back to a plain delete.
    pub async fn delete_messages(
        &self,
        channel_id: Snowflake,
        message_ids: &[Snowflake],
        reason: Option<&str>,
    ) -> HttpResult<()> {
        if let [single] = message_ids {
            return self.delete_message(channel_id, *single, reason).await;
        }
        let body = BulkDeleteMessages {
            messages: message_ids.to_vec(),
        };
        body.validate()?;
        self.request_empty(
            Route::post("/channels/{channel_id}/messages/bulk-delete").with("channel_id", channel_id),
            RequestOptions::json(&body)?.reason(reason),
        )
        .await
    }
}
