//! Bounded store of recently seen messages

use parley_core::{Message, Snowflake};
use std::collections::VecDeque;

/// Oldest messages are evicted once `capacity` is reached; a capacity of 0
/// disables caching
#[derive(Debug)]
pub struct MessageCache {
    capacity: usize,
    messages: VecDeque<Message>,
}

impl MessageCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    // Newer messages are looked up more often
    pub fn get(&self, id: Snowflake) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: Snowflake) -> Option<&mut Message> {
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }

    pub fn remove(&mut self, id: Snowflake) -> Option<Message> {
        let index = self.messages.iter().rposition(|m| m.id == id)?;
        self.messages.remove(index)
    }

    /// Drop every message of a channel
    pub fn remove_channel(&mut self, channel_id: Snowflake) {
        self.messages.retain(|m| m.channel_id != channel_id);
    }

    /// Drop every message of a guild
    pub fn remove_guild(&mut self, guild_id: Snowflake) {
        self.messages.retain(|m| m.guild_id != Some(guild_id));
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(id: u64, channel: u64) -> Message {
        serde_json::from_value(json!({
            "id": id.to_string(),
            "channel_id": channel.to_string(),
            "author": {"id": "1", "username": "a", "discriminator": "0"},
            "content": "hi",
            "timestamp": "2024-01-01T00:00:00+00:00",
        }))
        .unwrap()
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = MessageCache::new(2);
        cache.push(message(1, 10));
        cache.push(message(2, 10));
        cache.push(message(3, 10));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(Snowflake::new(1)).is_none());
        assert!(cache.get(Snowflake::new(3)).is_some());
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut cache = MessageCache::new(0);
        cache.push(message(1, 10));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_channel() {
        let mut cache = MessageCache::new(10);
        cache.push(message(1, 10));
        cache.push(message(2, 11));
        cache.remove_channel(Snowflake::new(10));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.remove(Snowflake::new(2)).map(|m| m.id), Some(Snowflake::new(2)));
    }
}
