//! # Redis
//!
//! Key-value store behind click counters, comments and redeem activations.
//!
//! ## Keys
//!
//! - `clicks`: list, one JSON click event per entry
//! - `prompt_stats`: hash, prompt id -> click count
//! - `comments:{prompt id}`: list, one JSON comment per entry
//! - `redeem:{client id}`: activation flag
//!
//! ## Implementation
//!
//! - Click event push and counter increment run in one `MULTI` so the count never drifts from the log
//! - `HINCRBY` assumes 0 for a missing field, no need to seed new prompts
//! - Comments are sorted newest first on read, writes are plain appends
//!
//! Without `REDIS_URL` the server falls back to [`MemoryStore`], which forgets everything on restart.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use deck::{ClickEvent, Comment, PromptStats};
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;
use tokio::sync::Mutex;

const CLICKS_KEY: &str = "clicks";
const STATS_KEY: &str = "prompt_stats";
const ACTIVATED: &str = "true";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] RedisError),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait PromptStore: Send + Sync {
    /// Appends the event and bumps the prompt's counter, returning the new total.
    async fn record_click(&self, event: &ClickEvent) -> Result<PromptStats, StoreError>;

    async fn stats(&self, prompt_id: &str) -> Result<Option<PromptStats>, StoreError>;

    async fn add_comment(&self, comment: &Comment) -> Result<(), StoreError>;

    /// Newest first.
    async fn comments(&self, prompt_id: &str) -> Result<Vec<Comment>, StoreError>;

    async fn is_redeemed(&self, client_id: &str) -> Result<bool, StoreError>;

    async fn set_redeemed(&self, client_id: &str) -> Result<(), StoreError>;
}

fn comments_key(prompt_id: &str) -> String {
    format!("comments:{prompt_id}")
}

fn redeem_key(client_id: &str) -> String {
    format!("redeem:{client_id}")
}

/// Stored order is append order, so equal timestamps keep the later write first.
fn newest_first(comments: &mut [Comment]) {
    comments.reverse();
    comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new().set_number_of_retries(1);

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl PromptStore for RedisStore {
    async fn record_click(&self, event: &ClickEvent) -> Result<PromptStats, StoreError> {
        let mut connection = self.connection.clone();
        let payload = serde_json::to_string(event)?;

        let (click_count,): (u64,) = redis::pipe()
            .atomic()
            .rpush(CLICKS_KEY, payload)
            .ignore()
            .hincr(STATS_KEY, &event.prompt_id, 1)
            .query_async(&mut connection)
            .await?;

        Ok(PromptStats {
            prompt_id: event.prompt_id.clone(),
            click_count,
        })
    }

    async fn stats(&self, prompt_id: &str) -> Result<Option<PromptStats>, StoreError> {
        let mut connection = self.connection.clone();
        let click_count: Option<u64> = connection.hget(STATS_KEY, prompt_id).await?;

        Ok(click_count.map(|click_count| PromptStats {
            prompt_id: prompt_id.to_string(),
            click_count,
        }))
    }

    async fn add_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let payload = serde_json::to_string(comment)?;

        let _: () = connection
            .rpush(comments_key(&comment.prompt_id), payload)
            .await?;

        Ok(())
    }

    async fn comments(&self, prompt_id: &str) -> Result<Vec<Comment>, StoreError> {
        let mut connection = self.connection.clone();
        let raw: Vec<String> = connection.lrange(comments_key(prompt_id), 0, -1).await?;

        let mut comments = raw
            .iter()
            .map(|entry| serde_json::from_str(entry))
            .collect::<Result<Vec<Comment>, _>>()?;
        newest_first(&mut comments);

        Ok(comments)
    }

    async fn is_redeemed(&self, client_id: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let flag: Option<String> = connection.get(redeem_key(client_id)).await?;

        Ok(flag.as_deref() == Some(ACTIVATED))
    }

    async fn set_redeemed(&self, client_id: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        let _: () = connection.set(redeem_key(client_id), ACTIVATED).await?;

        Ok(())
    }
}

#[derive(Default)]
struct Tables {
    clicks: Vec<ClickEvent>,
    stats: HashMap<String, u64>,
    comments: HashMap<String, Vec<Comment>>,
    redeemed: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[cfg(test)]
    async fn click_log_len(&self) -> usize {
        self.tables.lock().await.clicks.len()
    }
}

#[async_trait]
impl PromptStore for MemoryStore {
    async fn record_click(&self, event: &ClickEvent) -> Result<PromptStats, StoreError> {
        let mut tables = self.tables.lock().await;
        tables.clicks.push(event.clone());

        let click_count = tables.stats.entry(event.prompt_id.clone()).or_insert(0);
        *click_count += 1;

        Ok(PromptStats {
            prompt_id: event.prompt_id.clone(),
            click_count: *click_count,
        })
    }

    async fn stats(&self, prompt_id: &str) -> Result<Option<PromptStats>, StoreError> {
        let tables = self.tables.lock().await;

        Ok(tables.stats.get(prompt_id).map(|&click_count| PromptStats {
            prompt_id: prompt_id.to_string(),
            click_count,
        }))
    }

    async fn add_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().await;

        tables
            .comments
            .entry(comment.prompt_id.clone())
            .or_default()
            .push(comment.clone());

        Ok(())
    }

    async fn comments(&self, prompt_id: &str) -> Result<Vec<Comment>, StoreError> {
        let tables = self.tables.lock().await;
        let mut comments = tables.comments.get(prompt_id).cloned().unwrap_or_default();
        newest_first(&mut comments);

        Ok(comments)
    }

    async fn is_redeemed(&self, client_id: &str) -> Result<bool, StoreError> {
        Ok(self.tables.lock().await.redeemed.contains(client_id))
    }

    async fn set_redeemed(&self, client_id: &str) -> Result<(), StoreError> {
        self.tables
            .lock()
            .await
            .redeemed
            .insert(client_id.to_string());

        Ok(())
    }
}
