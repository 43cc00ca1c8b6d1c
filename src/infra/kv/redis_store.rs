use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;

use crate::application::repos::{KvError, KvStore};

const SCAN_BATCH: usize = 200;

/// Shared store for multi-instance deployments.
#[derive(Clone)]
pub struct RedisKv {
    pool: Pool,
}

impl RedisKv {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Connection, KvError> {
        self.pool.get().await.map_err(KvError::backend)
    }

    pub async fn ping(&self) -> Result<(), KvError> {
        let mut conn = self.conn().await?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(KvError::backend)?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for RedisKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let mut conn = self.conn().await?;
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(KvError::backend)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), KvError> {
        let mut conn = self.conn().await?;
        let result = match ttl {
            // SETEX rejects a zero expiry.
            Some(ttl) => {
                let seconds = ttl.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds).await
            }
            None => conn.set::<_, _, ()>(key, value).await,
        };
        result.map_err(KvError::backend)
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await.map_err(KvError::backend)
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let mut conn = self.conn().await?;
        let pattern = format!("{}*", escape_glob(prefix));
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(KvError::backend)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// Escape glob metacharacters so `prefix` matches literally in `SCAN MATCH`.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for ch in prefix.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::escape_glob;

    #[test]
    fn glob_metacharacters_are_escaped() {
        assert_eq!(escape_glob("nuxtpress:blog_draft:"), "nuxtpress:blog_draft:");
        assert_eq!(escape_glob("a*b?[c]"), "a\\*b\\?\\[c\\]");
    }
}
