//! Bidirectional cuisine membership: a global cuisine set, one set of
//! restaurant ids per cuisine, and one set of cuisines per restaurant. The
//! three inserts for a single cuisine travel in one pipeline; separate
//! cuisines are independent writes, so a failure can leave a restaurant
//! attached to a prefix of its declared cuisines.

use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::warn;

use crate::{error::Result, keys, utils::sanitize};

pub struct CuisineIndex {
    conn: ConnectionManager,
}

impl CuisineIndex {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Attach a restaurant to every cuisine in the input. Returns the
    /// sanitized cuisine names that were actually indexed.
    pub async fn add_restaurant(&self, id: &str, cuisines: &[String]) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut indexed = Vec::with_capacity(cuisines.len());

        for cuisine in cuisines {
            let cuisine = sanitize(cuisine);

            if cuisine.is_empty() {
                warn!("dropping cuisine that sanitized to nothing");
                continue;
            }

            let mut pipe = redis::pipe();
            pipe.sadd(keys::cuisines(), &cuisine).ignore();
            pipe.sadd(keys::cuisine(&cuisine), id).ignore();
            pipe.sadd(keys::restaurant_cuisines(id), &cuisine).ignore();

            let _: () = pipe.query_async(&mut conn).await?;
            indexed.push(cuisine);
        }

        Ok(indexed)
    }

    pub async fn all(&self) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(keys::cuisines()).await?)
    }

    /// Restaurant ids known to serve the cuisine.
    pub async fn by_cuisine(&self, name: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.smembers(keys::cuisine(&sanitize(name))).await?)
    }
}
