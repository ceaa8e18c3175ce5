//! # Review Ledger
//!
//! Per restaurant: a list of review ids with the newest at the head, plus
//! one detail hash per review. The list gives ordering and pagination; the
//! hashes carry the payload.

use std::collections::HashMap;

use futures::future::try_join_all;
use redis::{AsyncCommands, aio::ConnectionManager};
use tracing::warn;

use crate::{
    error::{Error, Result},
    keys,
    models::Review,
    utils::page_window,
};

pub struct ReviewLedger {
    conn: ConnectionManager,
}

impl ReviewLedger {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    /// Insert the review at the head of the ledger and write its detail
    /// hash. Returns the new ledger length.
    pub async fn append(&self, review: &Review) -> Result<u64> {
        let mut conn = self.conn.clone();

        let mut fields = vec![
            ("id", review.id.clone()),
            ("restaurantId", review.restaurant_id.clone()),
            ("rating", review.rating.to_string()),
            ("timestamp", review.timestamp.to_string()),
        ];
        if let Some(text) = &review.text {
            fields.push(("text", text.clone()));
        }

        let mut pipe = redis::pipe();
        pipe.lpush(keys::review_ledger(&review.restaurant_id), &review.id);
        pipe.hset_multiple(keys::review_details(&review.id), &fields)
            .ignore();

        let (length,): (u64,) = pipe.query_async(&mut conn).await?;
        Ok(length)
    }

    /// The ledger window `[(page-1)*limit, (page-1)*limit + limit - 1]`,
    /// most recent first. Windows past the end come back empty. Ids whose
    /// detail hash is gone are skipped; a partial write elsewhere must not
    /// fail the read.
    pub async fn page(&self, restaurant_id: &str, page: u32, limit: u32) -> Result<Vec<Review>> {
        let mut conn = self.conn.clone();

        let (start, stop) = page_window(page, limit);
        let ids: Vec<String> = conn
            .lrange(keys::review_ledger(restaurant_id), start, stop)
            .await?;

        let fetches = ids.iter().map(|id| {
            let mut conn = self.conn.clone();
            let key = keys::review_details(id);
            async move { conn.hgetall::<_, HashMap<String, String>>(key).await }
        });
        let hashes = try_join_all(fetches).await?;

        let mut reviews = Vec::with_capacity(ids.len());
        for (id, hash) in ids.iter().zip(hashes) {
            match parse_review(&hash) {
                Some(review) => reviews.push(review),
                None => warn!("review {id} in ledger of {restaurant_id} has no detail record"),
            }
        }

        Ok(reviews)
    }

    /// Remove every ledger occurrence of the review and delete its detail
    /// hash. Returns the removed review's rating when the detail record was
    /// still readable. NotFound only when neither structure knew the id.
    pub async fn remove(&self, restaurant_id: &str, review_id: &str) -> Result<Option<u8>> {
        let mut conn = self.conn.clone();
        let details_key = keys::review_details(review_id);

        let rating: Option<u8> = conn.hget(&details_key, "rating").await?;

        let mut pipe = redis::pipe();
        pipe.lrem(keys::review_ledger(restaurant_id), 0, review_id);
        pipe.del(&details_key);

        let (removed, deleted): (i64, i64) = pipe.query_async(&mut conn).await?;

        if removed == 0 && deleted == 0 {
            return Err(Error::NotFound(format!("review {review_id}")));
        }

        Ok(rating)
    }

    pub async fn len(&self, restaurant_id: &str) -> Result<u64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(keys::review_ledger(restaurant_id)).await?)
    }

    /// Every review id in the ledger, newest first.
    pub async fn all_ids(&self, restaurant_id: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.lrange(keys::review_ledger(restaurant_id), 0, -1).await?)
    }
}

fn parse_review(hash: &HashMap<String, String>) -> Option<Review> {
    Some(Review {
        id: hash.get("id")?.clone(),
        restaurant_id: hash.get("restaurantId")?.clone(),
        rating: hash.get("rating")?.parse().ok()?,
        text: hash.get("text").cloned(),
        timestamp: hash.get("timestamp")?.parse().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_review() {
        let review = parse_review(&hash(&[
            ("id", "r1"),
            ("restaurantId", "abc12"),
            ("rating", "4"),
            ("timestamp", "1700000000000"),
        ]))
        .unwrap();

        assert_eq!(review.rating, 4);
        assert_eq!(review.text, None);
    }

    #[test]
    fn test_parse_review_with_text() {
        let review = parse_review(&hash(&[
            ("id", "r1"),
            ("restaurantId", "abc12"),
            ("rating", "5"),
            ("text", "great pasta"),
            ("timestamp", "1700000000000"),
        ]))
        .unwrap();

        assert_eq!(review.text.as_deref(), Some("great pasta"));
    }

    #[test]
    fn test_parse_review_rejects_partial_hash() {
        assert!(parse_review(&hash(&[])).is_none());
        assert!(parse_review(&hash(&[("id", "r1"), ("rating", "bad")])).is_none());
    }
}
