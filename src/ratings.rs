//! # Rating Aggregator
//!
//! Running sum and count behind each restaurant's `averageRating`.
//!
//! The sum lives in the canonical hash (`totalStars`), the count is the
//! ledger length at aggregation time. The read-modify-write of the sum is
//! not atomic in the store, so every aggregate mutation for a restaurant
//! runs under that restaurant's keyed lock; different restaurants never
//! contend. Nothing beyond the one aggregate is held across a suspension.
//!
//! When the stored sum is missing or unreadable, or a ledger entry has
//! lost its detail record, the aggregate is rebuilt from the review detail
//! records instead of failing the request. That recomputation is the only
//! place history is rescanned.

use std::sync::Arc;

use dashmap::DashMap;
use redis::{AsyncCommands, aio::ConnectionManager};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::{
    error::Result, keys, rankings::Rankings, reviews::ReviewLedger, utils::round1,
};

pub struct RatingAggregator {
    conn: ConnectionManager,
    ledger: ReviewLedger,
    rankings: Rankings,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl RatingAggregator {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            ledger: ReviewLedger::new(conn.clone()),
            rankings: Rankings::new(conn.clone()),
            conn,
            locks: DashMap::new(),
        }
    }

    /// Serialize aggregate mutations for one restaurant. The guard must be
    /// held across the ledger write and the aggregate update that follows.
    pub async fn guard(&self, restaurant_id: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(restaurant_id.to_string())
            .or_default()
            .clone();

        lock.lock_owned().await
    }

    /// Fold a freshly appended rating into the aggregate. `review_count` is
    /// the ledger length after the append. Returns the new average.
    pub async fn on_added(
        &self,
        restaurant_id: &str,
        rating: u8,
        review_count: u64,
    ) -> Result<f64> {
        let mut conn = self.conn.clone();
        let key = keys::restaurant(restaurant_id);

        let stored: Option<f64> = conn.hget(&key, "totalStars").await?;

        let total = match stored {
            Some(total) => total + rating as f64,
            // First review ever writes the field; anything else missing it
            // is drift, so rebuild from the detail records.
            None if review_count <= 1 => rating as f64,
            None => {
                warn!("totalStars missing for {restaurant_id}, recomputing");
                return self.recompute(restaurant_id).await;
            }
        };

        self.write_aggregate(restaurant_id, total, review_count).await
    }

    /// Back a deleted rating out of the aggregate. An emptied ledger resets
    /// the totals to zero.
    pub async fn on_removed(&self, restaurant_id: &str, rating: u8) -> Result<f64> {
        let mut conn = self.conn.clone();
        let key = keys::restaurant(restaurant_id);

        let review_count = self.ledger.len(restaurant_id).await?;

        if review_count == 0 {
            return self.write_aggregate(restaurant_id, 0.0, 0).await;
        }

        let stored: Option<f64> = conn.hget(&key, "totalStars").await?;

        match stored {
            Some(total) => {
                self.write_aggregate(restaurant_id, total - rating as f64, review_count)
                    .await
            }
            None => {
                warn!("totalStars missing for {restaurant_id}, recomputing");
                self.recompute(restaurant_id).await
            }
        }
    }

    /// Rebuild sum and count from the review detail records and write the
    /// result back. Ledger ids without a detail record are dropped from the
    /// count rather than treated as zero-star reviews.
    pub async fn recompute(&self, restaurant_id: &str) -> Result<f64> {
        let mut conn = self.conn.clone();

        let ids = self.ledger.all_ids(restaurant_id).await?;

        if ids.is_empty() {
            return self.write_aggregate(restaurant_id, 0.0, 0).await;
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hget(keys::review_details(id), "rating");
        }
        let ratings: Vec<Option<f64>> = pipe.query_async(&mut conn).await?;

        let mut total = 0.0;
        let mut count = 0u64;
        for (id, rating) in ids.iter().zip(&ratings) {
            match rating {
                Some(rating) => {
                    total += rating;
                    count += 1;
                }
                None => warn!("review {id} of {restaurant_id} has no rating, dropped"),
            }
        }

        info!("recomputed aggregate for {restaurant_id}: {count} reviews");
        self.write_aggregate(restaurant_id, total, count).await
    }

    async fn write_aggregate(
        &self,
        restaurant_id: &str,
        total: f64,
        review_count: u64,
    ) -> Result<f64> {
        let average = if review_count == 0 {
            0.0
        } else {
            round1(total / review_count as f64)
        };

        let mut conn = self.conn.clone();
        let mut pipe = redis::pipe();
        pipe.hset(keys::restaurant(restaurant_id), "totalStars", total)
            .ignore();
        pipe.hset(keys::restaurant(restaurant_id), "averageRating", average)
            .ignore();
        let _: () = pipe.query_async(&mut conn).await?;

        self.rankings.upsert(restaurant_id, average).await?;

        Ok(average)
    }
}
