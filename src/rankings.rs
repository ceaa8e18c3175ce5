//! Descending-score ranking over all restaurants, one sorted-set entry per
//! restaurant mirroring its average rating. The mirror is eventually
//! consistent with the canonical hash, never atomic with it.

use std::cmp::Ordering;

use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{error::Result, keys, utils::page_window};

pub struct Rankings {
    conn: ConnectionManager,
}

impl Rankings {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn upsert(&self, restaurant_id: &str, score: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.zadd(keys::ratings(), restaurant_id, score).await?;
        Ok(())
    }

    /// Restaurant ids with scores for the requested rank window, best
    /// first. The store returns ties in reverse lexical order, so the
    /// window is re-sorted to break ties by ascending id.
    pub async fn top_range(&self, page: u32, limit: u32) -> Result<Vec<(String, f64)>> {
        let mut conn = self.conn.clone();

        let (start, stop) = page_window(page, limit);
        let mut entries: Vec<(String, f64)> =
            conn.zrevrange_withscores(keys::ratings(), start, stop).await?;

        order_ranked(&mut entries);
        Ok(entries)
    }
}

fn order_ranked(entries: &mut [(String, f64)]) {
    entries.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        unequal => unequal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, score: f64) -> (String, f64) {
        (id.to_string(), score)
    }

    #[test]
    fn test_descending_by_score() {
        let mut entries = vec![entry("a", 3.0), entry("b", 4.5), entry("c", 4.0)];
        order_ranked(&mut entries);

        let ids: Vec<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn test_ties_break_by_ascending_id() {
        let mut entries = vec![entry("zz", 4.0), entry("aa", 4.0), entry("mm", 4.0)];
        order_ranked(&mut entries);

        let ids: Vec<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["aa", "mm", "zz"]);
    }
}
