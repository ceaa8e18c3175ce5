//! # Meilisearch
//!
//! External search collaborator. The core feeds it one document per
//! restaurant and proxies substring queries over `name`; everything else
//! about ranking text relevance is the engine's business.
//!
//! ## Schema
//! - One index for all restaurants
//! - Fields: id (**string**), name (**string**), avgStars (**float**)
//! - `name` searchable, `avgStars` sortable
//!
//! Documents are upserted on create and whenever a restaurant's average
//! changes, so search results trail the store by at most one write. The
//! rebuild operation rescans the canonical keyspace and reindexes from
//! scratch, tolerating a missing prior index.

use std::{collections::HashMap, sync::Arc};

use meilisearch_sdk::{client::Client, settings::Settings};
use redis::{AsyncCommands, aio::ConnectionManager};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{error::Result, keys};

pub const RESTAURANT_INDEX: &str = "restaurants";
pub const DOC_ID: &str = "id";
pub const DOC_NAME: &str = "name";
pub const DOC_AVG_STARS: &str = "avgStars";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantDoc {
    pub id: String,
    pub name: String,
    pub avg_stars: f64,
}

pub async fn init_meilisearch(meili_url: &str, meili_admin_key: &str) -> Result<Arc<Client>> {
    let meili_client = Arc::new(Client::new(meili_url, Some(meili_admin_key))?);

    meili_client
        .index(RESTAURANT_INDEX)
        .set_settings(&index_settings())
        .await?;

    Ok(meili_client)
}

fn index_settings() -> Settings {
    Settings::new()
        .with_ranking_rules([
            "words",
            "typo",
            "proximity",
            "exactness",
            "attribute",
            "sort",
        ])
        .with_searchable_attributes([DOC_NAME])
        .with_sortable_attributes([DOC_AVG_STARS])
}

pub struct SearchIndex {
    client: Arc<Client>,
    conn: ConnectionManager,
}

impl SearchIndex {
    pub fn new(client: Arc<Client>, conn: ConnectionManager) -> Self {
        Self { client, conn }
    }

    /// Enqueue an add-or-update for one restaurant document. Indexing is
    /// asynchronous on the engine side.
    pub async fn upsert(&self, doc: &RestaurantDoc) -> Result<()> {
        self.client
            .index(RESTAURANT_INDEX)
            .add_or_update(&[doc.clone()], Some(DOC_ID))
            .await?;

        Ok(())
    }

    pub async fn query(&self, q: &str, limit: usize) -> Result<Vec<RestaurantDoc>> {
        let results = self
            .client
            .index(RESTAURANT_INDEX)
            .search()
            .with_query(q)
            .with_limit(limit)
            .execute::<RestaurantDoc>()
            .await?;

        Ok(results.hits.into_iter().map(|hit| hit.result).collect())
    }

    /// Maintenance: drop and rebuild the whole index from the canonical
    /// restaurant hashes. Returns the number of documents indexed.
    pub async fn rebuild(&self) -> Result<usize> {
        if let Err(e) = self.client.index(RESTAURANT_INDEX).delete().await {
            // First rebuild on a fresh engine has nothing to drop.
            warn!("dropping search index failed: {e}");
        }

        let index = self.client.index(RESTAURANT_INDEX);
        index.set_settings(&index_settings()).await?;

        let docs = self.collect_documents().await?;

        if !docs.is_empty() {
            let task = index.add_or_update(&docs, Some(DOC_ID)).await?;
            task.wait_for_completion(&self.client, None, None).await?;
        }

        info!("search index rebuilt with {} documents", docs.len());
        Ok(docs.len())
    }

    async fn collect_documents(&self) -> Result<Vec<RestaurantDoc>> {
        let mut conn = self.conn.clone();

        let mut restaurant_keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(keys::restaurant_pattern())
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            restaurant_keys.extend(batch);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }

        let mut docs = Vec::with_capacity(restaurant_keys.len());
        for key in restaurant_keys {
            let fields: HashMap<String, String> = conn.hgetall(&key).await?;

            let (Some(id), Some(name)) = (fields.get("id"), fields.get("name")) else {
                warn!("skipping malformed restaurant hash at {key}");
                continue;
            };

            docs.push(RestaurantDoc {
                id: id.clone(),
                name: name.clone(),
                avg_stars: fields
                    .get("averageRating")
                    .and_then(|raw| raw.parse().ok())
                    .unwrap_or(0.0),
            });
        }

        Ok(docs)
    }
}
