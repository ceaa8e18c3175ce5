//! Canonical restaurant records: one hash per restaurant plus an optional
//! free-form details document under its own key.

use redis::{AsyncCommands, aio::ConnectionManager};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    keys,
    models::RestaurantView,
};

pub struct RestaurantStore {
    conn: ConnectionManager,
}

impl RestaurantStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn create(&self, id: &str, name: &str, location: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        let fields = [
            ("id", id.to_string()),
            ("name", name.to_string()),
            ("location", location.to_string()),
        ];
        let _: () = conn.hset_multiple(keys::restaurant(id), &fields).await?;

        Ok(())
    }

    pub async fn exists(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.exists(keys::restaurant(id)).await?)
    }

    pub async fn name(&self, id: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(keys::restaurant(id), "name").await?)
    }

    /// Read the public fields and the cuisine set, bumping the view counter
    /// by one. The increment is atomic per restaurant; the field reads run
    /// concurrently with it and are not atomic with the new counter value.
    pub async fn get(&self, id: &str) -> Result<RestaurantView> {
        let key = keys::restaurant(id);

        let mut counter_conn = self.conn.clone();
        let mut fields_conn = self.conn.clone();
        let mut cuisines_conn = self.conn.clone();

        let (view_count, name, cuisines): (i64, Option<String>, Vec<String>) = tokio::try_join!(
            counter_conn.hincr(&key, "viewCount", 1),
            fields_conn.hget(&key, "name"),
            cuisines_conn.smembers(keys::restaurant_cuisines(id)),
        )?;

        let name = name.ok_or_else(|| Error::NotFound(format!("restaurant {id}")))?;

        Ok(RestaurantView {
            id: id.to_string(),
            name,
            view_count,
            cuisines,
        })
    }

    pub async fn set_details(&self, id: &str, details: &Value) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(keys::restaurant_details(id), details.to_string())
            .await?;
        Ok(())
    }

    pub async fn details(&self, id: &str) -> Result<Option<Value>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(keys::restaurant_details(id)).await?;

        match raw {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::Consistency(format!("corrupt details document for {id}: {e}"))),
        }
    }
}
