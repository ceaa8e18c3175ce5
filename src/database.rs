//! # Redis
//!
//! RAM database holding every redundant structure in the system.
//!
//! ## Requirements
//!
//! - Fast lookups and atomic single-key operations
//! - One hash per restaurant, one list plus one hash per review
//! - Sets for cuisine membership, a sorted set for the rating ranking
//! - A plain bitmap for the duplicate filter bits
//!
//! ## Implementation
//!
//! - Single connection manager per process, cloned into each service
//! - Atomic operations, Redis loads operations into a queue
//! - Multi-structure flows are pipelined, never transactional; the
//!   aggregate path is serialized per restaurant instead
use std::time::Duration;

use redis::{
    Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::error::Result;

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}
