//! Restaurant discovery and review core.
//!
//! Restaurants, cuisines, reviews and derived ratings over Redis, with
//! Meilisearch as the search collaborator and a weather provider behind a
//! TTL cache. Instead of one relational table the system keeps several
//! redundant, purpose-built structures and pays for it in consistency
//! work.
//!
//! # Redis + Meilisearch
//!
//! Redis gives atomic single-key operations and O(1) lookups for the hot
//! path: the canonical restaurant hash, per-restaurant review lists and
//! detail hashes, cuisine sets, the rating sorted set, the weather cache
//! and the duplicate-filter bitmap. Meilisearch is fundamentally a search
//! engine, not a database, so it only ever sees derived restaurant
//! documents and answers name queries; it is synced on every write that
//! changes a document and can be rebuilt from the canonical keyspace.
//!
//! Multi-structure flows are pipelined, never transactional. The one
//! mandatory mutual-exclusion domain is a restaurant's rating aggregate,
//! serialized by a keyed in-process lock; everything else is eventually
//! consistent and reconciled by recomputation when drift is detected.
//!
//! # Operations
//!
//! [`App`] is the entry point: construct it from a [`State`] built out of
//! [`Config`], then call the operation methods. HTTP surfaces, response
//! envelopes and process bootstrapping live with the embedder.

pub mod app;
pub mod bloom;
pub mod config;
pub mod cuisines;
pub mod database;
pub mod error;
pub mod ids;
pub mod keys;
pub mod models;
pub mod rankings;
pub mod ratings;
pub mod restaurants;
pub mod reviews;
pub mod search;
pub mod state;
pub mod utils;
pub mod weather;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};
pub use models::{
    NewRestaurant, NewReview, RankedRestaurant, Restaurant, RestaurantView, Review,
};
pub use state::State;
