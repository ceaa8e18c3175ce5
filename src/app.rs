//! The operations surface. One service object owning every component,
//! wiring the multi-structure flows: create gates on the duplicate filter
//! and fans out to the canonical hash, cuisine sets, ranking seed and
//! search document; review mutations run under the restaurant's aggregate
//! lock and then refresh the ranking mirror and search document.

use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::info;

use crate::{
    bloom::{BloomParams, DuplicateDetector},
    cuisines::CuisineIndex,
    error::{Error, Result},
    ids, keys,
    models::{NewRestaurant, NewReview, RankedRestaurant, Restaurant, RestaurantView, Review},
    rankings::Rankings,
    ratings::RatingAggregator,
    restaurants::RestaurantStore,
    reviews::ReviewLedger,
    search::{RestaurantDoc, SearchIndex},
    state::State,
    weather::{WeatherCache, WeatherProvider},
};

pub struct App {
    conn: redis::aio::ConnectionManager,
    detector: DuplicateDetector,
    store: RestaurantStore,
    cuisines: CuisineIndex,
    reviews: ReviewLedger,
    ratings: RatingAggregator,
    rankings: Rankings,
    weather: WeatherCache,
    search: SearchIndex,
}

impl App {
    pub async fn new() -> Result<Self> {
        Ok(Self::from_state(&State::new().await?))
    }

    pub fn from_state(state: &Arc<State>) -> Self {
        let conn = state.redis.clone();

        Self {
            detector: DuplicateDetector::new(
                conn.clone(),
                BloomParams {
                    capacity: state.config.bloom_capacity,
                    error_rate: state.config.bloom_error_rate,
                },
            ),
            store: RestaurantStore::new(conn.clone()),
            cuisines: CuisineIndex::new(conn.clone()),
            reviews: ReviewLedger::new(conn.clone()),
            ratings: RatingAggregator::new(conn.clone()),
            rankings: Rankings::new(conn.clone()),
            weather: WeatherCache::new(conn.clone(), WeatherProvider::from_config(&state.config)),
            search: SearchIndex::new(state.meili.clone(), conn.clone()),
            conn,
        }
    }

    /// Create a restaurant unless its `name:location` identity was seen
    /// before. Seeds the ranking at score zero and indexes the search
    /// document alongside the canonical record.
    pub async fn create_restaurant(&self, new: NewRestaurant) -> Result<Restaurant> {
        new.validate()?;

        let identity = format!("{}:{}", new.name, new.location);
        if self.detector.might_exist(&identity).await? {
            return Err(Error::Conflict(identity));
        }

        let id = ids::allocate(&self.conn, keys::restaurant).await?;

        self.store.create(&id, &new.name, &new.location).await?;

        let doc = RestaurantDoc {
            id: id.clone(),
            name: new.name.clone(),
            avg_stars: 0.0,
        };
        let (cuisines, _, _, _) = tokio::try_join!(
            self.cuisines.add_restaurant(&id, &new.cuisines),
            self.rankings.upsert(&id, 0.0),
            self.detector.record(&identity),
            self.search.upsert(&doc),
        )?;

        info!("created restaurant {id}");

        Ok(Restaurant {
            id,
            name: new.name,
            location: new.location,
            cuisines,
        })
    }

    /// Public fields plus cuisines, counting the view.
    pub async fn get_restaurant(&self, restaurant_id: &str) -> Result<RestaurantView> {
        self.ensure_exists(restaurant_id).await?;
        self.store.get(restaurant_id).await
    }

    pub async fn add_review(&self, restaurant_id: &str, new: NewReview) -> Result<Review> {
        new.validate()?;
        self.ensure_exists(restaurant_id).await?;

        let review_id = ids::allocate(&self.conn, keys::review_details).await?;
        let review = Review {
            id: review_id,
            restaurant_id: restaurant_id.to_string(),
            rating: new.rating,
            text: new.text,
            timestamp: Utc::now().timestamp_millis(),
        };

        let average = {
            let _guard = self.ratings.guard(restaurant_id).await;
            let review_count = self.reviews.append(&review).await?;
            self.ratings
                .on_added(restaurant_id, review.rating, review_count)
                .await?
        };

        self.refresh_search_doc(restaurant_id, average).await?;

        Ok(review)
    }

    pub async fn reviews(&self, restaurant_id: &str, page: u32, limit: u32) -> Result<Vec<Review>> {
        self.ensure_exists(restaurant_id).await?;
        self.reviews.page(restaurant_id, page, limit).await
    }

    /// Delete a review and fold its rating back out of the aggregate. When
    /// the detail record was already gone the aggregate is rebuilt from the
    /// remaining reviews instead.
    pub async fn delete_review(&self, restaurant_id: &str, review_id: &str) -> Result<()> {
        self.ensure_exists(restaurant_id).await?;

        let average = {
            let _guard = self.ratings.guard(restaurant_id).await;
            let rating = self.reviews.remove(restaurant_id, review_id).await?;

            match rating {
                Some(rating) => self.ratings.on_removed(restaurant_id, rating).await?,
                None => self.ratings.recompute(restaurant_id).await?,
            }
        };

        self.refresh_search_doc(restaurant_id, average).await?;

        info!("deleted review {review_id} of {restaurant_id}");
        Ok(())
    }

    /// Top-rated restaurants for the rank window, best first, ties by
    /// ascending id.
    pub async fn top_rated(&self, page: u32, limit: u32) -> Result<Vec<RankedRestaurant>> {
        let ranked = self.rankings.top_range(page, limit).await?;

        let names = try_join_all(
            ranked
                .iter()
                .map(|(id, _)| self.store.name(id)),
        )
        .await?;

        Ok(ranked
            .into_iter()
            .zip(names)
            .map(|((id, average_rating), name)| RankedRestaurant {
                id,
                name,
                average_rating,
            })
            .collect())
    }

    pub async fn cuisines(&self) -> Result<Vec<String>> {
        self.cuisines.all().await
    }

    /// Display names of the restaurants serving a cuisine. Ids whose
    /// canonical hash is gone are dropped.
    pub async fn restaurants_by_cuisine(&self, cuisine: &str) -> Result<Vec<String>> {
        let ids = self.cuisines.by_cuisine(cuisine).await?;
        let names = try_join_all(ids.iter().map(|id| self.store.name(id))).await?;

        Ok(names.into_iter().flatten().collect())
    }

    pub async fn weather(&self, restaurant_id: &str) -> Result<Value> {
        self.weather.for_restaurant(restaurant_id).await
    }

    pub async fn set_restaurant_details(&self, restaurant_id: &str, details: Value) -> Result<()> {
        self.ensure_exists(restaurant_id).await?;
        self.store.set_details(restaurant_id, &details).await
    }

    pub async fn restaurant_details(&self, restaurant_id: &str) -> Result<Option<Value>> {
        self.ensure_exists(restaurant_id).await?;
        self.store.details(restaurant_id).await
    }

    /// Substring search over restaurant names, proxied to the engine.
    pub async fn search(&self, q: &str, limit: usize) -> Result<Vec<RestaurantDoc>> {
        self.search.query(q, limit).await
    }

    pub async fn reset_duplicate_filter(&self) -> Result<()> {
        self.detector.reset().await
    }

    pub async fn rebuild_search_index(&self) -> Result<usize> {
        self.search.rebuild().await
    }

    async fn ensure_exists(&self, restaurant_id: &str) -> Result<()> {
        if !self.store.exists(restaurant_id).await? {
            return Err(Error::NotFound(format!("restaurant {restaurant_id}")));
        }
        Ok(())
    }

    async fn refresh_search_doc(&self, restaurant_id: &str, avg_stars: f64) -> Result<()> {
        let Some(name) = self.store.name(restaurant_id).await? else {
            return Err(Error::Consistency(format!(
                "restaurant {restaurant_id} vanished while refreshing its search document"
            )));
        };

        self.search
            .upsert(&RestaurantDoc {
                id: restaurant_id.to_string(),
                name,
                avg_stars,
            })
            .await
    }
}
