//! End-to-end flows against live backing services. Run with
//! `cargo test -- --ignored` once Redis and Meilisearch are reachable
//! (REDIS_URL / MEILI_URL / MEILI_ADMIN_KEY override the defaults).

use std::{env, sync::Arc, time::Duration};

use bites::{App, Config, Error, NewRestaurant, NewReview, State};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

fn config(weather_url: String) -> Config {
    Config {
        redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        meili_url: env::var("MEILI_URL").unwrap_or_else(|_| "http://127.0.0.1:7700".into()),
        meili_key: env::var("MEILI_ADMIN_KEY").unwrap_or_else(|_| "masterKey".into()),
        weather_url,
        weather_api_key: "test-key".into(),
        weather_timeout: Duration::from_millis(500),
        bloom_capacity: 1_000_000,
        bloom_error_rate: 0.0001,
    }
}

async fn app(weather_url: String) -> App {
    let state = State::with_config(config(weather_url))
        .await
        .expect("backing services unavailable");
    App::from_state(&state)
}

fn unique_restaurant(cuisines: &[&str]) -> NewRestaurant {
    NewRestaurant {
        name: format!("Trattoria {}", bites::ids::token()),
        location: "45.46,9.19".into(),
        cuisines: cuisines.iter().map(|c| c.to_string()).collect(),
    }
}

fn review(rating: u8) -> NewReview {
    NewReview { rating, text: None }
}

async fn ranked_score(app: &App, id: &str) -> Option<f64> {
    for page in 1..=20 {
        let ranked = app.top_rated(page, 50).await.unwrap();
        if ranked.is_empty() {
            return None;
        }
        if let Some(entry) = ranked.iter().find(|r| r.id == id) {
            return Some(entry.average_rating);
        }
    }
    None
}

#[tokio::test]
#[ignore = "requires running redis and meilisearch"]
async fn create_review_rank_and_cuisine_flow() {
    let app = app("http://127.0.0.1:9".into()).await;

    let new = unique_restaurant(&["Italian", "Pizza"]);
    let name = new.name.clone();
    let created = app.create_restaurant(new.clone()).await.unwrap();
    assert_eq!(created.cuisines, vec!["italian", "pizza"]);

    // Identical identity trips the duplicate gate.
    assert!(matches!(
        app.create_restaurant(new).await,
        Err(Error::Conflict(_))
    ));

    let first = app.add_review(&created.id, review(4)).await.unwrap();
    app.add_review(&created.id, review(2)).await.unwrap();

    assert_eq!(ranked_score(&app, &created.id).await, Some(3.0));

    // Most recent first: the rating-2 review leads the first page.
    let page = app.reviews(&created.id, 1, 10).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].rating, 2);
    assert_eq!(page[1].rating, 4);

    // A window past the ledger is empty, not an error.
    assert!(app.reviews(&created.id, 5, 10).await.unwrap().is_empty());

    let italian = app.restaurants_by_cuisine("italian").await.unwrap();
    assert!(italian.contains(&name));

    // Deleting a review pulls the average back to the remaining mean.
    app.delete_review(&created.id, &first.id).await.unwrap();
    assert_eq!(ranked_score(&app, &created.id).await, Some(2.0));

    let view = app.get_restaurant(&created.id).await.unwrap();
    assert_eq!(view.name, name);
    assert!(view.view_count >= 1);
}

#[tokio::test]
#[ignore = "requires running redis and meilisearch"]
async fn concurrent_reviews_converge_to_exact_mean() {
    let app = Arc::new(app("http://127.0.0.1:9".into()).await);

    let created = app
        .create_restaurant(unique_restaurant(&["thai"]))
        .await
        .unwrap();

    let ratings: Vec<u8> = vec![5, 3, 4, 1, 2, 5, 4, 3];
    let handles: Vec<_> = ratings
        .iter()
        .map(|&rating| {
            let app = app.clone();
            let id = created.id.clone();
            tokio::spawn(async move { app.add_review(&id, review(rating)).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mean = ratings.iter().map(|&r| r as f64).sum::<f64>() / ratings.len() as f64;
    let expected = (mean * 10.0).round() / 10.0;
    assert_eq!(ranked_score(&app, &created.id).await, Some(expected));
}

#[tokio::test]
#[ignore = "requires running redis and meilisearch"]
async fn weather_is_cached_within_ttl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"main": {"temp": 71.2}})))
        .expect(1)
        .mount(&server)
        .await;

    let app = app(server.uri()).await;
    let created = app
        .create_restaurant(unique_restaurant(&["mexican"]))
        .await
        .unwrap();

    let first = app.weather(&created.id).await.unwrap();
    let second = app.weather(&created.id).await.unwrap();

    assert_eq!(first, second);
    // The mock's expect(1) verifies the second read never left the cache.
}

#[tokio::test]
#[ignore = "requires running redis and meilisearch"]
async fn details_document_round_trip() {
    let app = app("http://127.0.0.1:9".into()).await;
    let created = app
        .create_restaurant(unique_restaurant(&["korean"]))
        .await
        .unwrap();

    assert_eq!(app.restaurant_details(&created.id).await.unwrap(), None);

    let details = json!({"hours": {"mon": "9-17"}, "links": ["https://example.com"]});
    app.set_restaurant_details(&created.id, details.clone())
        .await
        .unwrap();

    assert_eq!(
        app.restaurant_details(&created.id).await.unwrap(),
        Some(details)
    );
}
