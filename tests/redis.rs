//! Redis ranking store against a live server.
//!
//! These tests require a running Redis instance and clear its ranking keys.
//! Run with: cargo test --features redis --test redis -- --ignored
//! (`REVIEWS_TEST_REDIS_URL` overrides the default URL.)

#![cfg(feature = "redis")]

mod support;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use restaurant_reviews::catalog::{NewRestaurant, NewUser, Role};
use restaurant_reviews::ranking::{LEADERBOARD_KEY, RATINGS_KEY};
use restaurant_reviews::{
    Identity, InMemoryRecordStore, PipelineConfig, RankingError, RankingStore, RedisRankingStore,
    ReviewPipeline,
};

const DEFAULT_URL: &str = "redis://127.0.0.1:6379";

// every test shares the two ranking keys
static SERIAL: Mutex<()> = Mutex::new(());

fn redis_url() -> String {
    std::env::var("REVIEWS_TEST_REDIS_URL").unwrap_or_else(|_| DEFAULT_URL.to_string())
}

fn fresh_store() -> (MutexGuard<'static, ()>, RedisRankingStore) {
    let guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let client = redis::Client::open(redis_url()).unwrap();
    let mut con = client.get_connection().unwrap();
    redis::cmd("DEL")
        .arg(LEADERBOARD_KEY)
        .arg(RATINGS_KEY)
        .query::<()>(&mut con)
        .unwrap();
    let store = RedisRankingStore::open(&redis_url(), Duration::from_secs(2)).unwrap();
    (guard, store)
}

#[test]
#[ignore] // Requires Redis server
fn unknown_restaurant_rates_three() {
    let (_guard, store) = fresh_store();
    assert_eq!(store.rating(404).unwrap(), 3.0);
    assert!(store.top(10).unwrap().is_empty());
    assert!(store.all_ratings().unwrap().is_empty());
}

#[test]
#[ignore] // Requires Redis server
fn bump_writes_the_rating_hash() {
    let (_guard, store) = fresh_store();
    store.bump(2, "Beta", 1).unwrap();
    store.bump(2, "Beta", 0).unwrap();
    store.bump(2, "Beta", 1).unwrap();
    store.bump(1, "Alpha", -1).unwrap();
    store.adjust(1, -1).unwrap();

    // score 2 over 3 reviews
    assert!((store.rating(2).unwrap() - (3.0 + 4.0 / 3.0)).abs() < 1e-9);
    assert_eq!(store.rating(1).unwrap(), 1.0);

    let ratings = store.all_ratings().unwrap();
    let names: Vec<&str> = ratings.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Beta", "Alpha"]);

    let client = redis::Client::open(redis_url()).unwrap();
    let mut con = client.get_connection().unwrap();
    let count: i64 = redis::cmd("HGET")
        .arg(RATINGS_KEY)
        .arg("2:count")
        .query(&mut con)
        .unwrap();
    assert_eq!(count, 3);
}

#[test]
#[ignore] // Requires Redis server
fn top_orders_by_score_then_member_descending() {
    let (_guard, store) = fresh_store();
    assert_eq!(store.increment_leaderboard(1, "Alpha", 2).unwrap(), 2);
    store.increment_leaderboard(2, "Beta", 2).unwrap();
    store.increment_leaderboard(3, "Gamma", 5).unwrap();
    assert_eq!(store.increment_leaderboard(4, "Delta", -1).unwrap(), -1);

    let top = store.top(3).unwrap();
    let members: Vec<&str> = top.iter().map(|e| e.member.as_str()).collect();
    assert_eq!(members, vec!["3:Gamma", "2:Beta", "1:Alpha"]);
    assert_eq!(top[0].score, 5);
    assert!(store.top(0).unwrap().is_empty());
    assert_eq!(store.top(100).unwrap().len(), 4);
}

#[test]
#[ignore] // Requires Redis server
fn remove_clears_both_tracks() {
    let (_guard, store) = fresh_store();
    store.bump(1, "A", 1).unwrap();
    store.increment_leaderboard(1, "A", 1).unwrap();
    store.increment_leaderboard(1, "A (renamed)", 1).unwrap();
    store.increment_leaderboard(11, "K", 1).unwrap();

    store.remove(1).unwrap();
    // removing twice is fine
    store.remove(1).unwrap();

    let members: Vec<String> = store.top(10).unwrap().into_iter().map(|e| e.member).collect();
    assert_eq!(members, vec!["11:K".to_string()]);
    assert!(store.all_ratings().unwrap().is_empty());
    assert_eq!(store.rating(1).unwrap(), 3.0);
}

#[test]
#[ignore] // Requires Redis server
fn corrupt_values_are_reported() {
    let (_guard, store) = fresh_store();
    let client = redis::Client::open(redis_url()).unwrap();
    let mut con = client.get_connection().unwrap();
    redis::cmd("HSET")
        .arg(RATINGS_KEY)
        .arg("5:count")
        .arg("lots")
        .query::<()>(&mut con)
        .unwrap();

    assert!(matches!(store.rating(5), Err(RankingError::Corrupt(_))));
}

#[test]
#[ignore] // Requires Redis server
fn pipeline_scores_reviews_in_redis() {
    let (_guard, ranking) = fresh_store();
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = ReviewPipeline::new(store, Arc::new(ranking), PipelineConfig::default());
    let user = pipeline
        .catalog()
        .create_user(NewUser {
            username: "ada".into(),
            credential_hash: "x".into(),
            role: Role::User,
        })
        .unwrap();
    let restaurant = pipeline
        .catalog()
        .create_restaurant(NewRestaurant {
            name: "Lotus".into(),
            address: "1 Lake".into(),
            cuisine: "thai".into(),
        })
        .unwrap();
    let identity = Identity {
        user_id: user.user_id,
        role: user.role,
    };

    pipeline
        .submit_review(&identity, support::new_review(restaurant.restaurant_id, 5, "Amazing food!"))
        .unwrap();

    let top = pipeline.get_leaderboard(10).unwrap();
    assert_eq!(top[0].member, format!("{}:Lotus", restaurant.restaurant_id));
    assert_eq!(top[0].score, 1);
    assert_eq!(pipeline.get_restaurant_rating(restaurant.restaurant_id).unwrap(), 5.0);
}
