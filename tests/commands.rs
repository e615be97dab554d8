//! Command dispatch against the full review service.

mod support;

use std::sync::Arc;

use restaurant_reviews::catalog::Role;
use restaurant_reviews::{review_service, Identity, Service};
use serde_json::{json, Value};
use support::{request, Harness, Pipeline};

struct App {
    service: Service<Pipeline>,
    admin: Identity,
}

impl App {
    fn new() -> Self {
        let harness = Harness::new();
        let admin = harness.admin("root");
        Self {
            service: review_service(harness.pipeline),
            admin,
        }
    }

    fn call(&self, command: &str, input: Value, identity: Option<Identity>) -> (u16, Value) {
        let response = self.service.dispatch_request(&request(command, input, identity));
        (response.status, response.body)
    }

    fn ok(&self, command: &str, input: Value, identity: Option<Identity>) -> Value {
        let (status, body) = self.call(command, input, identity);
        assert_eq!(status, 200, "{command} failed: {body}");
        body
    }

    fn register(&self, username: &str) -> Identity {
        let body = self.ok(
            "user.create",
            json!({ "username": username, "credential_hash": "x" }),
            None,
        );
        Identity {
            user_id: body["user_id"].as_i64().unwrap(),
            role: Role::User,
        }
    }

    fn open_restaurant(&self, name: &str) -> i64 {
        let body = self.ok(
            "restaurant.create",
            json!({ "name": name, "address": format!("{name} square"), "cuisine": "thai" }),
            Some(self.admin),
        );
        body["restaurant_id"].as_i64().unwrap()
    }
}

#[test]
fn submit_then_read_everything_back() {
    let app = App::new();
    let user = app.register("ada");
    let restaurant_id = app.open_restaurant("Lotus");

    let review = app.ok(
        "review.submit",
        json!({ "rating": 5, "description": "Amazing food!", "restaurant_id": restaurant_id }),
        Some(user),
    );
    assert_eq!(review["sentiment"], "positive");
    assert_eq!(review["user_id"], user.user_id);

    let restaurant = app.ok("restaurant.get", json!({ "restaurant_id": restaurant_id }), None);
    assert_eq!(restaurant["average_rating"], 5.0);

    let top = app.ok("leaderboard.top", json!({}), None);
    assert_eq!(top, json!([{ "member": format!("{restaurant_id}:Lotus"), "score": 1 }]));

    let ratings = app.ok("leaderboard.ratings", json!({}), None);
    assert_eq!(ratings[0]["name"], "Lotus");
    assert_eq!(ratings[0]["rating"], 5.0);

    let rating = app.ok("leaderboard.rating", json!({ "restaurant_id": 999 }), None);
    assert_eq!(rating["rating"], 3.0);

    let by_user = app.ok("review.by_user", json!({ "user_id": user.user_id }), None);
    assert_eq!(by_user.as_array().unwrap().len(), 1);
    let by_rating = app.ok("review.by_rating", json!({ "rating": 4 }), None);
    assert!(by_rating.as_array().unwrap().is_empty());
}

#[test]
fn submission_requires_identity() {
    let app = App::new();
    let restaurant_id = app.open_restaurant("Lotus");

    let (status, body) = app.call(
        "review.submit",
        json!({ "rating": 5, "restaurant_id": restaurant_id }),
        None,
    );
    assert_eq!(status, 401);
    assert!(body["error"].as_str().unwrap().starts_with("unauthorized"));
}

#[test]
fn invalid_input_is_a_client_error() {
    let app = App::new();
    let user = app.register("ada");
    let restaurant_id = app.open_restaurant("Lotus");

    let long = "x".repeat(301);
    let cases = [
        json!({ "rating": 6, "restaurant_id": restaurant_id }),
        json!({ "rating": 0, "restaurant_id": restaurant_id }),
        json!({ "rating": 3, "description": long, "restaurant_id": restaurant_id }),
        json!({ "rating": "five", "restaurant_id": restaurant_id }),
    ];
    for input in cases {
        let (status, _) = app.call("review.submit", input, Some(user));
        assert_eq!(status, 400);
    }

    let (status, _) = app.call(
        "review.submit",
        json!({ "rating": 3, "restaurant_id": 4242 }),
        Some(user),
    );
    assert_eq!(status, 404);
}

#[test]
fn only_the_author_or_an_admin_edits_a_review() {
    let app = App::new();
    let author = app.register("ada");
    let stranger = app.register("bob");
    let restaurant_id = app.open_restaurant("Lotus");
    let review = app.ok(
        "review.submit",
        json!({ "rating": 4, "description": "Great", "restaurant_id": restaurant_id }),
        Some(author),
    );
    let review_id = review["review_id"].clone();

    let (status, _) = app.call(
        "review.update",
        json!({ "review_id": review_id, "rating": 1 }),
        Some(stranger),
    );
    assert_eq!(status, 403);

    let updated = app.ok(
        "review.update",
        json!({ "review_id": review_id, "description": "Terrible service" }),
        Some(author),
    );
    assert_eq!(updated["sentiment"], "negative");
    assert_eq!(updated["rating"], 4);

    let updated = app.ok(
        "review.update",
        json!({ "review_id": review_id, "rating": 2 }),
        Some(app.admin),
    );
    assert_eq!(updated["rating"], 2);

    let (status, _) = app.call("review.update", json!({ "rating": 2 }), Some(author));
    assert_eq!(status, 400);

    let (status, _) = app.call(
        "review.update",
        json!({ "review_id": 777, "rating": 2 }),
        Some(author),
    );
    assert_eq!(status, 404);
}

#[test]
fn restaurant_writes_are_admin_only() {
    let app = App::new();
    let user = app.register("ada");

    let input = json!({ "name": "Lotus", "address": "1 Lake", "cuisine": "thai" });
    assert_eq!(app.call("restaurant.create", input.clone(), None).0, 401);
    assert_eq!(app.call("restaurant.create", input.clone(), Some(user)).0, 403);
    assert_eq!(app.call("restaurant.create", input.clone(), Some(app.admin)).0, 200);

    // name and address are unique
    assert_eq!(app.call("restaurant.create", input, Some(app.admin)).0, 409);

    let listed = app.ok("restaurant.list", json!({}), None);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[test]
fn deleting_a_restaurant_clears_both_tracks() {
    let app = App::new();
    let user = app.register("ada");
    let restaurant_id = app.open_restaurant("Lotus");
    app.ok(
        "review.submit",
        json!({ "rating": 5, "description": "Great", "restaurant_id": restaurant_id }),
        Some(user),
    );

    let deleted = app.ok(
        "restaurant.delete",
        json!({ "restaurant_id": restaurant_id }),
        Some(app.admin),
    );
    assert_eq!(deleted["deleted"], true);

    assert_eq!(app.ok("leaderboard.top", json!({}), None), json!([]));
    assert_eq!(app.ok("leaderboard.ratings", json!({}), None), json!([]));
    let (status, _) = app.call(
        "restaurant.delete",
        json!({ "restaurant_id": restaurant_id }),
        Some(app.admin),
    );
    assert_eq!(status, 404);
}

#[test]
fn user_accounts_hide_credentials() {
    let app = App::new();
    let ada = app.register("ada");
    let bob = app.register("bob");

    let fetched = app.ok("user.get", json!({ "user_id": ada.user_id }), Some(bob));
    assert_eq!(fetched["username"], "ada");
    assert_eq!(fetched["role"], "USER");
    assert!(fetched.get("credential_hash").is_none());

    assert_eq!(app.call("user.get", json!({ "user_id": ada.user_id }), None).0, 401);

    // duplicate usernames conflict
    let (status, _) = app.call(
        "user.create",
        json!({ "username": "ada", "credential_hash": "y" }),
        None,
    );
    assert_eq!(status, 409);

    // self-registration cannot grant admin
    let (status, _) = app.call(
        "user.create",
        json!({ "username": "mallory", "credential_hash": "y", "role": "ADMIN" }),
        None,
    );
    assert_eq!(status, 401);
}

#[test]
fn users_edit_themselves_but_not_their_role() {
    let app = App::new();
    let ada = app.register("ada");
    let bob = app.register("bob");

    let renamed = app.ok(
        "user.update",
        json!({ "user_id": ada.user_id, "username": "ada2" }),
        Some(ada),
    );
    assert_eq!(renamed["username"], "ada2");

    let (status, _) = app.call(
        "user.update",
        json!({ "user_id": ada.user_id, "username": "hijack" }),
        Some(bob),
    );
    assert_eq!(status, 403);

    let (status, _) = app.call(
        "user.update",
        json!({ "user_id": ada.user_id, "role": "ADMIN" }),
        Some(ada),
    );
    assert_eq!(status, 403);

    let promoted = app.ok(
        "user.update",
        json!({ "user_id": ada.user_id, "role": "admin" }),
        Some(app.admin),
    );
    assert_eq!(promoted["role"], "ADMIN");

    assert_eq!(
        app.call("user.delete", json!({ "user_id": bob.user_id }), Some(ada)).0,
        403
    );
}

#[test]
fn admin_accounts_are_admin_only_and_redacted() {
    let app = App::new();
    let user = app.register("ada");

    let input = json!({ "username": "ops", "credential_hash": "secret" });
    assert_eq!(app.call("admin.create", input.clone(), Some(user)).0, 403);

    let created = app.ok("admin.create", input, Some(app.admin));
    assert_eq!(created["name"], "Captain");
    assert_eq!(created["role"], "ADMIN");
    assert!(created.get("credential_hash").is_none());
    let admin_id = created["admin_id"].clone();

    let found = app.ok("admin.by_username", json!({ "username": "ops" }), Some(app.admin));
    assert_eq!(found["admin_id"], admin_id);

    let deleted = app.ok("admin.delete", json!({ "admin_id": admin_id }), Some(app.admin));
    assert_eq!(deleted["deleted"], true);
    assert_eq!(
        app.call("admin.get", json!({ "admin_id": admin_id }), Some(app.admin)).0,
        404
    );
}

#[test]
fn unknown_commands_are_not_found() {
    let app = App::new();
    let (status, body) = app.call("review.nuke", json!({}), None);
    assert_eq!(status, 404);
    assert_eq!(body["error"], "unknown command: review.nuke");
}

#[test]
fn service_is_shareable_across_threads() {
    let app = Arc::new(App::new());
    let restaurant_id = app.open_restaurant("Lotus");
    let users: Vec<_> = (0..4).map(|n| app.register(&format!("user{n}"))).collect();

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let app = Arc::clone(&app);
            std::thread::spawn(move || {
                app.ok(
                    "review.submit",
                    json!({ "rating": 4, "description": "Great", "restaurant_id": restaurant_id }),
                    Some(user),
                );
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let top = app.ok("leaderboard.top", json!({ "top_n": 1 }), None);
    assert_eq!(top[0]["score"], 4);
}
