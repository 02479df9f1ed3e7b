use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use reqwest::header::{COOKIE, SET_COOKIE};
use serde_json::{Value, json};

use sprintspace_api::app::{AppServices, Clock, build_app};
use sprintspace_api::config::AppConfig;
use sprintspace_auth::TokenClaims;
use sprintspace_infra::InMemoryCatalogStore;

const JWT_SECRET: &str = "test-secret";
const OWNER: &str = "owner@example.com";
const OTHER: &str = "other@example.com";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(overrides: &[(&str, &str)]) -> Self {
        Self::spawn_with_clock(overrides, Clock::System).await
    }

    async fn spawn_with_clock(overrides: &[(&str, &str)], clock: Clock) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
            ("AUTH_TRANSPORT".to_string(), "header".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert(key.to_string(), value.to_string());
        }
        let config = AppConfig::from_lookup(|key| vars.get(key).cloned()).expect("invalid test config");

        // Same router as prod, over the in-memory store, on an ephemeral port.
        let services = AppServices::new(config, Arc::new(InMemoryCatalogStore::new())).with_clock(clock);
        let app = build_app(Arc::new(services));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn create_event(&self, token: &str, body: Value) -> String {
        let res = self
            .client
            .post(self.url("/events"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let created: Value = res.json().await.unwrap();
        assert_eq!(created["acknowledged"], true);
        created["insertedId"].as_str().unwrap().to_string()
    }

    async fn register(&self, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/registrations"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn get_json(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        let res = req.send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn registration_count(&self, event_id: &str) -> u64 {
        let (status, event) = self.get_json(&format!("/events/details/{event_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(event["totalRegistrations"], event["totalRegistrationCount"]);
        event["totalRegistrationCount"].as_u64().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt_at(email: &str, issued_at: DateTime<Utc>, ttl: ChronoDuration) -> String {
    let claims = TokenClaims::new(email, issued_at, issued_at + ttl);

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn mint_jwt(email: &str) -> String {
    mint_jwt_at(email, Utc::now(), ChronoDuration::minutes(10))
}

fn event_body(title: &str, date: &str) -> Value {
    json!({ "title": title, "marathonStartDate": date, "location": "Riverside" })
}

#[tokio::test]
async fn liveness_routes_are_public() {
    let srv = TestServer::spawn(&[]).await;

    let res = srv.client.get(srv.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!res.text().await.unwrap().is_empty());

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn(&[]).await;

    let res = srv
        .client
        .post(srv.url("/events"))
        .json(&event_body("Sprint", "2030-01-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = srv
        .client
        .get(srv.url("/registrations"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");

    let expired = mint_jwt_at(OWNER, Utc::now() - ChronoDuration::hours(3), ChronoDuration::hours(1));
    let res = srv
        .client
        .get(srv.url("/registrations"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Nothing was written by the rejected create.
    let (_, listing) = srv.get_json("/events", None).await;
    assert_eq!(listing["totalEvents"], 0);
}

#[tokio::test]
async fn malformed_identifiers_are_rejected_with_400() {
    let srv = TestServer::spawn(&[]).await;
    let token = mint_jwt(OWNER);

    for path in ["/marathons/123", "/events/details/not-an-id", "/marathons/zzzzzzzzzzzzzzzzzzzzzzzz"] {
        let (status, body) = srv.get_json(path, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["error"], "invalid_id");
    }

    for path in ["/registrations/123", "/marathons/abc/registrations"] {
        let (status, _) = srv.get_json(path, Some(token.as_str())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
    }

    let res = srv
        .client
        .put(srv.url("/events/65a1f0c2b3d4e5f6071829"))
        .bearer_auth(&token)
        .json(&json!({ "title": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .delete(srv.url("/registrations/nope"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.register(&token, json!({ "eventId": "bad" })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn event_lifecycle_enforces_record_ownership() {
    let srv = TestServer::spawn(&[]).await;
    let owner = mint_jwt(OWNER);
    let other = mint_jwt(OTHER);

    // Client-supplied owner and counter are ignored.
    let id = srv
        .create_event(
            &owner,
            json!({
                "title": "City Marathon",
                "marathonStartDate": "2030-04-01",
                "userEmail": OTHER,
                "totalRegistrationCount": 99,
            }),
        )
        .await;

    let (status, event) = srv.get_json(&format!("/marathons/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(event["_id"], id);
    assert_eq!(event["userEmail"], OWNER);
    assert_eq!(event["totalRegistrationCount"], 0);
    assert_eq!(event["marathonStartDate"], "2030-04-01");

    // Non-owner cannot update or delete, even when naming the owner in the query.
    let res = srv
        .client
        .put(srv.url(&format!("/events/{id}?email={OWNER}")))
        .bearer_auth(&other)
        .json(&json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .delete(srv.url(&format!("/marathons/{id}")))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .put(srv.url(&format!("/marathons/{id}")))
        .bearer_auth(&owner)
        .json(&json!({ "title": "City Marathon 2030", "_id": "65a1f0c2b3d4e5f60718293a" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack["matchedCount"], 1);
    assert_eq!(ack["modifiedCount"], 1);

    let (_, event) = srv.get_json(&format!("/events/details/{id}"), None).await;
    assert_eq!(event["_id"], id);
    assert_eq!(event["title"], "City Marathon 2030");

    let res = srv
        .client
        .delete(srv.url(&format!("/events/{id}")))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack["deletedCount"], 1);

    let (status, body) = srv.get_json(&format!("/marathons/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn create_requires_title_and_start_date() {
    let srv = TestServer::spawn(&[]).await;
    let token = mint_jwt(OWNER);

    let res = srv
        .client
        .post(srv.url("/events"))
        .bearer_auth(&token)
        .json(&json!({ "title": "No date" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");

    let res = srv
        .client
        .post(srv.url("/events"))
        .bearer_auth(&token)
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn listing_paginates_filtered_set() {
    let srv = TestServer::spawn(&[]).await;
    let owner = mint_jwt(OWNER);
    let other = mint_jwt(OTHER);

    for i in 0..20 {
        let token = if i < 5 { &other } else { &owner };
        srv.create_event(token, event_body(&format!("Event {i}"), "2030-01-01")).await;
    }

    let (status, page) = srv.get_json("/events?page=2&limit=9", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["events"].as_array().unwrap().len(), 9);
    assert_eq!(page["totalEvents"], 20);
    assert_eq!(page["totalPages"], 3);
    assert_eq!(page["currentPage"], 2);
    assert_eq!(page["events"][0]["title"], "Event 9");
    assert!(page.get("myEvents").is_none());

    let (_, last) = srv.get_json("/marathons?page=3&limit=9", None).await;
    assert_eq!(last["events"].as_array().unwrap().len(), 2);

    // Garbage paging falls back to page 1 with the configured size.
    let (_, first) = srv.get_json("/events?page=abc&limit=-4", None).await;
    assert_eq!(first["currentPage"], 1);
    assert_eq!(first["events"].as_array().unwrap().len(), 9);

    let (_, newest) = srv.get_json("/events?sort=desc&limit=1", None).await;
    assert_eq!(newest["events"][0]["title"], "Event 19");

    let (_, mine) = srv.get_json(&format!("/events?email={OTHER}&limit=2"), None).await;
    assert_eq!(mine["totalEvents"], 5);
    assert_eq!(mine["totalPages"], 3);
    assert_eq!(mine["events"].as_array().unwrap().len(), 2);
    assert_eq!(mine["myEvents"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn running_events_start_strictly_after_today() {
    let today = DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z").unwrap().with_timezone(&Utc);
    let srv = TestServer::spawn_with_clock(&[], Clock::Fixed(today)).await;
    let token = mint_jwt_at(OWNER, today, ChronoDuration::minutes(10));

    for (title, date) in [
        ("Yesterday", "2025-06-14"),
        ("Today", "2025-06-15"),
        ("Tomorrow", "2025-06-16"),
        ("Summer", "2025-07-01"),
        ("Autumn", "2025-09-01"),
        ("Winter", "2025-12-01"),
    ] {
        srv.create_event(&token, event_body(title, date)).await;
    }

    let (status, body) = srv.get_json("/running-events", None).await;
    assert_eq!(status, StatusCode::OK);

    let marathons = body["marathons"].as_array().unwrap();
    let titles: Vec<&str> = marathons.iter().map(|e| e["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Tomorrow", "Summer", "Autumn", "Winter"]);

    let sample = body["randomRunningEvents"].as_array().unwrap();
    assert_eq!(sample.len(), 3);
    for picked in sample {
        assert!(marathons.iter().any(|e| e["_id"] == picked["_id"]));
    }

    let (_, limited) = srv.get_json("/running-events?limit=2", None).await;
    assert_eq!(limited["marathons"].as_array().unwrap().len(), 2);
    assert!(limited["randomRunningEvents"].as_array().unwrap().len() <= 2);
}

#[tokio::test]
async fn registration_lifecycle_maintains_counter() {
    let srv = TestServer::spawn(&[]).await;
    let owner = mint_jwt(OWNER);
    let runner = mint_jwt("runner@example.com");

    let event_id = srv.create_event(&owner, event_body("Sprint Marathon 2024", "2030-05-05")).await;

    let res = srv.register(&runner, json!({ "eventId": event_id, "tshirt": "M" })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let first: Value = res.json().await.unwrap();
    let first_id = first["insertedId"].as_str().unwrap().to_string();
    assert_eq!(srv.registration_count(&event_id).await, 1);

    let (status, stored) = srv.get_json(&format!("/registrations/{first_id}"), Some(runner.as_str())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["userEmail"], "runner@example.com");
    assert_eq!(stored["eventTitle"], "Sprint Marathon 2024");
    assert_eq!(stored["eventId"], event_id);
    assert_eq!(stored["marathonId"], event_id);
    assert_eq!(stored["tshirt"], "M");

    let res = srv.register(&owner, json!({ "marathonId": event_id })).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let second: Value = res.json().await.unwrap();
    let second_id = second["insertedId"].as_str().unwrap().to_string();
    assert_eq!(srv.registration_count(&event_id).await, 2);

    let (_, listed) = srv.get_json(&format!("/marathons/{event_id}/registrations"), Some(owner.as_str())).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().all(|r| r["marathonId"] == event_id));

    let res = srv
        .client
        .delete(srv.url(&format!("/registrations/{first_id}")))
        .bearer_auth(&runner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack["deletedCount"], 1);
    assert_eq!(srv.registration_count(&event_id).await, 1);

    // A second delete of the same registration changes nothing.
    let res = srv
        .client
        .delete(srv.url(&format!("/registrations/{first_id}")))
        .bearer_auth(&runner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(srv.registration_count(&event_id).await, 1);

    let res = srv
        .client
        .delete(srv.url(&format!("/registrations/{second_id}")))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(srv.registration_count(&event_id).await, 0);
}

#[tokio::test]
async fn registration_for_missing_event_is_not_found() {
    let srv = TestServer::spawn(&[]).await;
    let token = mint_jwt(OWNER);

    let res = srv.register(&token, json!({ "eventId": "65a1f0c2b3d4e5f60718293a" })).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (_, all) = srv.get_json("/registrations", Some(token.as_str())).await;
    assert!(all.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_registrations_do_not_lose_updates() {
    let srv = TestServer::spawn(&[]).await;
    let token = mint_jwt(OWNER);
    let event_id = srv.create_event(&token, event_body("Relay", "2030-02-02")).await;

    let mut tasks = Vec::new();
    for i in 0..25 {
        let client = srv.client.clone();
        let url = srv.url("/registrations");
        let token = mint_jwt(&format!("runner{i}@example.com"));
        let body = json!({ "eventId": event_id });
        tasks.push(tokio::spawn(async move {
            client.post(url).bearer_auth(token).json(&body).send().await.unwrap().status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::CREATED);
    }

    assert_eq!(srv.registration_count(&event_id).await, 25);
}

#[tokio::test]
async fn title_search_is_case_insensitive_and_literal() {
    let srv = TestServer::spawn(&[]).await;
    let token = mint_jwt(OWNER);

    let sprint = srv.create_event(&token, event_body("Sprint Marathon 2024", "2030-03-03")).await;
    let trail = srv.create_event(&token, event_body("Trail Run", "2030-03-04")).await;
    assert_eq!(srv.register(&token, json!({ "eventId": sprint })).await.status(), StatusCode::CREATED);
    assert_eq!(srv.register(&token, json!({ "eventId": trail })).await.status(), StatusCode::CREATED);

    let (status, hits) = srv.get_json("/registrations/search?title=sprint", Some(token.as_str())).await;
    assert_eq!(status, StatusCode::OK);
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["eventTitle"], "Sprint Marathon 2024");

    let (_, hits) = srv.get_json("/registrations/search?title=.*", Some(token.as_str())).await;
    assert!(hits.as_array().unwrap().is_empty());

    let (_, hits) = srv
        .get_json(&format!("/registrations?email={OWNER}&search=TRAIL"), Some(token.as_str()))
        .await;
    let hits = hits.as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["eventTitle"], "Trail Run");

    let (_, hits) = srv.get_json("/registrations?email=nobody@example.com", Some(token.as_str())).await;
    assert!(hits.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn registration_update_keeps_identifier_and_parent() {
    let srv = TestServer::spawn(&[]).await;
    let token = mint_jwt(OWNER);

    let event_id = srv.create_event(&token, event_body("Night Run", "2030-10-10")).await;
    let elsewhere = srv.create_event(&token, event_body("Day Run", "2030-10-11")).await;
    let res = srv.register(&token, json!({ "eventId": event_id })).await;
    let created: Value = res.json().await.unwrap();
    let id = created["insertedId"].as_str().unwrap().to_string();

    let res = srv
        .client
        .put(srv.url(&format!("/registrations/{id}")))
        .bearer_auth(&token)
        .json(&json!({
            "_id": "65a1f0c2b3d4e5f60718293a",
            "eventId": elsewhere,
            "phone": "555-0100",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let ack: Value = res.json().await.unwrap();
    assert_eq!(ack["matchedCount"], 1);
    assert_eq!(ack["modifiedCount"], 1);

    let (_, stored) = srv.get_json(&format!("/registrations/{id}"), Some(token.as_str())).await;
    assert_eq!(stored["_id"], id);
    assert_eq!(stored["eventId"], event_id);
    assert_eq!(stored["phone"], "555-0100");
    assert_eq!(srv.registration_count(&elsewhere).await, 0);

    let res = srv
        .client
        .put(srv.url("/registrations/65a1f0c2b3d4e5f60718293a"))
        .bearer_auth(&token)
        .json(&json!({ "phone": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cookie_transport_round_trip() {
    let srv = TestServer::spawn(&[("AUTH_TRANSPORT", "cookie")]).await;

    let res = srv
        .client
        .post(srv.url("/jwt"))
        .json(&json!({ "user": { "email": OWNER } }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Path=/"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], "Token sent");
    let token = body["token"].as_str().unwrap().to_string();

    let res = srv
        .client
        .post(srv.url("/events"))
        .header(COOKIE, format!("token={token}"))
        .json(&event_body("Cookie Run", "2030-01-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Cookie transport ignores the Authorization header.
    let res = srv
        .client
        .post(srv.url("/events"))
        .bearer_auth(&token)
        .json(&event_body("Header Run", "2030-01-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv.client.post(srv.url("/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cleared = res.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cleared.contains("Max-Age=0"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], "Logged out");
}

#[tokio::test]
async fn header_transport_issues_bare_tokens() {
    let srv = TestServer::spawn(&[]).await;

    let res = srv
        .client
        .post(srv.url("/jwt"))
        .json(&json!({ "email": OWNER }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get(SET_COOKIE).is_none());
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    // Bare token without the Bearer prefix.
    let res = srv
        .client
        .get(srv.url("/registrations"))
        .header(reqwest::header::AUTHORIZATION, &token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.post(srv.url("/jwt")).json(&json!({})).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn issued_tokens_follow_the_service_clock() {
    let now = DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z").unwrap().with_timezone(&Utc);
    let srv = TestServer::spawn_with_clock(&[], Clock::Fixed(now)).await;

    let res = srv
        .client
        .post(srv.url("/jwt"))
        .json(&json!({ "email": OWNER }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let (status, listed) = srv.get_json("/registrations", Some(token.as_str())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    // Expiry is judged against the same clock.
    let stale = mint_jwt_at(OWNER, now - ChronoDuration::hours(6), ChronoDuration::hours(5));
    let (status, body) = srv.get_json("/registrations", Some(stale.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn small_issuer_clock_skew_is_accepted() {
    let srv = TestServer::spawn(&[]).await;
    let ahead = mint_jwt_at(OWNER, Utc::now() + ChronoDuration::seconds(10), ChronoDuration::minutes(10));
    let (status, _) = srv.get_json("/registrations", Some(ahead.as_str())).await;
    assert_eq!(status, StatusCode::OK);

    let far_ahead = mint_jwt_at(OWNER, Utc::now() + ChronoDuration::minutes(10), ChronoDuration::minutes(10));
    let (status, _) = srv.get_json("/registrations", Some(far_ahead.as_str())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_checks_configured_credentials() {
    let srv = TestServer::spawn(&[
        ("LOGIN_EMAIL", "test@example.com"),
        ("LOGIN_PASSWORD", "Password123"),
    ])
    .await;

    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "test@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");

    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "test@example.com", "password": "Password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let id = srv.create_event(&token, event_body("Login Run", "2030-01-01")).await;
    let (_, event) = srv.get_json(&format!("/marathons/{id}"), None).await;
    assert_eq!(event["userEmail"], "test@example.com");
}

#[tokio::test]
async fn login_is_rejected_when_unconfigured() {
    let srv = TestServer::spawn(&[]).await;

    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "test@example.com", "password": "Password123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
