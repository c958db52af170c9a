use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use beyondwork_activity::{EventStatus, SportEvent, UserProfile};
use beyondwork_api::app::{build_router, services::AppServices};
use beyondwork_auth::{Hs256TokenVerifier, Role, TokenClaims};
use beyondwork_core::{EventId, UserId};
use beyondwork_infra::{
    aggregation::LEADERBOARD_JOB,
    config::LeaderboardSettings,
    lock::{InMemoryRunLock, RunLock},
    store::InMemoryDocumentStore,
};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(services: AppServices) -> Self {
        // Same router as prod, in-memory backends, ephemeral port.
        let services = Arc::new(services);
        let app = build_router(services.clone(), Arc::new(Hs256TokenVerifier::new(SECRET)));
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
            services,
            handle,
        }
    }

    async fn in_memory(trigger_min_role: Role) -> Self {
        Self::spawn(AppServices::in_memory(&LeaderboardSettings::default(), trigger_min_role)).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn seed_user(&self, id: &str, name: &str, company: &str) {
        let profile = UserProfile::new(UserId::new(id), name, company);
        self.services.users.put_user(profile).await.unwrap();
    }

    async fn seed_event(&self, id: &str, host: &str, sport: &str, status: EventStatus, participants: &[&str]) {
        let mut event = SportEvent::new(EventId::new(id), UserId::new(host), Some(sport.to_string()), 10);
        event.participants = participants.iter().map(|p| UserId::new(*p)).collect();
        event.status = status;
        self.services.events.put_event(event).await.unwrap();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, user: &str, role: Role, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = TokenClaims {
        sub: UserId::new(user),
        role,
        issued_at: now - ChronoDuration::minutes(1),
        expires_at: now + ttl,
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn token(user: &str, role: Role) -> String {
    mint_jwt(SECRET, user, role, ChronoDuration::minutes(10))
}

async fn leaderboards(client: &reqwest::Client, srv: &TestServer, query: &str) -> Vec<Value> {
    let res = client
        .get(srv.url(&format!("/leaderboards{query}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    body["leaderboards"].as_array().unwrap().clone()
}

#[tokio::test]
async fn health_and_empty_leaderboards_are_public() {
    let srv = TestServer::in_memory(Role::User).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(leaderboards(&client, &srv, "").await.is_empty());
}

#[tokio::test]
async fn calculate_requires_a_valid_token() {
    let srv = TestServer::in_memory(Role::User).await;
    let client = reqwest::Client::new();

    let res = client.post(srv.url("/leaderboards/calculate")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "unauthenticated");

    let wrong_secret = mint_jwt("other-secret", "u1", Role::SuperAdmin, ChronoDuration::minutes(10));
    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(wrong_secret)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(SECRET, "u1", Role::SuperAdmin, ChronoDuration::minutes(-5));
    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn caller_identity_is_derived_from_token() {
    let srv = TestServer::in_memory(Role::User).await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(token("u42", Role::CorporateAdmin))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["userId"], "u42");
    assert_eq!(body["role"], "CORPORATE_ADMIN");
}

#[tokio::test]
async fn calculate_enforces_the_configured_minimum_role() {
    let srv = TestServer::in_memory(Role::CorporateAdmin).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(token("u1", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "permission_denied");

    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(token("admin", Role::CorporateAdmin))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn join_complete_calculate_and_query() {
    let srv = TestServer::in_memory(Role::User).await;
    let client = reqwest::Client::new();

    srv.seed_user("u1", "Alice", "Acme Corp").await;
    srv.seed_user("u2", "Bob", "Globex").await;
    srv.seed_user("u3", "Cara", "Acme Corp").await;
    srv.seed_event("e1", "u1", "cricket", EventStatus::Upcoming, &[]).await;
    srv.seed_event("e2", "u1", "football", EventStatus::Completed, &["u2"]).await;

    for user in ["u2", "u3"] {
        let res = client
            .post(srv.url("/events/e1/join"))
            .bearer_auth(token(user, Role::User))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    let res = client
        .post(srv.url("/events/e1/status"))
        .bearer_auth(token("u1", Role::User))
        .json(&json!({ "status": "COMPLETED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["event"]["status"], "COMPLETED");
    assert_eq!(body["credited"], 3);

    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(token("u3", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Leaderboards calculated successfully");
    assert_eq!(body["report"]["completedEvents"], 2);
    assert_eq!(body["report"]["participants"], 2);
    assert_eq!(body["report"]["trigger"]["kind"], "manual");

    // `ALL` means no sport filter: the overall board plus one per observed sport.
    let global = leaderboards(&client, &srv, "?type=GLOBAL&sportType=ALL").await;
    assert_eq!(global.len(), 3);
    let overall = global.iter().find(|b| b["sportType"] == "ALL").unwrap();
    assert_eq!(overall["id"], "global_all");
    let rankings = overall["rankings"].as_array().unwrap();
    assert_eq!(rankings.len(), 2);
    assert_eq!(rankings[0]["userId"], "u2");
    assert_eq!(rankings[0]["userName"], "Bob");
    assert_eq!(rankings[0]["score"], 20);
    assert_eq!(rankings[0]["rank"], 1);
    assert_eq!(rankings[1]["userId"], "u3");
    assert_eq!(rankings[1]["score"], 10);
    assert_eq!(rankings[1]["rank"], 2);

    let cricket = leaderboards(&client, &srv, "?sportType=cricket").await;
    assert_eq!(cricket.len(), 1);
    assert_eq!(cricket[0]["type"], "GLOBAL");

    let acme = leaderboards(&client, &srv, "?type=CORPORATE&company=Acme%20Corp").await;
    assert_eq!(acme.len(), 2);
    assert!(acme.iter().all(|b| b["company"] == "Acme Corp"));

    let football = leaderboards(&client, &srv, "?scope=CORPORATE&sportType=football").await;
    assert_eq!(football.len(), 1);
    assert_eq!(football[0]["company"], "Globex");
}

#[tokio::test]
async fn unknown_scope_is_rejected() {
    let srv = TestServer::in_memory(Role::User).await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/leaderboards?type=REGIONAL")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_scope");
}

#[tokio::test]
async fn calculate_conflicts_while_another_run_holds_the_lock() {
    let store = Arc::new(InMemoryDocumentStore::new());
    let lock = Arc::new(InMemoryRunLock::new());
    let services = AppServices::from_parts(
        store.clone(),
        store.clone(),
        store,
        lock.clone(),
        &LeaderboardSettings::default(),
        Role::User,
    );
    let srv = TestServer::spawn(services).await;
    let client = reqwest::Client::new();

    let lease = lock
        .try_acquire(LEADERBOARD_JOB, Duration::from_secs(60))
        .await
        .unwrap()
        .expect("lock should be free");

    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(token("u1", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "already_running");

    assert!(lock.release(&lease).await.unwrap());
    let res = client
        .post(srv.url("/leaderboards/calculate"))
        .bearer_auth(token("u1", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn event_rules_map_to_http_errors() {
    let srv = TestServer::in_memory(Role::User).await;
    let client = reqwest::Client::new();
    srv.seed_event("e1", "host", "tennis", EventStatus::Upcoming, &["u1"]).await;

    let res = client
        .post(srv.url("/events/e1/join"))
        .bearer_auth(token("u1", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url("/events/missing/join"))
        .bearer_auth(token("u1", Role::User))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/events/e1/status"))
        .bearer_auth(token("u1", Role::User))
        .json(&json!({ "status": "COMPLETED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/events/e1/status"))
        .bearer_auth(token("host", Role::User))
        .json(&json!({ "status": "FINISHED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/events/e1/status"))
        .bearer_auth(token("admin", Role::CorporateAdmin))
        .json(&json!({ "status": "CANCELLED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/events/e1/status"))
        .bearer_auth(token("host", Role::User))
        .json(&json!({ "status": "COMPLETED" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
