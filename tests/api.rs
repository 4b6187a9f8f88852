//! End-to-end tests against the fully built router: auth, book CRUD,
//! ownership, and the provider login flow with a fixed identity provider.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::ServiceExt;

use shelf_auth::provider::{IdentityProvider, ProviderIdentity, Url};
use shelf_auth::{AuthError, SessionGate};
use shelf_kernel::settings::{SessionStrategyKind, Settings};
use shelf_kernel::ModuleRegistry;

struct FixedIdentity(ProviderIdentity);

#[async_trait::async_trait]
impl IdentityProvider for FixedIdentity {
    fn authorize_url(&self) -> Result<Url, AuthError> {
        Ok(Url::parse("https://provider.test/authorize?client_id=shelf").unwrap())
    }

    async fn exchange(&self, _code: &str) -> Result<ProviderIdentity, AuthError> {
        Ok(self.0.clone())
    }
}

fn google_identity(account_id: &str, email: &str, name: &str) -> ProviderIdentity {
    ProviderIdentity {
        provider: "google".to_string(),
        account_id: account_id.to_string(),
        email: email.to_string(),
        display_name: Some(name.to_string()),
    }
}

async fn test_app(provider: Option<Arc<dyn IdentityProvider>>) -> (Router, SqlitePool) {
    test_app_with(Settings::default(), provider).await
}

async fn test_app_with(
    settings: Settings,
    provider: Option<Arc<dyn IdentityProvider>>,
) -> (Router, SqlitePool) {
    let db = shelf_db::connect_in_memory().await.unwrap();
    let gate = SessionGate::from_settings(&settings.auth, &db).unwrap();

    let mut registry = ModuleRegistry::new();
    registry.register(shelf_app::modules::auth::create_module(
        db.clone(),
        gate.clone(),
        provider,
    ));
    registry.register(shelf_app::modules::books::create_module(db.clone(), gate));

    shelf_db::migrate(&db, registry.collect_migrations())
        .await
        .unwrap();

    (shelf_http::build_router(&registry, &settings), db)
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get_raw(app: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn signup_and_login(app: &Router, name: &str, email: &str, password: &str) -> String {
    let (status, _) = request(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"name": name, "email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": email, "password": password})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn catalogue_round_trip() {
    let (app, _db) = test_app(None).await;
    let token = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (status, created) = request(
        &app,
        Method::POST,
        "/api/books",
        Some(&token),
        Some(json!({"title": "Dune", "author": "Herbert", "genre": "Fiction"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Dune");
    let book_id = created["id"].as_str().unwrap().to_string();

    // Owner listing has exactly the new entry.
    let (status, own) = request(&app, Method::GET, "/api/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let own = own.as_array().unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["title"], "Dune");
    assert_eq!(own[0]["id"].as_str().unwrap(), book_id);

    // The public listing carries the display name and nothing else about
    // the owner.
    let (status, all) = request(&app, Method::GET, "/api/books/all", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["owner_name"], "Ada");
    assert!(all[0].get("email").is_none());
    assert!(all[0].get("user_id").is_none());

    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/api/books/{book_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, own) = request(&app, Method::GET, "/api/books", Some(&token), None).await;
    assert!(own.as_array().unwrap().is_empty());

    // Deleting again reads as absent.
    let (status, _) = request(
        &app,
        Method::DELETE,
        &format!("/api/books/{book_id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let (app, _db) = test_app(None).await;
    signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (wrong_status, wrong_body) = request(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "nope"})),
    )
    .await;
    let (ghost_status, ghost_body) = request(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "ghost@x.com", "password": "nope"})),
    )
    .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(ghost_status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        wrong_body["error"]["message"],
        ghost_body["error"]["message"]
    );
    assert_eq!(wrong_body["error"]["code"], ghost_body["error"]["code"]);
}

#[tokio::test]
async fn duplicate_signup_conflicts() {
    let (app, _db) = test_app(None).await;
    signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"name": "Imposter", "email": "a@x.com", "password": "pw2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn owned_routes_require_a_session() {
    let (app, _db) = test_app(None).await;

    let (status, _) = request(&app, Method::GET, "/api/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/books",
        None,
        Some(json!({"title": "Dune", "author": "Herbert", "genre": "Fiction"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = request(&app, Method::DELETE, "/api/books/some-id", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A forged token is as good as none.
    let (status, _) = request(&app, Method::GET, "/api/books", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_reports_missing_fields() {
    let (app, _db) = test_app(None).await;
    let token = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (status, body) = request(
        &app,
        Method::POST,
        "/api/books",
        Some(&token),
        Some(json!({"title": "", "author": "   ", "genre": "Fiction"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let details = body["error"]["details"].as_array().unwrap();
    let fields: Vec<&str> = details
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["title", "author"]);
}

#[tokio::test]
async fn non_owner_delete_reads_as_not_found() {
    let (app, _db) = test_app(None).await;
    let ada = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;
    let bob = signup_and_login(&app, "Bob", "b@x.com", "pw2").await;

    let (_, created) = request(
        &app,
        Method::POST,
        "/api/books",
        Some(&ada),
        Some(json!({"title": "Dune", "author": "Herbert", "genre": "Fiction"})),
    )
    .await;
    let book_id = created["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        Method::DELETE,
        &format!("/api/books/{book_id}"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    // The row is intact for its owner.
    let (_, own) = request(&app, Method::GET, "/api/books", Some(&ada), None).await;
    assert_eq!(own.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn public_read_is_idempotent() {
    let (app, _db) = test_app(None).await;
    let token = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (_, created) = request(
        &app,
        Method::POST,
        "/api/books",
        Some(&token),
        Some(json!({"title": "Dune", "author": "Herbert", "genre": "Fiction"})),
    )
    .await;
    let book_id = created["id"].as_str().unwrap().to_string();

    let (first_status, first) = get_raw(&app, &format!("/api/books/{book_id}")).await;
    let (second_status, second) = get_raw(&app, &format!("/api/books/{book_id}")).await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);

    let (status, _) = get_raw(&app, "/api/books/no-such-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn session_cookie_authenticates_requests() {
    let (app, _db) = test_app(None).await;
    let token = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/books")
                .header(header::COOKIE, format!("shelf_session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn login_sets_the_session_cookie() {
    let (app, _db) = test_app(None).await;
    signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"email": "a@x.com", "password": "pw1"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with("shelf_session="));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let (app, _db) = test_app(None).await;
    let token = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (status, _) = request(&app, Method::GET, "/api/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&app, Method::GET, "/api/books", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_login_creates_a_session_and_user() {
    let identity = google_identity("g-1", "carol@x.com", "Carol");
    let (app, _db) = test_app(Some(Arc::new(FixedIdentity(identity)))).await;

    let (status, body) = request(
        &app,
        Method::GET,
        "/api/auth/provider/callback?code=abc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "carol@x.com");
    let user_id = body["user"]["id"].as_str().unwrap().to_string();
    let token = body["token"].as_str().unwrap().to_string();

    // The session is as good as a credential login.
    let (status, _) = request(
        &app,
        Method::POST,
        "/api/books",
        Some(&token),
        Some(json!({"title": "Dune", "author": "Herbert", "genre": "Fiction"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Repeating the callback resolves to the same user.
    let (status, body) = request(
        &app,
        Method::GET,
        "/api/auth/provider/callback?code=def",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"].as_str().unwrap(), user_id);
}

#[tokio::test]
async fn provider_redirect_points_at_the_provider() {
    let identity = google_identity("g-1", "carol@x.com", "Carol");
    let (app, _db) = test_app(Some(Arc::new(FixedIdentity(identity)))).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/auth/provider/redirect")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let location = response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(location.starts_with("https://provider.test/authorize"));
}

#[tokio::test]
async fn provider_conflict_surfaces_as_conflict() {
    let (app, db) = test_app(Some(Arc::new(FixedIdentity(google_identity(
        "g-2",
        "ada@x.com",
        "Ada",
    )))))
    .await;

    // The email is already bound to a different external identity.
    shelf_auth::reconcile::reconcile_provider(&db, &google_identity("g-1", "ada@x.com", "Ada"))
        .await
        .unwrap();

    let (status, body) = request(
        &app,
        Method::GET,
        "/api/auth/provider/callback?code=abc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "conflict");
}

#[tokio::test]
async fn provider_routes_require_configuration() {
    let (app, _db) = test_app(None).await;

    let (status, _) = request(&app, Method::GET, "/api/auth/provider/redirect", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(
        &app,
        Method::GET,
        "/api/auth/provider/callback?code=abc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_sessions_gate_requests_end_to_end() {
    let mut settings = Settings::default();
    settings.auth.session.strategy = SessionStrategyKind::Signed;
    settings.auth.session.secret = "integration-signing-secret".to_string();
    let (app, _db) = test_app_with(settings, None).await;

    let token = signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (status, _) = request(
        &app,
        Method::POST,
        "/api/books",
        Some(&token),
        Some(json!({"title": "Dune", "author": "Herbert", "genre": "Fiction"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(&app, Method::GET, "/api/books", Some("tampered"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_links_existing_password_account() {
    let (app, _db) = test_app(Some(Arc::new(FixedIdentity(google_identity(
        "g-1",
        "a@x.com",
        "Ada",
    )))))
    .await;
    signup_and_login(&app, "Ada", "a@x.com", "pw1").await;

    let (status, body) = request(
        &app,
        Method::GET,
        "/api/auth/provider/callback?code=abc",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let provider_user = body["user"]["id"].as_str().unwrap().to_string();

    // Credential login still resolves to the same account.
    let (status, body) = request(
        &app,
        Method::POST,
        "/api/auth/login",
        None,
        Some(json!({"email": "a@x.com", "password": "pw1"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"].as_str().unwrap(), provider_user);
}
