use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use chrono::Duration;
use folio_backend::{
    auth::{GithubOAuth, OAuthError, OAuthProvider, SessionKeys},
    config::{Config, StorageConfig},
    create_app,
    db::{
        models::{GithubProfile, NewProject, Role},
        MemoryStore, PortfolioStore,
    },
    state::AppState,
    storage::{ObjectStorage, StorageError, StoredObject},
    theme::color::HexColor,
};

const OWNER_LOGIN: &str = "owner";

struct FakeGithub {
    identity: GithubProfile,
}

#[async_trait]
impl OAuthProvider for FakeGithub {
    fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, OAuthError> {
        Ok(format!(
            "https://github.test/login/oauth/authorize?state={state}&redirect_uri={redirect_uri}"
        ))
    }

    async fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<String, OAuthError> {
        if code == "good" {
            Ok("token".to_string())
        } else {
            Err(OAuthError::Provider("bad_verification_code".to_string()))
        }
    }

    async fn fetch_identity(&self, _access_token: &str) -> Result<GithubProfile, OAuthError> {
        Ok(self.identity.clone())
    }
}

#[derive(Default)]
struct RecordingStorage {
    puts: Mutex<Vec<(String, usize, String)>>,
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject, StorageError> {
        self.puts
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.len(), content_type.to_string()));
        Ok(StoredObject {
            key: key.to_string(),
            url: format!("https://cdn.test/{key}"),
        })
    }
}

struct Harness {
    app: Router,
    state: AppState,
    store: Arc<MemoryStore>,
    storage: Arc<RecordingStorage>,
}

fn profile(id: &str, login: &str) -> GithubProfile {
    GithubProfile {
        github_id: id.to_string(),
        login: login.to_string(),
        name: Some(login.to_string()),
        email: None,
        avatar_url: None,
    }
}

fn harness_with(config: Config) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let storage = Arc::new(RecordingStorage::default());
    let oauth = Arc::new(FakeGithub {
        identity: profile("1000", OWNER_LOGIN),
    });
    let state = AppState::new(
        config,
        store.clone(),
        storage.clone(),
        oauth,
        reqwest::Client::new(),
    );
    Harness {
        app: create_app(state.clone()),
        state,
        store,
        storage,
    }
}

fn harness() -> Harness {
    harness_with(Config {
        github_owner_username: Some(OWNER_LOGIN.to_string()),
        ..Config::default()
    })
}

impl Harness {
    async fn session_for(&self, github_id: &str, login: &str, role: Role) -> String {
        self.store.insert_user(&profile(github_id, login), role).await;
        let token = self.state.sessions.issue(github_id, login).unwrap();
        format!("app_session_id={token}")
    }

    async fn admin(&self) -> String {
        self.session_for("1", "admin", Role::Admin).await
    }

    async fn user(&self) -> String {
        self.session_for("2", "visitor", Role::User).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, body)
    }

    async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::get(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let (status, _, body) = self.send(builder.body(Body::empty()).unwrap()).await;
        (status, body)
    }

    async fn post(&self, uri: &str, cookie: Option<&str>, input: Value) -> (StatusCode, Value) {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let (status, _, body) = self
            .send(builder.body(Body::from(input.to_string())).unwrap())
            .await;
        (status, body)
    }

    async fn seed_projects(&self, count: usize) -> Vec<i32> {
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            let project = self
                .store
                .create_project(NewProject {
                    title: format!("Project {n}"),
                    sort_order: Some(n as i32),
                    ..Default::default()
                })
                .await
                .unwrap();
            ids.push(project.id);
        }
        ids
    }
}

fn data(body: &Value) -> &Value {
    &body["result"]["data"]
}

fn set_cookies(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

fn collect_keys(value: &Value, keys: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                keys.push(key.clone());
                collect_keys(inner, keys);
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_keys(v, keys)),
        _ => {}
    }
}

/// Every admin procedure as (method, path, input).
fn admin_procedures() -> Vec<(&'static str, &'static str, Value)> {
    let reorder = json!({ "items": [{ "id": 1, "sortOrder": 0 }] });
    vec![
        ("GET", "/api/trpc/adminProfile.get", Value::Null),
        ("POST", "/api/trpc/adminProfile.update", json!({ "fullName": "Ada" })),
        ("GET", "/api/trpc/adminProjects.list", Value::Null),
        ("POST", "/api/trpc/adminProjects.create", json!({ "title": "New" })),
        ("POST", "/api/trpc/adminProjects.update", json!({ "id": 999, "title": "X" })),
        ("POST", "/api/trpc/adminProjects.delete", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminProjects.reorder", reorder.clone()),
        ("POST", "/api/trpc/adminProjects.bulkTileSize", json!({ "tileSize": "wide" })),
        ("GET", "/api/trpc/adminExperiences.list", Value::Null),
        (
            "POST",
            "/api/trpc/adminExperiences.create",
            json!({ "role": "Engineer", "company": "Acme", "period": "2020 - 2024" }),
        ),
        ("POST", "/api/trpc/adminExperiences.update", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminExperiences.delete", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminExperiences.reorder", reorder.clone()),
        ("GET", "/api/trpc/adminSkills.list", Value::Null),
        ("POST", "/api/trpc/adminSkills.create", json!({ "title": "Languages" })),
        ("POST", "/api/trpc/adminSkills.update", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminSkills.delete", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminSkills.reorder", reorder.clone()),
        ("GET", "/api/trpc/adminEducation.list", Value::Null),
        (
            "POST",
            "/api/trpc/adminEducation.create",
            json!({ "institution": "MIT", "degree": "BSc", "startYear": 2010 }),
        ),
        ("POST", "/api/trpc/adminEducation.update", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminEducation.delete", json!({ "id": 999 })),
        ("POST", "/api/trpc/adminEducation.reorder", reorder),
        ("POST", "/api/trpc/theme.update", json!({ "darkMode": true })),
        ("POST", "/api/trpc/theme.reset", json!({})),
        ("GET", "/api/trpc/analytics.summary", Value::Null),
        ("GET", "/api/trpc/analytics.detail?projectId=1", Value::Null),
        (
            "POST",
            "/api/trpc/system.notifyOwner",
            json!({ "title": "Hi", "content": "There" }),
        ),
    ]
}

async fn call(h: &Harness, method: &str, path: &str, input: &Value, cookie: Option<&str>) -> StatusCode {
    if method == "GET" {
        h.get(path, cookie).await.0
    } else {
        h.post(path, cookie, input.clone()).await.0
    }
}

#[tokio::test]
async fn test_portfolio_get_all_is_public() {
    let h = harness();
    let (status, body) = h.get("/api/trpc/portfolio.getAll", None).await;
    assert_eq!(status, StatusCode::OK);
    for key in ["profile", "projects", "experiences", "skills", "education"] {
        assert!(data(&body).get(key).is_some(), "missing {key}");
    }

    let (status, body) = h.get("/api/trpc/theme.get", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["accentColor"], "#B85C38");
}

#[tokio::test]
async fn test_admin_procedures_require_admin_role() {
    let h = harness();
    let user = h.user().await;
    let admin = h.admin().await;

    for (method, path, input) in admin_procedures() {
        assert_eq!(
            call(&h, method, path, &input, None).await,
            StatusCode::UNAUTHORIZED,
            "{path} without session"
        );
        assert_eq!(
            call(&h, method, path, &input, Some(&user)).await,
            StatusCode::FORBIDDEN,
            "{path} as user"
        );
        let status = call(&h, method, path, &input, Some(&admin)).await;
        assert!(
            status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN,
            "{path} as admin got {status}"
        );
    }
}

#[tokio::test]
async fn test_invalid_session_is_anonymous() {
    let h = harness();
    let (status, body) = h
        .get("/api/trpc/auth.me", Some("app_session_id=forged.token.value"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(data(&body).is_null());

    let (status, _) = h
        .get("/api/trpc/adminProjects.list", Some("app_session_id=forged"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reorder_batch_bounds() {
    let h = harness();
    let admin = h.admin().await;
    let ids = h.seed_projects(100).await;
    let path = "/api/trpc/adminProjects.reorder";

    let (status, _) = h.post(path, Some(&admin), json!({ "items": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let too_many: Vec<Value> = (1..=101).map(|id| json!({ "id": id, "sortOrder": 0 })).collect();
    let (status, _) = h.post(path, Some(&admin), json!({ "items": too_many })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for bad in [
        json!({ "id": 0, "sortOrder": 1 }),
        json!({ "id": -3, "sortOrder": 1 }),
        json!({ "id": ids[0], "sortOrder": -1 }),
        json!({ "id": ids[0], "sortOrder": 10000 }),
    ] {
        let (status, _) = h.post(path, Some(&admin), json!({ "items": [bad] })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let reversed: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(n, id)| json!({ "id": id, "sortOrder": 9999 - n as i64 }))
        .collect();
    let (status, body) = h.post(path, Some(&admin), json!({ "items": reversed })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["success"], true);

    let projects = h.store.list_projects().await.unwrap();
    assert_eq!(projects.first().unwrap().id, *ids.last().unwrap());
    assert_eq!(projects.first().unwrap().sort_order, 9900);
}

#[tokio::test]
async fn test_reorder_unknown_id_changes_nothing() {
    let h = harness();
    let admin = h.admin().await;
    let ids = h.seed_projects(2).await;

    let (status, _) = h
        .post(
            "/api/trpc/adminProjects.reorder",
            Some(&admin),
            json!({ "items": [
                { "id": ids[0], "sortOrder": 50 },
                { "id": 4242, "sortOrder": 60 }
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let projects = h.store.list_projects().await.unwrap();
    assert_eq!(projects[0].id, ids[0]);
    assert_eq!(projects[0].sort_order, 0);
}

#[tokio::test]
async fn test_theme_round_trip_uses_camel_case() {
    let h = harness();
    let admin = h.admin().await;

    let (status, _) = h
        .post(
            "/api/trpc/theme.update",
            Some(&admin),
            json!({ "accentColor": "#2563EB", "layoutMode": "combined" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h.get("/api/trpc/theme.get", None).await;
    assert_eq!(status, StatusCode::OK);
    let theme = data(&body);
    assert_eq!(theme["accentColor"], "#2563EB");
    assert_eq!(theme["layoutMode"], "combined");

    let hover = HexColor::parse(theme["accentColorHover"].as_str().unwrap()).unwrap();
    let accent = HexColor::parse("#2563EB").unwrap();
    assert!(hover.relative_luminance() < accent.relative_luminance());

    let mut keys = Vec::new();
    collect_keys(theme, &mut keys);
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|k| !k.contains('_')), "{keys:?}");
}

#[tokio::test]
async fn test_derived_hover_of_default_accent_is_darker() {
    let accent = HexColor::parse("#B85C38").unwrap();
    assert!(accent.derive_hover().relative_luminance() < accent.relative_luminance());
}

#[tokio::test]
async fn test_theme_update_validation() {
    let h = harness();
    let admin = h.admin().await;
    for input in [
        json!({ "accentColor": "blue" }),
        json!({ "headingFont": "Comic Sans MS" }),
        json!({ "sectionOrder": "hero,about,hero" }),
        json!({ "hiddenSections": "hero,footer" }),
        json!({ "layoutMode": "grid" }),
        json!({ "sectionTitles": { "about": "x".repeat(101) } }),
    ] {
        let (status, _) = h.post("/api/trpc/theme.update", Some(&admin), input.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{input}");
    }
}

#[tokio::test]
async fn test_theme_layout_and_reset() {
    let h = harness();
    let admin = h.admin().await;
    h.post(
        "/api/trpc/theme.update",
        Some(&admin),
        json!({
            "sectionOrder": "projects,hero",
            "hiddenSections": "contact",
            "sectionTitles": { "projects": "Selected Work" }
        }),
    )
    .await;

    let (_, body) = h.get("/api/trpc/theme.layout", None).await;
    let sections = data(&body)["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 7);
    assert_eq!(sections[0]["key"], "projects");
    assert_eq!(sections[0]["title"], "Selected Work");
    assert_eq!(sections[1]["key"], "hero");
    let contact = sections.iter().find(|s| s["key"] == "contact").unwrap();
    assert_eq!(contact["visible"], false);

    let (status, body) = h.post("/api/trpc/theme.reset", Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        data(&body)["sectionOrder"],
        "hero,about,projects,skills,experience,education,contact"
    );
}

#[tokio::test]
async fn test_theme_stylesheet_is_public() {
    let h = harness();
    let response = h
        .app
        .clone()
        .oneshot(Request::get("/api/theme.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let css = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(css.contains(":root {"));
    assert!(css.contains("--accent-hex: #B85C38;"));
}

#[tokio::test]
async fn test_project_crud() {
    let h = harness();
    let admin = h.admin().await;

    let (status, body) = h
        .post(
            "/api/trpc/adminProjects.create",
            Some(&admin),
            json!({ "title": "Folio", "tags": "rust,axum", "tileSize": "large" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let id = data(&body)["id"].as_i64().unwrap();
    assert_eq!(data(&body)["tileSize"], "large");

    let (status, body) = h
        .post(
            "/api/trpc/adminProjects.update",
            Some(&admin),
            json!({ "id": id, "featured": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["featured"], 1);
    assert_eq!(data(&body)["title"], "Folio");

    let (status, _) = h
        .post(
            "/api/trpc/adminProjects.create",
            Some(&admin),
            json!({ "title": "Bad", "liveUrl": "javascript:alert(1)" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = h
        .post("/api/trpc/adminProjects.delete", Some(&admin), json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = h
        .post("/api/trpc/adminProjects.delete", Some(&admin), json!({ "id": id }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let h = harness();
    let admin = h.admin().await;
    let (status, body) = h
        .post("/api/trpc/adminProjects.create", Some(&admin), json!({ "tags": "x" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_bulk_tile_size() {
    let h = harness();
    let admin = h.admin().await;
    h.seed_projects(3).await;
    let (status, body) = h
        .post(
            "/api/trpc/adminProjects.bulkTileSize",
            Some(&admin),
            json!({ "tileSize": "small" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["updated"], 3);
    let projects = h.store.list_projects().await.unwrap();
    assert!(projects.iter().all(|p| p.tile_size.as_str() == "small"));
}

#[tokio::test]
async fn test_analytics_track_and_summary() {
    let h = harness();
    let admin = h.admin().await;
    let ids = h.seed_projects(1).await;

    for event in ["view", "view", "click"] {
        let (status, body) = h
            .post(
                "/api/trpc/analytics.track",
                None,
                json!({ "projectId": ids[0], "eventType": event }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(data(&body)["tracked"], true);
    }

    let (status, body) = h.get("/api/trpc/analytics.summary", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let summary = &data(&body)[0];
    assert_eq!(summary["projectId"], ids[0]);
    assert_eq!(summary["views"], 2);
    assert_eq!(summary["clicks"], 1);

    let input = urlencode(&json!({ "projectId": ids[0] }).to_string());
    let (status, body) = h
        .get(&format!("/api/trpc/analytics.detail?input={input}"), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["totalViews"], 2);
    assert_eq!(data(&body)["events"].as_array().unwrap().len(), 3);
}

fn urlencode(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

#[tokio::test]
async fn test_notify_owner_without_webhook() {
    let h = harness();
    let admin = h.admin().await;
    let (status, body) = h
        .post(
            "/api/trpc/system.notifyOwner",
            Some(&admin),
            json!({ "title": "Hello", "content": "New contact form message" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["delivered"], false);

    let (status, _) = h
        .post(
            "/api/trpc/system.notifyOwner",
            Some(&admin),
            json!({ "title": "", "content": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// 1x1 transparent PNG
const PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

fn upload_body(content_type: &str) -> Value {
    json!({ "fileData": PNG_BASE64, "fileName": "avatar.png", "contentType": content_type })
}

#[tokio::test]
async fn test_upload_access_control() {
    let h = harness();
    let (status, _) = h.post("/api/upload", None, upload_body("image/png")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = h.user().await;
    let (status, _) = h.post("/api/upload", Some(&user), upload_body("image/png")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(h.storage.puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_rejects_bad_payloads() {
    let h = harness();
    let admin = h.admin().await;

    for content_type in ["application/pdf", "text/html", "image/bmp"] {
        let (status, _) = h
            .post("/api/upload", Some(&admin), upload_body(content_type))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{content_type}");
    }

    let cases = [
        json!({ "fileName": "a.png", "contentType": "image/png" }),
        json!({ "fileData": "!!!", "fileName": "a.png", "contentType": "image/png" }),
        json!({ "fileData": PNG_BASE64, "fileName": "a.jpg", "contentType": "image/jpeg" }),
        json!({
            "fileData": "A".repeat(10 * 1024 * 1024 + 4),
            "fileName": "a.png",
            "contentType": "image/png"
        }),
    ];
    for body in cases {
        let (status, _) = h.post("/api/upload", Some(&admin), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
    assert!(h.storage.puts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_stores_image() {
    let h = harness();
    let admin = h.admin().await;
    let (status, body) = h
        .post("/api/upload", Some(&admin), upload_body("image/png"))
        .await;
    assert_eq!(status, StatusCode::OK);

    let key = body["key"].as_str().unwrap();
    assert!(key.starts_with("portfolio/images/"));
    assert!(key.ends_with(".png"));
    assert_eq!(body["url"], format!("https://cdn.test/{key}"));

    let puts = h.storage.puts.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].2, "image/png");
}

#[tokio::test]
async fn test_upload_owner_pin() {
    let h = harness_with(Config {
        owner_github_id: Some("77".to_string()),
        ..Config::default()
    });
    let other_admin = h.admin().await;
    let (status, _) = h
        .post("/api/upload", Some(&other_admin), upload_body("image/png"))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let owner = h.session_for("77", "owner", Role::Admin).await;
    let (status, _) = h.post("/api/upload", Some(&owner), upload_body("image/png")).await;
    assert_eq!(status, StatusCode::OK);
}

async fn start_login(h: &Harness, return_path: &str) -> (String, String) {
    let (status, headers, _) = h
        .send(
            Request::get(format!("/api/auth/github?returnPath={return_path}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::FOUND);

    let location = headers[header::LOCATION].to_str().unwrap();
    let parsed = url::Url::parse(location).unwrap();
    let state = parsed
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    let cookie = set_cookies(&headers)
        .into_iter()
        .find(|c| c.starts_with("oauth_state="))
        .map(|c| cookie_pair(&c))
        .unwrap();
    (state, cookie)
}

async fn callback(h: &Harness, query: &str, cookie: &str) -> (StatusCode, HeaderMap) {
    let (status, headers, _) = h
        .send(
            Request::get(format!("/api/auth/github/callback?{query}"))
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    (status, headers)
}

#[tokio::test]
async fn test_oauth_login_issues_session_and_promotes_owner() {
    let h = harness();
    let (state, state_cookie) = start_login(&h, "/admin").await;

    let (status, headers) = callback(&h, &format!("code=good&state={state}"), &state_cookie).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/admin");

    let session = set_cookies(&headers)
        .into_iter()
        .find(|c| c.starts_with("app_session_id=") && !c.contains("Max-Age=0"))
        .unwrap();
    assert!(session.contains("HttpOnly"));

    let (status, body) = h.get("/api/trpc/auth.me", Some(&cookie_pair(&session))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["login"], OWNER_LOGIN);
    assert_eq!(data(&body)["role"], "admin");

    let audit = h.store.audit_log().await;
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor_github_id, "1000");
}

#[tokio::test]
async fn test_oauth_open_redirect_is_neutralized() {
    let h = harness();
    let (state, state_cookie) = start_login(&h, "//evil.example").await;
    let (status, headers) = callback(&h, &format!("code=good&state={state}"), &state_cookie).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/");
}

#[tokio::test]
async fn test_oauth_callback_failures() {
    let h = harness();
    let (state, state_cookie) = start_login(&h, "/").await;

    let (status, _) = callback(&h, &format!("state={state}"), &state_cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = callback(&h, "code=good&state=garbage", &state_cookie).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = callback(&h, &format!("code=good&state={state}"), "oauth_state=wrong").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, headers) = callback(&h, &format!("code=bad&state={state}"), &state_cookie).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!set_cookies(&headers)
        .iter()
        .any(|c| c.starts_with("app_session_id=")));
}

#[tokio::test]
async fn test_oauth_unconfigured_is_server_error() {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        Config::default(),
        store,
        Arc::new(RecordingStorage::default()),
        Arc::new(GithubOAuth::new(reqwest::Client::new(), None, None)),
        reqwest::Client::new(),
    );
    let response = create_app(state)
        .oneshot(Request::get("/api/auth/github").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let h = harness();
    let (status, headers, body) = h
        .send(Request::post("/api/trpc/auth.logout").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["success"], true);
    let cookies = set_cookies(&headers);
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("app_session_id=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_health_and_security_headers() {
    let h = harness();
    let (status, headers, body) = h
        .send(Request::get("/api/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_auth_rate_limit() {
    let h = harness();
    let request = || {
        Request::get("/api/auth/github")
            .header("x-forwarded-for", "198.51.100.9")
            .body(Body::empty())
            .unwrap()
    };
    for _ in 0..20 {
        let (status, _, _) = h.send(request()).await;
        assert_eq!(status, StatusCode::FOUND);
    }
    let (status, _, body) = h.send(request()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");
}

#[tokio::test]
async fn test_session_signed_with_a_guessable_secret_is_rejected() {
    let h = harness();
    h.admin().await;
    let forged = SessionKeys::new(
        "default-jwt-secret-change-in-production",
        Duration::days(1),
        false,
    )
    .issue("1", "admin")
    .unwrap();
    let (status, _) = h
        .get(
            "/api/trpc/adminProjects.list",
            Some(&format!("app_session_id={forged}")),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_boolean_flags_travel_as_numbers() {
    let h = harness();
    let admin = h.admin().await;

    let (status, body) = h
        .post(
            "/api/trpc/adminProjects.create",
            Some(&admin),
            json!({ "title": "Flagged", "featured": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["featured"], 1);

    let (status, body) = h
        .post(
            "/api/trpc/adminProfile.update",
            Some(&admin),
            json!({ "fullName": "Ada", "availableForWork": 0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["availableForWork"], 0);

    let (_, body) = h.get("/api/trpc/portfolio.getAll", None).await;
    assert_eq!(data(&body)["projects"][0]["featured"], 1);
    assert_eq!(data(&body)["profile"]["availableForWork"], 0);
}

#[tokio::test]
async fn test_education_end_year_can_be_cleared() {
    let h = harness();
    let admin = h.admin().await;
    let (_, body) = h
        .post(
            "/api/trpc/adminEducation.create",
            Some(&admin),
            json!({ "institution": "MIT", "degree": "BSc", "startYear": 2010, "endYear": 2014 }),
        )
        .await;
    let id = data(&body)["id"].as_i64().unwrap();

    let (status, body) = h
        .post(
            "/api/trpc/adminEducation.update",
            Some(&admin),
            json!({ "id": id, "degree": "MSc" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(data(&body)["endYear"], 2014);

    let (status, body) = h
        .post(
            "/api/trpc/adminEducation.update",
            Some(&admin),
            json!({ "id": id, "endYear": null }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(data(&body)["endYear"].is_null());

    let (_, body) = h.get("/api/trpc/adminEducation.list", Some(&admin)).await;
    assert!(data(&body)[0]["endYear"].is_null());
    assert_eq!(data(&body)[0]["degree"], "MSc");
}

#[tokio::test]
async fn test_stylesheet_uses_stored_custom_hover() {
    let h = harness();
    let admin = h.admin().await;
    let (status, _) = h
        .post(
            "/api/trpc/theme.update",
            Some(&admin),
            json!({ "accentColor": "#2563EB", "accentColorHover": "#112233" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let response = h
        .app
        .clone()
        .oneshot(Request::get("/api/theme.css").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let css = String::from_utf8(bytes.to_vec()).unwrap();
    let hover = HexColor::parse("#112233").unwrap().to_oklch().to_string();
    assert!(css.contains(&format!("--color-terracotta-dark: {hover};")), "{css}");
    assert!(css.contains("--accent-hover-hex: #112233;"));
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_limit() {
    let h = harness();
    for n in 0..20 {
        let (status, _, _) = h
            .send(
                Request::get("/api/auth/github")
                    .header("x-forwarded-for", format!("198.51.100.{n}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::FOUND);
    }
    let (status, _, _) = h
        .send(
            Request::get("/api/auth/github")
                .header("x-forwarded-for", "203.0.113.250")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_forwarded_for_is_honoured_behind_trusted_proxy() {
    let h = harness_with(Config {
        trust_proxy: true,
        ..Config::default()
    });
    let from = |ip: &str| {
        Request::get("/api/auth/github")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };
    for _ in 0..20 {
        assert_eq!(h.send(from("198.51.100.1")).await.0, StatusCode::FOUND);
    }
    assert_eq!(h.send(from("198.51.100.1")).await.0, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(h.send(from("198.51.100.2")).await.0, StatusCode::FOUND);
}

#[tokio::test]
async fn test_uploaded_files_are_sandboxed() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("logo.svg"),
        r#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#,
    )
    .unwrap();
    let h = harness_with(Config {
        storage: StorageConfig::Local {
            dir: dir.path().to_string_lossy().into_owned(),
            public_prefix: "/uploads".to_string(),
        },
        ..Config::default()
    });

    let (status, headers, _) = h
        .send(Request::get("/uploads/logo.svg").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    let csp = headers[header::CONTENT_SECURITY_POLICY].to_str().unwrap();
    assert!(csp.contains("sandbox"));
    assert!(csp.contains("default-src 'none'"));
}
