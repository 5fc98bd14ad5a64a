pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::compliance::handlers as compliance;
use crate::documents::handlers as documents;
use crate::documents::validation::MAX_UPLOAD_BYTES;
use crate::faq::handlers as faq;
use crate::state::AppState;

/// Multipart framing and form fields on top of the largest accepted file.
/// Oversized files still reach the validator so the caller gets the portal's message.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/signup", post(auth::handle_sign_up))
        .route("/api/v1/auth/login", post(auth::handle_sign_in))
        .route("/api/v1/auth/federated", post(auth::handle_federated_sign_in))
        .route("/api/v1/auth/logout", post(auth::handle_sign_out))
        .route("/api/v1/auth/me", get(auth::handle_me))
        .route("/api/v1/users/:id/role", patch(auth::handle_set_role))
        .route("/api/v1/navigate", get(auth::handle_navigate))
        // FAQ assistant
        .route("/api/v1/faq", get(faq::handle_list_faq))
        .route("/api/v1/faq/answer", post(faq::handle_answer))
        .route("/api/v1/chat/sessions", post(faq::handle_open_chat))
        .route(
            "/api/v1/chat/sessions/:id",
            get(faq::handle_get_chat).delete(faq::handle_close_chat),
        )
        .route(
            "/api/v1/chat/sessions/:id/messages",
            post(faq::handle_send_message),
        )
        // Documents
        .route(
            "/api/v1/documents",
            post(documents::handle_upload)
                .get(documents::handle_list)
                .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/documents/stream", get(documents::handle_stream))
        .route(
            "/api/v1/documents/:id/review",
            patch(documents::handle_review),
        )
        // Compliance
        .route("/api/v1/compliance", get(compliance::handle_my_compliance))
        .route(
            "/api/v1/compliance/:user_id",
            get(compliance::handle_user_compliance),
        )
        .route("/api/v1/hr/overview", get(compliance::handle_hr_overview))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::auth::models::Role;
    use crate::config::{BackendKind, Config};

    const BOUNDARY: &str = "portal-test-boundary";

    const RELAY_SECRET: &str = "relay-secret";

    fn test_config() -> Config {
        Config {
            backend: BackendKind::Memory,
            postgres: None,
            port: 0,
            rust_log: "debug".to_string(),
            password_hash_iterations: 1_000,
            hr_bootstrap_emails: Vec::new(),
            federation_secret: None,
            cors_allowed_origins: Vec::new(),
        }
    }

    fn test_state() -> AppState {
        AppState::in_memory(test_config())
    }

    async fn federated(app: &Router, secret: Option<&str>, subject: &str, email: &str) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/federated")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(s) = secret {
            req = req.header(auth::FEDERATION_SECRET_HEADER, s);
        }
        let body = json!({"subject": subject, "email": email, "display_name": "Visitor"});
        let resp = app
            .clone()
            .oneshot(req.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn multipart_body(category: Option<&str>, mime: &str, contents: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some(c) = category {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"category\"\r\n\r\n{c}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"doc.pdf\"\r\nContent-Type: {mime}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn upload(app: &Router, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/documents")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn sign_up(app: &Router, email: &str, name: &str) -> (String, String) {
        let (status, body) = send(
            app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": email, "password": "secret1", "display_name": name})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        (
            body["token"].as_str().unwrap().to_string(),
            body["principal"]["user_id"].as_str().unwrap().to_string(),
        )
    }

    /// Signs up a user and promotes them to HR directly through the auth service.
    async fn sign_up_hr(state: &AppState, app: &Router) -> String {
        let (token, user_id) = sign_up(app, "hr@corp.com", "Helen").await;
        state
            .auth
            .set_role(user_id.parse::<Uuid>().unwrap(), Role::Hr)
            .await
            .unwrap();
        token
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state());
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "compliance-portal");
    }

    #[tokio::test]
    async fn test_faq_answer_is_public() {
        let app = build_router(test_state());
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/faq/answer",
            None,
            Some(json!({"text": "What file formats are accepted?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["answer"].as_str().unwrap().contains("PDF"));

        let (status, body) = send(&app, Method::GET, "/api/v1/faq", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["questions"].as_array().unwrap().len(), 8);
        assert_eq!(body["quick_actions"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_chat_requires_sign_in_and_owner() {
        let app = build_router(test_state());
        let (status, _) = send(&app, Method::POST, "/api/v1/chat/sessions", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (ann, _) = sign_up(&app, "ann@corp.com", "Ann").await;
        let (bob, _) = sign_up(&app, "bob@corp.com", "Bob").await;

        let (status, session) =
            send(&app, Method::POST, "/api/v1/chat/sessions", Some(&ann), None).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session["messages"].as_array().unwrap().len(), 1);
        let uri = format!("/api/v1/chat/sessions/{}", session["id"].as_str().unwrap());

        let (status, exchange) = send(
            &app,
            Method::POST,
            &format!("{uri}/messages"),
            Some(&ann),
            Some(json!({"text": "how long does review take"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(exchange["user"]["origin"], "user");
        assert_eq!(exchange["assistant"]["origin"], "assistant");

        let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, Some(&ann), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, &uri, Some(&ann), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_review_and_compliance_flow() {
        let state = test_state();
        let app = build_router(state.clone());
        let (ann, ann_id) = sign_up(&app, "ann@corp.com", "Ann").await;
        let hr = sign_up_hr(&state, &app).await;

        let (status, record) = upload(
            &app,
            &ann,
            multipart_body(Some("id_proof"), "application/pdf", b"%PDF-1.4"),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(record["status"], "pending");
        assert_eq!(record["owner_id"], ann_id.as_str());
        let review_uri = format!("/api/v1/documents/{}/review", record["id"].as_str().unwrap());

        // Employees cannot review.
        let (status, _) = send(
            &app,
            Method::PATCH,
            &review_uri,
            Some(&ann),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, reviewed) = send(
            &app,
            Method::PATCH,
            &review_uri,
            Some(&hr),
            Some(json!({"status": "approved"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reviewed["status"], "approved");
        assert!(reviewed["reviewed_at"].is_string());

        let (status, summary) =
            send(&app, Method::GET, "/api/v1/compliance", Some(&ann), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["approved_count"], 1);
        assert_eq!(summary["pending_count"], 3);
        assert_eq!(summary["percentage"], 25);
        assert_eq!(summary["has_issues"], true);

        let (status, overview) = send(
            &app,
            Method::GET,
            "/api/v1/hr/overview?search=ANN",
            Some(&hr),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(overview["stats"]["total_documents"], 1);
        assert_eq!(overview["stats"]["approved_documents"], 1);
        assert_eq!(overview["employees"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        let state = test_state();
        let app = build_router(state.clone());
        let (ann, _) = sign_up(&app, "ann@corp.com", "Ann").await;
        let hr = sign_up_hr(&state, &app).await;

        let (status, body) = upload(
            &app,
            &ann,
            multipart_body(Some("id_proof"), "application/zip", b"PK"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNSUPPORTED_TYPE");
        assert_eq!(
            body["error"]["message"],
            "Only PDF, JPEG, and PNG files are allowed"
        );

        let too_big = vec![0u8; MAX_UPLOAD_BYTES as usize + 1];
        let (status, body) = upload(
            &app,
            &ann,
            multipart_body(Some("id_proof"), "application/pdf", &too_big),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["message"], "File size must be less than 10MB");

        let (status, body) = upload(
            &app,
            &ann,
            multipart_body(None, "application/pdf", b"%PDF"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MISSING_FIELD");

        let (status, _) = upload(
            &app,
            &hr,
            multipart_body(Some("id_proof"), "application/pdf", b"%PDF"),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        assert!(state
            .documents
            .query(crate::documents::store::DocumentQuery::all())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_employee_cannot_read_other_compliance() {
        let state = test_state();
        let app = build_router(state.clone());
        let (ann, _) = sign_up(&app, "ann@corp.com", "Ann").await;
        let (_, bob_id) = sign_up(&app, "bob@corp.com", "Bob").await;
        let hr = sign_up_hr(&state, &app).await;
        let uri = format!("/api/v1/compliance/{bob_id}");

        let (status, _) = send(&app, Method::GET, &uri, Some(&ann), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let (status, _) = send(&app, Method::GET, "/api/v1/hr/overview", Some(&ann), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, summary) = send(&app, Method::GET, &uri, Some(&hr), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["percentage"], 0);
        assert_eq!(summary["required_total"], 4);
    }

    #[tokio::test]
    async fn test_navigation_and_sign_out() {
        let app = build_router(test_state());
        let (status, body) = send(
            &app,
            Method::GET,
            "/api/v1/navigate?path=/hr-dashboard",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "unauthenticated");
        assert_eq!(body["outcome"], json!({"action": "render", "route": "login"}));

        let (ann, _) = sign_up(&app, "ann@corp.com", "Ann").await;
        let (_, body) = send(
            &app,
            Method::GET,
            "/api/v1/navigate?path=/hr-dashboard",
            Some(&ann),
            None,
        )
        .await;
        assert_eq!(body["state"], "employee");
        assert_eq!(body["redirects"], json!(["dashboard", "employee_dashboard"]));

        let (status, _) = send(&app, Method::POST, "/api/v1/auth/logout", Some(&ann), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, Method::GET, "/api/v1/auth/me", Some(&ann), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_federated_sign_in_is_disabled_without_secret() {
        let app = build_router(test_state());
        let (status, _) = federated(&app, Some(RELAY_SECRET), "google|1", "eve@corp.com").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_federated_sign_in_cannot_claim_foreign_account() {
        let mut config = test_config();
        config.federation_secret = Some(RELAY_SECRET.to_string());
        let state = AppState::in_memory(config);
        let app = build_router(state.clone());
        let hr = sign_up_hr(&state, &app).await;

        // No relay secret: the asserted identity is not trusted at all.
        let (status, body) = federated(&app, None, "attacker", "hr@corp.com").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("token").is_none());
        let (status, _) = federated(&app, Some("guess"), "attacker", "hr@corp.com").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Even a trusted relay cannot take over an email held by another account.
        let (status, body) = federated(&app, Some(RELAY_SECRET), "attacker", "HR@corp.com").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.get("token").is_none());

        let (status, me) = send(&app, Method::GET, "/api/v1/auth/me", Some(&hr), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["role"], "hr");
        assert_eq!(state.auth.list_profiles().await.unwrap().len(), 1);

        // A fresh identity is created as an employee and keeps its account on return.
        let (status, first) = federated(&app, Some(RELAY_SECRET), "google|7", "eve@corp.com").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["principal"]["role"], "employee");
        let (_, second) = federated(&app, Some(RELAY_SECRET), "google|7", "eve@corp.com").await;
        assert_eq!(second["principal"]["user_id"], first["principal"]["user_id"]);
    }

    #[tokio::test]
    async fn test_bootstrap_email_signs_up_as_hr() {
        let mut config = test_config();
        config.hr_bootstrap_emails = vec!["boss@corp.com".to_string()];
        let app = build_router(AppState::in_memory(config));

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({"email": "Boss@Corp.com", "password": "secret1", "display_name": "Boss"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["principal"]["role"], "hr");
        let boss = body["token"].as_str().unwrap().to_string();

        let (ann, _) = sign_up(&app, "ann@corp.com", "Ann").await;
        let (_, me) = send(&app, Method::GET, "/api/v1/auth/me", Some(&ann), None).await;
        assert_eq!(me["role"], "employee");

        let (status, _) = send(&app, Method::GET, "/api/v1/hr/overview", Some(&boss), None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
