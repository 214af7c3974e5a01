//! End-to-end tests: real HTTP transport against the in-memory backend

use points_admin::domain::types::{AdjustKind, AdjustPoints, Page, PointTypeCreate};
use points_admin::domain::ApiError;
use points_admin::io::mock_backend::{
    self, MockBackend, DEFAULT_PASSWORD, DEFAULT_USERNAME, REJECTED_CODE,
};
use points_admin::io::notify::{RecordingNavigator, RecordingNotifier, Variant};
use points_admin::io::{ApiClient, FileTokenStore, HttpTransport, TokenStore};
use points_admin::services::{AuthApi, LeaderboardApi, PointTypesApi, Session, UserPointsApi};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::watch;

struct Fixture {
    client: ApiClient,
    backend: Arc<MockBackend>,
    notifier: Arc<RecordingNotifier>,
    navigator: Arc<RecordingNavigator>,
    session: Arc<Session>,
    token_path: std::path::PathBuf,
    _dir: TempDir,
    _shutdown: watch::Sender<bool>,
}

async fn start_backend(backend: Arc<MockBackend>) -> (SocketAddr, watch::Sender<bool>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = watch::channel(false);
    tokio::spawn(mock_backend::serve(listener, backend, rx));
    (addr, tx)
}

async fn fixture() -> Fixture {
    let backend = Arc::new(MockBackend::new());
    let (addr, shutdown) = start_backend(backend.clone()).await;

    let dir = TempDir::new().unwrap();
    let token_path = dir.path().join("state").join("session.json");
    let session = Arc::new(Session::new(FileTokenStore::new(&token_path)));
    let transport =
        HttpTransport::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let client = ApiClient::new(
        Arc::new(transport),
        session.clone(),
        notifier.clone(),
        navigator.clone(),
    );

    Fixture {
        client,
        backend,
        notifier,
        navigator,
        session,
        token_path,
        _dir: dir,
        _shutdown: shutdown,
    }
}

async fn logged_in() -> Fixture {
    let fx = fixture().await;
    AuthApi::new(&fx.client).login(DEFAULT_USERNAME, DEFAULT_PASSWORD).await.unwrap();
    fx
}

#[tokio::test]
async fn test_login_persists_token_and_authorizes_calls() {
    let fx = logged_in().await;

    assert!(fx.session.is_authenticated());
    let stored = FileTokenStore::new(&fx.token_path).load().unwrap();
    assert!(stored.is_some());

    let items = PointTypesApi::new(&fx.client).list(Page::default()).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].uri, "base");
    assert_eq!(fx.notifier.count(), 0);
    assert!(fx.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_point_types_are_paged() {
    let fx = logged_in().await;
    let api = PointTypesApi::new(&fx.client);
    for (uri, name) in [("event", "Event"), ("season", "Season")] {
        let body = PointTypeCreate {
            uri: uri.to_string(),
            display_name: name.to_string(),
            description: String::new(),
        };
        api.create(&body).await.unwrap();
    }

    let first = api.list(Page::new(2, 0)).await.unwrap();
    assert_eq!(first.iter().map(|p| p.uri.as_str()).collect::<Vec<_>>(), vec!["base", "event"]);
    let rest = api.list(Page::new(2, 2)).await.unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].uri, "season");
    assert!(api.list(Page::new(2, 10)).await.unwrap().is_empty());
    assert_eq!(fx.notifier.count(), 0);
}

#[tokio::test]
async fn test_bad_credentials_are_a_domain_error() {
    let fx = fixture().await;

    let err = AuthApi::new(&fx.client).login(DEFAULT_USERNAME, "wrong").await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Domain {
            code: REJECTED_CODE,
            message: "invalid username or password".to_string()
        }
    );
    assert!(!fx.session.is_authenticated());
    assert_eq!(fx.notifier.count(), 1);
    assert!(fx.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_missing_token_tears_down_session() {
    let fx = fixture().await;

    let err = PointTypesApi::new(&fx.client).list(Page::default()).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);

    let notes = fx.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Unauthorized");
    assert_eq!(notes[0].description, "Please log in again");
    assert_eq!(notes[0].variant, Variant::Destructive);
    assert_eq!(fx.navigator.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_revoked_token_clears_persisted_session() {
    let fx = logged_in().await;
    fx.backend.revoke_all();

    let err = LeaderboardApi::new(&fx.client).list("1").await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert!(!fx.session.is_authenticated());
    assert_eq!(FileTokenStore::new(&fx.token_path).load().unwrap(), None);
    assert_eq!(fx.navigator.redirects().len(), 1);
}

#[tokio::test]
async fn test_overdraft_is_a_domain_error_and_keeps_session() {
    let fx = logged_in().await;

    let adjust = AdjustPoints {
        user_id: "u2".to_string(),
        kind: AdjustKind::Subtract,
        amount: 1000,
        reason: Some("refund".to_string()),
    };
    let err = UserPointsApi::new(&fx.client).adjust("1", &adjust).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Domain { code: REJECTED_CODE, message: "insufficient balance".to_string() }
    );

    let notes = fx.notifier.notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].description, "insufficient balance");
    assert!(fx.session.is_authenticated());
    assert!(fx.navigator.redirects().is_empty());
    assert_eq!(fx.backend.balance("1", "u2"), Some(80));
}

#[tokio::test]
async fn test_adjust_then_leaderboard_reflects_balance() {
    let fx = logged_in().await;

    let adjust = AdjustPoints {
        user_id: "u2".to_string(),
        kind: AdjustKind::Add,
        amount: 500,
        reason: None,
    };
    UserPointsApi::new(&fx.client).adjust("1", &adjust).await.unwrap();

    let top = LeaderboardApi::new(&fx.client).top("1", 1).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].user_id, "u2");
    assert_eq!(top[0].points, 580);
}

#[tokio::test]
async fn test_http_401_tears_down_with_body_message() {
    let fx = logged_in().await;
    fx.backend.push_fault(401, json!({"message": "token expired"}));

    let err = PointTypesApi::new(&fx.client).list(Page::default()).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert_eq!(fx.notifier.notifications()[0].description, "token expired");
    assert!(!fx.session.is_authenticated());
    assert_eq!(fx.navigator.redirects(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn test_error_status_with_forbidden_code_tears_down() {
    let fx = logged_in().await;
    fx.backend.push_fault(403, json!({"code": 3999, "message": "kicked out"}));

    let err = PointTypesApi::new(&fx.client).list(Page::default()).await.unwrap_err();
    assert_eq!(err, ApiError::Unauthorized);
    assert!(!fx.session.is_authenticated());
}

#[tokio::test]
async fn test_server_error_uses_body_message() {
    let fx = logged_in().await;
    fx.backend.push_fault(500, json!({"message": "server exploded"}));

    let err = PointTypesApi::new(&fx.client).list(Page::default()).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Transport { status: Some(500), message: "server exploded".to_string() }
    );
    assert!(fx.session.is_authenticated());
    assert!(fx.navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_server_error_without_message_uses_status_text() {
    let fx = logged_in().await;
    fx.backend.push_fault(502, json!("bad gateway"));

    let err = PointTypesApi::new(&fx.client).list(Page::default()).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::Transport {
            status: Some(502),
            message: "request failed with status code 502".to_string()
        }
    );
}

#[tokio::test]
async fn test_unreachable_backend_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = Arc::new(Session::new(points_admin::io::MemoryTokenStore::with_token("t")));
    let notifier = Arc::new(RecordingNotifier::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let transport =
        HttpTransport::new(&format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let client =
        ApiClient::new(Arc::new(transport), session.clone(), notifier.clone(), navigator.clone());

    let err = PointTypesApi::new(&client).list(Page::default()).await.unwrap_err();
    match err {
        ApiError::Transport { status, message } => {
            assert_eq!(status, None);
            assert!(!message.is_empty());
        }
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(notifier.count(), 1);
    assert!(session.is_authenticated());
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_concurrent_forbidden_calls_are_idempotent() {
    let fx = logged_in().await;
    fx.backend.revoke_all();

    let api = PointTypesApi::new(&fx.client);
    let (a, b) = tokio::join!(api.list(Page::default()), api.detail("1"));
    assert_eq!(a.unwrap_err(), ApiError::Unauthorized);
    assert_eq!(b.unwrap_err(), ApiError::Unauthorized);

    assert_eq!(fx.notifier.count(), 2);
    assert!(fx.navigator.redirects().iter().all(|r| r == "/login"));
    assert!(!fx.session.is_authenticated());
    assert_eq!(FileTokenStore::new(&fx.token_path).load().unwrap(), None);
}

#[tokio::test]
async fn test_logout_revokes_and_clears() {
    let fx = logged_in().await;
    assert_eq!(fx.backend.token_count(), 1);

    AuthApi::new(&fx.client).logout().await.unwrap();
    assert_eq!(fx.backend.token_count(), 0);
    assert!(!fx.session.is_authenticated());
    assert_eq!(FileTokenStore::new(&fx.token_path).load().unwrap(), None);
}

#[tokio::test]
async fn test_session_restored_from_token_file() {
    let fx = logged_in().await;

    let restored = Session::new(FileTokenStore::new(&fx.token_path));
    assert!(restored.is_authenticated());
    assert_eq!(restored.token(), fx.session.token());
}
