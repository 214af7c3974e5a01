//! In-memory backend speaking the envelope protocol
//!
//! Serves the admin endpoint table from seeded data so the CLI and the
//! integration tests can run without the real service.
//!
//! - Every route except login requires `Authorization: Bearer <token>`;
//!   a missing or unknown token answers `code 3999` with HTTP 200
//! - Business-rule rejections answer `code 1001` with HTTP 200
//! - Queued faults replace the next reply verbatim (status + raw JSON body)

use crate::domain::envelope::{Envelope, FORBIDDEN_CODE};
use crate::domain::types::{
    AdjustKind, AdjustPoints, LeaderboardEntry, LoginRequest, LoginResponse, Page, PointType,
    PointTypeCreate, PointTypeUpdate, Reward, RewardDraft, RewardRecord, UserPoints,
};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Malformed request body
pub const BAD_REQUEST_CODE: i64 = 1000;

/// Business-rule rejection (unknown record, overdraft, duplicate...)
pub const REJECTED_CODE: i64 = 1001;

/// No route for method + path
pub const NOT_FOUND_CODE: i64 = 1004;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "admin123";

/// Status + JSON body the server writes back
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub body: Value,
}

impl Reply {
    fn envelope(status: u16, envelope: Envelope<Value>) -> Self {
        let body = json!({
            "code": envelope.code,
            "message": envelope.message,
            "data": envelope.data,
        });
        Self { status, body }
    }

    fn ok<T: Serialize>(data: T) -> Self {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        Self::envelope(200, Envelope::ok(data))
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self::envelope(200, Envelope::error(REJECTED_CODE, message))
    }

    fn forbidden() -> Self {
        Self::envelope(200, Envelope::error(FORBIDDEN_CODE, "token invalid or expired"))
    }

    fn bad_request(detail: impl std::fmt::Display) -> Self {
        let message = format!("malformed request body: {}", detail);
        Self::envelope(400, Envelope::error(BAD_REQUEST_CODE, message))
    }

    fn not_found(method: &Method, path: &str) -> Self {
        let message = format!("no route for {} {}", method, path);
        Self::envelope(404, Envelope::error(NOT_FOUND_CODE, message))
    }

    pub fn code(&self) -> Option<i64> {
        self.body.get("code").and_then(Value::as_i64)
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }
}

#[derive(Debug, Default)]
struct Store {
    /// username -> password
    accounts: HashMap<String, String>,
    /// token -> username
    tokens: HashMap<String, String>,
    point_types: Vec<PointType>,
    /// point type id -> balances
    balances: BTreeMap<String, Vec<UserPoints>>,
    /// point type id -> rewards
    rewards: BTreeMap<String, Vec<Reward>>,
    /// point type id -> redemption history
    records: BTreeMap<String, Vec<RewardRecord>>,
    next_id: u64,
}

impl Store {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn has_point_type(&self, id: &str) -> bool {
        self.point_types.iter().any(|pt| pt.id == id)
    }
}

pub struct MockBackend {
    store: Mutex<Store>,
    faults: Mutex<VecDeque<Reply>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend seeded with one account, one point type, a few balances and a reward
    pub fn new() -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        let mut store = Store { next_id: 100, ..Default::default() };
        store.accounts.insert(DEFAULT_USERNAME.to_string(), DEFAULT_PASSWORD.to_string());
        store.point_types.push(PointType {
            id: "1".to_string(),
            uri: "base".to_string(),
            display_name: "Base Points".to_string(),
            description: "Earned by everyday activity".to_string(),
            enabled: true,
            created_at: now,
        });
        store.balances.insert(
            "1".to_string(),
            vec![
                seed_balance("11", "u1", "alice", 120),
                seed_balance("12", "u2", "bob", 80),
                seed_balance("13", "u3", "carol", 200),
            ],
        );
        store.rewards.insert(
            "1".to_string(),
            vec![Reward {
                id: "21".to_string(),
                name: "Coffee voucher".to_string(),
                cost: 50,
                stock: 10,
                kind: "coupon".to_string(),
                description: "One free coffee".to_string(),
            }],
        );
        store.records.insert(
            "1".to_string(),
            vec![RewardRecord {
                id: "31".to_string(),
                user_id: "u1".to_string(),
                user_name: "alice".to_string(),
                reward_name: "Coffee voucher".to_string(),
                kind: "coupon".to_string(),
                cost: 50,
                created_at: now,
            }],
        );
        Self { store: Mutex::new(store), faults: Mutex::new(VecDeque::new()) }
    }

    /// Register another account
    pub fn with_account(self, username: &str, password: &str) -> Self {
        self.store.lock().accounts.insert(username.to_string(), password.to_string());
        self
    }

    /// Mint a token without going through login
    pub fn issue_token(&self, username: &str) -> String {
        let token = Uuid::now_v7().simple().to_string();
        self.store.lock().tokens.insert(token.clone(), username.to_string());
        token
    }

    /// Invalidate every issued token
    pub fn revoke_all(&self) {
        self.store.lock().tokens.clear();
    }

    pub fn token_count(&self) -> usize {
        self.store.lock().tokens.len()
    }

    /// Answer the next request with this status and raw body
    pub fn push_fault(&self, status: u16, body: Value) {
        self.faults.lock().push_back(Reply { status, body });
    }

    pub fn balance(&self, point_type_id: &str, user_id: &str) -> Option<i64> {
        let store = self.store.lock();
        store
            .balances
            .get(point_type_id)
            .and_then(|rows| rows.iter().find(|r| r.user_id == user_id))
            .map(|r| r.balance)
    }

    /// Route one request. `target` is the path with an optional query string,
    /// `authorization` the raw header value.
    pub fn handle(
        &self,
        method: &Method,
        target: &str,
        authorization: Option<&str>,
        body: &[u8],
    ) -> Reply {
        if let Some(fault) = self.faults.lock().pop_front() {
            return fault;
        }

        let (path, query) = target.split_once('?').unwrap_or((target, ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if let (&Method::POST, ["admin", "v1", "login"]) = (method, segments.as_slice()) {
            return self.login(body);
        }

        let Some(token) = bearer(authorization) else {
            return Reply::forbidden();
        };
        if !self.store.lock().tokens.contains_key(token) {
            return Reply::forbidden();
        }

        match (method, segments.as_slice()) {
            (&Method::POST, ["auth", "logout"]) => {
                self.store.lock().tokens.remove(token);
                Reply::ok(Value::Null)
            }
            (&Method::GET, ["admin", "v1", "points-types"]) => {
                self.list_point_types(page_from_query(query))
            }
            (&Method::POST, ["admin", "v1", "points-types"]) => self.create_point_type(body),
            (&Method::GET, ["admin", "v1", "points-types", id]) => self.point_type(id),
            (&Method::PUT, ["admin", "v1", "points-types", id]) => self.update_point_type(id, body),
            (&Method::DELETE, ["admin", "v1", "points-types", id]) => self.delete_point_type(id),
            (&Method::GET, ["points-types", pt, "user-points"]) => self.user_points(pt),
            (&Method::POST, ["points-types", pt, "user-points", "adjust"]) => self.adjust(pt, body),
            (&Method::GET, ["points-types", pt, "leaderboard"]) => self.leaderboard(pt),
            (&Method::GET, ["points-types", pt, "rewards"]) => self.rewards(pt),
            (&Method::POST, ["points-types", pt, "rewards"]) => self.create_reward(pt, body),
            (&Method::PUT, ["points-types", pt, "rewards", id]) => self.update_reward(pt, id, body),
            (&Method::DELETE, ["points-types", pt, "rewards", id]) => self.delete_reward(pt, id),
            (&Method::GET, ["points-types", pt, "reward-records"]) => self.records(pt),
            _ => Reply::not_found(method, path),
        }
    }

    fn login(&self, body: &[u8]) -> Reply {
        let request: LoginRequest = match decode(body) {
            Ok(r) => r,
            Err(reply) => return reply,
        };
        let valid = self
            .store
            .lock()
            .accounts
            .get(&request.username)
            .is_some_and(|password| *password == request.password);
        if !valid {
            return Reply::rejected("invalid username or password");
        }
        let token = self.issue_token(&request.username);
        info!(username = %request.username, "mock_login");
        Reply::ok(LoginResponse { token })
    }

    fn list_point_types(&self, page: Page) -> Reply {
        let store = self.store.lock();
        let window: Vec<&PointType> = store
            .point_types
            .iter()
            .skip(page.offset as usize)
            .take(page.limit as usize)
            .collect();
        Reply::ok(window)
    }

    fn point_type(&self, id: &str) -> Reply {
        let store = self.store.lock();
        match store.point_types.iter().find(|pt| pt.id == id) {
            Some(pt) => Reply::ok(pt),
            None => Reply::rejected("point type not found"),
        }
    }

    fn create_point_type(&self, body: &[u8]) -> Reply {
        let create: PointTypeCreate = match decode(body) {
            Ok(c) => c,
            Err(reply) => return reply,
        };
        if create.uri.trim().is_empty() {
            return Reply::rejected("uri is required");
        }
        let mut store = self.store.lock();
        if store.point_types.iter().any(|pt| pt.uri == create.uri) {
            return Reply::rejected("uri already exists");
        }
        let point_type = PointType {
            id: store.next_id(),
            uri: create.uri,
            display_name: create.display_name,
            description: create.description,
            enabled: true,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        store.point_types.push(point_type.clone());
        Reply::ok(point_type)
    }

    fn update_point_type(&self, id: &str, body: &[u8]) -> Reply {
        let update: PointTypeUpdate = match decode(body) {
            Ok(u) => u,
            Err(reply) => return reply,
        };
        let mut store = self.store.lock();
        let Some(pt) = store.point_types.iter_mut().find(|pt| pt.id == id) else {
            return Reply::rejected("point type not found");
        };
        if let Some(name) = update.display_name {
            pt.display_name = name;
        }
        if let Some(description) = update.description {
            pt.description = description;
        }
        if let Some(enabled) = update.enabled {
            pt.enabled = enabled;
        }
        Reply::ok(pt.clone())
    }

    fn delete_point_type(&self, id: &str) -> Reply {
        let mut store = self.store.lock();
        let before = store.point_types.len();
        store.point_types.retain(|pt| pt.id != id);
        if store.point_types.len() == before {
            return Reply::rejected("point type not found");
        }
        store.balances.remove(id);
        store.rewards.remove(id);
        store.records.remove(id);
        Reply::ok(Value::Null)
    }

    fn user_points(&self, pt: &str) -> Reply {
        let store = self.store.lock();
        if !store.has_point_type(pt) {
            return Reply::rejected("point type not found");
        }
        Reply::ok(store.balances.get(pt).cloned().unwrap_or_default())
    }

    fn adjust(&self, pt: &str, body: &[u8]) -> Reply {
        let adjust: AdjustPoints = match decode(body) {
            Ok(a) => a,
            Err(reply) => return reply,
        };
        if adjust.amount <= 0 {
            return Reply::rejected("amount must be positive");
        }
        let mut store = self.store.lock();
        if !store.has_point_type(pt) {
            return Reply::rejected("point type not found");
        }
        let next_id = store.next_id();
        let rows = store.balances.entry(pt.to_string()).or_default();
        let index = match rows.iter().position(|r| r.user_id == adjust.user_id) {
            Some(i) => i,
            None if adjust.kind == AdjustKind::Add => {
                rows.push(UserPoints {
                    id: next_id,
                    user_id: adjust.user_id.clone(),
                    name: adjust.user_id.clone(),
                    balance: 0,
                });
                rows.len() - 1
            }
            None => return Reply::rejected("user has no balance for this point type"),
        };
        let row = &mut rows[index];
        let balance = adjust.kind.apply(row.balance, adjust.amount);
        if balance < 0 {
            return Reply::rejected("insufficient balance");
        }
        row.balance = balance;
        debug!(
            point_type = %pt,
            user_id = %adjust.user_id,
            kind = adjust.kind.as_str(),
            amount = %adjust.amount,
            balance = %balance,
            "mock_points_adjusted"
        );
        Reply::ok(Value::Null)
    }

    fn leaderboard(&self, pt: &str) -> Reply {
        let store = self.store.lock();
        if !store.has_point_type(pt) {
            return Reply::rejected("point type not found");
        }
        let mut rows = store.balances.get(pt).cloned().unwrap_or_default();
        rows.sort_by(|a, b| b.balance.cmp(&a.balance).then_with(|| a.user_id.cmp(&b.user_id)));
        let entries: Vec<LeaderboardEntry> = rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| LeaderboardEntry {
                rank: (i + 1) as u32,
                user_id: row.user_id,
                name: row.name,
                points: row.balance,
            })
            .collect();
        Reply::ok(entries)
    }

    fn rewards(&self, pt: &str) -> Reply {
        let store = self.store.lock();
        if !store.has_point_type(pt) {
            return Reply::rejected("point type not found");
        }
        Reply::ok(store.rewards.get(pt).cloned().unwrap_or_default())
    }

    fn create_reward(&self, pt: &str, body: &[u8]) -> Reply {
        let draft: RewardDraft = match decode(body) {
            Ok(d) => d,
            Err(reply) => return reply,
        };
        if let Some(reply) = validate_reward(&draft) {
            return reply;
        }
        let mut store = self.store.lock();
        if !store.has_point_type(pt) {
            return Reply::rejected("point type not found");
        }
        let reward = Reward {
            id: store.next_id(),
            name: draft.name,
            cost: draft.cost,
            stock: draft.stock,
            kind: draft.kind,
            description: draft.description,
        };
        store.rewards.entry(pt.to_string()).or_default().push(reward.clone());
        Reply::ok(reward)
    }

    fn update_reward(&self, pt: &str, id: &str, body: &[u8]) -> Reply {
        let draft: RewardDraft = match decode(body) {
            Ok(d) => d,
            Err(reply) => return reply,
        };
        if let Some(reply) = validate_reward(&draft) {
            return reply;
        }
        let mut store = self.store.lock();
        let found = store.rewards.get_mut(pt).and_then(|rows| rows.iter_mut().find(|r| r.id == id));
        let Some(reward) = found else {
            return Reply::rejected("reward not found");
        };
        reward.name = draft.name;
        reward.cost = draft.cost;
        reward.stock = draft.stock;
        reward.kind = draft.kind;
        reward.description = draft.description;
        Reply::ok(reward.clone())
    }

    fn delete_reward(&self, pt: &str, id: &str) -> Reply {
        let mut store = self.store.lock();
        let Some(rows) = store.rewards.get_mut(pt) else {
            return Reply::rejected("reward not found");
        };
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Reply::rejected("reward not found");
        }
        Reply::ok(Value::Null)
    }

    fn records(&self, pt: &str) -> Reply {
        let store = self.store.lock();
        if !store.has_point_type(pt) {
            return Reply::rejected("point type not found");
        }
        Reply::ok(store.records.get(pt).cloned().unwrap_or_default())
    }
}

fn seed_balance(id: &str, user_id: &str, name: &str, balance: i64) -> UserPoints {
    UserPoints {
        id: id.to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        balance,
    }
}

/// `limit` / `offset` from a raw query string; absent or unparsable values keep the defaults
fn page_from_query(query: &str) -> Page {
    let mut page = Page::default();
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match (key, value.parse::<u32>()) {
            ("limit", Ok(limit)) => page.limit = limit,
            ("offset", Ok(offset)) => page.offset = offset,
            _ => {}
        }
    }
    page
}

fn bearer(authorization: Option<&str>) -> Option<&str> {
    authorization?.strip_prefix("Bearer ").map(str::trim).filter(|t| !t.is_empty())
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, Reply> {
    serde_json::from_slice(body).map_err(Reply::bad_request)
}

fn validate_reward(draft: &RewardDraft) -> Option<Reply> {
    if draft.name.trim().is_empty() {
        return Some(Reply::rejected("reward name is required"));
    }
    if draft.cost <= 0 {
        return Some(Reply::rejected("cost must be positive"));
    }
    if draft.stock < 0 {
        return Some(Reply::rejected("stock cannot be negative"));
    }
    None
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    backend: Arc<MockBackend>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let target = req.uri().path_and_query().map_or(path.clone(), |pq| pq.as_str().to_string());
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let reply = match req.into_body().collect().await {
        Ok(collected) => {
            let body = collected.to_bytes();
            backend.handle(&method, &target, authorization.as_deref(), &body)
        }
        Err(e) => Reply::bad_request(e),
    };

    debug!(
        method = %method,
        path = %path,
        status = %reply.status,
        code = ?reply.code(),
        "mock_request"
    );

    let mut response = Response::new(Full::new(Bytes::from(reply.body.to_string())));
    *response.status_mut() =
        StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(response)
}

/// Accept connections until `shutdown` flips to true
pub async fn serve(
    listener: TcpListener,
    backend: Arc<MockBackend>,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "mock_backend_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let backend = backend.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let backend = backend.clone();
                                async move { handle_request(req, backend).await }
                            });

                            let conn = http1::Builder::new().serve_connection(io, service);
                            if let Err(e) = conn.await {
                                error!(error = %e, "mock_backend_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "mock_backend_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                // A dropped sender also ends the loop
                if changed.is_err() || *shutdown.borrow() {
                    info!("mock_backend_shutdown");
                    return Ok(());
                }
            }
        }
    }
}
