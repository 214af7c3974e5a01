//! API gateway client
//!
//! Single choke point for every backend call. Each `send` runs the
//! interceptor pipeline and, on a rejected verdict, performs the side effects
//! in a fixed order: notify, then (if asked) clear the session and redirect.
//! Every failure is both notified and returned; nothing is retried.

use crate::domain::envelope::Envelope;
use crate::domain::error::{ApiError, ApiResult};
use crate::io::interceptor::{
    authorize, interpret_network_failure, interpret_response, invalid_response, local_failure,
    Failure, Verdict, LOGIN_ROUTE,
};
use crate::io::notify::{Navigator, Notifier};
use crate::io::transport::{ApiRequest, Transport};
use crate::services::session::Session;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Log a rejected call (cold path)
#[cold]
fn log_call_failed(method: &Method, path: &str, failure: &Failure) {
    warn!(
        method = %method,
        path = %path,
        kind = failure.error.kind(),
        error = %failure.error,
        teardown = failure.teardown,
        "api_call_failed"
    );
}

pub struct ApiClient {
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    login_route: String,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self { transport, session, notifier, navigator, login_route: LOGIN_ROUTE.to_string() }
    }

    pub fn with_login_route(mut self, route: impl Into<String>) -> Self {
        self.login_route = route.into();
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Perform the call and return the envelope's `data`
    pub async fn send<T: DeserializeOwned>(&self, request: ApiRequest) -> ApiResult<T> {
        let envelope = self.send_envelope::<T>(request).await?;
        Ok(envelope.data)
    }

    /// Perform the call and return the whole envelope, `data` decoded into `T`
    pub async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> ApiResult<Envelope<T>> {
        let method = request.method.clone();
        let path = request.path();
        let request = authorize(request, self.session.token().as_deref());

        let (status, verdict) = match self.transport.execute(&request).await {
            Ok(response) => (response.status, interpret_response(&response)),
            Err(failure) => (0, interpret_network_failure(&failure)),
        };

        let envelope = match verdict {
            Verdict::Success(envelope) => envelope,
            Verdict::Rejected(failure) => return Err(self.reject(&method, &path, failure)),
        };

        match serde_json::from_value::<T>(envelope.data) {
            Ok(data) => {
                debug!(method = %method, path = %path, status = %status, "api_call_ok");
                Ok(Envelope { code: envelope.code, message: envelope.message, data })
            }
            Err(e) => Err(self.reject(&method, &path, invalid_response(status, &e))),
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.send(ApiRequest::get(segments.iter().copied())).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResult<T> {
        let mut request = ApiRequest::get(segments.iter().copied());
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        self.send(request).await
    }

    /// Collection endpoints answer an empty table with `data: null` or no `data` at all
    pub async fn get_list<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<Vec<T>> {
        self.get_list_with_query(segments, &[]).await
    }

    pub async fn get_list_with_query<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> ApiResult<Vec<T>> {
        let rows: Option<Vec<T>> = self.get_with_query(segments, query).await?;
        Ok(rows.unwrap_or_default())
    }

    pub async fn post<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.with_body(ApiRequest::post(segments.iter().copied()), body)?;
        self.send(request).await
    }

    pub async fn put<B, T>(&self, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.with_body(ApiRequest::put(segments.iter().copied()), body)?;
        self.send(request).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        self.send(ApiRequest::delete(segments.iter().copied())).await
    }

    /// Attach a JSON body; an unencodable body is reported like any other failure
    pub fn with_body<B: Serialize + ?Sized>(
        &self,
        request: ApiRequest,
        body: &B,
    ) -> ApiResult<ApiRequest> {
        let method = request.method.clone();
        let path = request.path();
        request.with_json(body).map_err(|e| {
            let failure = local_failure(format!("failed to encode request: {}", e));
            self.reject(&method, &path, failure)
        })
    }

    /// Apply a failure's side effects and hand back its error
    pub(crate) fn reject(&self, method: &Method, path: &str, failure: Failure) -> ApiError {
        log_call_failed(method, path, &failure);
        self.notifier.notify(failure.notice);
        if failure.teardown {
            self.teardown();
        }
        failure.error
    }

    /// Clear the credential and auth state, then send the user to log in again
    fn teardown(&self) {
        self.session.logout();
        self.navigator.redirect(&self.login_route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PointType;
    use crate::io::notify::{RecordingNavigator, RecordingNotifier};
    use crate::io::token_store::MemoryTokenStore;
    use crate::io::transport::{RawResponse, ScriptedTransport};
    use serde_json::json;

    struct Harness {
        client: ApiClient,
        transport: Arc<ScriptedTransport>,
        notifier: Arc<RecordingNotifier>,
        navigator: Arc<RecordingNavigator>,
        session: Arc<Session>,
    }

    fn harness(token: Option<&str>) -> Harness {
        let store = match token {
            Some(t) => MemoryTokenStore::with_token(t),
            None => MemoryTokenStore::new(),
        };
        let session = Arc::new(Session::new(store));
        let transport = Arc::new(ScriptedTransport::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let client = ApiClient::new(
            transport.clone(),
            session.clone(),
            notifier.clone(),
            navigator.clone(),
        );
        Harness { client, transport, notifier, navigator, session }
    }

    #[tokio::test]
    async fn test_success_returns_data_without_notification() {
        let h = harness(Some("tok"));
        h.transport.push_envelope(0, "ok", json!([{"id": "1", "uri": "base"}]));

        let list: Vec<PointType> = h.client.get(&["admin", "v1", "points-types"]).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].uri, "base");
        assert_eq!(h.notifier.count(), 0);
        assert!(h.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_bearer_header_attached_when_token_present() {
        let h = harness(Some("tok"));
        h.transport.push_envelope(0, "ok", json!(null));
        let _: serde_json::Value = h.client.get(&["x"]).await.unwrap();

        let sent = h.transport.last_request().unwrap();
        assert_eq!(sent.header("Authorization"), Some("Bearer tok"));
    }

    #[tokio::test]
    async fn test_no_header_when_token_absent() {
        let h = harness(None);
        h.transport.push_envelope(0, "ok", json!(null));
        let _: serde_json::Value = h.client.get(&["x"]).await.unwrap();

        let sent = h.transport.last_request().unwrap();
        assert_eq!(sent.header("Authorization"), None);
    }

    #[tokio::test]
    async fn test_forbidden_code_tears_down_session() {
        let h = harness(Some("tok"));
        h.transport.push_envelope(3999, "expired", json!(null));

        let err = h.client.get::<serde_json::Value>(&["x"]).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert_eq!(h.session.token(), None);
        assert!(!h.session.is_authenticated());
        assert_eq!(h.navigator.redirects(), vec!["/login"]);
        assert_eq!(h.notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_domain_error_keeps_session() {
        let h = harness(Some("tok"));
        h.transport.push_envelope(1001, "库存不足", json!(null));

        let err = h.client.get::<serde_json::Value>(&["x"]).await.unwrap_err();
        assert_eq!(err, ApiError::Domain { code: 1001, message: "库存不足".to_string() });
        assert_eq!(h.notifier.notifications()[0].description, "库存不足");
        assert_eq!(h.session.token(), Some("tok".to_string()));
        assert!(h.navigator.redirects().is_empty());
    }

    #[tokio::test]
    async fn test_list_with_null_or_missing_data_is_empty() {
        let h = harness(Some("tok"));
        h.transport
            .push_envelope(0, "success", json!(null))
            .push(RawResponse::json(200, &json!({"code": 0, "message": "success"})));

        let path = ["admin", "v1", "points-types"];
        let first: Vec<PointType> = h.client.get_list(&path).await.unwrap();
        let second: Vec<PointType> = h.client.get_list(&path).await.unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(h.notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_get_with_query_sends_pairs() {
        let h = harness(None);
        h.transport.push_envelope(0, "ok", json!([]));

        let rows: Vec<PointType> = h
            .client
            .get_list_with_query(&["points-types"], &[("limit", "5"), ("offset", "10")])
            .await
            .unwrap();
        assert!(rows.is_empty());

        let sent = h.transport.last_request().unwrap();
        let expected = vec![
            ("limit".to_string(), "5".to_string()),
            ("offset".to_string(), "10".to_string()),
        ];
        assert_eq!(sent.query, expected);
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_reported() {
        let h = harness(None);
        h.transport.push_envelope(0, "ok", json!("not a list"));

        let err = h.client.get::<Vec<PointType>>(&["x"]).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport { status: Some(200), .. }));
        assert_eq!(h.notifier.count(), 1);
    }

    #[tokio::test]
    async fn test_network_failure_notifies_and_propagates() {
        let h = harness(Some("tok"));
        h.transport.push_failure("connection refused");

        let err = h.client.get::<serde_json::Value>(&["x"]).await.unwrap_err();
        assert_eq!(err, ApiError::transport(None, "connection refused"));
        assert_eq!(h.notifier.notifications()[0].description, "connection refused");
        assert_eq!(h.session.token(), Some("tok".to_string()));
    }

    #[tokio::test]
    async fn test_custom_login_route() {
        let h = harness(Some("tok"));
        let client = h.client.with_login_route("/admin/login");
        h.transport.push(RawResponse::new(401, ""));

        let err = client.get::<serde_json::Value>(&["x"]).await.unwrap_err();
        assert_eq!(err, ApiError::Unauthorized);
        assert_eq!(h.navigator.redirects(), vec!["/admin/login"]);
    }

    #[tokio::test]
    async fn test_send_envelope_keeps_message() {
        let h = harness(None);
        h.transport.push_envelope(0, "created", json!({"id": "9"}));

        let env =
            h.client.send_envelope::<serde_json::Value>(ApiRequest::post(["x"])).await.unwrap();
        assert_eq!(env.message, "created");
        assert_eq!(env.data["id"], "9");
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let h = harness(None);
        h.transport.push_envelope(0, "ok", json!(null));

        let _: serde::de::IgnoredAny =
            h.client.post(&["points-types"], &json!({"uri": "event"})).await.unwrap();
        let sent = h.transport.last_request().unwrap();
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.body, Some(json!({"uri": "event"})));
    }
}
