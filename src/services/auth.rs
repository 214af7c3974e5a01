//! Login and logout against the admin API

use crate::domain::error::ApiResult;
use crate::domain::types::{LoginRequest, LoginResponse, User};
use crate::io::api_client::ApiClient;
use crate::io::interceptor::{invalid_response, local_failure};
use crate::io::transport::ApiRequest;
use serde::de::IgnoredAny;
use tracing::info;

const LOGIN_PATH: [&str; 3] = ["admin", "v1", "login"];
const LOGOUT_PATH: [&str; 2] = ["auth", "logout"];

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a token and start a session with it
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<User> {
        let request =
            LoginRequest { username: username.to_string(), password: password.to_string() };
        let request = self.client.with_body(ApiRequest::post(LOGIN_PATH), &request)?;
        let method = request.method.clone();
        let path = request.path();

        let response: LoginResponse = self.client.send(request).await?;
        if response.token.is_empty() {
            let failure = invalid_response(200, &"login response carried no token");
            return Err(self.client.reject(&method, &path, failure));
        }

        let user = User { username: username.to_string() };
        if let Err(e) = self.client.session().login(user.clone(), &response.token) {
            let failure = local_failure(format!("could not persist session: {}", e));
            return Err(self.client.reject(&method, &path, failure));
        }
        info!(username = %username, "login_succeeded");
        Ok(user)
    }

    /// Tell the backend, then drop the local session whatever it answered
    pub async fn logout(&self) -> ApiResult<()> {
        let result = self.client.send::<IgnoredAny>(ApiRequest::post(LOGOUT_PATH)).await;
        self.client.session().logout();
        result.map(|_| ())
    }
}
