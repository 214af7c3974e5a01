//! User balances within a point type

use crate::domain::error::ApiResult;
use crate::domain::types::{AdjustPoints, UserPoints};
use crate::io::api_client::ApiClient;
use serde::de::IgnoredAny;

pub struct UserPointsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UserPointsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, point_type_id: &str) -> ApiResult<Vec<UserPoints>> {
        self.client.get_list(&["points-types", point_type_id, "user-points"]).await
    }

    /// Credit or debit a user's balance; the backend rejects overdrafts
    pub async fn adjust(&self, point_type_id: &str, adjust: &AdjustPoints) -> ApiResult<()> {
        let path = ["points-types", point_type_id, "user-points", "adjust"];
        self.client.post::<_, IgnoredAny>(&path, adjust).await.map(|_| ())
    }
}
