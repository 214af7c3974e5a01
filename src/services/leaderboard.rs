//! Leaderboard for a point type

use crate::domain::error::ApiResult;
use crate::domain::types::LeaderboardEntry;
use crate::io::api_client::ApiClient;

pub struct LeaderboardApi<'a> {
    client: &'a ApiClient,
}

impl<'a> LeaderboardApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Rows in the order the backend ranked them
    pub async fn list(&self, point_type_id: &str) -> ApiResult<Vec<LeaderboardEntry>> {
        self.client.get_list(&["points-types", point_type_id, "leaderboard"]).await
    }

    /// First `n` rows
    pub async fn top(&self, point_type_id: &str, n: usize) -> ApiResult<Vec<LeaderboardEntry>> {
        let mut rows = self.list(point_type_id).await?;
        rows.truncate(n);
        Ok(rows)
    }
}
