//! Redeemable rewards and their redemption records

use crate::domain::error::ApiResult;
use crate::domain::types::{Reward, RewardDraft, RewardRecord};
use crate::io::api_client::ApiClient;
use serde::de::IgnoredAny;

pub struct RewardsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> RewardsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, point_type_id: &str) -> ApiResult<Vec<Reward>> {
        self.client.get_list(&["points-types", point_type_id, "rewards"]).await
    }

    pub async fn records(&self, point_type_id: &str) -> ApiResult<Vec<RewardRecord>> {
        self.client.get_list(&["points-types", point_type_id, "reward-records"]).await
    }

    pub async fn create(&self, point_type_id: &str, draft: &RewardDraft) -> ApiResult<Reward> {
        self.client.post(&["points-types", point_type_id, "rewards"], draft).await
    }

    pub async fn update(
        &self,
        point_type_id: &str,
        reward_id: &str,
        draft: &RewardDraft,
    ) -> ApiResult<Reward> {
        self.client.put(&["points-types", point_type_id, "rewards", reward_id], draft).await
    }

    pub async fn delete(&self, point_type_id: &str, reward_id: &str) -> ApiResult<()> {
        self.client
            .delete::<IgnoredAny>(&["points-types", point_type_id, "rewards", reward_id])
            .await
            .map(|_| ())
    }
}
