//! Point-type definitions (admin API)

use crate::domain::error::ApiResult;
use crate::domain::types::{Page, PointType, PointTypeCreate, PointTypeUpdate};
use crate::io::api_client::ApiClient;
use serde::de::IgnoredAny;

const BASE: [&str; 3] = ["admin", "v1", "points-types"];

pub struct PointTypesApi<'a> {
    client: &'a ApiClient,
}

impl<'a> PointTypesApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// One page of point types; the backend pages with `limit` / `offset`
    pub async fn list(&self, page: Page) -> ApiResult<Vec<PointType>> {
        let limit = page.limit.to_string();
        let offset = page.offset.to_string();
        let query = [("limit", limit.as_str()), ("offset", offset.as_str())];
        self.client.get_list_with_query(&BASE, &query).await
    }

    pub async fn detail(&self, id: &str) -> ApiResult<PointType> {
        self.client.get(&item(id)).await
    }

    pub async fn create(&self, point_type: &PointTypeCreate) -> ApiResult<PointType> {
        self.client.post(&BASE, point_type).await
    }

    pub async fn update(&self, id: &str, update: &PointTypeUpdate) -> ApiResult<PointType> {
        self.client.put(&item(id), update).await
    }

    pub async fn delete(&self, id: &str) -> ApiResult<()> {
        self.client.delete::<IgnoredAny>(&item(id)).await.map(|_| ())
    }
}

fn item(id: &str) -> [&str; 4] {
    [BASE[0], BASE[1], BASE[2], id]
}
