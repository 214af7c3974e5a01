//! Backend-owned records
//!
//! These are displayed verbatim; the client enforces no invariants beyond
//! "show what the server returned". Every field defaults when absent.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Operator identity kept in the auth state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: String,
}

/// A named category of points with its own balances, leaderboard and rewards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointType {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub uri: String,
    pub display_name: String,
    pub description: String,
    pub enabled: bool,
    /// Epoch milliseconds
    pub created_at: i64,
}

impl PointType {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        epoch_ms_to_utc(self.created_at)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTypeCreate {
    pub uri: String,
    pub display_name: String,
    pub description: String,
}

/// Partial update; absent fields are left untouched by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointTypeUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl PointTypeUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none() && self.enabled.is_none()
    }
}

/// Page size the admin list endpoints use when none is given
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// `limit` / `offset` window for paged admin lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { limit: DEFAULT_PAGE_LIMIT, offset: 0 }
    }
}

impl Page {
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }
}

/// A user's balance within one point type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPoints {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    pub name: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustKind {
    Add,
    Subtract,
}

impl AdjustKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustKind::Add => "add",
            AdjustKind::Subtract => "subtract",
        }
    }

    /// Signed delta applied to a balance
    pub fn apply(&self, balance: i64, amount: i64) -> i64 {
        match self {
            AdjustKind::Add => balance.saturating_add(amount),
            AdjustKind::Subtract => balance.saturating_sub(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustPoints {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: AdjustKind,
    pub amount: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaderboardEntry {
    pub rank: u32,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    pub name: String,
    pub points: i64,
}

/// A redeemable reward
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reward {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub cost: i64,
    pub stock: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
}

/// Fields an operator fills in to create or replace a reward
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDraft {
    pub name: String,
    pub cost: i64,
    pub stock: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id")]
    pub user_id: String,
    pub user_name: String,
    pub reward_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub cost: i64,
    /// Epoch milliseconds
    pub created_at: i64,
}

impl RewardRecord {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        epoch_ms_to_utc(self.created_at)
    }
}

/// Identifiers arrive as strings from some endpoints and integers from others
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct IdVisitor;

    impl<'de> Visitor<'de> for IdVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a string or integer id")
        }

        fn visit_str<E>(self, value: &str) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_unit<E>(self) -> Result<String, E>
        where
            E: de::Error,
        {
            Ok(String::new())
        }
    }

    deserializer.deserialize_any(IdVisitor)
}

/// Convert epoch milliseconds to a UTC timestamp; zero means "not set"
pub fn epoch_ms_to_utc(ms: i64) -> Option<DateTime<Utc>> {
    if ms <= 0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_type_from_sparse_json() {
        let pt: PointType = serde_json::from_str(
            r#"{"id":"1","uri":"base","displayName":"Base points","enabled":true}"#,
        )
        .unwrap();
        assert_eq!(pt.uri, "base");
        assert_eq!(pt.display_name, "Base points");
        assert_eq!(pt.description, "");
        assert!(pt.enabled);
        assert!(pt.created_at_utc().is_none());
    }

    #[test]
    fn test_point_type_update_skips_absent_fields() {
        let update = PointTypeUpdate { enabled: Some(false), ..Default::default() };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"enabled":false}"#);
        assert!(!update.is_empty());
        assert!(PointTypeUpdate::default().is_empty());
    }

    #[test]
    fn test_adjust_points_wire_format() {
        let adjust = AdjustPoints {
            user_id: "u1".to_string(),
            kind: AdjustKind::Subtract,
            amount: 50,
            reason: None,
        };
        let value = serde_json::to_value(&adjust).unwrap();
        assert_eq!(value, serde_json::json!({"userId":"u1","type":"subtract","amount":50}));
    }

    #[test]
    fn test_adjust_kind_apply() {
        assert_eq!(AdjustKind::Add.apply(100, 20), 120);
        assert_eq!(AdjustKind::Subtract.apply(100, 20), 80);
        assert_eq!(AdjustKind::Add.apply(i64::MAX, 1), i64::MAX);
    }

    #[test]
    fn test_reward_type_field() {
        let reward: Reward =
            serde_json::from_str(r#"{"id":"r1","name":"Mug","cost":300,"stock":5,"type":"兑换"}"#)
                .unwrap();
        assert_eq!(reward.kind, "兑换");
        assert_eq!(reward.cost, 300);
    }

    #[test]
    fn test_numeric_ids_accepted() {
        let row: UserPoints =
            serde_json::from_str(r#"{"id":7,"userId":1024,"name":"alice","balance":90}"#).unwrap();
        assert_eq!(row.id, "7");
        assert_eq!(row.user_id, "1024");

        let row: UserPoints = serde_json::from_str(r#"{"id":null,"name":"bob"}"#).unwrap();
        assert_eq!(row.id, "");
        assert_eq!(row.user_id, "");
    }

    #[test]
    fn test_epoch_ms_to_utc() {
        let ts = epoch_ms_to_utc(1_700_000_000_000).unwrap();
        assert_eq!(ts.timestamp(), 1_700_000_000);
        assert!(epoch_ms_to_utc(0).is_none());
    }
}
