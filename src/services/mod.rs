//! Services - session state and typed endpoint groups
//!
//! - `session` - single owner of the credential and auth state
//! - `auth` - login / logout
//! - `point_types` - point-type CRUD
//! - `user_points` - balances and adjustments
//! - `leaderboard` - ranked balances
//! - `rewards` - rewards and redemption records

pub mod auth;
pub mod leaderboard;
pub mod point_types;
pub mod rewards;
pub mod session;
pub mod user_points;

// Re-export commonly used types
pub use auth::AuthApi;
pub use leaderboard::LeaderboardApi;
pub use point_types::PointTypesApi;
pub use rewards::RewardsApi;
pub use session::{AuthState, Session};
pub use user_points::UserPointsApi;
