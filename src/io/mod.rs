//! IO modules - everything that talks to the outside world
//!
//! - `transport` - HTTP transport trait, reqwest implementation, scripted test double
//! - `interceptor` - request augmentation and response classification
//! - `api_client` - the gateway client every backend call goes through
//! - `token_store` - persistent storage for the session credential
//! - `mock_backend` - in-memory backend used by the `mock-backend` binary and tests
//! - `notify` - notifier and navigator collaborators
//! - `table` - plain-text tables for terminal output

pub mod api_client;
pub mod interceptor;
pub mod mock_backend;
pub mod notify;
pub mod table;
pub mod token_store;
pub mod transport;

// Re-export commonly used types
pub use api_client::ApiClient;
pub use notify::{Navigator, Notification, Notifier, TerminalNavigator, TerminalNotifier, Variant};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, HttpTransport, RawResponse, Transport};
