//! # Account Linking
//!
//! Last.fm web authentication for chat users:
//!
//! 1. **Token**: `auth.getToken` issues a token valid for a few minutes.
//! 2. **Authorization**: the user opens the authorization URL and allows
//!    access on last.fm.
//! 3. **Session**: `auth.getSession` exchanges the token for a session key.
//!
//! Step 3 can be triggered by the provider redirecting to the callback
//! endpoint, by the background poller, or by the user confirming manually.
//! [`PendingAuthorizations`] makes sure exactly one of them decides the
//! outcome; [`LinkCoordinator`] ties the flow together and enforces the
//! alt-account allowance.

mod coordinator;
mod pending;

use async_trait::async_trait;

pub use coordinator::CallbackResult;
pub use coordinator::LinkCoordinator;
pub use coordinator::LinkSettings;
pub use pending::PendingAuthorizations;

use crate::{error::ApiResult, types::AuthorizedSession};

/// Token issuance and token-for-session exchange.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn get_token(&self) -> ApiResult<String>;

    async fn get_session(&self, token: &str) -> ApiResult<AuthorizedSession>;

    fn api_key(&self) -> &str;
}
