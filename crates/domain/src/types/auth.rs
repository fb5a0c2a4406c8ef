//! Authentication session types

use serde::{Deserialize, Serialize};

/// Token pair and identity for an authenticated session.
///
/// Created by login, replaced wholesale by refresh, destroyed by logout or
/// an irrecoverable refresh failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    pub team_id: String,
}
