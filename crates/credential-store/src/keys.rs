//! Storage key constants.

/// Storage keys used by the credential vault
pub struct CredentialKeys;

impl CredentialKeys {
    /// Session access token
    pub const ACCESS_TOKEN: &'static str = "session.access_token";

    /// Session refresh token
    pub const REFRESH_TOKEN: &'static str = "session.refresh_token";

    /// Session metadata (JSON)
    pub const SESSION_META: &'static str = "session.meta";
}
