use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod client;
pub mod creds_cache;
pub mod creds_creator;
pub mod saml;

/// Schema version written with every cached credential, for forward
/// compatibility of the cache file.
pub const CREDENTIALS_VERSION: u32 = 1;

fn default_credentials_version() -> u32 {
    CREDENTIALS_VERSION
}

/// An AWS role the user may assume, derived from one SAML Role attribute
/// value. `role_name` is the last `/`-delimited segment of `role_arn`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsRole {
    pub role_name: String,
    pub principal_arn: String,
    pub role_arn: String,
}

/// Short-lived credentials from one STS exchange. Never mutated; only
/// superseded or pruned.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsCredentials {
    pub session_token: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// RFC 3339 timestamp.
    pub expiration: String,
    #[serde(default = "default_credentials_version")]
    pub version: u32,
}

impl AwsCredentials {
    /// Parsed expiry; unparseable timestamps count as already expired.
    pub fn expiration(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(self.expiration.as_str(), &Rfc3339).ok()
    }
}

/// The roles extracted from one SAML assertion, together with the raw
/// assertion needed for the STS exchange.
#[derive(Debug, Clone)]
pub struct RoleState {
    pub roles: Vec<AwsRole>,
    pub saml_string: String,
}
