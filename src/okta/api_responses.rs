use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// The AWS federation app type in Okta's app catalog.
pub const AWS_APP_NAME: &str = "amazon_aws";

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OktaError {
    error_code: String,
    error_summary: String,
}

impl OktaError {
    /// Returns an error summary
    pub fn summary(&self) -> String {
        format!(
            "okta error code {} - {}",
            self.error_code, self.error_summary
        )
    }
}

/// Result of an Okta authn or MFA-verify call, branched on by the
/// authenticator.
#[derive(Debug)]
pub enum AuthResult {
    Failure(StatusCode),
    MfaRequired {
        state_token: String,
        factors: Vec<MfaFactor>,
    },
    Success {
        session_token: String,
    },
}

/// How a factor is driven once selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MfaKind {
    /// The user types a code or answer (totp, sms, hardware token).
    Challenge,
    /// Approved out-of-band (push notification).
    Verify,
    /// Security question; the answer is echoed while typing.
    Question,
    /// An sms-style factor a server reports pre-classified.
    Sms,
    /// Anything bmx cannot drive; must be rejected before use.
    Unknown,
}

impl MfaKind {
    /// Classifies a raw Okta factor-type string.
    ///
    /// The check order matters: a type string can contain more than one
    /// matchable substring (e.g. "token:software:totp").
    pub fn classify(factor_type: &str) -> MfaKind {
        if factor_type.contains("token") || factor_type.contains("sms") {
            MfaKind::Challenge
        } else if factor_type.contains("push") {
            MfaKind::Verify
        } else if factor_type == "question" {
            MfaKind::Question
        } else {
            MfaKind::Unknown
        }
    }
}

#[derive(Debug, Clone)]
pub struct MfaFactor {
    pub id: String,
    pub provider: String,
    pub factor_type: String,
    pub kind: MfaKind,
}

impl MfaFactor {
    pub fn new(id: &str, provider: &str, factor_type: &str) -> MfaFactor {
        MfaFactor {
            id: id.to_string(),
            provider: provider.to_string(),
            factor_type: factor_type.to_string(),
            kind: MfaKind::classify(factor_type),
        }
    }

    /// Label shown in the factor selection prompt.
    pub fn display_name(&self) -> String {
        format!("{}: {}", self.provider, self.factor_type)
    }
}

/// Raw `/api/v1/authn` payload. Mapped onto [`AuthResult`] by the client;
/// never exposed past it.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthnResponseRaw {
    pub state_token: Option<String>,
    pub session_token: Option<String>,
    pub status: Option<TransactionState>,
    #[serde(rename = "_embedded")]
    pub embedded: Option<Embedded>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub enum TransactionState {
    #[serde(rename = "MFA_REQUIRED")]
    MfaRequired,
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(other)]
    Unimplemented,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Embedded {
    #[serde(default)]
    pub factors: Option<Vec<MfaFactorRaw>>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MfaFactorRaw {
    pub id: String,
    pub factor_type: String,
    pub provider: String,
}

/// An Okta session, as returned by `POST /api/v1/sessions` and
/// `GET /api/v1/sessions/me`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OktaSession {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub login: Option<String>,
    /// RFC 3339 timestamp.
    pub expires_at: String,
}

/// An app link from `GET /api/v1/users/me/appLinks`.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OktaApp {
    pub id: String,
    pub label: String,
    pub app_name: String,
    pub link_url: String,
}
