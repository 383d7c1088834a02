use reqwest::StatusCode;
use thiserror::Error;

/// User-facing failures. Every variant renders as one short message; no stack
/// traces or raw payloads reach the terminal.
///
/// Cache corruption and DSSO failures are deliberately absent: both are
/// recovered internally (empty cache / fall back to interactive login) and
/// never surface to the user.
#[derive(Debug, Error)]
pub enum BmxError {
    #[error("{0} value was not provided")]
    MissingInput(&'static str),

    /// Okta rejected the credentials, or no cached session was available in
    /// non-interactive mode. The status code is kept for diagnostics.
    #[error("Okta authentication failed")]
    AuthenticationFailure(Option<StatusCode>),

    #[error("selected MFA factor is not supported by bmx")]
    MfaUnsupported,

    #[error("MFA verification with Okta failed")]
    MfaVerificationFailure,

    #[error("{0}")]
    SamlParse(String),

    #[error("account {0} could not be found")]
    AccountNotFound(String),

    #[error("role {0} could not be found")]
    RoleNotFound(String),
}
