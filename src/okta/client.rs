use crate::http::api_client::{AcceptType, ApiClient};
use crate::okta::api_responses::{
    AuthResult, AuthnResponseRaw, MfaFactor, OktaApp, OktaError, OktaSession, TransactionState,
    AWS_APP_NAME,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

/// Anonymous Okta capability: the authn state machine endpoints plus session
/// creation. One concrete implementation; fakes in tests.
#[async_trait]
pub trait OktaAnonymousApi: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthResult>;
    async fn issue_mfa_challenge(&self, state_token: &str, factor_id: &str) -> Result<()>;
    async fn verify_mfa_challenge_response(
        &self,
        state_token: &str,
        factor_id: &str,
        response: &str,
    ) -> Result<AuthResult>;
    async fn create_session(&self, session_token: &str) -> Result<OktaSession>;
}

/// Okta capability keyed by a session cookie.
#[async_trait]
pub trait OktaAuthenticatedApi: Send + Sync {
    /// Lists the user's AWS federation apps (`amazon_aws` type only).
    async fn get_aws_account_apps(&self) -> Result<Vec<OktaApp>>;
    async fn get_current_session(&self) -> Result<OktaSession>;
    async fn get_page(&self, url: &str) -> Result<String>;
}

pub trait OktaClientFactory: Send + Sync {
    fn anonymous_client(&self, org_url: &Url) -> Result<Box<dyn OktaAnonymousApi>>;
    fn authenticated_client(
        &self,
        org_url: &Url,
        session_id: &str,
    ) -> Result<Box<dyn OktaAuthenticatedApi>>;
}

pub struct OktaHttpClientFactory;

impl OktaClientFactory for OktaHttpClientFactory {
    fn anonymous_client(&self, org_url: &Url) -> Result<Box<dyn OktaAnonymousApi>> {
        Ok(Box::new(OktaAnonymousClient::new(org_url)?))
    }

    fn authenticated_client(
        &self,
        org_url: &Url,
        session_id: &str,
    ) -> Result<Box<dyn OktaAuthenticatedApi>> {
        Ok(Box::new(OktaAuthenticatedClient::new(org_url, session_id)?))
    }
}

/// Base URL for an org given as either a bare Okta org name or a full host.
pub fn org_base_url(org: &str) -> Result<Url> {
    let url = if org.contains('.') {
        format!("https://{org}/")
    } else {
        format!("https://{org}.okta.com/")
    };

    Ok(Url::parse(url.as_str())?)
}

pub struct OktaAnonymousClient {
    client: ApiClient,
    api_base: Url,
}

impl OktaAnonymousClient {
    pub fn new(org_url: &Url) -> Result<OktaAnonymousClient> {
        Ok(OktaAnonymousClient {
            client: ApiClient::new()?,
            api_base: org_url.join("api/v1/")?,
        })
    }
}

#[async_trait]
impl OktaAnonymousApi for OktaAnonymousClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AuthResult> {
        let url = self.api_base.join("authn")?;
        let json = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .client
            .post_json(url.as_str(), &json)
            .await
            .context("okta authentication request failed")?;
        let status = response.status();
        if status != StatusCode::OK {
            if let Ok(error) = response.json::<OktaError>().await {
                log::debug!("okta rejected the authentication: {}", error.summary());
            }
            return Ok(AuthResult::Failure(status));
        }

        let raw: AuthnResponseRaw = response
            .json()
            .await
            .context("okta returned an invalid authn response")?;

        Ok(map_authn_response(raw, status))
    }

    async fn issue_mfa_challenge(&self, state_token: &str, factor_id: &str) -> Result<()> {
        let url = self
            .api_base
            .join(format!("authn/factors/{factor_id}/verify").as_str())?;
        let json = serde_json::json!({
            "stateToken": state_token,
        });

        self.client
            .post_json(url.as_str(), &json)
            .await?
            .error_for_status()
            .context("error issuing the MFA challenge with okta")?;

        Ok(())
    }

    async fn verify_mfa_challenge_response(
        &self,
        state_token: &str,
        factor_id: &str,
        response: &str,
    ) -> Result<AuthResult> {
        let url = self
            .api_base
            .join(format!("authn/factors/{factor_id}/verify").as_str())?;
        let json = serde_json::json!({
            "stateToken": state_token,
            "passCode": response,
        });

        let response = self
            .client
            .post_json(url.as_str(), &json)
            .await
            .context("okta MFA verification request failed")?;
        let status = response.status();
        if status != StatusCode::OK {
            if let Ok(error) = response.json::<OktaError>().await {
                log::debug!("okta rejected the MFA response: {}", error.summary());
            }
            return Ok(AuthResult::Failure(status));
        }

        let raw: AuthnResponseRaw = response
            .json()
            .await
            .context("okta returned an invalid MFA verification response")?;

        match raw.session_token {
            Some(session_token) => Ok(AuthResult::Success { session_token }),
            None => Ok(AuthResult::Failure(status)),
        }
    }

    async fn create_session(&self, session_token: &str) -> Result<OktaSession> {
        let url = self.api_base.join("sessions")?;
        let json = serde_json::json!({
            "sessionToken": session_token,
        });

        let session = self
            .client
            .post_json(url.as_str(), &json)
            .await?
            .error_for_status()
            .context("request to create an okta session failed")?
            .json()
            .await
            .context("okta returned an invalid session response")?;

        Ok(session)
    }
}

fn map_authn_response(raw: AuthnResponseRaw, status: StatusCode) -> AuthResult {
    if raw.status == Some(TransactionState::Success) {
        if let Some(session_token) = raw.session_token {
            return AuthResult::Success { session_token };
        }
    }

    if raw.status == Some(TransactionState::MfaRequired) {
        let factors: Vec<MfaFactor> = raw
            .embedded
            .and_then(|embedded| embedded.factors)
            .unwrap_or_default()
            .iter()
            .map(|factor| MfaFactor::new(&factor.id, &factor.provider, &factor.factor_type))
            .collect();

        if let Some(state_token) = raw.state_token {
            if !factors.is_empty() {
                return AuthResult::MfaRequired {
                    state_token,
                    factors,
                };
            }
        }
    }

    AuthResult::Failure(status)
}

pub struct OktaAuthenticatedClient {
    client: ApiClient,
    api_base: Url,
}

impl OktaAuthenticatedClient {
    pub fn new(org_url: &Url, session_id: &str) -> Result<OktaAuthenticatedClient> {
        Ok(OktaAuthenticatedClient {
            client: ApiClient::with_session_cookie(org_url, session_id)?,
            api_base: org_url.join("api/v1/")?,
        })
    }
}

#[async_trait]
impl OktaAuthenticatedApi for OktaAuthenticatedClient {
    async fn get_aws_account_apps(&self) -> Result<Vec<OktaApp>> {
        let url = self.api_base.join("users/me/appLinks")?;

        let apps: Vec<OktaApp> = self
            .client
            .get(url.to_string(), None, AcceptType::Json)
            .await?
            .error_for_status()
            .context("request to list AWS accounts from okta failed")?
            .json()
            .await
            .context("okta returned an invalid app list")?;

        Ok(apps
            .into_iter()
            .filter(|app| app.app_name == AWS_APP_NAME)
            .collect())
    }

    async fn get_current_session(&self) -> Result<OktaSession> {
        let url = self.api_base.join("sessions/me")?;

        let session = self
            .client
            .get(url.to_string(), None, AcceptType::Json)
            .await?
            .error_for_status()
            .context("request to retrieve the okta session failed")?
            .json()
            .await
            .context("okta returned an invalid session response")?;

        Ok(session)
    }

    async fn get_page(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url.to_string(), None, AcceptType::Html)
            .await?
            .error_for_status()
            .context("request for the app login page failed")?
            .text()
            .await?;

        Ok(body)
    }
}
