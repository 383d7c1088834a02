use crate::config::BmxConfig;
use crate::errors::BmxError;
use crate::okta::api_responses::{AuthResult, MfaFactor, MfaKind};
use crate::okta::client::{org_base_url, OktaAnonymousApi, OktaAuthenticatedApi, OktaClientFactory};
use crate::okta::dsso::DssoProbe;
use crate::okta::session_cache::{OktaSessionEntry, OktaSessionStorage};
use crate::prompt::{mfa_response_prompt, Prompter};
use anyhow::{anyhow, Result};
use time::OffsetDateTime;

/// An authenticated Okta client plus the org/user it belongs to. Everything
/// downstream of authentication (app listing, page fetches) goes through
/// this.
pub struct AuthenticatedOktaContext {
    pub org: String,
    pub user: String,
    pub client: Box<dyn OktaAuthenticatedApi>,
}

impl std::fmt::Debug for AuthenticatedOktaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedOktaContext")
            .field("org", &self.org)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// The authentication decision procedure: cached session, then desktop SSO,
/// then interactive password + MFA. No branch retries on failure; the user
/// re-runs the command.
pub struct OktaAuthenticator<'a> {
    factory: &'a dyn OktaClientFactory,
    prompter: &'a dyn Prompter,
    session_storage: &'a OktaSessionStorage,
    config: &'a BmxConfig,
}

impl<'a> OktaAuthenticator<'a> {
    pub fn new(
        factory: &'a dyn OktaClientFactory,
        prompter: &'a dyn Prompter,
        session_storage: &'a OktaSessionStorage,
        config: &'a BmxConfig,
    ) -> OktaAuthenticator<'a> {
        OktaAuthenticator {
            factory,
            prompter,
            session_storage,
            config,
        }
    }

    pub async fn authenticate(
        &self,
        org: Option<String>,
        user: Option<String>,
        non_interactive: bool,
        ignore_cache: bool,
        allow_dsso: bool,
    ) -> Result<AuthenticatedOktaContext> {
        let org = match org.or_else(|| self.config.org.clone()) {
            Some(org) => org,
            None if !non_interactive => self.prompter.prompt_org()?,
            None => return Err(BmxError::MissingInput("org").into()),
        };
        let user = match user.or_else(|| self.config.user.clone()) {
            Some(user) => user,
            None if !non_interactive => self.prompter.prompt_user()?,
            None => return Err(BmxError::MissingInput("user").into()),
        };

        let org_url = org_base_url(org.as_str())?;

        // The cached session is trusted optimistically: no validation call is
        // made, a stale-but-unexpired session only fails on first use.
        if !ignore_cache {
            if let Some(session_id) = self.cached_session_id(org.as_str(), user.as_str()) {
                log::debug!("reusing cached okta session for {user}@{org}");
                let client = self
                    .factory
                    .authenticated_client(&org_url, session_id.as_str())?;
                return Ok(AuthenticatedOktaContext { org, user, client });
            }
        }

        if allow_dsso {
            let probe = DssoProbe::new(self.factory, self.session_storage);
            if let Some(context) = probe.try_dsso(org.as_str(), user.as_str(), &org_url).await {
                return Ok(context);
            }
        }

        if non_interactive {
            return Err(BmxError::AuthenticationFailure(None).into());
        }

        let password = self.prompter.prompt_password()?;
        let anonymous = self.factory.anonymous_client(&org_url)?;

        let session_token = match anonymous
            .authenticate(user.as_str(), password.as_str())
            .await?
        {
            AuthResult::Failure(status) => {
                return Err(BmxError::AuthenticationFailure(Some(status)).into());
            }
            AuthResult::MfaRequired {
                state_token,
                factors,
            } => {
                self.run_mfa(anonymous.as_ref(), state_token.as_str(), &factors)
                    .await?
            }
            AuthResult::Success { session_token } => session_token,
        };

        let session = anonymous.create_session(session_token.as_str()).await?;
        self.cache_session(
            org.as_str(),
            user.as_str(),
            session.id.as_str(),
            session.expires_at.as_str(),
        )?;

        let client = self
            .factory
            .authenticated_client(&org_url, session.id.as_str())?;

        Ok(AuthenticatedOktaContext { org, user, client })
    }

    async fn run_mfa(
        &self,
        client: &dyn OktaAnonymousApi,
        state_token: &str,
        factors: &[MfaFactor],
    ) -> Result<String> {
        let factor = self.prompter.select_mfa(factors)?;
        if factor.kind == MfaKind::Unknown {
            return Err(BmxError::MfaUnsupported.into());
        }

        // sms/call/email factors need Okta to send the code before the user
        // can answer
        let needs_challenge = factor.kind == MfaKind::Sms
            || matches!(factor.factor_type.as_str(), "sms" | "call" | "email");
        if needs_challenge {
            client
                .issue_mfa_challenge(state_token, factor.id.as_str())
                .await?;
        }

        let (label, masked) = mfa_response_prompt(&factor);
        let response = self.prompter.get_mfa_response(label, masked)?;

        match client
            .verify_mfa_challenge_response(state_token, factor.id.as_str(), response.as_str())
            .await?
        {
            AuthResult::Success { session_token } => Ok(session_token),
            AuthResult::Failure(_) => Err(BmxError::MfaVerificationFailure.into()),
            AuthResult::MfaRequired { .. } => {
                Err(anyhow!("unexpected MFA_REQUIRED state during verification"))
            }
        }
    }

    fn cached_session_id(&self, org: &str, user: &str) -> Option<String> {
        let now = OffsetDateTime::now_utc();

        self.session_storage
            .load()
            .into_iter()
            .filter(|session| session.expires_at().is_some_and(|expires| expires > now))
            .find(|session| session.org == org && session.user_id == user)
            .map(|session| session.session_id)
    }

    fn cache_session(&self, org: &str, user: &str, session_id: &str, expires_at: &str) -> Result<()> {
        self.session_storage.upsert(OktaSessionEntry {
            user_id: user.to_string(),
            org: org.to_string(),
            session_id: session_id.to_string(),
            expires_at: expires_at.to_string(),
        })
    }
}
