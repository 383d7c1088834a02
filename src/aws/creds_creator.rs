use crate::aws::client::CloudRoleBroker;
use crate::aws::creds_cache::AwsCredentialCache;
use crate::aws::saml;
use crate::aws::AwsCredentials;
use crate::config::BmxConfig;
use crate::errors::BmxError;
use crate::okta::authenticator::AuthenticatedOktaContext;
use crate::prompt::Prompter;
use anyhow::Result;

const DEFAULT_DURATION_MINUTES: i64 = 60;

/// Turns an authenticated Okta context into AWS credentials: resolve the
/// account and role (argument → config → prompt), consult the credential
/// cache, and only then go to STS.
pub struct AwsCredsCreator<'a> {
    broker: &'a dyn CloudRoleBroker,
    prompter: &'a dyn Prompter,
    creds_cache: &'a AwsCredentialCache,
    config: &'a BmxConfig,
}

impl<'a> AwsCredsCreator<'a> {
    pub fn new(
        broker: &'a dyn CloudRoleBroker,
        prompter: &'a dyn Prompter,
        creds_cache: &'a AwsCredentialCache,
        config: &'a BmxConfig,
    ) -> AwsCredsCreator<'a> {
        AwsCredsCreator {
            broker,
            prompter,
            creds_cache,
            config,
        }
    }

    pub async fn create_aws_creds(
        &self,
        okta: &AuthenticatedOktaContext,
        account: Option<String>,
        role: Option<String>,
        duration: Option<i64>,
        non_interactive: bool,
        use_cache: bool,
    ) -> Result<AwsCredentials> {
        let aws_apps = okta.client.get_aws_account_apps().await?;

        let account = match account.or_else(|| self.config.account.clone()) {
            Some(account) => account,
            None if !non_interactive => {
                let labels: Vec<String> = aws_apps.iter().map(|app| app.label.clone()).collect();
                self.prompter.prompt_account(&labels)?
            }
            None => return Err(BmxError::MissingInput("account").into()),
        };

        let selected_app = aws_apps
            .iter()
            .find(|app| app.label.eq_ignore_ascii_case(account.as_str()))
            .ok_or_else(|| BmxError::AccountNotFound(account.clone()))?;

        let login_page = okta.client.get_page(selected_app.link_url.as_str()).await?;
        let saml_response = saml::extract_saml_from_login_page(login_page.as_str())?;
        let state = self.broker.get_roles(saml_response.as_str())?;

        let role = match role.or_else(|| self.config.role.clone()) {
            Some(role) => role,
            None if !non_interactive => {
                let names: Vec<String> = state
                    .roles
                    .iter()
                    .map(|role| role.role_name.clone())
                    .collect();
                self.prompter.prompt_role(&names)?
            }
            None => return Err(BmxError::MissingInput("role").into()),
        };

        // the cache is keyed by the canonical names, not the user's spelling
        let selected_role = state
            .roles
            .iter()
            .find(|r| r.role_name.eq_ignore_ascii_case(role.as_str()))
            .ok_or_else(|| BmxError::RoleNotFound(role.clone()))?;

        let duration = duration
            .or(self.config.duration)
            .unwrap_or(DEFAULT_DURATION_MINUTES);

        if use_cache {
            if let Some(credentials) = self.creds_cache.get(
                okta.org.as_str(),
                okta.user.as_str(),
                selected_app.label.as_str(),
                selected_role.role_name.as_str(),
                duration,
            ) {
                log::debug!("using cached AWS credentials for {account}/{role}");
                return Ok(credentials);
            }
        }

        let credentials = self
            .broker
            .get_tokens(&state, selected_role.role_name.as_str(), duration)
            .await?;

        if use_cache {
            self.creds_cache.set(
                okta.org.as_str(),
                okta.user.as_str(),
                selected_app.label.as_str(),
                selected_role.role_name.as_str(),
                &credentials,
            )?;
        }

        Ok(credentials)
    }
}
