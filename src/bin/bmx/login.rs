use anyhow::Result;
use bmx::config::BmxConfig;
use bmx::okta::authenticator::OktaAuthenticator;
use bmx::okta::client::OktaHttpClientFactory;
use bmx::okta::session_cache::OktaSessionStorage;
use bmx::prompt::ConsolePrompter;
use clap::Parser;

#[derive(Parser)]
pub struct Login {
    /// Okta org name (or full Okta host)
    #[clap(long)]
    org: Option<String>,

    /// Okta username
    #[clap(short, long)]
    user: Option<String>,

    /// Skip the desktop single-sign-on probe
    #[clap(long)]
    no_dsso: bool,
}

impl Login {
    pub async fn run(&self) -> Result<()> {
        let config = BmxConfig::load();
        let prompter = ConsolePrompter;
        let factory = OktaHttpClientFactory;
        let session_storage = OktaSessionStorage::new()?;

        let authenticator = OktaAuthenticator::new(&factory, &prompter, &session_storage, &config);

        // a login always establishes a fresh session; the cache is only
        // written, never consulted
        let context = authenticator
            .authenticate(self.org.clone(), self.user.clone(), false, true, !self.no_dsso)
            .await?;

        eprintln!("Okta session established for {}@{}.", context.user, context.org);

        Ok(())
    }
}
