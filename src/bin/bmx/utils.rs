use anyhow::Result;
use bmx::aws::client::AwsStsBroker;
use bmx::aws::creds_cache::AwsCredentialCache;
use bmx::aws::creds_creator::AwsCredsCreator;
use bmx::aws::AwsCredentials;
use bmx::config::BmxConfig;
use bmx::okta::authenticator::OktaAuthenticator;
use bmx::okta::client::OktaHttpClientFactory;
use bmx::okta::session_cache::OktaSessionStorage;
use bmx::prompt::ConsolePrompter;
use clap::Args;

/// Flags shared by every credential-producing command.
#[derive(Args, Clone)]
pub struct AuthArgs {
    /// Okta org name (or full Okta host)
    #[clap(long)]
    pub org: Option<String>,

    /// Okta username
    #[clap(short, long)]
    pub user: Option<String>,

    /// AWS account name, as labelled in Okta
    #[clap(short, long)]
    pub account: Option<String>,

    /// AWS role name
    #[clap(short, long)]
    pub role: Option<String>,

    /// Requested credential lifetime in minutes
    #[clap(short, long)]
    pub duration: Option<i64>,

    /// Fail instead of prompting for missing values
    #[clap(long)]
    pub non_interactive: bool,

    /// Bypass the session and credential caches
    #[clap(long)]
    pub ignore_cache: bool,

    /// Skip the desktop single-sign-on probe
    #[clap(long)]
    pub no_dsso: bool,
}

/// Runs the whole broker pipeline: authenticate against Okta, resolve the
/// account/role, and produce AWS credentials.
pub async fn acquire_credentials(args: &AuthArgs) -> Result<AwsCredentials> {
    let config = BmxConfig::load();
    let prompter = ConsolePrompter;
    let factory = OktaHttpClientFactory;
    let session_storage = OktaSessionStorage::new()?;

    let authenticator = OktaAuthenticator::new(&factory, &prompter, &session_storage, &config);
    let okta = authenticator
        .authenticate(
            args.org.clone(),
            args.user.clone(),
            args.non_interactive,
            args.ignore_cache,
            !args.no_dsso,
        )
        .await?;

    let broker = AwsStsBroker::new();
    let creds_cache = AwsCredentialCache::new()?;
    let creator = AwsCredsCreator::new(&broker, &prompter, &creds_cache, &config);

    creator
        .create_aws_creds(
            &okta,
            args.account.clone(),
            args.role.clone(),
            args.duration,
            args.non_interactive,
            !args.ignore_cache,
        )
        .await
}
