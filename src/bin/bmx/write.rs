use crate::utils::{self, AuthArgs};
use anyhow::Result;
use bmx::config::BmxConfig;
use bmx::errors::BmxError;
use bmx::paths;
use clap::Parser;
use ini::Ini;

#[derive(Parser)]
pub struct Write {
    #[clap(flatten)]
    auth: AuthArgs,

    /// Profile to create or update in ~/.aws/credentials
    #[clap(short, long)]
    profile: Option<String>,
}

impl Write {
    pub async fn run(&self) -> Result<()> {
        let config = BmxConfig::load();
        let profile = match self.profile.clone().or(config.profile) {
            Some(profile) => profile,
            None => return Err(BmxError::MissingInput("profile").into()),
        };

        let credentials = utils::acquire_credentials(&self.auth).await?;

        let path = paths::aws_credentials_file()?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        // merge into the existing credentials file; other profiles are kept
        let mut ini = match Ini::load_from_file(path.as_path()) {
            Ok(ini) => ini,
            Err(_) => Ini::new(),
        };
        ini.with_section(Some(profile.as_str()))
            .set("aws_access_key_id", credentials.access_key_id.as_str())
            .set("aws_secret_access_key", credentials.secret_access_key.as_str())
            .set("aws_session_token", credentials.session_token.as_str());
        ini.write_to_file(path.as_path())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(path.as_path(), perms)?;
        }

        eprintln!("Wrote AWS credentials to profile `{profile}`.");

        Ok(())
    }
}
