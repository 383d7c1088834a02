use anyhow::Result;
use bmx::config::BmxConfig;
use bmx::prompt::{ConsolePrompter, Prompter};
use clap::Parser;

#[derive(Parser)]
pub struct Configure {
    /// Default Okta org
    #[clap(long)]
    org: Option<String>,

    /// Default Okta username
    #[clap(short, long)]
    user: Option<String>,

    /// Default credential lifetime in minutes
    #[clap(short, long)]
    duration: Option<i64>,

    /// Default AWS profile for `bmx write`
    #[clap(short, long)]
    profile: Option<String>,
}

impl Configure {
    pub fn run(&self) -> Result<()> {
        let prompter = ConsolePrompter;

        let org = match self.org.clone() {
            Some(org) => org,
            None => prompter.prompt_org()?,
        };
        let user = match self.user.clone() {
            Some(user) => user,
            None => prompter.prompt_user()?,
        };

        let config = BmxConfig {
            org: Some(org),
            user: Some(user),
            account: None,
            role: None,
            duration: self.duration,
            profile: self.profile.clone(),
        };
        config.save()?;

        eprintln!("Configuration saved to ~/.bmx/config.");

        Ok(())
    }
}
