use crate::utils::{self, AuthArgs};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde_json::json;

#[derive(ValueEnum, PartialEq, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Bash,
    Powershell,
    /// AWS `credential_process` format
    Json,
}

#[derive(Parser)]
pub struct Print {
    #[clap(flatten)]
    auth: AuthArgs,

    #[clap(long, value_enum, default_value_t = OutputFormat::Bash)]
    format: OutputFormat,
}

impl Print {
    pub async fn run(&self) -> Result<()> {
        let credentials = utils::acquire_credentials(&self.auth).await?;

        match self.format {
            OutputFormat::Bash => {
                println!(
                    "export AWS_SESSION_TOKEN=\"{}\"\nexport AWS_ACCESS_KEY_ID=\"{}\"\nexport AWS_SECRET_ACCESS_KEY=\"{}\"",
                    credentials.session_token,
                    credentials.access_key_id,
                    credentials.secret_access_key,
                );
            }
            OutputFormat::Powershell => {
                println!(
                    "$env:AWS_SESSION_TOKEN = \"{}\"\n$env:AWS_ACCESS_KEY_ID = \"{}\"\n$env:AWS_SECRET_ACCESS_KEY = \"{}\"",
                    credentials.session_token,
                    credentials.access_key_id,
                    credentials.secret_access_key,
                );
            }
            OutputFormat::Json => {
                let json = json!({
                    "Version": 1,
                    "AccessKeyId": credentials.access_key_id,
                    "SecretAccessKey": credentials.secret_access_key,
                    "SessionToken": credentials.session_token,
                    "Expiration": credentials.expiration,
                });
                println!("{json}");
            }
        }

        Ok(())
    }
}
