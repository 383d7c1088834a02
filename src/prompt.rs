use crate::errors::BmxError;
use crate::okta::api_responses::{MfaFactor, MfaKind};
use anyhow::{anyhow, Result};
use std::io::{self, BufRead, Write};

/// Console interaction consumed by the authenticator and the credentials
/// creator. Injected so the flows can be tested without a terminal.
pub trait Prompter {
    fn prompt_org(&self) -> Result<String>;
    fn prompt_user(&self) -> Result<String>;
    fn prompt_password(&self) -> Result<String>;
    fn prompt_account(&self, accounts: &[String]) -> Result<String>;
    fn prompt_role(&self, roles: &[String]) -> Result<String>;
    fn select_mfa(&self, factors: &[MfaFactor]) -> Result<MfaFactor>;
    /// Reads an MFA response. Masked input hides keystrokes; security
    /// question answers are echoed.
    fn get_mfa_response(&self, prompt: &str, masked: bool) -> Result<String>;
}

/// [`Prompter`] over stderr/stdin. Prompts go to stderr so that command
/// output stays pipeable.
pub struct ConsolePrompter;

impl ConsolePrompter {
    fn read_line(&self, prompt: &str) -> Result<String> {
        eprint!("{prompt}");
        let _ = io::stderr().flush();
        let mut buffer = String::new();
        io::stdin().lock().read_line(&mut buffer)?;
        // remove \n on unix or \r\n on windows
        let len = buffer.trim_end_matches(&['\r', '\n'][..]).len();
        buffer.truncate(len);

        Ok(buffer)
    }

    fn select_from(&self, label: &str, options: &[String]) -> Result<String> {
        eprintln!("Available {label}s:");
        for (i, option) in options.iter().enumerate() {
            eprintln!("[{}] {}", i + 1, option);
        }

        let buffer = self.read_line(&format!("Select a {label}: "))?;
        let selection: usize = buffer
            .parse()
            .map_err(|_| anyhow!("invalid {} selection", label))?;
        if selection < 1 || selection > options.len() {
            return Err(anyhow!("invalid {} selection", label));
        }

        Ok(options[selection - 1].clone())
    }
}

impl Prompter for ConsolePrompter {
    fn prompt_org(&self) -> Result<String> {
        let org = self.read_line("Okta org: ")?;
        if org.is_empty() {
            return Err(BmxError::MissingInput("org").into());
        }

        Ok(org)
    }

    fn prompt_user(&self) -> Result<String> {
        let user = self.read_line("Okta username: ")?;
        if user.is_empty() {
            return Err(BmxError::MissingInput("user").into());
        }

        Ok(user)
    }

    fn prompt_password(&self) -> Result<String> {
        Ok(rpassword::prompt_password("Okta password: ")?)
    }

    fn prompt_account(&self, accounts: &[String]) -> Result<String> {
        self.select_from("account", accounts)
    }

    fn prompt_role(&self, roles: &[String]) -> Result<String> {
        self.select_from("role", roles)
    }

    fn select_mfa(&self, factors: &[MfaFactor]) -> Result<MfaFactor> {
        eprintln!("MFA is required. Available factors:");
        for (i, factor) in factors.iter().enumerate() {
            eprintln!("[{}] {}", i + 1, factor.display_name());
        }

        let buffer = self.read_line("Select an MFA factor: ")?;
        let selection: usize = buffer
            .parse()
            .map_err(|_| anyhow!("invalid MFA factor selection"))?;
        if selection < 1 || selection > factors.len() {
            return Err(anyhow!("invalid MFA factor selection"));
        }

        Ok(factors[selection - 1].clone())
    }

    fn get_mfa_response(&self, prompt: &str, masked: bool) -> Result<String> {
        if masked {
            Ok(rpassword::prompt_password(format!("{prompt}: "))?)
        } else {
            self.read_line(&format!("{prompt}: "))
        }
    }
}

/// The label and echo behavior for a factor's response prompt. Security
/// questions show the typed answer; everything else is masked.
pub fn mfa_response_prompt(factor: &MfaFactor) -> (&'static str, bool) {
    if factor.kind == MfaKind::Question {
        ("Answer", false)
    } else {
        ("PassCode", true)
    }
}
