use crate::okta::authenticator::AuthenticatedOktaContext;
use crate::okta::client::OktaClientFactory;
use crate::okta::session_cache::{OktaSessionEntry, OktaSessionStorage};
use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{EventResponseReceived, GetResponseBodyParams};
use chromiumoxide::Page;
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::oneshot;
use url::Url;

const DSSO_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_LOGIN_FORM_RETRIES: usize = 3;

/// The background API call the org home page makes once a user is signed in;
/// its response carries the logged-in user's login.
const ENDUSER_HOME_PATH: &str = "/enduser/api/v1/home";

// Same discovery list the Playwright registry uses for system browsers.
const LINUX_BROWSER_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/opt/microsoft/msedge/msedge",
];
const MAC_BROWSER_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
];
const WINDOWS_BROWSER_PARTIAL_PATHS: &[&str] = &[
    "Microsoft\\Edge\\Application\\msedge.exe",
    "Google\\Chrome\\Application\\chrome.exe",
];
const WINDOWS_ENV_PREFIXES: &[&str] = &["LOCALAPPDATA", "PROGRAMFILES", "PROGRAMFILES(X86)"];

/// Passive desktop-SSO login: drive a headless browser to the org's Okta
/// home page and, if the machine already holds a live corporate session,
/// harvest its `sid` cookie without prompting the user for anything.
///
/// Every failure mode is non-fatal; the caller falls back to interactive
/// authentication.
pub struct DssoProbe<'a> {
    factory: &'a dyn OktaClientFactory,
    session_storage: &'a OktaSessionStorage,
    timeout: Duration,
}

impl<'a> DssoProbe<'a> {
    pub fn new(
        factory: &'a dyn OktaClientFactory,
        session_storage: &'a OktaSessionStorage,
    ) -> DssoProbe<'a> {
        DssoProbe {
            factory,
            session_storage,
            timeout: DSSO_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> DssoProbe<'a> {
        self.timeout = timeout;
        self
    }

    pub async fn try_dsso(
        &self,
        org: &str,
        user: &str,
        org_url: &Url,
    ) -> Option<AuthenticatedOktaContext> {
        let browser_path = match browser_executable() {
            Some(path) => path,
            None => {
                log::debug!("no system browser found, skipping desktop SSO");
                return None;
            }
        };

        let config = match BrowserConfig::builder()
            .chrome_executable(browser_path)
            .build()
        {
            Ok(config) => config,
            Err(e) => {
                log::debug!("could not configure the browser for desktop SSO: {e}");
                return None;
            }
        };

        let (mut browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                log::debug!("could not launch the browser for desktop SSO: {e}");
                return None;
            }
        };
        let handler_task = tokio::spawn(async move { while handler.next().await.is_some() {} });

        // Both detectors resolve under one shared deadline; the browser is
        // released on every exit path.
        let signals = tokio::time::timeout(self.timeout, probe_signals(&browser, org_url)).await;

        let _ = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();

        let (session_id, login) = match signals {
            Ok(Ok(signals)) => signals,
            Ok(Err(e)) => {
                log::debug!("desktop SSO probe failed: {e}");
                return None;
            }
            Err(_) => {
                log::debug!("desktop SSO timed out after {:?}", self.timeout);
                return None;
            }
        };

        let expected = user.split('@').next().unwrap_or(user);
        let actual = login.split('@').next().unwrap_or(login.as_str());
        if !expected.eq_ignore_ascii_case(actual) {
            log::warn!("desktop SSO found a session for {login}, not for {user}; ignoring it");
            return None;
        }

        match self.build_context(org, user, org_url, session_id.as_str()).await {
            Ok(context) => {
                log::debug!("desktop SSO succeeded for {user}@{org}");
                Some(context)
            }
            Err(e) => {
                log::warn!("desktop SSO found a session but could not use it: {e}");
                None
            }
        }
    }

    async fn build_context(
        &self,
        org: &str,
        user: &str,
        org_url: &Url,
        session_id: &str,
    ) -> Result<AuthenticatedOktaContext> {
        let client = self.factory.authenticated_client(org_url, session_id)?;
        let session = client.get_current_session().await?;

        self.session_storage.upsert(OktaSessionEntry {
            user_id: user.to_string(),
            org: org.to_string(),
            session_id: session.id.clone(),
            expires_at: session.expires_at.clone(),
        })?;

        Ok(AuthenticatedOktaContext {
            org: org.to_string(),
            user: user.to_string(),
            client,
        })
    }
}

/// Waits for both DSSO signals: the session cookie and the logged-in user's
/// login, each delivered through a one-shot slot by its own watcher.
async fn probe_signals(browser: &Browser, org_url: &Url) -> Result<(String, String)> {
    let page = browser.new_page("about:blank").await?;

    let (sid_tx, sid_rx) = oneshot::channel::<String>();
    let (login_tx, login_rx) = oneshot::channel::<String>();

    // login watcher: picks the logged-in user's login out of the
    // intercepted enduser home API response
    let mut responses = page.event_listener::<EventResponseReceived>().await?;
    let watcher_page = page.clone();
    tokio::spawn(async move {
        while let Some(event) = responses.next().await {
            if !event.response.url.contains(ENDUSER_HOME_PATH) {
                continue;
            }

            let params = GetResponseBodyParams::new(event.request_id.clone());
            let body = match watcher_page.execute(params).await {
                Ok(body) => body,
                Err(_) => continue,
            };

            let text = if body.base64_encoded {
                match STANDARD.decode(body.body.as_bytes()) {
                    Ok(bytes) => String::from_utf8_lossy(bytes.as_slice()).into_owned(),
                    Err(_) => continue,
                }
            } else {
                body.body.clone()
            };

            let value: serde_json::Value = match serde_json::from_str(text.as_str()) {
                Ok(value) => value,
                Err(_) => continue,
            };

            let login = value
                .pointer("/user/profile/login")
                .or_else(|| value.pointer("/profile/login"))
                .and_then(|login| login.as_str());

            if let Some(login) = login {
                let _ = login_tx.send(login.to_string());
                return;
            }
        }
    });
    tokio::spawn(watch_session_cookie(page.clone(), org_url.clone(), sid_tx));

    let session_id = sid_rx.await?;
    let login = login_rx.await?;

    Ok((session_id, login))
}

/// Navigates to the org home page and harvests the `sid` cookie once the
/// page is no longer a login form. A login form at the root path gets up to
/// 3 navigation attempts; anywhere else means SSO isn't happening.
async fn watch_session_cookie(page: Page, org_url: Url, tx: oneshot::Sender<String>) {
    for _ in 0..MAX_LOGIN_FORM_RETRIES {
        if page.goto(org_url.as_str()).await.is_err() {
            return;
        }
        let _ = page.wait_for_navigation().await;

        if !login_form_shown(&page).await {
            if let Some(session_id) = session_cookie(&page).await {
                let _ = tx.send(session_id);
            }
            return;
        }

        let at_root = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|url| Url::parse(url.as_str()).ok())
            .map(|url| url.path() == "/")
            .unwrap_or(false);
        if !at_root {
            return;
        }
    }
}

async fn login_form_shown(page: &Page) -> bool {
    let result = page
        .evaluate(
            r#"document.querySelector('input[name="identifier"], input[name="username"], input[type="password"]') !== null"#,
        )
        .await;

    match result {
        Ok(value) => value.into_value::<bool>().unwrap_or(true),
        Err(_) => true,
    }
}

async fn session_cookie(page: &Page) -> Option<String> {
    let cookies = page.get_cookies().await.ok()?;

    cookies
        .into_iter()
        .find(|cookie| cookie.name == "sid")
        .map(|cookie| cookie.value)
}

fn browser_executable() -> Option<String> {
    if cfg!(target_os = "windows") {
        for partial in WINDOWS_BROWSER_PARTIAL_PATHS {
            for prefix_var in WINDOWS_ENV_PREFIXES {
                if let Ok(prefix) = std::env::var(prefix_var) {
                    let path = std::path::Path::new(prefix.as_str()).join(partial);
                    if path.exists() {
                        return Some(path.to_string_lossy().into_owned());
                    }
                }
            }
        }
        return None;
    }

    let candidates = if cfg!(target_os = "macos") {
        MAC_BROWSER_PATHS
    } else {
        LINUX_BROWSER_PATHS
    };

    candidates
        .iter()
        .find(|path| std::path::Path::new(path).exists())
        .map(|path| path.to_string())
}
