//! The out-of-process step where the user signs in at the provider.
//!
//! The engine hands an [`AuthorizationRequest`] to an [`AuthorizationPrompt`] and
//! waits, without a deadline, for the [`PromptOutcome`].

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use url::Url;

/// What the prompt needs to show the provider's authorization screen.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: Url,
    pub redirect_uri: String,
    /// The state the provider must echo back.
    pub state: String,
}

/// How the user left the provider's authorization screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// Redirected back to us; the code may still be missing.
    Success {
        code: Option<String>,
        state: Option<String>,
    },
    /// Redirected back with an OAuth `error` parameter.
    Error {
        error: String,
        description: Option<String>,
    },
    /// The user closed the screen.
    Dismiss,
    /// The flow was cancelled before completing.
    Cancel,
    /// Another authorization screen was already open.
    Locked,
}

impl PromptOutcome {
    pub fn type_name(&self) -> &'static str {
        match self {
            PromptOutcome::Success { .. } => "success",
            PromptOutcome::Error { .. } => "error",
            PromptOutcome::Dismiss => "dismiss",
            PromptOutcome::Cancel => "cancel",
            PromptOutcome::Locked => "locked",
        }
    }

    /// Interprets the redirect the provider sent the user back to.
    pub fn from_redirect(redirect: &Url) -> Self {
        let param = |name: &str| {
            redirect
                .query_pairs()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
        };

        if let Some(error) = param("error") {
            return PromptOutcome::Error {
                error,
                description: param("error_description"),
            };
        }
        PromptOutcome::Success {
            code: param("code").filter(|c| !c.is_empty()),
            state: param("state"),
        }
    }
}

#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Shows the authorization screen and resolves once the user is done with it.
    async fn authorize(&self, request: AuthorizationRequest) -> PromptOutcome;
}

/// Opens the system browser and reads the redirect URL pasted back on stdin.
///
/// An empty line or end of input counts as the user dismissing the screen.
pub struct ConsolePrompt {
    open_browser: bool,
}

impl ConsolePrompt {
    pub fn new(open_browser: bool) -> Self {
        ConsolePrompt { open_browser }
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Parses a pasted redirect. Unparseable input is treated as a dismissal.
pub fn parse_pasted_redirect(input: &str) -> PromptOutcome {
    let value = input.trim();
    if value.is_empty() {
        return PromptOutcome::Dismiss;
    }
    match Url::parse(value) {
        Ok(url) => PromptOutcome::from_redirect(&url),
        Err(e) => {
            warn!("Pasted text is not a redirect URL: {}", e);
            PromptOutcome::Dismiss
        }
    }
}

#[async_trait]
impl AuthorizationPrompt for ConsolePrompt {
    async fn authorize(&self, request: AuthorizationRequest) -> PromptOutcome {
        let opened = self.open_browser && open::that(request.url.as_str()).is_ok();
        if opened {
            info!("Opened authorization page in the system browser");
        } else {
            debug!("Browser not opened; printing the authorization URL");
        }
        eprintln!("Sign in at:\n\n  {}\n", request.url);
        eprintln!(
            "After signing in you will be sent to {}.\nPaste that full URL here (empty line to cancel):",
            request.redirect_uri
        );

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) => PromptOutcome::Dismiss,
            Ok(_) => parse_pasted_redirect(&line),
            Err(e) => {
                warn!("Failed to read redirect from stdin: {}", e);
                PromptOutcome::Cancel
            }
        }
    }
}
