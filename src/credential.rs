//! Resolving the Gemini API key.
//!
//! The key comes from `GEMINI_API_KEY`.  When the variable is unset or blank
//! the user is asked for it on a masked prompt.  If neither yields a key, the
//! resolver returns [`Error::MissingCredential`] and the caller stops before
//! any network work happens.

use std::borrow::Cow;
use std::fmt;

use rustyline::completion::Completer;
use rustyline::config::{ColorMode, Configurer};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Editor, Helper};

use crate::error::{Error, Result};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// A non-empty API key.  `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, trimming surrounding whitespace.  Returns `None` when nothing is left.
    pub fn new(key: impl AsRef<str>) -> Option<Self> {
        let key = key.as_ref().trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    /// The secret itself.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Interactive source of a secret.
pub trait SecretPrompt {
    /// Ask for a secret.  `Ok(None)` means the user supplied nothing.
    fn prompt_secret(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// A prompt that never yields a secret, for non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl SecretPrompt for NoPrompt {
    fn prompt_secret(&mut self, _prompt: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Looks up the API key in one environment variable and falls back to a prompt.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    variable: String,
    prompt: String,
}

impl CredentialResolver {
    /// A resolver for [`API_KEY_ENV`].
    pub fn new() -> Self {
        Self::for_variable(API_KEY_ENV)
    }

    /// A resolver for an arbitrary variable.
    pub fn for_variable(variable: impl Into<String>) -> Self {
        let variable = variable.into();
        let prompt = format!("請輸入您的 {variable}: ");
        Self { variable, prompt }
    }

    /// The variable consulted.
    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Resolve from the process environment, then `prompt`.
    pub fn resolve(&self, prompt: &mut dyn SecretPrompt) -> Result<ApiKey> {
        self.resolve_from(std::env::var(&self.variable).ok(), prompt)
    }

    /// Resolve from an explicit environment value, then `prompt`.
    pub fn resolve_from(
        &self,
        env_value: Option<String>,
        prompt: &mut dyn SecretPrompt,
    ) -> Result<ApiKey> {
        if let Some(key) = env_value.and_then(ApiKey::new) {
            tracing::debug!(variable = %self.variable, "API key taken from environment");
            return Ok(key);
        }
        match prompt.prompt_secret(&self.prompt)?.and_then(ApiKey::new) {
            Some(key) => Ok(key),
            None => Err(Error::missing_credential(&self.variable)),
        }
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// A terminal prompt that echoes `*` instead of the typed characters.
pub struct MaskedPrompt {
    editor: Editor<MaskingHelper, DefaultHistory>,
}

impl MaskedPrompt {
    /// Create a masked prompt on the controlling terminal.
    pub fn new() -> Result<Self> {
        let mut editor = Editor::new().map_err(readline_error)?;
        editor.set_helper(Some(MaskingHelper));
        editor.set_color_mode(ColorMode::Forced);
        editor.set_auto_add_history(false);
        Ok(Self { editor })
    }
}

impl SecretPrompt for MaskedPrompt {
    fn prompt_secret(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(readline_error(err)),
        }
    }
}

fn readline_error(err: ReadlineError) -> Error {
    match err {
        ReadlineError::Io(err) => Error::io("failed to read from terminal", err),
        err => Error::io(
            "failed to read from terminal",
            std::io::Error::other(err.to_string()),
        ),
    }
}

struct MaskingHelper;

impl Highlighter for MaskingHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        Cow::Owned("*".repeat(line.chars().count()))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

impl Completer for MaskingHelper {
    type Candidate = String;
}

impl Hinter for MaskingHelper {
    type Hint = String;
}

impl Validator for MaskingHelper {}

impl Helper for MaskingHelper {}
