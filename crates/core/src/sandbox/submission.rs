//! Inbound submissions and their validation.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::{ValidationError, ValidationErrors};

/// Scripting dialects the sandbox can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Javascript,
    Typescript,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::Javascript, Language::Typescript];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
        }
    }

    /// File extension the interpreter uses to pick the dialect.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Javascript => "js",
            Self::Typescript => "ts",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| format!("unsupported language '{s}'"))
    }
}

/// Raw execution request as received from the transport layer.
///
/// Fields default to empty strings so that missing fields surface as
/// field-level validation errors instead of deserialization failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    #[serde(default)]
    pub script: String,
    #[serde(default)]
    pub language: String,
}

/// A validated, immutable submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub script: String,
    pub language: Language,
}

impl SubmissionRequest {
    pub fn new(script: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            script: script.into(),
            language: language.into(),
        }
    }

    /// Validate the request, collecting every field error at once.
    pub fn validate(self, max_script_bytes: usize) -> Result<Submission, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.script.trim().is_empty() {
            errors.add("script", field_error("required", "script must not be empty".into()));
        } else if self.script.len() > max_script_bytes {
            let mut err = field_error(
                "too_large",
                format!("script exceeds {max_script_bytes} bytes").into(),
            );
            err.add_param("max".into(), &max_script_bytes);
            errors.add("script", err);
        }

        let language = match self.language.parse::<Language>() {
            Ok(language) => Some(language),
            Err(message) => {
                let mut err = field_error("unsupported_language", message.into());
                err.add_param("value".into(), &self.language);
                errors.add("language", err);
                None
            }
        };

        match language {
            Some(language) if errors.is_empty() => Ok(Submission {
                script: self.script,
                language,
            }),
            _ => Err(errors),
        }
    }
}

fn field_error(code: &'static str, message: Cow<'static, str>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message);
    err
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
