//! Stage-tiered disclosure of failures to clients.
//!
//! The same failure is reported differently depending on where the service
//! runs: production clients only see the failure's name and message, staging
//! clients additionally see the kind chain, and development or test clients
//! get the full normalized cause chain.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::normalize::{NormalizedCause, NormalizedOutcome};

/// Deployment stage of the running service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Local development.
    #[default]
    Development,
    /// Automated test runs.
    Testing,
    /// Pre-production.
    Staging,
    /// Production.
    Production,
}

impl Stage {
    /// Lowercase name of the stage.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Testing => "testing",
            Self::Staging => "staging",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown stage name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage `{0}`, expected one of development, testing, staging, production")]
pub struct ParseStageError(pub String);

impl FromStr for Stage {
    type Err = ParseStageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "testing" | "test" => Ok(Self::Testing),
            "staging" => Ok(Self::Staging),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ParseStageError(s.to_owned())),
        }
    }
}

/// How much of a failure a client is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disclosure {
    /// Name and message only.
    Minimal,
    /// Name, message and the kind chain.
    KindsOnly,
    /// Name, message and the normalized cause chain.
    Full,
}

impl Disclosure {
    /// Disclosure tier used for `stage`.
    #[must_use]
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Production => Self::Minimal,
            Stage::Staging => Self::KindsOnly,
            Stage::Development | Stage::Testing => Self::Full,
        }
    }
}

/// Client-facing error body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Kind name of the failure.
    pub name: String,
    /// Failure message.
    pub message: String,
    /// Chain detail, depending on the disclosure tier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ReportList>,
}

/// Chain detail carried by an [`ErrorReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReportList {
    /// Kind names only.
    Kinds(Vec<String>),
    /// Fully normalized chain entries.
    Causes(Vec<NormalizedCause>),
}

impl NormalizedOutcome {
    /// Builds the error report a client at `stage` may see.
    #[must_use]
    pub fn disclose(&self, stage: Stage) -> ErrorReport {
        let list = match Disclosure::for_stage(stage) {
            Disclosure::Minimal => None,
            Disclosure::KindsOnly => Some(ReportList::Kinds(self.cause_kind_chain.clone())),
            Disclosure::Full => Some(ReportList::Causes(self.cause_chain.clone())),
        };
        ErrorReport {
            name: self.name.clone(),
            message: self.message.clone(),
            list,
        }
    }
}
