use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// Generates `as_str`, `Display` and `FromStr` for a unit-only enum whose
/// wire names are fixed strings.
macro_rules! wire_enum {
    ($name:ident, $label:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            /// Canonical wire name.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = AuditError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($wire => Ok(Self::$variant),)+
                    other => Err(AuditError::invalid_argument(format!(
                        "unknown {} '{}'",
                        $label, other
                    ))),
                }
            }
        }
    };
}

/// Kind of creative asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Image,
    Video,
    Text,
    Audio,
    Document,
    Archive,
}

wire_enum!(ContentType, "content type" {
    Image => "image",
    Video => "video",
    Text => "text",
    Audio => "audio",
    Document => "document",
    Archive => "archive",
});

/// Compliance verdict recorded on a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compliance {
    #[default]
    Pending,
    Passed,
    Failed,
}

wire_enum!(Compliance, "compliance status" {
    Pending => "pending",
    Passed => "passed",
    Failed => "failed",
});

/// Lifecycle status of a material.
///
/// Always derivable from [`Compliance`]:
///
/// ```text
/// passed  -> approved
/// failed  -> flagged | rejected
/// pending -> pending | testing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialStatus {
    #[default]
    Pending,
    Testing,
    Approved,
    Flagged,
    Rejected,
}

wire_enum!(MaterialStatus, "material status" {
    Pending => "pending",
    Testing => "testing",
    Approved => "approved",
    Flagged => "flagged",
    Rejected => "rejected",
});

impl MaterialStatus {
    /// Whether this status is a legal pairing with the given compliance value.
    #[must_use]
    pub const fn is_consistent_with(self, compliance: Compliance) -> bool {
        matches!(
            (compliance, self),
            (Compliance::Passed, Self::Approved)
                | (Compliance::Failed, Self::Flagged | Self::Rejected)
                | (Compliance::Pending, Self::Pending | Self::Testing)
        )
    }
}

/// Terminal outcome of an audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
}

wire_enum!(Verdict, "verdict" {
    Passed => "passed",
    Failed => "failed",
});

impl Verdict {
    #[must_use]
    pub const fn compliance(self) -> Compliance {
        match self {
            Self::Passed => Compliance::Passed,
            Self::Failed => Compliance::Failed,
        }
    }

    /// Material status the orchestrator writes when applying this verdict.
    #[must_use]
    pub const fn material_status(self) -> MaterialStatus {
        match self {
            Self::Passed => MaterialStatus::Approved,
            Self::Failed => MaterialStatus::Flagged,
        }
    }
}

/// Categorical reason code attached to a failed verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationTag {
    ContentViolation,
    PolicyBreach,
    MisleadingClaim,
    InappropriateContent,
    CopyrightIssue,
    FalseInformation,
}

wire_enum!(ViolationTag, "violation tag" {
    ContentViolation => "content_violation",
    PolicyBreach => "policy_breach",
    MisleadingClaim => "misleading_claim",
    InappropriateContent => "inappropriate_content",
    CopyrightIssue => "copyright_issue",
    FalseInformation => "false_information",
});

/// Predicted creative quality carried alongside the compliance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPrediction {
    HighQuality,
    MediumQuality,
    LowQuality,
    #[default]
    Pending,
}

wire_enum!(QualityPrediction, "quality prediction" {
    HighQuality => "high_quality",
    MediumQuality => "medium_quality",
    LowQuality => "low_quality",
    Pending => "pending",
});

/// How a task was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    #[default]
    Single,
    #[serde(alias = "batch-member")]
    BatchMember,
}

impl OperationKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::BatchMember => "batch_member",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "batch_member" | "batch-member" => Ok(Self::BatchMember),
            other => Err(AuditError::invalid_argument(format!(
                "unknown operation kind '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of an audit task. Moves `pending -> completed | failed`
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

wire_enum!(TaskStatus, "task status" {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

impl TaskStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Compliance filter for result queries. `all` disables the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Compliance),
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, compliance: Compliance) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == compliance,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed.parse::<Compliance>().map(Self::Only)
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Programmatic,
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "cli"),
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            Self::Programmatic => write!(f, "programmatic"),
            Self::Defaults => write!(f, "default"),
        }
    }
}
