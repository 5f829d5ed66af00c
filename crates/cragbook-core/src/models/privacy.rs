// ABOUTME: Per-resource privacy settings attached to every principal
// ABOUTME: Public, unlisted and private visibility levels scoped by resource kind
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Visibility of a principal's records of one resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    /// Listed for everyone
    #[default]
    Public,
    /// Visible to everyone but not advertised; listings still include it
    Unlisted,
    /// Only the owner and administrators can see it
    Private,
}

impl Privacy {
    /// Wire/storage name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Unlisted => "unlisted",
            Self::Private => "private",
        }
    }

    /// Whether records under this setting are hidden from other principals
    #[must_use]
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl Display for Privacy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privacy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "unlisted" => Ok(Self::Unlisted),
            "private" => Ok(Self::Private),
            other => Err(AppError::invalid_input(format!(
                "Unknown privacy setting '{other}'"
            ))),
        }
    }
}

/// Resource kinds that carry an independent privacy setting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Attempts on routes
    Attempts,
    /// Climbing sessions
    Sessions,
    /// Routes marked as projects
    Interests,
    /// Location reviews
    Reviews,
    /// Route ratings
    Ratings,
    /// Shoe usage records
    ShoeLogs,
}

impl ResourceKind {
    /// All kinds, in declaration order
    pub const ALL: [Self; 6] = [
        Self::Attempts,
        Self::Sessions,
        Self::Interests,
        Self::Reviews,
        Self::Ratings,
        Self::ShoeLogs,
    ];

    /// Field name inside [`PrivacySettings`]
    #[must_use]
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Attempts => "attempts",
            Self::Sessions => "sessions",
            Self::Interests => "interests",
            Self::Reviews => "reviews",
            Self::Ratings => "ratings",
            Self::ShoeLogs => "shoe_logs",
        }
    }

    /// Dotted document path of this kind's setting on a user document
    #[must_use]
    pub fn document_path(self) -> String {
        format!("privacy.{}", self.field_name())
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.field_name())
    }
}

/// A principal's privacy choices, one per resource kind (all public by default)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacySettings {
    /// Attempts visibility
    pub attempts: Privacy,
    /// Sessions visibility
    pub sessions: Privacy,
    /// Interests visibility
    pub interests: Privacy,
    /// Reviews visibility
    pub reviews: Privacy,
    /// Ratings visibility
    pub ratings: Privacy,
    /// Shoe-log visibility
    pub shoe_logs: Privacy,
}

impl PrivacySettings {
    /// Setting for one resource kind
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Privacy {
        match kind {
            ResourceKind::Attempts => self.attempts,
            ResourceKind::Sessions => self.sessions,
            ResourceKind::Interests => self.interests,
            ResourceKind::Reviews => self.reviews,
            ResourceKind::Ratings => self.ratings,
            ResourceKind::ShoeLogs => self.shoe_logs,
        }
    }

    /// Change the setting for one resource kind
    pub fn set(&mut self, kind: ResourceKind, privacy: Privacy) {
        let slot = match kind {
            ResourceKind::Attempts => &mut self.attempts,
            ResourceKind::Sessions => &mut self.sessions,
            ResourceKind::Interests => &mut self.interests,
            ResourceKind::Reviews => &mut self.reviews,
            ResourceKind::Ratings => &mut self.ratings,
            ResourceKind::ShoeLogs => &mut self.shoe_logs,
        };
        *slot = privacy;
    }

    /// Every kind set to the same value
    #[must_use]
    pub const fn uniform(privacy: Privacy) -> Self {
        Self {
            attempts: privacy,
            sessions: privacy,
            interests: privacy,
            reviews: privacy,
            ratings: privacy,
            shoe_logs: privacy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_public() {
        let settings = PrivacySettings::default();
        for kind in ResourceKind::ALL {
            assert_eq!(settings.get(kind), Privacy::Public);
        }
    }

    #[test]
    fn test_set_only_touches_one_kind() {
        let mut settings = PrivacySettings::default();
        settings.set(ResourceKind::ShoeLogs, Privacy::Private);
        assert!(settings.get(ResourceKind::ShoeLogs).is_private());
        assert_eq!(settings.get(ResourceKind::Attempts), Privacy::Public);
    }

    #[test]
    fn test_partial_documents_fill_defaults() {
        let settings: PrivacySettings =
            serde_json::from_str(r#"{"ratings":"unlisted"}"#).unwrap();
        assert_eq!(settings.ratings, Privacy::Unlisted);
        assert_eq!(settings.reviews, Privacy::Public);
    }

    #[test]
    fn test_privacy_parse() {
        assert_eq!("PRIVATE".parse::<Privacy>().unwrap(), Privacy::Private);
        assert!("secret".parse::<Privacy>().is_err());
        assert_eq!(ResourceKind::ShoeLogs.document_path(), "privacy.shoe_logs");
    }
}
