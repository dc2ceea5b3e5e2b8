//! Feature flags gating expense operations.

use std::collections::HashSet;

use hostfund_shared::config::FeatureConfig;
use serde::{Deserialize, Serialize};

use crate::expense::user::RemoteUser;

/// Feature flags a user may be denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Feature {
    /// Every feature at once.
    All,
    /// Submitting and managing expenses.
    UseExpenses,
    /// Comment threads.
    Conversations,
}

impl Feature {
    /// Returns the string representation of the feature.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::UseExpenses => "USE_EXPENSES",
            Self::Conversations => "CONVERSATIONS",
        }
    }

    /// Parses a feature from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALL" => Some(Self::All),
            "USE_EXPENSES" => Some(Self::UseExpenses),
            "CONVERSATIONS" => Some(Self::Conversations),
            _ => None,
        }
    }
}

/// Decides whether a user may use a feature.
pub trait FeatureGate: Send + Sync {
    /// True if `user` may use `feature`.
    fn can_use_feature(&self, user: &RemoteUser, feature: Feature) -> bool;
}

/// Gate combining platform-wide switches with per-user restrictions.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredFeatureGate {
    disabled: HashSet<Feature>,
}

impl ConfiguredFeatureGate {
    /// A gate that only applies per-user restrictions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the gate from configuration; unknown names are skipped.
    #[must_use]
    pub fn from_config(config: &FeatureConfig) -> Self {
        let disabled = config
            .disabled
            .iter()
            .filter_map(|name| {
                let feature = Feature::parse(name);
                if feature.is_none() {
                    tracing::warn!(feature = %name, "ignoring unknown feature flag");
                }
                feature
            })
            .collect();
        Self { disabled }
    }

    /// Turns a feature off for everyone.
    #[must_use]
    pub fn disable(mut self, feature: Feature) -> Self {
        self.disabled.insert(feature);
        self
    }
}

impl FeatureGate for ConfiguredFeatureGate {
    fn can_use_feature(&self, user: &RemoteUser, feature: Feature) -> bool {
        let blocks = |f: &Feature| *f == feature || *f == Feature::All;
        !self.disabled.iter().any(blocks) && !user.disabled_features.iter().any(blocks)
    }
}
