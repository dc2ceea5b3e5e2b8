//! The authenticated requester and its role memberships.

use hostfund_shared::types::{CollectiveId, UserId};
use serde::{Deserialize, Serialize};

use crate::expense::feature::Feature;
use crate::expense::types::Collective;

/// Role a user holds on a collective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberRole {
    /// Manages the collective.
    Admin,
    /// Read access to the collective's books.
    Accountant,
    /// Plain member.
    Member,
}

impl MemberRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Some(Self::Admin),
            "ACCOUNTANT" => Some(Self::Accountant),
            "MEMBER" => Some(Self::Member),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::Accountant => "ACCOUNTANT",
            Self::Member => "MEMBER",
        }
    }
}

/// One `(role, collective)` assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Role held.
    pub role: MemberRole,
    /// Collective the role applies to.
    pub collective_id: CollectiveId,
}

/// The authenticated user making the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    /// User ID.
    pub id: UserId,
    /// The user's own profile collective.
    pub collective_id: CollectiveId,
    /// Role assignments.
    pub memberships: Vec<Membership>,
    /// Features turned off for this user.
    pub disabled_features: Vec<Feature>,
}

impl RemoteUser {
    /// Creates a user with no memberships.
    #[must_use]
    pub fn new(id: UserId, collective_id: CollectiveId) -> Self {
        Self {
            id,
            collective_id,
            memberships: Vec::new(),
            disabled_features: Vec::new(),
        }
    }

    /// Adds a role assignment.
    #[must_use]
    pub fn with_role(mut self, role: MemberRole, collective_id: CollectiveId) -> Self {
        self.memberships.push(Membership {
            role,
            collective_id,
        });
        self
    }

    /// Turns a feature off for this user.
    #[must_use]
    pub fn with_disabled_feature(mut self, feature: Feature) -> Self {
        self.disabled_features.push(feature);
        self
    }

    /// True if the user holds one of `roles` on `collective_id`.
    ///
    /// A user holds every role on their own profile collective.
    #[must_use]
    pub fn has_role(&self, roles: &[MemberRole], collective_id: CollectiveId) -> bool {
        collective_id == self.collective_id
            || self
                .memberships
                .iter()
                .any(|m| m.collective_id == collective_id && roles.contains(&m.role))
    }

    /// True if the user is an admin of `collective_id`.
    #[must_use]
    pub fn is_admin(&self, collective_id: CollectiveId) -> bool {
        self.has_role(&[MemberRole::Admin], collective_id)
    }

    /// True if the user administers `collective`, directly or through the
    /// parent of an event or project.
    #[must_use]
    pub fn is_admin_of_collective(&self, collective: &Collective) -> bool {
        if self.is_admin(collective.id) {
            return true;
        }
        collective.collective_type.inherits_parent_admins()
            && collective
                .parent_collective_id
                .is_some_and(|parent| self.is_admin(parent))
    }
}
