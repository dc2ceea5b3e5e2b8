//! User repository: resolves the authenticated requester.

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use tracing::warn;

use hostfund_core::expense::{Feature, MemberRole, RemoteUser};
use hostfund_shared::types::{CollectiveId, UserId};

use crate::entities::{members, users};

/// User repository for lookups.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads a user together with their role memberships.
    ///
    /// Unknown role or feature names are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_remote_user(&self, user_id: UserId) -> Result<Option<RemoteUser>, DbErr> {
        let Some(user) = users::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };

        let memberships = members::Entity::find()
            .filter(members::Column::UserId.eq(user.id))
            .all(&self.db)
            .await?;

        let mut remote_user = RemoteUser::new(user_id, CollectiveId::from_uuid(user.collective_id));
        for member in memberships {
            match MemberRole::parse(&member.role) {
                Some(role) => {
                    remote_user =
                        remote_user.with_role(role, CollectiveId::from_uuid(member.collective_id));
                }
                None => warn!(user_id = %user.id, role = %member.role, "Skipping unknown member role"),
            }
        }

        for feature in disabled_features(&user.disabled_features) {
            remote_user = remote_user.with_disabled_feature(feature);
        }

        Ok(Some(remote_user))
    }
}

fn disabled_features(value: &serde_json::Value) -> Vec<Feature> {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|name| {
            let feature = Feature::parse(name);
            if feature.is_none() {
                warn!(feature = %name, "Skipping unknown disabled feature");
            }
            feature
        })
        .collect()
}
