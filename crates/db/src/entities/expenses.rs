//! `SeaORM` Entity for expenses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub collective_id: Uuid,
    pub from_collective_id: Uuid,
    pub user_id: Uuid,
    pub last_edited_by_id: Option<Uuid>,
    pub payout_method_id: Option<Uuid>,
    #[sea_orm(column_type = "Text", nullable)]
    pub invoice_info: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub payee_address: Option<String>,
    pub payee_country: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::collectives::Entity",
        from = "Column::CollectiveId",
        to = "super::collectives::Column::Id"
    )]
    Collectives,
    #[sea_orm(has_many = "super::expense_items::Entity")]
    ExpenseItems,
}

impl Related<super::collectives::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Collectives.def()
    }
}

impl Related<super::expense_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
