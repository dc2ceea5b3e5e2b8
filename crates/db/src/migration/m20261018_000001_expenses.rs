//! Initial schema: collectives, users, memberships, expenses and their
//! ledger transactions.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(SCHEMA_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const SCHEMA_SQL: &str = r"
CREATE TABLE collectives (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    slug VARCHAR(255) NOT NULL UNIQUE,
    collective_type VARCHAR(32) NOT NULL,
    host_collective_id UUID REFERENCES collectives(id),
    parent_collective_id UUID REFERENCES collectives(id),
    is_active BOOLEAN NOT NULL DEFAULT false,
    currency VARCHAR(3) NOT NULL DEFAULT 'USD',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_collective_type CHECK (
        collective_type IN ('USER', 'ORGANIZATION', 'COLLECTIVE', 'EVENT', 'PROJECT', 'FUND')
    )
);

CREATE INDEX idx_collectives_host ON collectives(host_collective_id);
CREATE INDEX idx_collectives_parent ON collectives(parent_collective_id);

CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) NOT NULL UNIQUE,
    collective_id UUID NOT NULL UNIQUE REFERENCES collectives(id),
    -- JSON array of feature names switched off for this user
    disabled_features JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE members (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    collective_id UUID NOT NULL REFERENCES collectives(id) ON DELETE CASCADE,
    role VARCHAR(32) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_member_role CHECK (role IN ('ADMIN', 'ACCOUNTANT', 'MEMBER')),
    CONSTRAINT uq_member_role UNIQUE (user_id, collective_id, role)
);

CREATE INDEX idx_members_user ON members(user_id);

CREATE TABLE expenses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    status VARCHAR(32) NOT NULL DEFAULT 'PENDING',
    amount BIGINT NOT NULL,
    currency VARCHAR(3) NOT NULL,
    description TEXT NOT NULL,
    collective_id UUID NOT NULL REFERENCES collectives(id),
    from_collective_id UUID NOT NULL REFERENCES collectives(id),
    user_id UUID NOT NULL REFERENCES users(id),
    last_edited_by_id UUID REFERENCES users(id),
    payout_method_id UUID,
    invoice_info TEXT,
    payee_address TEXT,
    payee_country VARCHAR(2),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_expense_amount CHECK (amount > 0),
    CONSTRAINT chk_expense_status CHECK (
        status IN (
            'DRAFT', 'UNVERIFIED', 'PENDING', 'APPROVED', 'REJECTED',
            'PROCESSING', 'ERROR', 'SCHEDULED_FOR_PAYMENT', 'PAID'
        )
    )
);

CREATE INDEX idx_expenses_collective ON expenses(collective_id, status);
CREATE INDEX idx_expenses_payee ON expenses(from_collective_id);

CREATE TABLE expense_items (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    expense_id UUID NOT NULL REFERENCES expenses(id) ON DELETE CASCADE,
    amount BIGINT NOT NULL,
    description TEXT,
    url TEXT,
    incurred_at TIMESTAMPTZ NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_expense_items_expense ON expense_items(expense_id);

-- Append-only audit log
CREATE TABLE activities (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    activity_type VARCHAR(64) NOT NULL,
    collective_id UUID NOT NULL REFERENCES collectives(id),
    expense_id UUID REFERENCES expenses(id) ON DELETE SET NULL,
    user_id UUID REFERENCES users(id),
    data JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_activities_expense ON activities(expense_id, created_at);

-- Ledger rows, signed amounts in minor units: CREDIT > 0, DEBIT < 0
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    kind VARCHAR(6) NOT NULL,
    collective_id UUID NOT NULL REFERENCES collectives(id),
    expense_id UUID REFERENCES expenses(id),
    amount BIGINT NOT NULL,
    currency VARCHAR(3) NOT NULL,
    payment_processor_fee BIGINT NOT NULL DEFAULT 0,
    is_refund BOOLEAN NOT NULL DEFAULT false,
    refund_transaction_id UUID REFERENCES transactions(id),
    description TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_transaction_kind CHECK (kind IN ('CREDIT', 'DEBIT')),
    CONSTRAINT chk_transaction_sign CHECK (
        (kind = 'CREDIT' AND amount >= 0) OR (kind = 'DEBIT' AND amount <= 0)
    ),
    CONSTRAINT chk_processor_fee CHECK (payment_processor_fee >= 0)
);

CREATE INDEX idx_transactions_collective ON transactions(collective_id);
CREATE INDEX idx_transactions_expense ON transactions(expense_id) WHERE expense_id IS NOT NULL;
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS activities CASCADE;
DROP TABLE IF EXISTS expense_items CASCADE;
DROP TABLE IF EXISTS expenses CASCADE;
DROP TABLE IF EXISTS members CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP TABLE IF EXISTS collectives CASCADE;
";
