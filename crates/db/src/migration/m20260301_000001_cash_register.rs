//! Cash register schema.
//!
//! Creates the payment-method catalog, per-tenant session counters,
//! sessions, the movement log and the declared values captured at close.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(TABLES_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE cash_session_status AS ENUM ('open', 'closed');
CREATE TYPE record_state AS ENUM ('active', 'deleted');
CREATE TYPE cash_movement_kind AS ENUM ('withdrawal', 'supply', 'payment');
";

const TABLES_SQL: &str = r"
-- Read-only catalog; maintained outside the cash register
CREATE TABLE payment_methods (
    id UUID PRIMARY KEY,
    code VARCHAR(32) NOT NULL UNIQUE,
    name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Last issued session number per tenant
CREATE TABLE cash_register_counters (
    tenant_id UUID PRIMARY KEY,
    last_session_number BIGINT NOT NULL CHECK (last_session_number > 0)
);

CREATE TABLE cash_sessions (
    id UUID PRIMARY KEY,
    tenant_id UUID NOT NULL,
    sequence_number BIGINT NOT NULL,
    operator_id UUID NOT NULL,
    opened_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    closed_at TIMESTAMPTZ,
    opening_amount NUMERIC(19, 4) NOT NULL,
    opening_note TEXT,
    closing_note TEXT,
    status cash_session_status NOT NULL DEFAULT 'open',
    record_state record_state NOT NULL DEFAULT 'active',
    last_movement_number BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_cash_sessions_tenant_seq UNIQUE (tenant_id, sequence_number),
    CONSTRAINT chk_cash_sessions_opening CHECK (opening_amount >= 0),
    CONSTRAINT chk_cash_sessions_closed_at CHECK ((status = 'closed') = (closed_at IS NOT NULL)),
    CONSTRAINT chk_cash_sessions_last_movement CHECK (last_movement_number >= 0)
);

CREATE TABLE cash_movements (
    id UUID PRIMARY KEY,
    session_id UUID NOT NULL REFERENCES cash_sessions(id) ON DELETE RESTRICT,
    sequence_number BIGINT NOT NULL,
    kind cash_movement_kind NOT NULL,
    payment_method_id UUID REFERENCES payment_methods(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL,
    note TEXT,
    payment_reference_id UUID,
    authorized_by UUID,
    record_state record_state NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_cash_movements_session_seq UNIQUE (session_id, sequence_number),
    CONSTRAINT chk_cash_movements_amount CHECK (amount > 0),
    CONSTRAINT chk_cash_movements_payment_method CHECK (
        kind <> 'payment' OR payment_method_id IS NOT NULL
    )
);

CREATE TABLE cash_closing_declared_values (
    session_id UUID NOT NULL REFERENCES cash_sessions(id) ON DELETE RESTRICT,
    payment_method_id UUID NOT NULL REFERENCES payment_methods(id) ON DELETE RESTRICT,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount >= 0),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (session_id, payment_method_id)
);
";

const INDEXES_SQL: &str = r"
-- Open session lookup per tenant
CREATE INDEX idx_cash_sessions_open ON cash_sessions(tenant_id, opened_at)
    WHERE status = 'open' AND record_state = 'active';

-- Operator's sessions
CREATE INDEX idx_cash_sessions_operator ON cash_sessions(tenant_id, operator_id, opened_at DESC);

-- Reconciliation reads the active log of one session
CREATE INDEX idx_cash_movements_session_active ON cash_movements(session_id, sequence_number)
    WHERE record_state = 'active';
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS cash_closing_declared_values CASCADE;
DROP TABLE IF EXISTS cash_movements CASCADE;
DROP TABLE IF EXISTS cash_sessions CASCADE;
DROP TABLE IF EXISTS cash_register_counters CASCADE;
DROP TABLE IF EXISTS payment_methods CASCADE;
DROP TYPE IF EXISTS cash_movement_kind;
DROP TYPE IF EXISTS record_state;
DROP TYPE IF EXISTS cash_session_status;
";
