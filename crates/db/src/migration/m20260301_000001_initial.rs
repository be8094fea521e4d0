//! Initial database migration.
//!
//! Creates the enums, the users, sales and transactions tables, and the
//! constraints the purchase flow relies on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(SALES_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

const ENUMS_SQL: &str = r"
CREATE TYPE sale_status AS ENUM ('CREATED', 'OPEN', 'CLOSED', 'FINISHED');

CREATE TYPE saft_requirement AS ENUM ('NOT_REQUIRED', 'REQUIRED', 'REQUIRED_VERIFIED_EMAIL');

CREATE TYPE kyc_status AS ENUM ('PENDING', 'VERIFIED', 'REJECTED');

CREATE TYPE form_of_payment AS ENUM ('TRANSFER', 'CARD', 'CRYPTO');

CREATE TYPE transaction_status AS ENUM (
    'PENDING',
    'AWAITING_PAYMENT',
    'PAYMENT_SUBMITTED',
    'PAYMENT_VERIFIED',
    'COMPLETED',
    'REJECTED',
    'CANCELLED'
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    wallet_address VARCHAR(128) NOT NULL UNIQUE,
    email VARCHAR(255),
    email_verified BOOLEAN NOT NULL DEFAULT false,
    name VARCHAR(255),
    kyc_status kyc_status,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const SALES_SQL: &str = r"
CREATE TABLE sales (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    token_symbol VARCHAR(20) NOT NULL,
    status sale_status NOT NULL DEFAULT 'CREATED',
    initial_token_quantity NUMERIC(38, 18) NOT NULL,
    available_token_quantity NUMERIC(38, 18) NOT NULL,
    minimum_token_buy_per_user NUMERIC(38, 18),
    maximum_token_buy_per_user NUMERIC(38, 18),
    token_price_per_unit NUMERIC(38, 18) NOT NULL,
    currency VARCHAR(20) NOT NULL,
    sale_closing_date TIMESTAMPTZ NOT NULL,
    requires_kyc BOOLEAN NOT NULL DEFAULT false,
    saft saft_requirement NOT NULL DEFAULT 'NOT_REQUIRED',
    to_wallet_address VARCHAR(128),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_sales_available_non_negative CHECK (available_token_quantity >= 0),
    CONSTRAINT chk_sales_available_le_initial CHECK (available_token_quantity <= initial_token_quantity),
    CONSTRAINT chk_sales_price_positive CHECK (token_price_per_unit > 0),
    CONSTRAINT chk_sales_buy_limits CHECK (
        minimum_token_buy_per_user IS NULL
        OR maximum_token_buy_per_user IS NULL
        OR minimum_token_buy_per_user <= maximum_token_buy_per_user
    )
);

CREATE INDEX idx_sales_open ON sales(sale_closing_date) WHERE status = 'OPEN';
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id),
    sale_id UUID NOT NULL REFERENCES sales(id),
    token_symbol VARCHAR(20) NOT NULL,
    quantity NUMERIC(38, 18) NOT NULL,
    form_of_payment form_of_payment NOT NULL,
    paid_currency VARCHAR(20) NOT NULL,
    price NUMERIC(38, 18) NOT NULL,
    total_amount NUMERIC(38, 18) NOT NULL,
    fees NUMERIC(38, 18) NOT NULL DEFAULT 0,
    status transaction_status NOT NULL DEFAULT 'PENDING',
    payment_evidence TEXT,
    rejection_reason TEXT,
    comment TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CONSTRAINT chk_transactions_quantity_positive CHECK (quantity > 0),
    CONSTRAINT chk_transactions_amounts_non_negative CHECK (total_amount >= 0 AND fees >= 0)
);

-- At most one in-flight purchase per user and sale
CREATE UNIQUE INDEX uq_transactions_in_flight
    ON transactions(user_id, sale_id)
    WHERE status IN ('PENDING', 'AWAITING_PAYMENT');

CREATE INDEX idx_transactions_status_created ON transactions(status, created_at);
CREATE INDEX idx_transactions_sale ON transactions(sale_id);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_users_updated_at BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_sales_updated_at BEFORE UPDATE ON sales
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_transactions_updated_at BEFORE UPDATE ON transactions
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP FUNCTION IF EXISTS set_updated_at() CASCADE;
DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS form_of_payment;
DROP TYPE IF EXISTS kyc_status;
DROP TYPE IF EXISTS saft_requirement;
DROP TYPE IF EXISTS sale_status;
";
