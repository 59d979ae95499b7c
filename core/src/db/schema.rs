//! Idempotent schema setup. Every statement is `CREATE ... IF NOT EXISTS`, so
//! pointing the binary at a fresh database is enough — there is no separate
//! migration step to run first.

pub const CREATE_TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS chain (
        id         BIGINT PRIMARY KEY,
        name       TEXT NOT NULL,
        last_block BIGINT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contract (
        id         BIGSERIAL PRIMARY KEY,
        chain_id   BIGINT NOT NULL REFERENCES chain(id),
        address    TEXT NOT NULL,
        name       TEXT,
        symbol     TEXT,
        decimals   INT,
        UNIQUE (chain_id, address)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_balance (
        chain_id    BIGINT NOT NULL REFERENCES chain(id),
        contract_id BIGINT NOT NULL REFERENCES contract(id),
        user_addr   TEXT NOT NULL,
        balance     TEXT NOT NULL,
        PRIMARY KEY (chain_id, contract_id, user_addr)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS balance_change (
        id            BIGSERIAL PRIMARY KEY,
        chain_id      BIGINT NOT NULL REFERENCES chain(id),
        contract_id   BIGINT NOT NULL REFERENCES contract(id),
        user_addr     TEXT NOT NULL,
        amount        TEXT NOT NULL,
        balance_after TEXT NOT NULL,
        tx_hash       TEXT NOT NULL,
        block_number  BIGINT NOT NULL,
        log_index     BIGINT NOT NULL,
        event_type    TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        UNIQUE (chain_id, tx_hash, log_index, user_addr)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS balance_change_order_idx
        ON balance_change (chain_id, contract_id, user_addr, block_number DESC, log_index DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS balance_change_created_at_idx
        ON balance_change (chain_id, contract_id, user_addr, created_at)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS balance_change_rollback_idx
        ON balance_change (chain_id, block_number)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS user_points (
        chain_id    BIGINT NOT NULL REFERENCES chain(id),
        contract_id BIGINT NOT NULL REFERENCES contract(id),
        user_addr   TEXT NOT NULL,
        points      TEXT NOT NULL,
        PRIMARY KEY (chain_id, contract_id, user_addr)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS points_calculation (
        id            BIGSERIAL PRIMARY KEY,
        chain_id      BIGINT NOT NULL,
        contract_id   BIGINT NOT NULL,
        user_addr     TEXT NOT NULL,
        window_start  TIMESTAMPTZ NOT NULL,
        window_end    TIMESTAMPTZ NOT NULL,
        points_added  TEXT NOT NULL,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];
