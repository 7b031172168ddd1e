use crate::constants::MAX_NAME_LENGTH;

/// SQL text a provider needs from its database engine.
///
/// Table and schema arguments arrive already validated and quoted.
pub trait Dialect: Send + Sync {
    /// Non-blocking lock attempt, bound to the lock name, yielding a boolean
    fn lock_sql(&self) -> &'static str;

    /// Lock release, bound to the lock name, yielding whether it was held
    fn unlock_sql(&self) -> &'static str;

    /// Latest recorded index as text, zero or one row
    fn version_query(&self, table: &str) -> String;

    /// History insert binding index, name and timestamp
    fn insert_sql(&self, table: &str) -> String;

    /// Idempotent statements that create the history schema and table
    fn schema_setup_sql(&self, schema: &str, table: &str) -> Vec<String>;

    /// Per-connection statement making `schema` the default for scripts
    fn session_setup_sql(&self, schema: &str) -> Option<String>;
}

/// PostgreSQL, with session-level advisory locks keyed by `hashtext(name)`
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Dialect for Postgres {
    fn lock_sql(&self) -> &'static str {
        "SELECT pg_try_advisory_lock(hashtext($1))"
    }

    fn unlock_sql(&self) -> &'static str {
        "SELECT pg_advisory_unlock(hashtext($1))"
    }

    fn version_query(&self, table: &str) -> String {
        format!(r#"SELECT "index"::TEXT FROM {} ORDER BY id DESC LIMIT 1"#, table)
    }

    fn insert_sql(&self, table: &str) -> String {
        format!(
            r#"INSERT INTO {} ("index", name, created_at) VALUES ($1, $2, $3)"#,
            table
        )
    }

    fn schema_setup_sql(&self, schema: &str, table: &str) -> Vec<String> {
        vec![
            format!("CREATE SCHEMA IF NOT EXISTS {}", schema),
            format!(
                r#"CREATE TABLE IF NOT EXISTS {} (
    id BIGSERIAL PRIMARY KEY,
    "index" BIGINT NOT NULL,
    name VARCHAR({}) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
)"#,
                table, MAX_NAME_LENGTH
            ),
        ]
    }

    fn session_setup_sql(&self, schema: &str) -> Option<String> {
        Some(format!("SET search_path = {}, public", schema))
    }
}
