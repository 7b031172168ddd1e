use lockstep::db::dialect::{Dialect, Postgres};

const TABLE: &str = r#""public"."lockstep_history""#;

#[test]
fn test_lock_sql() {
    insta::assert_snapshot!(Postgres.lock_sql(), @"SELECT pg_try_advisory_lock(hashtext($1))");
    insta::assert_snapshot!(Postgres.unlock_sql(), @"SELECT pg_advisory_unlock(hashtext($1))");
}

#[test]
fn test_version_query() {
    insta::assert_snapshot!(
        Postgres.version_query(TABLE),
        @r#"SELECT "index"::TEXT FROM "public"."lockstep_history" ORDER BY id DESC LIMIT 1"#
    );
}

#[test]
fn test_insert_sql() {
    insta::assert_snapshot!(
        Postgres.insert_sql(TABLE),
        @r#"INSERT INTO "public"."lockstep_history" ("index", name, created_at) VALUES ($1, $2, $3)"#
    );
}

#[test]
fn test_session_setup_sql() {
    insta::assert_snapshot!(
        Postgres.session_setup_sql(r#""app""#).unwrap(),
        @r#"SET search_path = "app", public"#
    );
}

#[test]
fn test_schema_setup_sql() {
    let statements = Postgres.schema_setup_sql(r#""public""#, TABLE);
    insta::assert_snapshot!(statements[0].as_str(), @r#"CREATE SCHEMA IF NOT EXISTS "public""#);
    assert!(statements[1].starts_with(r#"CREATE TABLE IF NOT EXISTS "public"."lockstep_history" ("#));
    assert!(statements[1].contains("id BIGSERIAL PRIMARY KEY"));
    assert!(statements[1].contains(r#""index" BIGINT NOT NULL"#));
    assert!(statements[1].contains("created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP"));
}
