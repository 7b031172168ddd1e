use lockstep::migration::{parse_migration, parse_migration_str};
use lockstep::{Migration, ParseErrorKind};
use rstest::rstest;

const HEADER: &str = "-- +lockstep Name create_users\n-- +lockstep Index 1\n";

#[test]
fn test_plain_migration() {
    let script = format!(
        "{HEADER}-- +lockstep Up\n-- +lockstep BeginBlock\nCREATE TABLE users (id BIGSERIAL PRIMARY KEY);\n-- +lockstep EndBlock\n"
    );

    let migration = parse_migration_str(&script).unwrap();
    assert_eq!(
        migration,
        Migration::new(1, "create_users", "CREATE TABLE users (id BIGSERIAL PRIMARY KEY);\n")
    );
    assert!(!migration.is_reversible());
}

#[test]
fn test_up_down_variant() {
    let script = format!(
        "{HEADER}-- +lockstep Up\n-- +lockstep BeginBlock\nCREATE TABLE users ();\n-- +lockstep EndBlock\n\n-- +lockstep Down\n-- +lockstep BeginBlock\nDROP TABLE users;\n-- +lockstep EndBlock\n"
    );

    let migration = parse_migration_str(&script).unwrap();
    assert_eq!(migration.command(), "CREATE TABLE users ();\n");
    assert_eq!(migration.down_command(), Some("DROP TABLE users;\n"));
}

#[test]
fn test_block_content_is_not_trimmed() {
    let lines = [
        "-- +lockstep Index 7",
        "-- +lockstep Name indented",
        "-- +lockstep Up",
        "-- +lockstep BeginBlock",
        "    SELECT 1;  ",
        "",
        "-- a comment kept verbatim",
        "-- +lockstep EndBlock",
    ];

    let migration = parse_migration(lines).unwrap();
    assert_eq!(
        migration.command(),
        "    SELECT 1;  \n\n-- a comment kept verbatim\n"
    );
}

#[test]
fn test_crlf_line_endings() {
    let script = "-- +lockstep Name crlf\r\n-- +lockstep Index 2\r\n-- +lockstep Up\r\n-- +lockstep BeginBlock\r\nSELECT 2;\r\n-- +lockstep EndBlock\r\n";
    let migration = parse_migration_str(script).unwrap();
    assert_eq!(migration.command(), "SELECT 2;\n");
}

#[test]
fn test_directive_keywords_are_case_insensitive() {
    let script = "--+LOCKSTEP name mixed\n-- +Lockstep INDEX 3\n--   +lockstep up\n-- +lockstep beginblock\nSELECT 3;\n-- +lockstep ENDBLOCK\n";
    let migration = parse_migration_str(script).unwrap();
    assert_eq!(migration.name(), "mixed");
    assert_eq!(migration.index(), 3);
}

#[rstest]
#[case::missing_name("-- +lockstep Index 1\n", ParseErrorKind::MissingField)]
#[case::missing_index("-- +lockstep Name x\n", ParseErrorKind::MissingField)]
#[case::missing_begin_block(
    "-- +lockstep Name x\n-- +lockstep Index 1\n-- +lockstep Up\nSELECT 1;\n",
    ParseErrorKind::OutOfOrderDirective
)]
#[case::end_block_without_begin(
    "-- +lockstep Name x\n-- +lockstep Index 1\n-- +lockstep EndBlock\n",
    ParseErrorKind::OutOfOrderDirective
)]
#[case::unterminated_block(
    "-- +lockstep Name x\n-- +lockstep Index 1\n-- +lockstep Up\n-- +lockstep BeginBlock\nSELECT 1;\n",
    ParseErrorKind::UnterminatedBlock
)]
#[case::dangling_header(
    "-- +lockstep Name x\n-- +lockstep Index 1\n-- +lockstep Down\n",
    ParseErrorKind::UnterminatedBlock
)]
#[case::directive_inside_block(
    "-- +lockstep Name x\n-- +lockstep Index 1\n-- +lockstep Up\n-- +lockstep BeginBlock\n-- +lockstep Down\n",
    ParseErrorKind::ForbiddenDirective
)]
#[case::stray_content("SELECT 1;\n", ParseErrorKind::StrayContent)]
#[case::unknown_keyword("-- +lockstep BlockStart\n", ParseErrorKind::MalformedDirective)]
#[case::non_integer_index("-- +lockstep Index one\n", ParseErrorKind::MalformedDirective)]
#[case::empty_name("-- +lockstep Name\n", ParseErrorKind::MalformedDirective)]
#[case::argument_on_up("-- +lockstep Up now\n", ParseErrorKind::MalformedDirective)]
fn test_structural_errors(#[case] script: &str, #[case] expected: ParseErrorKind) {
    let err = parse_migration_str(script).unwrap_err();
    assert_eq!(err.kind, expected, "{}", err);
}

#[test]
fn test_error_carries_line_number() {
    let script = "-- +lockstep Name x\n-- +lockstep Index 1\n\nSELECT 1;\n";
    let err = parse_migration_str(script).unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::StrayContent);
    assert_eq!(err.line, Some(4));
}

#[test]
fn test_name_length_limit() {
    let at_limit = format!("-- +lockstep Name {}\n", "n".repeat(256));
    let over_limit = format!("-- +lockstep Name {}\n", "n".repeat(257));

    assert_eq!(
        parse_migration_str(&at_limit).unwrap_err().kind,
        ParseErrorKind::MissingField
    );
    assert_eq!(
        parse_migration_str(&over_limit).unwrap_err().kind,
        ParseErrorKind::MalformedDirective
    );
}
