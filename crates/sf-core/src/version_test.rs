use super::*;

#[test]
fn test_parse_valid_version() {
    let v = Version::parse("002_create_users_table").unwrap();
    assert_eq!(v.prefix(), "002");
    assert_eq!(v.description(), "create_users_table");
    assert_eq!(v, "002_create_users_table");
}

#[test]
fn test_parse_rejects_malformed_versions() {
    for bad in ["", "create_users", "_x", "001", "001_", "01a_x", "abc_def"] {
        assert!(
            matches!(Version::parse(bad), Err(CoreError::InvalidVersion { .. })),
            "expected '{bad}' to be rejected"
        );
    }
}

#[test]
fn test_from_filename() {
    let v = Version::from_filename("003_create_indexes.sql").unwrap();
    assert_eq!(v.as_str(), "003_create_indexes");
    assert!(Version::from_filename("003_create_indexes.txt").is_err());
}

#[test]
fn test_down_filename() {
    let v = Version::parse("001_create_schema_migrations_table").unwrap();
    assert_eq!(
        v.down_filename(),
        "001_down_create_schema_migrations_table.sql"
    );
}

#[test]
fn test_ordering_is_lexical() {
    let mut versions: Vec<Version> = ["010_c", "002_b", "001_a"]
        .into_iter()
        .map(|s| s.parse().unwrap())
        .collect();
    versions.sort();
    let names: Vec<&str> = versions.iter().map(|v| v.as_str()).collect();
    assert_eq!(names, vec!["001_a", "002_b", "010_c"]);
}

#[test]
fn test_serializes_as_plain_string() {
    let v = Version::parse("001_init").unwrap();
    assert_eq!(serde_yaml::to_string(&v).unwrap().trim(), "001_init");
}
