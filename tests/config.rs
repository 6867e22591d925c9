use tagsweep::config::loader::{ensure_config_file, load_from_path};
use tagsweep::config::{AppConfig, Operation};
use tagsweep::validation::{report::format_report, validate_config};
use tempfile::TempDir;

#[test]
fn fresh_config_is_rejected_until_edited() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");

    assert!(ensure_config_file(&path).unwrap());
    let values = load_from_path(&path).unwrap();
    let result = validate_config(&values);

    assert!(!result.is_valid());
    assert!(format_report(&result).contains("placeholder"));
}

#[test]
fn edited_config_resolves() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".env");
    std::fs::write(
        &path,
        format!(
            "KEYWORDS=\" GDR, Team\"\nOPTION=rewrite\nDIR_PATH={}\nDELETE_SUBS=no\nDEFAULT_SUB_LANGUAGE=en\n",
            dir.path().display()
        ),
    )
    .unwrap();

    let values = load_from_path(&path).unwrap();
    assert!(validate_config(&values).is_valid());

    let config = AppConfig::from_values(&values).unwrap();
    assert_eq!(config.keywords, vec![" GDR", " Team"]);
    assert_eq!(config.option, Some(Operation::Rewrite));
    assert_eq!(config.delete_subs, Some(false));
    assert_eq!(config.subtitles.default_language, "en");
    assert_eq!(config.dir_path.as_deref(), Some(dir.path()));
}
