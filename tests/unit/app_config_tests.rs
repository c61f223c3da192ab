/*!
 * Unit tests for configuration loading and validation.
 */

use sceneforge::app_config::{Config, LogLevel};

#[test]
fn test_saveAndLoad_shouldRoundTrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sceneforge.json");

    let mut config = Config::default();
    config.api_keys = vec!["seed-key".to_string()];
    config.retry.max_attempts = 5;
    config.save_to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.api_keys, vec!["seed-key".to_string()]);
    assert_eq!(loaded.retry.max_attempts, 5);
    assert_eq!(loaded.default_style, "cinematic");
}

#[test]
fn test_fromFile_partialConfig_shouldFillDefaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{"log_level": "debug"}"#).unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.retry.max_attempts, 3);
    assert!(config.styles.contains_key("cinematic"));
    let style = config.style("cinematic");
    assert_eq!(style.batch_size, 3);
    assert_eq!(style.batch_delay_ms, 2000);
}

#[test]
fn test_fromFile_invalidConfig_shouldFailValidation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"retry": {"max_attempts": 0}}"#).unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_fromFile_missingFile_shouldFail() {
    assert!(Config::from_file("/no/such/config.json").is_err());
}

#[test]
fn test_customStyle_shouldBeResolvedByName() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("styles.json");
    std::fs::write(
        &path,
        r#"{
            "styles": {
                "cinematic": {
                    "character_system_prompt": "c",
                    "snippet_system_prompt": "s",
                    "scene_system_prompt": "sc",
                    "batch_size": 3
                },
                "noir": {
                    "character_system_prompt": "c2",
                    "snippet_system_prompt": "s2",
                    "scene_system_prompt": "sc2",
                    "batch_size": 8,
                    "batch_delay_ms": 50
                }
            }
        }"#,
    )
    .unwrap();

    let config = Config::from_file(&path).unwrap();

    assert_eq!(config.style("noir").batch_size, 8);
    assert_eq!(config.style("noir").batch_delay_ms, 50);
    // Unknown names fall back to the default style.
    assert_eq!(config.style("unknown").batch_size, 3);
}
