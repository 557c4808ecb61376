use std::collections::HashMap;

use crate::settings::config::{RESOURCE_GROUP_VAR, SUBSCRIPTION_ID_VAR, WORKSPACE_NAME_VAR};
use crate::settings::manager::SettingsManager;
use crate::settings::Settings;
use crate::speech::OutputFormat;
use tempfile::TempDir;

#[test]
fn test_missing_file_is_created_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("nested").join("settings.toml");

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    assert!(settings_path.exists());
    assert_eq!(manager.settings(), &Settings::default());
    assert_eq!(manager.settings().job.compute, "aml-cluster");
    assert_eq!(manager.settings().speech.voice, "en-US-AndrewNeural");
}

#[test]
fn test_partial_file_fills_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(
        &settings_path,
        r#"
[workspace]
subscription_id = "sub-1"
resource_group = "rg-ml"
workspace_name = "ws-train"

[job]
compute = "gpu-cluster"
"#,
    )
    .unwrap();

    let manager = SettingsManager::from_path(settings_path).unwrap();
    let settings = manager.settings();

    assert_eq!(settings.workspace.workspace_name, "ws-train");
    assert_eq!(settings.job.compute, "gpu-cluster");
    assert_eq!(settings.job.command, "python train.py");
    assert_eq!(settings.speech.output_format, OutputFormat::Raw16Khz16BitMonoPcm);
}

#[test]
fn test_corrupt_file_is_backed_up() {
    let temp_dir = TempDir::new().unwrap();
    let settings_path = temp_dir.path().join("settings.toml");
    std::fs::write(&settings_path, "this is = = not toml").unwrap();

    let manager = SettingsManager::from_path(settings_path.clone()).unwrap();

    assert_eq!(manager.settings(), &Settings::default());
    let backup = temp_dir.path().join("settings.toml.backup");
    assert_eq!(
        std::fs::read_to_string(backup).unwrap(),
        "this is = = not toml"
    );
    let rewritten = std::fs::read_to_string(settings_path).unwrap();
    assert!(toml::from_str::<Settings>(&rewritten).is_ok());
}

#[test]
fn test_env_overrides_replace_workspace_fields() {
    let mut settings = Settings::default();
    settings.workspace.subscription_id = "from-file".to_string();
    settings.workspace.resource_group = "rg-file".to_string();

    let env: HashMap<&str, &str> = HashMap::from([
        (SUBSCRIPTION_ID_VAR, "from-env"),
        (RESOURCE_GROUP_VAR, "   "),
        (WORKSPACE_NAME_VAR, "ws-env"),
    ]);
    settings.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

    assert_eq!(settings.workspace.subscription_id, "from-env");
    assert_eq!(settings.workspace.resource_group, "rg-file");
    assert_eq!(settings.workspace.workspace_name, "ws-env");
}

#[test]
fn test_workspace_scope_requires_every_field() {
    let mut settings = Settings::default();
    settings.workspace.subscription_id = "sub".to_string();
    settings.workspace.resource_group = "rg".to_string();

    let err = settings.workspace_scope().unwrap_err();
    assert_eq!(err.field, "workspace_name");

    settings.workspace.workspace_name = "ws".to_string();
    assert!(settings.workspace_scope().is_ok());
}
