use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use modsum::config::Config;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_config_load_defaults() {
    // Use figment directly without Env to avoid interference from other tests
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .extract()
        .unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.io_threads, 4);
    assert_eq!(config.cache_file_name, "sha1-cache.db");
}

#[test]
fn test_config_load_from_env() {
    std::env::set_var("MODSUM_TEST_ENV_IO_THREADS", "16");
    std::env::set_var("MODSUM_TEST_ENV_VERIFIED_FILE_NAME", ".checked");

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Env::prefixed("MODSUM_TEST_ENV_").split("__"))
        .extract()
        .unwrap();

    assert_eq!(config.io_threads, 16);
    assert_eq!(config.verified_file_name, ".checked");
    assert_eq!(config.derived_dirs.get("Images Raw").map(String::as_str), Some("rawt"));

    std::env::remove_var("MODSUM_TEST_ENV_IO_THREADS");
    std::env::remove_var("MODSUM_TEST_ENV_VERIFIED_FILE_NAME");
}

#[test]
fn test_config_load_from_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
origin_pattern = "httpcloud4steamusercontent"
ignored_extensions = ["rawt", "bak"]
io_threads = 8

[derived_dirs]
"Images Raw" = "rawt"
"#,
    )
    .unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();

    assert_eq!(config.origin().literal(), "httpcloud4steamusercontent");
    assert_eq!(config.ignored_extensions, vec!["rawt", "bak"]);
    assert_eq!(config.io_threads, 8);
    // Maps merge key by key
    assert_eq!(config.derived_dirs.len(), 2);
    assert_eq!(config.verified_file_name, ".sha1-verified");
}

#[test]
fn test_config_file_drives_walker() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "ignored_extensions = [\"BAK\"]\n").unwrap();

    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract()
        .unwrap();
    let walker = config.walker_config(None);
    assert!(walker.is_ignored_file(std::path::Path::new("x.bak")));
    assert!(!walker.is_ignored_file(std::path::Path::new("x.tmp")));
}

#[test]
fn test_config_invalid_toml_fallback() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = \"many\"").unwrap();

    let result: Result<Config, _> = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .extract();
    assert!(result.is_err());

    // The application layer falls back to defaults
    let loaded = Config::load(Some(&config_path));
    assert_eq!(loaded.io_threads, Config::default().io_threads);
}
