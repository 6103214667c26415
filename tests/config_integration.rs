use grounded_search::config::AppConfig;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;

const BIN: &str = "grounded-search";

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        env::remove_var("GROUNDED_SERVER__PORT");
        env::remove_var("GROUNDED_PROVIDER__MODEL");
        env::remove_var("GROUNDED_PROVIDER__API_KEY");
        env::remove_var("GROUNDED_PROVIDER__TIMEOUT_SECS");
        env::remove_var("GROUNDED_SERVER__REQUEST_TIMEOUT_SECS");
        env::remove_var("GEMINI_API_KEY");
        env::remove_var("GEMINI_MODEL");
        env::remove_var("DISPLAY_LANGUAGE");
        env::remove_var("CONFIG_FILE");
        env::remove_var("PORT");
    }
}

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .expect("Failed to create temp config");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load defaults");
    assert_eq!(config.server.port, 3000);
    assert_eq!(config.server.host, "0.0.0.0");
    assert!(config.server.cors_permissive);
    assert_eq!(config.provider.model, "gemini-2.5-flash");
    assert_eq!(config.provider.display_language, "English");
    assert!(config.provider.api_key.is_none());

    let settings = config.llm_settings();
    assert_eq!(settings.timeout, Duration::from_secs(45));
    assert_eq!(settings.generation.top_k, 40);
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("GROUNDED_SERVER__PORT", "9090");
        env::set_var("GROUNDED_PROVIDER__MODEL", "gemini-2.5-pro");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.provider.model, "gemini-2.5-pro");

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let file = write_config(
        r#"
server:
  port: 7070
provider:
  display_language: French
  temperature: 0.5
"#,
    );
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config from file");
    assert_eq!(config.server.port, 7070);
    assert_eq!(config.provider.display_language, "French");
    assert!((config.provider.temperature - 0.5).abs() < f32::EPSILON);
    // Untouched keys keep their defaults
    assert_eq!(config.provider.model, "gemini-2.5-flash");

    clear_env_vars();
}

#[test]
#[serial]
fn test_cli_overrides_env_and_file() {
    clear_env_vars();

    let file = write_config("server:\n  port: 7070\n");
    unsafe {
        env::set_var("GROUNDED_SERVER__PORT", "9090");
    }

    let path = file.path().to_string_lossy().to_string();
    let config = AppConfig::load_from_args([
        BIN,
        "--config",
        path.as_str(),
        "--port",
        "8081",
        "--language",
        "German",
    ])
    .expect("Failed to load config");
    assert_eq!(config.server.port, 8081);
    assert_eq!(config.provider.display_language, "German");

    clear_env_vars();
}

#[test]
#[serial]
fn test_gemini_api_key_fallback() {
    clear_env_vars();
    unsafe {
        env::set_var("GEMINI_API_KEY", "from-bare-env");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.provider.api_key.as_deref(), Some("from-bare-env"));

    // The structured variable wins over the bare one
    unsafe {
        env::set_var("GROUNDED_PROVIDER__API_KEY", "from-structured-env");
    }
    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(
        config.provider.api_key.as_deref(),
        Some("from-structured-env")
    );

    clear_env_vars();
}

#[test]
#[serial]
fn test_api_key_is_not_debug_printed() {
    clear_env_vars();
    unsafe {
        env::set_var("GEMINI_API_KEY", "super-secret-value");
    }

    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    let printed = format!("{config:?}");
    assert!(!printed.contains("super-secret-value"));

    clear_env_vars();
}

#[test]
#[serial]
fn test_invalid_values_are_rejected() {
    clear_env_vars();

    let file = write_config("provider:\n  model: \"\"\n");
    unsafe {
        env::set_var("CONFIG_FILE", file.path());
    }
    assert!(AppConfig::load_from_args([BIN]).is_err());

    clear_env_vars();
    unsafe {
        env::set_var("GROUNDED_PROVIDER__TIMEOUT_SECS", "0");
    }
    assert!(AppConfig::load_from_args([BIN]).is_err());

    clear_env_vars();
}

#[test]
#[serial]
fn test_zero_request_timeout_is_rejected() {
    clear_env_vars();
    unsafe {
        env::set_var("GROUNDED_SERVER__REQUEST_TIMEOUT_SECS", "0");
    }

    assert!(AppConfig::load_from_args([BIN]).is_err());

    clear_env_vars();
}

#[test]
#[serial]
fn test_request_timeout_must_exceed_provider_timeout() {
    clear_env_vars();

    // Equal to the default provider bound of 45s
    unsafe {
        env::set_var("GROUNDED_SERVER__REQUEST_TIMEOUT_SECS", "45");
    }
    let err = AppConfig::load_from_args([BIN]).unwrap_err();
    assert!(err.to_string().contains("request_timeout_secs"), "{err}");

    unsafe {
        env::set_var("GROUNDED_SERVER__REQUEST_TIMEOUT_SECS", "30");
    }
    assert!(AppConfig::load_from_args([BIN]).is_err());

    unsafe {
        env::set_var("GROUNDED_SERVER__REQUEST_TIMEOUT_SECS", "46");
    }
    let config = AppConfig::load_from_args([BIN]).expect("Failed to load config");
    assert_eq!(config.server.request_timeout_secs, 46);

    clear_env_vars();
}

#[test]
#[serial]
fn test_unknown_flag_is_an_error() {
    clear_env_vars();
    assert!(AppConfig::load_from_args([BIN, "--no-such-flag"]).is_err());
}
