use payoutd::config::Config;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.http_bind_port, 8990);
    assert!(config.http_password.is_none());
    assert!(config.webhook_secret.is_none());
    assert!(!config.is_auth_enabled());
}

#[test]
fn test_config_with_auth() {
    let mut config = Config::default();
    config.http_password = Some("testpassword".to_string());
    assert!(config.is_auth_enabled());
    assert_eq!(config.auth_password(), Some("testpassword"));
}

#[test]
fn test_config_address() {
    let mut config = Config::default();
    config.http_bind_ip = "127.0.0.1".to_string();
    config.http_bind_port = 8080;
    assert_eq!(config.http_address(), "127.0.0.1:8080");
}

#[test]
fn test_config_save_load() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("test.toml");

    let mut original_config = Config::default();
    original_config.http_password = Some("testpass".to_string());
    original_config.webhook_secret = Some("railsecret".to_string());
    original_config.http_bind_port = 8080;

    original_config.save_to_file(&config_path).unwrap();

    let loaded_config = Config::load_from_file(&config_path).unwrap();

    assert_eq!(loaded_config.http_password, Some("testpass".to_string()));
    assert_eq!(loaded_config.webhook_secret, Some("railsecret".to_string()));
    assert_eq!(loaded_config.http_bind_port, 8080);
}

#[test]
fn test_generate_password() {
    let password1 = Config::generate_password();
    let password2 = Config::generate_password();

    // Passwords should be different
    assert_ne!(password1, password2);

    // Should be 64 hex characters (32 bytes * 2 hex chars per byte)
    assert_eq!(password1.len(), 64);
    assert_eq!(password2.len(), 64);

    assert!(password1.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(password2.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_load_or_create_new_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("new_config.toml");

    assert!(!config_path.exists());

    // Load or create should create file and generate password
    let (config, password_generated) = Config::load_or_create(&config_path).unwrap();

    assert!(config_path.exists());
    assert!(password_generated);
    assert!(config.http_password.is_some());

    let password = config.http_password.unwrap();
    assert_eq!(password.len(), 64);
    assert!(password.chars().all(|c| c.is_ascii_hexdigit()));

    // Verify the file contains the password
    let file_contents = std::fs::read_to_string(&config_path).unwrap();
    assert!(file_contents.contains(&format!("http-password = \"{}\"", password)));
}

#[test]
fn test_load_or_create_existing_file_with_password() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("existing_config.toml");

    let mut original_config = Config::default();
    original_config.http_password = Some("existingpass".to_string());
    original_config.save_to_file(&config_path).unwrap();

    // Load or create should not generate new password
    let (config, password_generated) = Config::load_or_create(&config_path).unwrap();

    assert!(!password_generated);
    assert_eq!(config.http_password, Some("existingpass".to_string()));
}

#[test]
fn test_load_or_create_corrupted_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("corrupted.toml");

    std::fs::write(&config_path, "this is not [valid toml").unwrap();

    // Corrupted configs are recreated rather than crashing the daemon
    let (config, password_generated) = Config::load_or_create(&config_path).unwrap();
    assert!(password_generated);
    assert!(config.http_password.is_some());
}
