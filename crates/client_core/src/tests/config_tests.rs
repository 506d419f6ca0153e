use super::*;

use std::{
    env,
    time::{SystemTime, UNIX_EPOCH},
};

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let owned: Vec<(String, String)> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| {
        owned
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }
}

#[test]
fn defaults_match_the_gate_constants() {
    let settings = Settings::default();
    assert_eq!(settings.password_length, crate::password_gate::PASSWORD_LENGTH);
    assert_eq!(settings.max_password_tries, crate::password_gate::MAX_TRIES);
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn file_values_override_defaults() {
    let mut settings = Settings::default();
    apply_file_overrides(
        &mut settings,
        r#"
log_filter = "client_core=debug"
password_length = 6
max_password_tries = 5
progress_log_interval = 0
"#,
    );

    assert_eq!(settings.log_filter, "client_core=debug");
    assert_eq!(settings.password_length, 6);
    assert_eq!(settings.max_password_tries, 5);
    assert_eq!(settings.progress_log_interval, 0);
    assert_eq!(settings.feed_capacity, Settings::default().feed_capacity);
}

#[test]
fn unparsable_file_is_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "password_length = [");
    assert_eq!(settings, Settings::default());
}

#[test]
fn out_of_range_values_are_ignored() {
    let mut settings = Settings::default();
    apply_file_overrides(&mut settings, "max_password_tries = 300\npassword_length = -1");
    assert_eq!(settings.max_password_tries, 3);
    assert_eq!(settings.password_length, 4);
}

#[test]
fn app_prefixed_env_wins_over_rust_log() {
    let mut settings = Settings::default();
    apply_env_overrides(
        &mut settings,
        vars(&[
            ("RUST_LOG", "warn"),
            ("APP__LOG_FILTER", "debug"),
            ("APP__MAX_PASSWORD_TRIES", "2"),
            ("APP__FEED_CAPACITY", "not-a-number"),
        ]),
    );

    assert_eq!(settings.log_filter, "debug");
    assert_eq!(settings.max_password_tries, 2);
    assert_eq!(settings.feed_capacity, 1024);
}

#[test]
fn load_settings_from_reads_explicit_path() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let path = env::temp_dir().join(format!("client_core_settings_{suffix}.toml"));
    fs::write(&path, "password_length = 8\n").expect("write settings");

    let settings = load_settings_from(&path).expect("load");
    assert_eq!(settings.password_length, 8);

    fs::remove_file(&path).expect("cleanup");
    assert!(load_settings_from(&path).is_err());
}
