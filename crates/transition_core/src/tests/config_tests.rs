use super::*;

use std::{
    collections::HashMap,
    env,
    time::{SystemTime, UNIX_EPOCH},
};

#[test]
fn defaults_match_site_tuning() {
    let settings = Settings::default();
    assert_eq!(settings.ready_timeout(), Duration::from_millis(4000));
    assert_eq!(settings.reveal_delay(), Duration::from_millis(500));
    assert_eq!(settings.router_timeout(), Duration::from_millis(7000));
    assert_eq!(settings.timing.mid_enter_cue_ms, 500);
    assert!(settings.is_known_namespace(&Namespace::new("Portfolio")));
    assert!(!settings.is_known_namespace(&Namespace::new("Careers")));
}

#[test]
fn controller_url_follows_namespace_convention() {
    let mut settings = Settings::default();
    settings.controller_base_url = "https://cdn.example.com/site/pages/".into();

    assert_eq!(
        settings
            .controller_url(&Namespace::new("Team"))
            .expect("url")
            .as_deref(),
        Some("https://cdn.example.com/site/pages/Team.js")
    );
    assert_eq!(
        settings
            .controller_url(&Namespace::new("Privacy Policy"))
            .expect("url")
            .as_deref(),
        Some("https://cdn.example.com/site/pages/Privacy%20Policy.js")
    );
}

#[test]
fn empty_base_url_disables_controller_fetching() {
    let mut settings = Settings::default();
    settings.controller_base_url = "  ".into();
    assert_eq!(settings.controller_url(&Namespace::new("Home")).expect("url"), None);
    assert!(settings.validate().is_ok());
}

#[test]
fn relative_base_url_is_a_config_error() {
    let mut settings = Settings::default();
    settings.controller_base_url = "dist/pages".into();
    assert!(matches!(settings.validate(), Err(StartupError::Config(_))));
}

#[test]
fn partial_toml_keeps_remaining_defaults() {
    let settings = Settings::from_toml_str(
        r#"
            debug = false
            ready_timeout_ms = 2500
            namespaces = ["Home", "Team"]

            [selectors]
            transition_wrap = ".page_transition"

            [timing]
            overlay_fade_ms = 200
        "#,
    )
    .expect("parse");

    assert!(!settings.debug);
    assert_eq!(settings.ready_timeout_ms, 2500);
    assert_eq!(settings.reveal_delay_ms, 500);
    assert_eq!(settings.namespaces, vec!["Home", "Team"]);
    assert_eq!(settings.selectors.transition_wrap, ".page_transition");
    assert_eq!(settings.selectors.transition_column, ".layout_column_el");
    assert_eq!(settings.timing.overlay_fade_ms, 200);
    assert_eq!(settings.timing.overlay_remove_ms, 140);
}

#[test]
fn env_overrides_take_precedence_and_ignore_garbage() {
    let vars = HashMap::from([
        ("APP__DEBUG", "off"),
        ("APP__READY_TIMEOUT_MS", "1200"),
        ("APP__REVEAL_DELAY_MS", "soon"),
        ("CONTROLLER_BASE_URL", "https://short.example.com/pages"),
        ("APP__CONTROLLER_BASE_URL", "https://long.example.com/pages"),
    ]);
    let mut settings = Settings::default();
    settings.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

    assert!(!settings.debug);
    assert_eq!(settings.ready_timeout_ms, 1200);
    assert_eq!(settings.reveal_delay_ms, 500);
    assert_eq!(settings.controller_base_url, "https://long.example.com/pages");
}

#[test]
fn load_settings_from_reads_file_and_reports_bad_toml() {
    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    let temp_root = env::temp_dir().join(format!("transition_core_config_test_{suffix}"));
    fs::create_dir_all(&temp_root).expect("temp root");

    let good = temp_root.join("good.toml");
    fs::write(&good, "reveal_delay_ms = 0\n").expect("write good");
    let settings = load_settings_from(Some(good.as_path())).expect("load good");
    assert_eq!(settings.reveal_delay_ms, 0);

    let bad = temp_root.join("bad.toml");
    fs::write(&bad, "reveal_delay_ms = \"later\"\n").expect("write bad");
    let err = load_settings_from(Some(bad.as_path())).expect_err("bad toml");
    assert!(err.to_string().contains("bad.toml"));

    let missing = temp_root.join("missing.toml");
    assert!(load_settings_from(Some(missing.as_path())).is_err());

    fs::remove_dir_all(temp_root).expect("cleanup");
}
