use fontmgr_core::{Config, telemetry};

#[test]
fn init_installs_once_and_tolerates_bad_filters() {
    let root = std::env::temp_dir().join(format!("fontmgr_telemetry_{}", uuid::Uuid::new_v4()));
    let mut cfg = Config::rooted(root.join("data"), root.join("ram"));
    cfg.log_level = "fontmgr_core=loud".to_owned();

    assert!(telemetry::init(&cfg));
    cfg.log_json = true;
    assert!(!telemetry::init(&cfg), "second init is rejected");
}
