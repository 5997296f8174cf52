use multibox_scan::{LogConfig, ScanError, init_logging};

#[test]
fn init_logging_writes_to_rolling_file_and_refuses_second_init() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LogConfig {
        component: "scan-test".to_string(),
        dir: dir.path().join("logs"),
        to_stderr: false,
        default_filter: "info".to_string(),
    };

    let guard = init_logging(&config).expect("first init succeeds");
    tracing::info!(box_name = "INBOX", "logging smoke test");

    let second = init_logging(&config).expect_err("global subscriber is already set");
    assert!(matches!(second, ScanError::Logging(_)));

    drop(guard);

    let files: Vec<_> = std::fs::read_dir(&config.dir)
        .expect("log dir exists")
        .map(|entry| entry.expect("dir entry").path())
        .collect();
    let log_file = files
        .iter()
        .find(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("scan-test"))
        })
        .expect("rolling log file created");
    let contents = std::fs::read_to_string(log_file).expect("log file readable");
    assert!(contents.contains("logging smoke test"));
}

#[test]
fn default_log_config_points_at_home_logs() {
    let config = LogConfig::default();
    assert_eq!(config.component, "multibox");
    assert!(config.dir.ends_with(".multibox/logs"));
    assert!(!config.to_stderr);
    assert_eq!(config.default_filter, "info");
}
