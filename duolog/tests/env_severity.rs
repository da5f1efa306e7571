use duolog::{CaptureFactory, Severity, router_config};

// Environment configuration is read once per process, so this file holds a single test.
#[test]
fn test_out_of_range_env_severities_fall_back() {
    unsafe {
        std::env::set_var("DUOLOG_DEFAULT_SEVERITY", "300");
        std::env::set_var("DUOLOG_ERROR_SEVERITY", "-1");
    }
    let capture = CaptureFactory::new();
    let router = router_config()
        .with_app_name("shop")
        .with_sink_factory(capture.clone())
        .build();
    assert_eq!(router.default_severity(), Severity::Info);
    assert_eq!(router.error_severity(), Severity::Critical);
    router.emit("no level", None).unwrap();
    assert_eq!(capture.records()[0].severity, Severity::Info);
}
