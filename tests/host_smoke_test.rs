#[test]
#[cfg(feature = "integration-tests")]
fn presents_frames_and_exits() {
    use haunt_ngin::{EngineConfig, scenes};

    let config = EngineConfig::default()
        .with_title("smoke test")
        .with_log_level(log::LevelFilter::Debug)
        .exit_after(3);
    haunt_ngin::run(config, Box::new(scenes::haunted_house)).unwrap();
}
