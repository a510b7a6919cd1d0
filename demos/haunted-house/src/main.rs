use haunt_ngin::{EngineConfig, scenes};

fn main() -> anyhow::Result<()> {
    let config = EngineConfig::default()
        .with_title("Haunted House")
        .with_log_level(log::LevelFilter::Info);
    haunt_ngin::run(config, Box::new(scenes::haunted_house))
}
