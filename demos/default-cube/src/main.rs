use haunt_ngin::{EngineConfig, resources::TextureLoader, scenes};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::default().with_title("Default Cube");
    haunt_ngin::run(config, Box::new(|_: &TextureLoader| scenes::default_cube()))?;
    Ok(())
}
