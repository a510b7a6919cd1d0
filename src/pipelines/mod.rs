//! Render pipelines and their uniforms.
//!
//! - `basic` builds the lit scene pipeline and the shared pipeline helper
//! - `light` packs lights and fog into the uniform the scene shader reads

pub mod basic;
pub mod light;
