use anyhow::Context;
use gl_generator::{Api, Fallbacks, GlobalGenerator, Profile, Registry};
use std::env;
use std::fs::File;
use std::path::Path;

/// Create gl bindings used by the GLX backend.
fn create_gl_bindings(out_dir: &str) -> anyhow::Result<()> {
    let mut gl = File::create(Path::new(&out_dir).join("gl_bindings.rs"))
        .context("Unable to generate gl bindings")?;

    Registry::new(Api::Gl, (3, 3), Profile::Core, Fallbacks::All, [] as [&str; 0])
        .write_bindings(GlobalGenerator, &mut gl)
        .context("Couldn't write gl bindings")?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let dest = env::var("OUT_DIR")?;

    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("linux") {
        create_gl_bindings(&dest)?;
    }

    Ok(())
}
