use std::{
    env,
    fs::{File, OpenOptions},
    io::BufWriter,
    path::PathBuf,
};

mod version;

fn open(s: &str) -> anyhow::Result<BufWriter<File>> {
    let mut path = PathBuf::from(env::var("OUT_DIR")?);
    path.push(s);
    Ok(BufWriter::new(
        OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?,
    ))
}

fn main() -> anyhow::Result<()> {
    version::main()?;

    println!("cargo:rerun-if-changed=build/build.rs");
    println!("cargo:rerun-if-changed=build/version.rs");
    Ok(())
}
