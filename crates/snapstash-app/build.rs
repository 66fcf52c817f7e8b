use std::fs;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let version_path = manifest_dir
        .parent()
        .and_then(|crates| crates.parent())
        .map(|root| root.join("VERSION"))
        .expect("workspace root");

    println!("cargo:rerun-if-changed={}", version_path.display());

    // Packaged builds have no workspace VERSION file; fall back to the crate version.
    let version = match fs::read_to_string(&version_path) {
        Ok(raw) => raw.trim().to_string(),
        Err(_) => std::env::var("CARGO_PKG_VERSION").expect("package version"),
    };
    assert!(
        !version.is_empty(),
        "VERSION file must contain a non-empty version"
    );

    println!("cargo:rustc-env=SNAPSTASH_VERSION={version}");
}
