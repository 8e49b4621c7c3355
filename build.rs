use std::{env, path::PathBuf};

fn main() {
    println!("cargo:rerun-if-changed=kernel.ld");

    // Only the bare-metal image needs the kernel layout.
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("none") {
        let dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
        println!("cargo:rustc-link-arg-bins=-T{}", dir.join("kernel.ld").display());
    }
}
