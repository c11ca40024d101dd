fn main() {
    // Only run linker script setup for hardware builds
    #[cfg(feature = "hardware")]
    {
        use std::env;
        use std::fs;
        use std::path::PathBuf;

        // Put `memory.x` in our output directory and ensure it's on the linker search path.
        let out = PathBuf::from(env::var_os("OUT_DIR").unwrap_or_default());
        let memory_x = include_bytes!("../../memory.x");

        if let Err(e) = fs::write(out.join("memory.x"), memory_x) {
            println!("cargo:warning=cannot write memory.x: {e}");
        }

        println!("cargo:rustc-link-search={}", out.display());
        println!("cargo:rustc-link-arg-bins=--nmagic");
        println!("cargo:rustc-link-arg-bins=-Tlink.x");
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
        println!("cargo:rerun-if-changed=../../memory.x");
    }

    println!("cargo:rerun-if-changed=build.rs");
}
