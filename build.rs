use std::process::Command;

/// True when pkg-config knows the given package
fn pkg_config_exists(package: &str) -> bool {
    Command::new("pkg-config")
        .args(["--exists", package])
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    if Command::new("pkg-config").arg("--version").output().is_err() {
        println!("cargo:warning=pkg-config not found; cannot verify native dependencies");
        return;
    }

    if !pkg_config_exists("opencv4") && !pkg_config_exists("opencv") {
        println!("cargo:warning=OpenCV development files not found (install libopencv-dev)");
    }

    // midir's Linux backend talks to ALSA
    if cfg!(target_os = "linux") && !pkg_config_exists("alsa") {
        println!("cargo:warning=ALSA development files not found (install libasound2-dev)");
    }
}
