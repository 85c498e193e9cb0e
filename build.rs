//! Build script for multibuild.
//!
//! Bakes the short git revision into `MULTIBUILD_GIT_REV` for `--version`,
//! unless the environment already provides one.

fn main() {
    println!("cargo:rerun-if-env-changed=MULTIBUILD_GIT_REV");
    if std::env::var_os("MULTIBUILD_GIT_REV").is_some() {
        return;
    }

    if let Some(output) = std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
    {
        let rev = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !rev.is_empty() {
            println!("cargo:rustc-env=MULTIBUILD_GIT_REV={rev}");
        }
    }
}
