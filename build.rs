use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=FFMPEG_DIR");
    println!("cargo:rerun-if-env-changed=VCPKG_ROOT");

    // Only the in-process decoder links against the FFmpeg libraries.
    if env::var_os("CARGO_FEATURE_FFMPEG").is_none() {
        return;
    }
    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows") {
        return;
    }
    if env::var_os("FFMPEG_DIR").is_some() {
        return;
    }

    match vcpkg_ffmpeg_dir() {
        Some(dir) if dir.exists() => println!(
            "cargo:warning=Found vcpkg FFmpeg at {0}. Set FFMPEG_DIR={0} if linking fails.",
            dir.display()
        ),
        Some(dir) => println!(
            "cargo:warning=VCPKG_ROOT is set but {} does not exist; install ffmpeg with vcpkg or build with --no-default-features.",
            dir.display()
        ),
        None => println!(
            "cargo:warning=FFMPEG_DIR is not set. Install FFmpeg via vcpkg and set FFMPEG_DIR, or build with --no-default-features."
        ),
    }
}

fn vcpkg_ffmpeg_dir() -> Option<PathBuf> {
    let root = env::var_os("VCPKG_ROOT")?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    Some(PathBuf::from(root).join("installed").join(triplet))
}
