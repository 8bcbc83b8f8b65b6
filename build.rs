use std::env;
use std::path::PathBuf;

const DEFAULT_ZED_ROOT_UNIX: &str = "/usr/local/zed";
const DEFAULT_ZED_ROOT_WINDOWS: &str = "C:\\Program Files (x86)\\ZED SDK";

fn main() {
    println!("cargo:rerun-if-env-changed=ZED_SDK_ROOT");

    if env::var_os("CARGO_FEATURE_ZED_SDK").is_none() {
        return;
    }

    let root = match env::var("ZED_SDK_ROOT") {
        Ok(root) => PathBuf::from(root),
        Err(_) => match env::consts::OS {
            "windows" => PathBuf::from(DEFAULT_ZED_ROOT_WINDOWS),
            "linux" => PathBuf::from(DEFAULT_ZED_ROOT_UNIX),
            other => panic!("the ZED SDK is not available on {other}"),
        },
    };

    println!(
        "cargo:rustc-link-search=native={}",
        root.join("lib").display()
    );
    println!("cargo:rustc-link-lib=sl_zed_c");
}
