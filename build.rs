// build.rs

fn main() {
    // --- Link against Xlib and XRender ---
    // pkg-config first; if it cannot find every library we fall back to
    // plain linker flags and hope the libraries sit in a standard path.
    let libraries = ["x11", "xrender"];

    let mut pkg_config_success = true;

    for lib in &libraries {
        if pkg_config::probe_library(lib).is_err() {
            eprintln!(
                "pkg-config failed for library '{}'. Falling back to manual linking.",
                lib
            );
            pkg_config_success = false;
            break;
        }
    }

    if !pkg_config_success {
        println!("cargo:rustc-link-lib=X11");
        println!("cargo:rustc-link-lib=Xrender");
        println!("cargo:rustc-link-search=/usr/lib");
        eprintln!(
            "Manual linking flags applied. Ensure the X11 and Xrender development libraries are installed."
        );
    } else {
        eprintln!("pkg-config successfully found libraries. Linking configured automatically.");
    }
}
