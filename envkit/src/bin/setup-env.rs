//! setup-env binary: `envkit setup` with a flat flag surface, for scripts
//! that call the environment bootstrap directly.

fn main() {
    if let Err(e) = envkit::run_setup_cli() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
