fn main() {
    if let Err(e) = envkit::run_cli() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
