use clap::Parser;

use recoll_launcher::runtime::{self, RuntimeOptions};

fn main() {
    let options = RuntimeOptions::parse();

    if let Err(error) = runtime::run_with_options(options) {
        eprintln!("[recoll-launcher] runtime failed: {error}");
        std::process::exit(1);
    }
}
