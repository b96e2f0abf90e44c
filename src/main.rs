//! adaudit binary
//!
//! All logic lives in the library; main.rs only invokes `cli::run()`.

fn main() {
    // cli::run() reports its own errors; main only maps to the process exit
    if let Err(code) = adaudit::cli::run() {
        std::process::exit(code.as_i32());
    }
}
