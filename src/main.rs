fn main() {
    if let Err(code) = assessor::cli::run() {
        std::process::exit(code.as_i32());
    }
}
