fn main() {
    if let Err(err) = labelforge::run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
