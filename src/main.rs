fn main() {
    if let Err(error) = n5_crop::run_cli() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
