fn main() {
    if let Err(err) = schemagen::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
