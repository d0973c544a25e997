use galaxite::app;

fn main() {
    env_logger::init();

    if let Err(err) = app::run() {
        eprintln!("galaxite: {err}");
        std::process::exit(1);
    }
}
