mod app;
mod config;
pub mod midi;
pub mod mixer;
pub mod registry;
pub mod router;
pub mod strip;
pub mod surface;

use std::path::Path;

fn main() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    match run() {
        Ok(()) => log::info!("Exiting"),
        Err(err) => {
            log::error!("Error: {err}");
            for source in err.chain().skip(1) {
                log::error!("\t{source}");
            }
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<()> {
    let config = config::Config::load(Path::new(config::DEFAULT_PATH))?;
    let app = app::App::try_new(&config)?;

    app.run()
}
