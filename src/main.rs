mod alpha;
mod app;
mod assets;
mod catalog;
mod compose;
mod config;
mod core;
mod fetch;
mod index;
mod optimize;
mod raster;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    log::set_max_level(config::get().log_level.as_level_filter());

    if let Err(e) = app::run() {
        log::error!("{e:#}");
        return Err(e.into());
    }
    Ok(())
}
