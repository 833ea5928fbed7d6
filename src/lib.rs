pub mod renderer;
pub mod settings;
pub mod time;

pub use settings::PipelineSettings;

pub fn init_logging() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .try_init();
}
