use std::sync::Arc;

use tracing::{error, info};

use vidstash::{Config, DriveStorage, MemoryDrive, UploadService};

fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    if let Err(e) = vidstash::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        vidstash::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    let storage = DriveStorage::new(MemoryDrive::new(), &config.storage);
    let service = UploadService::from_config(Arc::new(storage), &config);

    info!("vidstash upload service ready");
    info!(
        "App root '{}', {} parallel uploads per owner, {} workers",
        config.storage.app_root,
        service.parallel_limit(),
        config.upload.workers
    );
}
