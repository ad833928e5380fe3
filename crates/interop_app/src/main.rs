use anyhow::Context;
use interop_app::settings::InteropSettings;
use interop_app::{appdata, args, host, logging, APP_NAME, APP_VERSION};

fn main() -> anyhow::Result<()> {
    let args = args::parse_args();
    let paths = appdata::setup_appdata()?;
    let log = logging::init(&paths.logs_dir, args.verbose).context("Failed to initialize logging")?;

    tracing::info!("{APP_NAME} {APP_VERSION}");
    tracing::debug!("Log file: {}", log.log_file.display());
    for warning in &args.warnings {
        tracing::warn!("{warning}");
    }

    appdata::ensure_default_config(&paths.config_file);
    let config_file = args.config.unwrap_or(paths.config_file);
    tracing::debug!("Config file: {}", config_file.display());
    let settings = InteropSettings::load(&config_file);

    let result = host::run(settings);
    if let Err(err) = &result {
        tracing::error!("❌ {err:#}");
    }
    result
}
