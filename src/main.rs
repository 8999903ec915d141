use std::path::PathBuf;

use clap::Parser;
use inventory_cli::{match_and_print, prelude::InventoryError, run, InventoryCommand};
use settings::{LoggingConfig, DEFAULT_CONFIG_PATH};
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(
    name = "rackinv",
    author,
    version,
    about = "Rack registry editor and vCenter VM inventory merger"
)]
struct Cli {
    /// YAML configuration file; a missing file means defaults
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: InventoryCommand,
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), InventoryError> {
    let subscriber = tracing_subscriber::fmt::fmt()
        .pretty()
        .with_max_level(LevelFilter::from(logging.max_level));

    if let Some(output_file) = logging.log_file.clone() {
        let file = std::fs::File::create(&output_file).map_err(|source| {
            InventoryError::LogFile {
                path: output_file.clone(),
                source,
            }
        })?;
        let file = std::sync::Mutex::new(file);

        let subscriber = subscriber.with_writer(file).finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| InventoryError::Tracing(e.to_string()))
    } else {
        let subscriber = subscriber.with_writer(std::io::stderr).finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| InventoryError::Tracing(e.to_string()))
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(e) => return match_and_print(Err(e.into())),
    };

    if let Err(e) = init_tracing(&settings.logging) {
        return match_and_print(Err(e));
    }
    tracing::debug!("loaded configuration from {}", cli.config.display());

    match_and_print(run(cli.command, &settings).await);
}
