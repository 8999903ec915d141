use std::path::PathBuf;

use models::ModelError;
use settings::SettingsError;
use thiserror::Error;
use vsphere::{ConnectError, ProjectionError, VsphereError};

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("{0}")]
    Settings(#[from] SettingsError),

    #[error("reading user input: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("talking to vCenter: {0}")]
    Vsphere(#[from] VsphereError),

    #[error("unexpected VM data: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Unable to connect to VMware vCenter: {0}")]
    NotConnected(#[source] ConnectError),

    #[error("opening log file `{}`: {source}", path.display())]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("installing log subscriber: {0}")]
    Tracing(String),
}
