//! `max-blobs` command: placeholder.

use crate::cli::MaxBlobsArgs;
use crate::error::CliError;

pub fn handle(_args: &MaxBlobsArgs) -> Result<(), CliError> {
    Err(CliError::NotYetImplemented {
        feature: "max-blobs".into(),
    })
}
