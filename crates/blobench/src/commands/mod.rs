//! Command handlers.

pub mod max_blobs;
pub mod min_bandwidth;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

pub async fn dispatch(command: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match command {
        Command::MinBandwidth(args) => min_bandwidth::handle(args, global).await,
        Command::MaxBlobs(args) => max_blobs::handle(&args),
    }
}
