//! Clap derive structures for the `blobench` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// blobench -- bandwidth limits of a reproducible Ethereum network simulation
#[derive(Debug, Parser)]
#[command(
    name = "blobench",
    version,
    about = "Determine the networking limits of a reproducible Ethereum network simulation",
    long_about = "Degradation-testing harness for blob-carrying validator nodes.\n\n\
        Progressively throttles a target node's network interface inside a\n\
        Kurtosis enclave while watching Grafana health probes, to find the\n\
        minimum bandwidth the node tolerates for a given blob workload.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Kurtosis enclave hosting the network under test
    #[arg(long, short = 'e', env = "BLOBENCH_ENCLAVE", global = true)]
    pub enclave: Option<String>,

    /// Service whose network interface is throttled
    #[arg(long, short = 's', env = "BLOBENCH_SERVICE", global = true)]
    pub service: Option<String>,

    /// Path to the config file
    #[arg(long, env = "BLOBENCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Determine the minimum bandwidth required for a given number of blobs per block
    #[command(alias = "min")]
    MinBandwidth(MinBandwidthArgs),

    /// Determine the maximum number of blobs per block a node sustains at a target bandwidth
    #[command(alias = "max")]
    MaxBlobs(MaxBlobsArgs),
}

// ── min-bandwidth ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MinBandwidthArgs {
    /// The number of blobs per block
    #[arg(long, short = 'b', default_value_t = 6)]
    pub blobs: u64,

    /// The initial bandwidth in megabits per second
    #[arg(long = "bandwidth", visible_alias = "bw", default_value_t = 50)]
    pub bandwidth_mbit: u64,

    /// The bandwidth floor in megabits per second; the test stops before
    /// applying any rate below it
    #[arg(long = "floor", default_value_t = 5)]
    pub floor_mbit: u64,

    /// The percentage to decrease the bandwidth by each iteration
    #[arg(long = "decay", short = 'd', default_value_t = 50)]
    pub decay_percent: u64,
}

// ── max-blobs ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct MaxBlobsArgs {
    /// The target node's bandwidth in megabits per second
    #[arg(long = "bandwidth", visible_alias = "bw", default_value_t = 50)]
    pub bandwidth_mbit: u64,

    /// The initial number of blobs per block
    #[arg(long, short = 'b', default_value_t = 6)]
    pub blobs: u64,

    /// The percentage to increase the blob count by each iteration
    #[arg(long, short = 'd', default_value_t = 100)]
    pub delta: u64,
}
