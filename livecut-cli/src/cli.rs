use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "livecut",
    about = "Record a live capture into rotated HLS segments with live and sealed playlists",
    version
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a capture into rotated segments until Ctrl-C (or --duration)
    Record {
        /// Capture source file; reads stdin when omitted
        #[arg(short = 'i', long)]
        input: Option<PathBuf>,

        /// Directory receiving segments and playlists
        #[arg(short, long, default_value = "segments")]
        output: PathBuf,

        /// Segment rotation interval in seconds
        #[arg(short = 'n', long, default_value = "6", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Grace period for the encoder flush, in milliseconds
        #[arg(long, default_value = "100")]
        flush_grace_ms: u64,

        /// Stop automatically after this many seconds
        #[arg(short, long)]
        duration: Option<u64>,

        /// Write captured data as-is instead of converting through ffmpeg
        #[arg(long)]
        passthrough: bool,

        /// Path to the ffmpeg binary
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },

    /// Print the stream status (liveness, segment count, newest segment)
    Status {
        /// Directory holding segments and playlists
        #[arg(short, long, default_value = "segments")]
        output: PathBuf,
    },

    /// List stored segments as JSON
    Segments {
        /// Directory holding segments and playlists
        #[arg(short, long, default_value = "segments")]
        output: PathBuf,
    },
}
