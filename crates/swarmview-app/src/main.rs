#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    missing_docs
)]

//! Binary entrypoint for the swarmview terminal client.

use swarmview_app::{AppResult, run_app};

/// Runs one torrent session until it terminates.
#[tokio::main]
async fn main() -> AppResult<()> {
    run_app().await
}
