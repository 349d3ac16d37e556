//! Find attached boards and print what they are.
//!
//! Discovery is configured through the `J5_*` environment variables (see
//! [`j5_hal::config`]). The result is written to stdout as a JSON array of
//! board descriptions; logs go to the journal or stderr.

use anyhow::{Context, Result};

use j5_hal::board::{Board, BoardInfo};
use j5_hal::config::DiscoveryConfig;
use j5_hal::discovery;
use j5_hal::tracing::{self, prelude::*};

fn main() -> Result<()> {
    tracing::init_journald_or_stderr();

    let config = DiscoveryConfig::from_env().context("invalid discovery configuration")?;
    debug!("Discovery config: {:?}", config);

    let boards = discovery::discover_system(&config).context("discovery failed")?;
    info!("Found {} board(s).", boards.len());

    let info: Vec<BoardInfo> = boards.values().map(Board::info).collect();
    println!("{}", serde_json::to_string_pretty(&info)?);

    for board in boards.values() {
        if let Err(e) = board.make_safe() {
            warn!("Could not make {} safe: {}", board, e);
        }
        board.close();
    }

    Ok(())
}
