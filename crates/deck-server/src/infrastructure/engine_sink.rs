//! Stand-in engine for the standalone daemon.
//!
//! The automation engine is an external collaborator.  When `deckd` runs on
//! its own, every command on the bus is drained here and recorded as a
//! structured `tracing` event under the `engine` target, so an operator can
//! watch presses and style changes arrive with `RUST_LOG=engine=info`.

use tokio::sync::mpsc;
use tracing::info;

use deck_core::EngineCommand;

/// Drains `commands` until every sender is dropped.  Returns how many
/// commands were seen.
pub async fn run_engine_sink(mut commands: mpsc::UnboundedReceiver<EngineCommand>) -> usize {
    let mut seen = 0;
    while let Some(command) = commands.recv().await {
        log_command(&command);
        seen += 1;
    }
    seen
}

fn log_command(command: &EngineCommand) {
    match command {
        EngineCommand::BankPress {
            bank,
            button,
            pressed,
        } => info!(target: "engine", bank, button, pressed, "bank press"),
        EngineCommand::DeviceKey {
            device_id,
            key,
            pressed,
            states,
        } => {
            let held = states.iter().filter(|s| s.pressed).count();
            info!(target: "engine", %device_id, key, pressed, held, "device key");
        }
        EngineCommand::SetStyle {
            bank,
            button,
            style,
        } => info!(target: "engine", bank, button, field = style.field(), ?style, "set style"),
        EngineCommand::Invalidate { bank, button } => {
            info!(target: "engine", bank, button, "invalidate");
        }
        EngineCommand::DeviceReady { device_id } => {
            info!(target: "engine", %device_id, "device ready");
        }
    }
}
