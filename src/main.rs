// TastySnake pairing console
// Finds a nearby player over the LAN and opens a data channel to them

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use tastysnake::config;
use tastysnake::debug;
use tastysnake::pairing::{ConnectionController, SessionState};
use tastysnake::radio::lan::LocalDevice;
use tastysnake::radio::LanRadio;
use tastysnake::screen::{parse_command, ConsoleView, ScreenCommand, HELP};

#[derive(Parser, Debug)]
#[command(name = "tastysnake", version, about = "Pair with a nearby TastySnake player")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name shown to other players; overrides the config file
    #[arg(long)]
    name: Option<String>,

    /// Write debug logs to a file
    #[arg(long)]
    debug: bool,

    /// Debug log location (defaults to the temp dir)
    #[arg(long, requires = "debug")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    debug::init(cli.debug, cli.log_file.clone()).context("could not open debug log")?;

    let config_path = cli.config.clone().unwrap_or_else(config::get_config_path);
    let mut config = config::load_config(&config_path)
        .with_context(|| format!("could not load config from {}", config_path.display()))?;
    if let Some(name) = cli.name {
        config.device.name = name;
    }

    let device = LocalDevice::generate(&config.device.name);
    info!("Local device {} ({})", device.name, device.id);

    let radio = Arc::new(LanRadio::new(device, config.network.clone()));
    let view = ConsoleView::new(io::stdout());
    let mut controller = ConnectionController::new(radio.clone(), view, config.pairing.clone());

    controller
        .view_mut()
        .say(&format!("you are {}", radio.device().name));
    controller.view_mut().say(HELP);
    controller.enter();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while controller.state() != SessionState::LinkEstablished {
        tokio::select! {
            _ = controller.pump() => {}
            line = lines.next_line() => {
                let Some(line) = line.context("could not read stdin")? else {
                    break;
                };
                match parse_command(&line) {
                    ScreenCommand::Refresh => controller.refresh(),
                    ScreenCommand::Select(index) => {
                        if !controller.select_index(index) {
                            controller.view_mut().say(&format!("no device #{}", index + 1));
                        }
                    }
                    ScreenCommand::Help => controller.view_mut().say(HELP),
                    ScreenCommand::Quit => break,
                    ScreenCommand::Unknown(input) => {
                        controller
                            .view_mut()
                            .say(&format!("unknown command '{}'; h for help", input));
                    }
                }
            }
        }
    }

    controller.stop();

    if let Some(channel) = controller.view_mut().take_channel() {
        info!("Handing off channel to {}", channel.peer());
        controller.view_mut().say("link ready, game would start here");
        channel.close().await.context("could not close data channel")?;
    }

    Ok(())
}
