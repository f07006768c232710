//! Terminal control panel for a netrelay server.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use netrelay::client::RelayClient;
use netrelay::panel::{ControlPanel, PanelCommand, PanelState};

/// Network Relay Controller panel
#[derive(Parser, Debug)]
#[command(name = "netrelay-panel")]
#[command(version, about = "Network Relay Controller panel", long_about = None)]
struct Cli {
    /// Hostname or IP address of relay controller
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Port number of relay controller API
    #[arg(short, long, default_value_t = 5000)]
    port: u16,

    /// Number of relays shown on the panel
    #[arg(short, long, default_value_t = 4)]
    relays: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let client = RelayClient::new(&cli.host, cli.port)?;
    let repaint = Arc::new(|state: &PanelState| {
        print!("\n{}> ", state.render());
        let _ = io::stdout().flush();
    });
    let panel = ControlPanel::new(client, cli.relays, repaint);
    panel.start();

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match line.parse::<PanelCommand>() {
            Ok(command) => {
                if !panel.execute(command) {
                    break;
                }
            }
            Err(message) => {
                eprintln!("{message}");
                print!("> ");
                io::stdout().flush()?;
            }
        }
    }

    Ok(())
}
