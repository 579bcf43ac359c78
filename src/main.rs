//! # Venue Gate CLI (`vgate`)
//!
//! The `vgate` binary runs the API server and offers a couple of
//! diagnostic commands against the configured booking subsystem.
//!
//! ## Usage
//!
//! ```bash
//! vgate --config ./config/vgate.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vgate serve` | Start the HTTP API server |
//! | `vgate snapshot <calendar_id>` | Fetch and print a calendar snapshot as JSON |
//! | `vgate check-config` | Load and validate the configuration file |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use venue_gate::{config, snapshot, upstream::HttpBookingFeed};

/// Venue Gate — REST facade for a legacy venue-booking marketplace.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/vgate.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "vgate",
    about = "Venue Gate — REST facade for a legacy venue-booking marketplace",
    version,
    long_about = "Venue Gate reads a legacy booking site's availability and schedule feeds, \
    derives per-slot availability, hands verified bookings to the legacy cart, and runs a \
    signed enquiry handshake, all behind a JSON API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/vgate.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// calendar, cart, and enquiry endpoints.
    Serve,

    /// Fetch one calendar's snapshot and print it as JSON.
    ///
    /// Talks to the configured booking subsystem directly; useful for
    /// inspecting what clients would receive without running the server.
    Snapshot {
        /// Booking-subsystem calendar id.
        calendar_id: u32,

        /// Clamp the snapshot to start at this date (YYYY-MM-DD).
        #[arg(long)]
        start: Option<chrono::NaiveDate>,

        /// Clamp the snapshot to end at this date (YYYY-MM-DD).
        #[arg(long)]
        end: Option<chrono::NaiveDate>,
    },

    /// Load and validate the configuration file, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            venue_gate::server::run_server(&cfg).await?;
        }
        Commands::Snapshot {
            calendar_id,
            start,
            end,
        } => {
            let feed = HttpBookingFeed::new(&cfg.upstream.ajax_url, cfg.upstream.timeout_secs)?;
            let snap =
                snapshot::build_snapshot(Arc::new(feed), &cfg, calendar_id, start, end).await?;
            println!("{}", serde_json::to_string_pretty(&snap)?);
        }
        Commands::CheckConfig => {
            println!("Configuration OK: {}", cli.config.display());
            println!("  server.bind       = {}", cfg.server.bind);
            println!("  upstream.ajax_url = {}", cfg.upstream.ajax_url);
            println!("  products          = {}", cfg.products.len());
            println!("  calendars         = {}", cfg.calendars.len());
        }
    }

    Ok(())
}
