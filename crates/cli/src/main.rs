//! NWDAF operator CLI
//!
//! Queries health and steering state, requests manual steering, and manages
//! analytics subscriptions on a running NWDAF.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{analytics, steering, subscriptions};

/// NWDAF operator CLI
#[derive(Parser)]
#[command(name = "nwdafctl")]
#[command(author, version, about = "CLI for the NWDAF traffic steering service", long_about = None)]
pub struct Cli {
    /// NWDAF SBI URL (can also be set via NWDAF_URL env var)
    #[arg(long, env = "NWDAF_URL", default_value = "http://localhost:8000")]
    pub server: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show component health
    Health,

    /// Show auto-steering controller status
    Status,

    /// Steer all traffic to an edge anchor (edge1 or edge2)
    Steer {
        /// Target anchor
        target: String,
    },

    /// Show per-interface UPF network usage
    UpfMetrics,

    /// Query current UPF receive rates directly from Prometheus
    Rates {
        /// Prometheus base URL
        #[arg(
            long,
            env = "PROMETHEUS_URL",
            default_value = "http://prometheus-kube-prometheus-prometheus.monitoring:9090"
        )]
        prometheus_url: String,

        /// Namespace holding the UPF pods
        #[arg(long, env = "UPF_NAMESPACE", default_value = "free5gc")]
        namespace: String,
    },

    /// Manage analytics subscriptions
    #[command(subcommand)]
    Subscription(SubscriptionCommands),

    /// Fetch on-demand analytics for an event type
    Analytics {
        /// Event type (NF_LOAD, NETWORK_PERFORMANCE, SLICE_LOAD)
        event_type: String,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionCommands {
    /// Create a subscription
    Create(subscriptions::SubscriptionArgs),

    /// Show a subscription
    Get {
        /// Subscription ID
        id: String,
    },

    /// Replace a subscription's event type, callback and period
    Update {
        /// Subscription ID
        id: String,

        #[command(flatten)]
        args: subscriptions::SubscriptionArgs,
    },

    /// Delete a subscription
    Delete {
        /// Subscription ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.server)?;

    match cli.command {
        Commands::Health => steering::show_health(&client, cli.format).await?,
        Commands::Status => steering::show_status(&client, cli.format).await?,
        Commands::Steer { target } => steering::steer(&client, &target).await?,
        Commands::UpfMetrics => steering::show_upf_metrics(&client).await?,
        Commands::Rates {
            prometheus_url,
            namespace,
        } => steering::show_rates(&prometheus_url, &namespace, cli.format).await?,
        Commands::Subscription(sub_cmd) => match sub_cmd {
            SubscriptionCommands::Create(args) => {
                subscriptions::create(&client, args, cli.format).await?;
            }
            SubscriptionCommands::Get { id } => {
                subscriptions::get(&client, &id, cli.format).await?;
            }
            SubscriptionCommands::Update { id, args } => {
                subscriptions::update(&client, &id, args, cli.format).await?;
            }
            SubscriptionCommands::Delete { id } => {
                subscriptions::delete(&client, &id).await?;
            }
        },
        Commands::Analytics { event_type } => {
            analytics::show_analytics(&client, &event_type, cli.format).await?;
        }
    }

    Ok(())
}
