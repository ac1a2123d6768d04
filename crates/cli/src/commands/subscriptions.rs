//! Analytics subscription commands

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use nwdaf_lib::sbi::{SubscriptionRequest, SubscriptionResponse};

use crate::client::ApiClient;
use crate::output::{print_json, print_success, OutputFormat};

const SUBSCRIPTIONS: &str = "nnwdaf-eventssubscription/v1/subscriptions";

/// Fields sent on create and update
#[derive(Args, Debug, Clone)]
pub struct SubscriptionArgs {
    /// Event type (NF_LOAD, NETWORK_PERFORMANCE, SLICE_LOAD)
    #[arg(long)]
    pub event_type: String,

    /// Consumer NF instance ID
    #[arg(long, default_value = "nwdafctl")]
    pub consumer_nf_id: String,

    /// Callback URI for notifications
    #[arg(long)]
    pub notification_uri: String,

    /// Reporting period in seconds
    #[arg(long, default_value_t = 0)]
    pub reporting_period: i64,
}

impl From<SubscriptionArgs> for SubscriptionRequest {
    fn from(args: SubscriptionArgs) -> Self {
        SubscriptionRequest {
            event_type: args.event_type,
            consumer_nf_id: args.consumer_nf_id,
            notification_uri: args.notification_uri,
            analytics_filter: None,
            reporting_period: args.reporting_period,
        }
    }
}

fn print_subscription(sub: &SubscriptionResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(sub)?,
        OutputFormat::Table => {
            println!("Subscription ID:        {}", sub.subscription_id.cyan());
            println!("Event type:             {}", sub.event_type);
            println!("Notification URI:       {}", sub.notification_uri);
        }
    }
    Ok(())
}

pub async fn create(client: &ApiClient, args: SubscriptionArgs, format: OutputFormat) -> Result<()> {
    let request = SubscriptionRequest::from(args);
    let created: SubscriptionResponse = client.post(SUBSCRIPTIONS, &request).await?;

    if matches!(format, OutputFormat::Table) {
        print_success("Subscription created");
    }
    print_subscription(&created, format)
}

pub async fn get(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let path = format!("{}/{}", SUBSCRIPTIONS, id);
    let sub: SubscriptionResponse = client.get(&path).await?;
    print_subscription(&sub, format)
}

pub async fn update(
    client: &ApiClient,
    id: &str,
    args: SubscriptionArgs,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("{}/{}", SUBSCRIPTIONS, id);
    let request = SubscriptionRequest::from(args);
    let updated: SubscriptionResponse = client.put(&path, &request).await?;

    if matches!(format, OutputFormat::Table) {
        print_success("Subscription updated");
    }
    print_subscription(&updated, format)
}

pub async fn delete(client: &ApiClient, id: &str) -> Result<()> {
    let path = format!("{}/{}", SUBSCRIPTIONS, id);
    client.delete(&path).await?;
    print_success(&format!("Subscription {} deleted", id));
    Ok(())
}
