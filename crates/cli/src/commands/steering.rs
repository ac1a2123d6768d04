//! Health, steering and UPF traffic commands

use anyhow::{Context, Result};
use colored::Colorize;
use nwdaf_lib::health::HealthResponse;
use nwdaf_lib::steering::ControllerStatus;
use nwdaf_lib::upf_metrics::{format_rate, UpfMetricsClient};
use nwdaf_lib::NwdafMetrics;
use serde::Serialize;
use serde_json::json;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    color_status, format_secs, format_unix, print_error, print_json, print_success, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Failures")]
    failures: u32,
    #[tabled(rename = "Since")]
    since: String,
}

#[derive(Tabled, Serialize)]
struct RateRow {
    #[tabled(rename = "UPF")]
    upf: String,
    #[tabled(rename = "RX Bytes/s")]
    bytes_per_sec: f64,
    #[tabled(rename = "RX Rate")]
    rate: String,
}

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: HealthResponse = client.get("healthz").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let overall = serde_json::to_value(result.status)?;
            println!(
                "{} {}",
                "NWDAF health:".bold(),
                color_status(overall.as_str().unwrap_or_default())
            );
            println!();

            let rows: Vec<ComponentRow> = result
                .components
                .iter()
                .map(|(name, health)| {
                    let status = serde_json::to_value(health.status)
                        .ok()
                        .and_then(|v| v.as_str().map(str::to_string))
                        .unwrap_or_default();
                    ComponentRow {
                        name: name.clone(),
                        status: color_status(&status),
                        message: health.message.clone().unwrap_or_default(),
                        failures: health.consecutive_failures,
                        since: format_unix(health.since),
                    }
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}

pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let status: ControllerStatus = client.get("steering/status").await?;

    match format {
        OutputFormat::Json => print_json(&status)?,
        OutputFormat::Table => {
            println!("{}", "Auto-Steering Controller".bold());
            println!("{}", "=".repeat(50));
            let enabled = if status.enabled { "enabled" } else { "disabled" };
            let running = if status.monitor_running {
                "running"
            } else {
                "stopped"
            };
            println!("Auto-steer:             {}", color_status(enabled));
            println!("Monitor:                {}", color_status(running));
            println!("Interval:               {}", format_secs(status.interval_secs));
            println!("Threshold:              {}", format_rate(status.threshold_bps));
            println!("Cooldown:               {}", format_secs(status.cooldown_secs));
            match status.seconds_since_last_steer {
                Some(secs) => println!("Last auto-steer:        {} ago", format_secs(secs)),
                None => println!("Last auto-steer:        {}", "never".dimmed()),
            }
            if status.cooldown_remaining_secs > 0 {
                println!(
                    "Cooldown remaining:     {}",
                    format_secs(status.cooldown_remaining_secs).yellow()
                );
            }
            println!();
            println!("Model:                  {}", status.model.cyan());
            println!("NEF:                    {}", status.nef_url);
            println!("Prometheus:             {}", status.prometheus_url);
        }
    }

    Ok(())
}

/// Request manual steering; the server's text reply is printed as-is
pub async fn steer(client: &ApiClient, target: &str) -> Result<()> {
    let reply = client
        .post_text("steer", &json!({ "target": target }))
        .await?;

    if reply.starts_with('❌') {
        print_error(reply.trim_start_matches('❌').trim());
        anyhow::bail!("steering to {} failed", target);
    }

    print_success("Steering request accepted");
    println!("{}", reply);
    Ok(())
}

pub async fn show_upf_metrics(client: &ApiClient) -> Result<()> {
    let report = client.get_text("upf-metrics").await?;
    println!("{}", report);
    Ok(())
}

/// One-shot rate snapshot straight from Prometheus, bypassing the NWDAF
pub async fn show_rates(prometheus_url: &str, namespace: &str, format: OutputFormat) -> Result<()> {
    let metrics_client = UpfMetricsClient::new(prometheus_url, namespace, NwdafMetrics::new())
        .context("Failed to create Prometheus client")?;
    let sample = metrics_client
        .query_rates()
        .await
        .with_context(|| format!("Failed to query rates from {}", prometheus_url))?;

    let rows: Vec<RateRow> = sample
        .buckets()
        .iter()
        .map(|(label, bytes_per_sec)| RateRow {
            upf: label.to_string(),
            bytes_per_sec: *bytes_per_sec,
            rate: format_rate(*bytes_per_sec),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows)?,
        OutputFormat::Table => print_table(&rows),
    }
    Ok(())
}
