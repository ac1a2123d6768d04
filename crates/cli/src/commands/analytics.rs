//! On-demand analytics command

use anyhow::Result;
use colored::Colorize;
use nwdaf_lib::sbi::{AnalyticsRequest, AnalyticsResponse};
use serde_json::Value;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_unix, print_info, print_json, print_table, OutputFormat};

const ANALYTICS: &str = "nnwdaf-analyticsinfo/v1/analytics";

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn render_value(key: &str, value: &Value) -> String {
    match value {
        Value::Number(n) if key == "timestamp" => n
            .as_i64()
            .map(format_unix)
            .unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub async fn show_analytics(client: &ApiClient, event_type: &str, format: OutputFormat) -> Result<()> {
    let request = AnalyticsRequest {
        event_type: event_type.to_string(),
        analytics_filter: None,
    };
    let response: AnalyticsResponse = client.post(ANALYTICS, &request).await?;

    match format {
        OutputFormat::Json => print_json(&response)?,
        OutputFormat::Table => {
            println!("{} {}", "Analytics:".bold(), response.event_type.cyan());

            let Some(Value::Object(data)) = &response.data else {
                print_info(&format!("No analytics available for {}", response.event_type));
                return Ok(());
            };

            let rows: Vec<FieldRow> = data
                .iter()
                .map(|(key, value)| FieldRow {
                    field: key.clone(),
                    value: render_value(key, value),
                })
                .collect();
            print_table(&rows);
        }
    }

    Ok(())
}
