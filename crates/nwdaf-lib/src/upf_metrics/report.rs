//! Fixed-width UPF usage table

use std::collections::BTreeMap;

const TABLE_WIDTH: usize = 100;
const POD_MAX: usize = 44;
const IFACE_MAX: usize = 11;

/// Rendered when no series came back
pub const EMPTY_REPORT: &str = "No UPF network metrics found in Prometheus.";

/// Counters joined on (pod, interface)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterfaceUsage {
    pub pod: String,
    pub interface: String,
    pub rx_bytes: f64,
    pub tx_bytes: f64,
    pub rx_rate: f64,
    pub tx_rate: f64,
}

/// Which column a query result populates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageColumn {
    RxBytes,
    TxBytes,
    RxRate,
    TxRate,
}

/// Usage rows keyed by `pod|interface`, iterated in key order
#[derive(Debug, Default)]
pub struct UsageTable {
    rows: BTreeMap<String, InterfaceUsage>,
}

impl UsageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Ensure a row exists and optionally set one of its columns
    pub fn record(&mut self, pod: &str, interface: &str, column: UsageColumn, value: Option<f64>) {
        let row = self
            .rows
            .entry(format!("{}|{}", pod, interface))
            .or_insert_with(|| InterfaceUsage {
                pod: pod.to_string(),
                interface: interface.to_string(),
                ..Default::default()
            });

        if let Some(value) = value {
            match column {
                UsageColumn::RxBytes => row.rx_bytes = value,
                UsageColumn::TxBytes => row.tx_bytes = value,
                UsageColumn::RxRate => row.rx_rate = value,
                UsageColumn::TxRate => row.tx_rate = value,
            }
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = &InterfaceUsage> {
        self.rows.values()
    }

    pub fn render(&self) -> String {
        if self.is_empty() {
            return EMPTY_REPORT.to_string();
        }

        let heavy = "=".repeat(TABLE_WIDTH);
        let light = "-".repeat(TABLE_WIDTH);

        let mut out = String::new();
        out.push_str(&heavy);
        out.push('\n');
        out.push_str("UPF Network Usage (from Prometheus)\n");
        out.push_str(&heavy);
        out.push('\n');
        out.push_str(&format_row(
            "POD",
            "INTERFACE",
            "RX TOTAL",
            "TX TOTAL",
            "RX RATE",
            "TX RATE",
        ));
        out.push_str(&light);
        out.push('\n');

        for row in self.rows() {
            out.push_str(&format_row(
                &truncate(&row.pod, POD_MAX),
                &truncate(&row.interface, IFACE_MAX),
                &format_bytes(row.rx_bytes),
                &format_bytes(row.tx_bytes),
                &format_rate(row.rx_rate),
                &format_rate(row.tx_rate),
            ));
        }

        out.push_str(&heavy);
        out.push('\n');
        out
    }
}

fn format_row(pod: &str, iface: &str, rx: &str, tx: &str, rx_rate: &str, tx_rate: &str) -> String {
    format!(
        "{:<45} {:<12} {:<12} {:<12} {:<12} {:<12}\n",
        pod, iface, rx, tx, rx_rate, tx_rate
    )
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Human-readable byte count (decimal units)
pub fn format_bytes(bytes: f64) -> String {
    if bytes >= 1e9 {
        format!("{:.2} GB", bytes / 1e9)
    } else if bytes >= 1e6 {
        format!("{:.2} MB", bytes / 1e6)
    } else if bytes >= 1e3 {
        format!("{:.2} KB", bytes / 1e3)
    } else {
        format!("{:.0} B", bytes)
    }
}

/// Human-readable bit rate from a bytes/second value
pub fn format_rate(bytes_per_sec: f64) -> String {
    let bits = bytes_per_sec * 8.0;
    if bytes_per_sec >= 1e6 {
        format!("{:.2} Mbps", bits / 1e6)
    } else if bytes_per_sec >= 1e3 {
        format!("{:.2} Kbps", bits / 1e3)
    } else {
        format!("{:.0} bps", bits)
    }
}
