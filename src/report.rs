//! Fabric reports.
//!
//! A [`FabricReport`] is a plain serializable snapshot of a crawled
//! fabric, rendered either as JSON or as human-readable text.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Local};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use crate::fabric::discovery::CrawlSummary;
use crate::fabric::Fabric;
use crate::interface::Neighbor;

#[derive(Debug, Clone, Serialize)]
pub struct FabricReport {
    pub generated_at: DateTime<Local>,
    pub summary: Option<CrawlSummary>,
    pub devices: Vec<DeviceReport>,
    pub mac_table: Vec<MacReport>,
    pub discovery_status: Vec<StatusReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub hostname: String,
    pub mgmt_address: Option<String>,
    pub is_switch: bool,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub os_version: Option<String>,
    pub status: String,
    pub interfaces: Vec<InterfaceReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterfaceReport {
    pub name: String,
    pub description: String,
    pub mode: String,
    pub is_enabled: bool,
    pub is_up: bool,
    pub mac_count: usize,
    /// Resolved peers as `hostname interface`, unresolved ones as reported
    pub neighbors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MacReport {
    pub mac: String,
    pub vlan: u16,
    pub attached_to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub target: String,
    pub status: String,
}

/// Snapshot a fabric for reporting
pub fn build_report(fabric: &Fabric, summary: Option<CrawlSummary>) -> FabricReport {
    let mut devices: Vec<DeviceReport> = fabric
        .devices()
        .map(|(_, device)| {
            let facts = device.switch().map(|s| &s.facts);
            DeviceReport {
                hostname: device.hostname.clone(),
                mgmt_address: device.mgmt_address.map(|a| a.to_string()),
                is_switch: device.is_switch(),
                vendor: facts.map(|f| f.vendor.clone()).filter(|v| !v.is_empty()),
                model: facts.map(|f| f.model.clone()).filter(|m| !m.is_empty()),
                os_version: facts.map(|f| f.os_version.clone()).filter(|v| !v.is_empty()),
                status: device.discovery_status.label().to_string(),
                interfaces: device
                    .interfaces()
                    .iter()
                    .map(|interface| InterfaceReport {
                        name: interface.name().to_string(),
                        description: interface.description.clone(),
                        mode: if interface.routed_port {
                            "routed".to_string()
                        } else {
                            interface.mode.to_string()
                        },
                        is_enabled: interface.is_enabled,
                        is_up: interface.is_up,
                        mac_count: interface.mac_count,
                        neighbors: interface
                            .neighbors
                            .iter()
                            .map(|n| describe_neighbor(fabric, n))
                            .collect(),
                    })
                    .collect(),
            }
        })
        .collect();
    devices.sort_by(|a, b| a.hostname.cmp(&b.hostname));

    let mut mac_table: Vec<MacReport> = fabric
        .mac_table()
        .iter()
        .map(|(mac, entry)| MacReport {
            mac: mac.to_string(),
            vlan: entry.vlan,
            attached_to: fabric.describe(entry.interface),
        })
        .collect();
    mac_table.sort_by(|a, b| a.mac.cmp(&b.mac));

    let mut discovery_status: Vec<StatusReport> = fabric
        .discovery_status()
        .iter()
        .map(|(target, status)| StatusReport {
            target: target.clone(),
            status: status.label().to_string(),
        })
        .collect();
    discovery_status.sort_by(|a, b| a.target.cmp(&b.target));

    FabricReport {
        generated_at: Local::now(),
        summary,
        devices,
        mac_table,
        discovery_status,
    }
}

fn describe_neighbor(fabric: &Fabric, neighbor: &Neighbor) -> String {
    match neighbor {
        Neighbor::Resolved(peer) => fabric.describe(*peer),
        Neighbor::Unresolved(d) if d.platform.is_empty() => format!("{} {} (unresolved)", d.hostname, d.remote_interface),
        Neighbor::Unresolved(d) => format!("{} {} [{}] (unresolved)", d.hostname, d.remote_interface, d.platform),
    }
}

/// Serialize the report as pretty JSON
pub fn generate_json_report(report: &FabricReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

/// Render the report as text
pub fn generate_text_report(report: &FabricReport) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("=".repeat(80));
    lines.push("                              FABRIC REPORT".to_string());
    lines.push("=".repeat(80));
    lines.push(String::new());

    lines.push(format!("Generated: {}", report.generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(format!("Devices: {}", report.devices.len()));
    lines.push(format!("Switches: {}", report.devices.iter().filter(|d| d.is_switch).count()));
    if let Some(summary) = &report.summary {
        lines.push(format!(
            "Crawl: {} completed, {} failed, {} skipped",
            summary.completed, summary.failed, summary.skipped
        ));
    }
    lines.push(String::new());

    for device in &report.devices {
        lines.push("-".repeat(80));
        let mut header = device.hostname.clone();
        if let Some(address) = &device.mgmt_address {
            header.push_str(&format!(" ({})", address));
        }
        for fact in [&device.vendor, &device.model].into_iter().flatten() {
            header.push_str(&format!(" {}", fact));
        }
        lines.push(format!("{} [{}]", header, device.status));

        for interface in &device.interfaces {
            let state = match (interface.is_enabled, interface.is_up) {
                (false, _) => "disabled",
                (true, true) => "up",
                (true, false) => "down",
            };
            lines.push(format!(
                "  {:<28} {:<8} {:<8} macs={:<5} {}",
                interface.name, interface.mode, state, interface.mac_count, interface.description
            ));
            for neighbor in &interface.neighbors {
                lines.push(format!("      -> {}", neighbor));
            }
        }
    }
    lines.push(String::new());

    if !report.mac_table.is_empty() {
        lines.push("=".repeat(80));
        lines.push("MAC attachment points".to_string());
        lines.push("=".repeat(80));
        for entry in &report.mac_table {
            lines.push(format!("  {}  vlan {:<5} {}", entry.mac, entry.vlan, entry.attached_to));
        }
        lines.push(String::new());
    }

    let failed: Vec<&StatusReport> = report.discovery_status.iter().filter(|s| s.status == "failed").collect();
    if !failed.is_empty() {
        lines.push("Failed targets:".to_string());
        for status in failed {
            lines.push(format!("  {}", status.target));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Write a rendered report to `output_path`
pub fn write_report(contents: &str, output_path: &Path) -> Result<()> {
    fs::write(output_path, contents)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;
    log::info!("Report written to {}", output_path.display());
    Ok(())
}
