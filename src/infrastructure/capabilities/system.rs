//! Host information.
//!
//! Release, CPU and RAM figures come from `/proc`, so they are Linux-only;
//! other hosts report them as `unavailable`.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use super::Capability;
use crate::domain::types::ToolArgs;

const UNAVAILABLE: &str = "unavailable";
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

pub struct SystemInfo;

#[async_trait]
impl Capability for SystemInfo {
    fn name(&self) -> &'static str {
        "get_system_info"
    }

    fn description(&self) -> &'static str {
        "Get the host's OS, CPU and RAM usage."
    }

    async fn invoke(&self, _args: &ToolArgs) -> String {
        let release = tokio::fs::read_to_string("/proc/sys/kernel/osrelease")
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| UNAVAILABLE.to_string());

        let info = json!({
            "OS": std::env::consts::OS,
            "OS Release": release,
            "Architecture": std::env::consts::ARCH,
            "CPU Usage": cpu_usage().await.unwrap_or_else(|| UNAVAILABLE.to_string()),
            "RAM Usage": ram_usage().await.unwrap_or_else(|| UNAVAILABLE.to_string()),
        });
        serde_json::to_string_pretty(&info)
            .unwrap_or_else(|e| format!("Error getting system info: {}", e))
    }
}

/// (busy, total) jiffies from the aggregate `cpu` line of `/proc/stat`.
fn parse_cpu_times(stat: &str) -> Option<(u64, u64)> {
    let line = stat.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some((total - idle, total))
}

async fn cpu_usage() -> Option<String> {
    let first = parse_cpu_times(&tokio::fs::read_to_string("/proc/stat").await.ok()?)?;
    tokio::time::sleep(CPU_SAMPLE_INTERVAL).await;
    let second = parse_cpu_times(&tokio::fs::read_to_string("/proc/stat").await.ok()?)?;
    Some(format!("{:.1}%", cpu_percent(first, second)))
}

fn cpu_percent(first: (u64, u64), second: (u64, u64)) -> f64 {
    let busy = second.0.saturating_sub(first.0) as f64;
    let total = second.1.saturating_sub(first.1) as f64;
    if total == 0.0 { 0.0 } else { busy / total * 100.0 }
}

/// Used/total memory from `/proc/meminfo`.
fn parse_meminfo(meminfo: &str) -> Option<(u64, u64)> {
    let field = |name: &str| -> Option<u64> {
        meminfo
            .lines()
            .find(|l| l.starts_with(name))?
            .split_whitespace()
            .nth(1)?
            .parse()
            .ok()
    };
    let total = field("MemTotal:")?;
    let available = field("MemAvailable:")?;
    Some((total.saturating_sub(available), total))
}

async fn ram_usage() -> Option<String> {
    let (used, total) = parse_meminfo(&tokio::fs::read_to_string("/proc/meminfo").await.ok()?)?;
    if total == 0 {
        return None;
    }
    Some(format!("{:.1}%", used as f64 / total as f64 * 100.0))
}
