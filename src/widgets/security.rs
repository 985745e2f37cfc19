//! Security overview
//!
//! Read-only: threats and devices are reported, never acted on.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatKind {
    Malware,
    Phishing,
    Intrusion,
    Suspicious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatStatus {
    Detected,
    Quarantined,
    Resolved,
    Investigating,
}

impl ThreatStatus {
    /// Still needs attention
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Detected | Self::Investigating)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Threat {
    pub id: String,
    pub kind: ThreatKind,
    pub severity: ThreatSeverity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub status: ThreatStatus,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Computer,
    Phone,
    Tablet,
    Router,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceStatus {
    Secure,
    Warning,
    AtRisk,
    Compromised,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub kind: DeviceKind,
    pub status: DeviceStatus,
    pub last_scan: DateTime<Utc>,
    pub threats: u32,
    pub antivirus: bool,
    pub firewall: bool,
    pub encryption: bool,
}

/// Device protection summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounts {
    pub by_status: BTreeMap<DeviceStatus, usize>,
    pub open_threats: usize,
    pub total_threats: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityOverview {
    /// 0-100
    pub score: u8,
    pub threats: Vec<Threat>,
    pub devices: Vec<Device>,
}

impl SecurityOverview {
    #[must_use]
    pub const fn new(score: u8, threats: Vec<Threat>, devices: Vec<Device>) -> Self {
        Self {
            score,
            threats,
            devices,
        }
    }

    /// Demo data shown on the dashboard, timed relative to `now`
    #[must_use]
    pub fn sample(now: DateTime<Utc>) -> Self {
        let threat = |id: &str,
                      kind: ThreatKind,
                      severity: ThreatSeverity,
                      description: &str,
                      ago: Duration,
                      status: ThreatStatus,
                      source: &str| Threat {
            id: id.to_string(),
            kind,
            severity,
            description: description.to_string(),
            timestamp: now - ago,
            status,
            source: source.to_string(),
        };
        let device = |id: &str,
                      name: &str,
                      kind: DeviceKind,
                      status: DeviceStatus,
                      ago: Duration,
                      threats: u32,
                      antivirus: bool| Device {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            status,
            last_scan: now - ago,
            threats,
            antivirus,
            firewall: true,
            encryption: true,
        };

        Self::new(
            87,
            vec![
                threat(
                    "1",
                    ThreatKind::Malware,
                    ThreatSeverity::High,
                    "Suspicious executable file detected in downloads folder",
                    Duration::hours(2),
                    ThreatStatus::Quarantined,
                    "Downloads/unknown_file.exe",
                ),
                threat(
                    "2",
                    ThreatKind::Phishing,
                    ThreatSeverity::Medium,
                    "Suspicious email link blocked",
                    Duration::hours(1),
                    ThreatStatus::Resolved,
                    "Email: support@fakebank.com",
                ),
                threat(
                    "3",
                    ThreatKind::Intrusion,
                    ThreatSeverity::Low,
                    "Multiple failed login attempts detected",
                    Duration::minutes(30),
                    ThreatStatus::Investigating,
                    "IP: 192.168.1.100",
                ),
            ],
            vec![
                device("1", "Main Computer", DeviceKind::Computer, DeviceStatus::Secure, Duration::hours(6), 0, true),
                device("2", "iPhone 15", DeviceKind::Phone, DeviceStatus::Secure, Duration::hours(12), 0, true),
                device("3", "Home Router", DeviceKind::Router, DeviceStatus::Warning, Duration::hours(24), 2, false),
            ],
        )
    }

    #[must_use]
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for device in &self.devices {
            *counts.by_status.entry(device.status).or_default() += 1;
            counts.total_threats += device.threats;
        }
        counts.open_threats = self.threats.iter().filter(|t| t.status.is_open()).count();
        counts
    }

    /// Threats ordered most severe first
    #[must_use]
    pub fn threats_by_severity(&self) -> Vec<&Threat> {
        let mut threats: Vec<&Threat> = self.threats.iter().collect();
        threats.sort_by(|a, b| b.severity.cmp(&a.severity));
        threats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_counts() {
        let overview = SecurityOverview::sample(Utc::now());
        let counts = overview.counts();
        assert_eq!(counts.by_status.get(&DeviceStatus::Secure), Some(&2));
        assert_eq!(counts.by_status.get(&DeviceStatus::Warning), Some(&1));
        assert_eq!(counts.by_status.get(&DeviceStatus::Compromised), None);
        assert_eq!(counts.open_threats, 1);
        assert_eq!(counts.total_threats, 2);
    }

    #[test]
    fn threats_sorted_by_severity() {
        let overview = SecurityOverview::sample(Utc::now());
        let severities: Vec<ThreatSeverity> =
            overview.threats_by_severity().iter().map(|t| t.severity).collect();
        assert_eq!(
            severities,
            [ThreatSeverity::High, ThreatSeverity::Medium, ThreatSeverity::Low]
        );
    }

    #[test]
    fn sample_is_relative_to_now() {
        let now = Utc::now();
        let overview = SecurityOverview::sample(now);
        assert_eq!(overview.threats[2].timestamp, now - Duration::minutes(30));
        assert_eq!(overview.score, 87);
    }
}
