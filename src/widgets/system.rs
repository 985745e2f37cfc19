//! Host metrics
//!
//! Samples CPU, memory, disk and temperature from the host and keeps a short
//! rolling history for the CPU and memory charts.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{Components, Disks, System};

/// Samples kept per chart
pub const HISTORY_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Health {
    Normal,
    Warning,
    Critical,
}

impl Health {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive lower bounds of the warning and critical bands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f32,
    pub critical: f32,
}

impl Thresholds {
    pub const CPU: Self = Self::new(70.0, 90.0);
    pub const MEMORY: Self = Self::new(80.0, 95.0);
    pub const DISK: Self = Self::new(85.0, 95.0);
    pub const TEMPERATURE: Self = Self::new(70.0, 85.0);

    #[must_use]
    pub const fn new(warning: f32, critical: f32) -> Self {
        Self { warning, critical }
    }

    #[must_use]
    pub fn classify(self, value: f32) -> Health {
        if value >= self.critical {
            Health::Critical
        } else if value >= self.warning {
            Health::Warning
        } else {
            Health::Normal
        }
    }
}

/// One reading of the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSample {
    pub timestamp: DateTime<Utc>,
    /// Percent
    pub cpu: f32,
    /// Percent
    pub memory: f32,
    /// Percent across all disks; `None` without any disk
    pub disk: Option<f32>,
    /// Hottest sensor in Celsius; `None` without sensors
    pub temperature: Option<f32>,
    pub processes: usize,
    /// Seconds
    pub uptime: u64,
}

impl MetricsSample {
    #[must_use]
    pub fn cpu_health(&self) -> Health {
        Thresholds::CPU.classify(self.cpu)
    }

    #[must_use]
    pub fn memory_health(&self) -> Health {
        Thresholds::MEMORY.classify(self.memory)
    }

    #[must_use]
    pub fn disk_health(&self) -> Option<Health> {
        self.disk.map(|d| Thresholds::DISK.classify(d))
    }

    #[must_use]
    pub fn temperature_health(&self) -> Option<Health> {
        self.temperature.map(|t| Thresholds::TEMPERATURE.classify(t))
    }

    /// Uptime as `N days, N hours`
    #[must_use]
    pub fn uptime_text(&self) -> String {
        let days = self.uptime / 86_400;
        let hours = (self.uptime % 86_400) / 3_600;
        format!("{days} days, {hours} hours")
    }
}

/// Fixed-length rolling history, oldest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricHistory {
    points: VecDeque<(DateTime<Utc>, f32)>,
}

impl MetricHistory {
    pub fn push(&mut self, at: DateTime<Utc>, value: f32) {
        if self.points.len() == HISTORY_LEN {
            self.points.pop_front();
        }
        self.points.push_back((at, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }

    #[must_use]
    pub fn latest(&self) -> Option<f32> {
        self.points.back().map(|(_, v)| *v)
    }
}

/// Host sampler
pub struct SystemMonitor {
    system: System,
    disks: Disks,
    components: Components,
    cpu_history: MetricHistory,
    memory_history: MetricHistory,
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMonitor {
    /// Create a sampler; CPU usage reads 0 until a second refresh
    #[must_use]
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            cpu_history: MetricHistory::default(),
            memory_history: MetricHistory::default(),
        }
    }

    /// Take a reading and append it to the history
    pub fn sample(&mut self) -> MetricsSample {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();
        self.system
            .refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        self.disks.refresh(true);
        self.components.refresh(true);

        let (disk_used, disk_total) = self.disks.iter().fold((0, 0), |(used, total), disk| {
            (
                used + disk.total_space().saturating_sub(disk.available_space()),
                total + disk.total_space(),
            )
        });

        let sample = MetricsSample {
            timestamp: Utc::now(),
            cpu: self.system.global_cpu_usage(),
            memory: percent_of(self.system.used_memory(), self.system.total_memory()).unwrap_or(0.0),
            disk: percent_of(disk_used, disk_total),
            temperature: self
                .components
                .iter()
                .filter_map(sysinfo::Component::temperature)
                .reduce(f32::max),
            processes: self.system.processes().len(),
            uptime: System::uptime(),
        };

        tracing::debug!(cpu = sample.cpu, memory = sample.memory, "sampled host metrics");
        self.cpu_history.push(sample.timestamp, sample.cpu);
        self.memory_history.push(sample.timestamp, sample.memory);
        sample
    }

    #[must_use]
    pub const fn cpu_history(&self) -> &MetricHistory {
        &self.cpu_history
    }

    #[must_use]
    pub const fn memory_history(&self) -> &MetricHistory {
        &self.memory_history
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn percent_of(part: u64, whole: u64) -> Option<f32> {
    (whole > 0).then(|| (part as f64 / whole as f64 * 100.0) as f32)
}
