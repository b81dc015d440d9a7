use std::collections::VecDeque;
use std::fmt;

use crate::executor::ExecutionProfile;
use crate::registry::Registry;

/// Registry inspector for debugging
pub struct RegistryInspector;

impl RegistryInspector {
    /// Point-in-time summary of the registry's contents
    pub fn summary(registry: &Registry) -> RegistrySummary {
        RegistrySummary {
            entity_count: registry.entity_count(),
            storages: registry
                .storage_sizes()
                .into_iter()
                .map(|(name, len)| StorageInfo { name, len })
                .collect(),
            systems: registry.system_names(),
            edges: registry.precedence_edges(),
        }
    }

    /// Print registry summary to console
    pub fn print_summary(registry: &Registry) {
        print!("{}", Self::summary(registry));
    }

    /// Print per-system timings of a tick
    pub fn print_profile(profile: &ExecutionProfile) {
        println!("=== Tick Profile ===");
        println!("Total: {:?}", profile.total_frame_time);
        for timing in &profile.system_timings {
            println!(
                "{}: {:?} ({} reads, {} writes, {} fan-outs)",
                timing.name,
                timing.duration,
                timing.access.reads.len(),
                timing.access.writes.len(),
                timing.fan_outs
            );
        }
        for conflict in &profile.conflicts {
            println!("Unordered conflict: {} <-> {}", conflict.first, conflict.second);
        }
    }
}

/// Storage information for debugging
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageInfo {
    pub name: &'static str,
    pub len: usize,
}

#[derive(Clone, Debug)]
pub struct RegistrySummary {
    pub entity_count: usize,
    /// Sorted by component name
    pub storages: Vec<StorageInfo>,
    /// Registration order
    pub systems: Vec<&'static str>,
    pub edges: Vec<(&'static str, &'static str)>,
}

impl fmt::Display for RegistrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Registry Summary ===")?;
        writeln!(f, "Entities: {}", self.entity_count)?;

        writeln!(f, "\n=== Storages ===")?;
        for storage in &self.storages {
            writeln!(f, "{}: {} components", storage.name, storage.len)?;
        }

        writeln!(f, "\n=== Systems ===")?;
        for system in &self.systems {
            writeln!(f, "{system}")?;
        }
        for (before, after) in &self.edges {
            writeln!(f, "{before} -> {after}")?;
        }
        Ok(())
    }
}

/// Performance diagnostics over recent ticks
#[derive(Clone, Debug)]
pub struct Diagnostics {
    frame_times: VecDeque<f32>,
    max_samples: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Create new diagnostics tracker
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::new(),
            max_samples: 60,
        }
    }

    /// Record a frame time in milliseconds
    pub fn record_frame_time(&mut self, time_ms: f32) {
        self.frame_times.push_back(time_ms);
        if self.frame_times.len() > self.max_samples {
            self.frame_times.pop_front();
        }
    }

    pub fn record_profile(&mut self, profile: &ExecutionProfile) {
        self.record_frame_time(profile.total_frame_time.as_secs_f32() * 1000.0);
    }

    /// Ticks per second implied by the average tick time
    pub fn ticks_per_second(&self) -> f32 {
        let avg_ms = self.avg_frame_time();
        if avg_ms > 0.0 {
            1000.0 / avg_ms
        } else {
            0.0
        }
    }

    /// Get average frame time in milliseconds
    pub fn avg_frame_time(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32
    }

    pub fn max_frame_time(&self) -> f32 {
        self.frame_times
            .iter()
            .copied()
            .fold(0.0, f32::max)
    }

    pub fn sample_count(&self) -> usize {
        self.frame_times.len()
    }
}
