//! Resource monitor: samples process RSS, classifies it into a level, and
//! fires registered downgrade callbacks on escalation. Never kills work,
//! only lowers ambition.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ResourceLevel {
    Normal,
    Warn,
    Critical,
    Emergency,
}

impl ResourceLevel {
    pub fn classify(used_fraction: f64) -> Self {
        if used_fraction >= 0.92 {
            ResourceLevel::Emergency
        } else if used_fraction >= 0.85 {
            ResourceLevel::Critical
        } else if used_fraction >= 0.70 {
            ResourceLevel::Warn
        } else {
            ResourceLevel::Normal
        }
    }
}

type DowngradeCallback = Box<dyn Fn(ResourceLevel) + Send + Sync>;

/// Samples RSS at <=1Hz in production; in this crate the sampler is driven
/// explicitly by `sample()` calls from stage boundaries, so worker counts
/// can be computed from a fresh level at the start of each stage without
/// a background thread.
pub struct ResourceMonitor {
    ceiling_bytes: u64,
    level: Mutex<ResourceLevel>,
    callbacks: Mutex<Vec<DowngradeCallback>>,
}

impl ResourceMonitor {
    pub fn new(ceiling_bytes: u64) -> Self {
        Self { ceiling_bytes, level: Mutex::new(ResourceLevel::Normal), callbacks: Mutex::new(Vec::new()) }
    }

    pub fn register_downgrade_callback<F>(&self, f: F)
    where
        F: Fn(ResourceLevel) + Send + Sync + 'static,
    {
        self.callbacks.lock().expect("resource monitor mutex poisoned").push(Box::new(f));
    }

    /// Samples current RSS (bytes) and updates the level, firing downgrade
    /// callbacks when the level transitions to `Critical` or `Emergency`.
    pub fn sample(&self, current_rss_bytes: u64) -> ResourceLevel {
        let used_fraction = current_rss_bytes as f64 / self.ceiling_bytes as f64;
        let new_level = ResourceLevel::classify(used_fraction);

        let mut level = self.level.lock().expect("resource monitor mutex poisoned");
        let transitioned_up = new_level > *level;
        *level = new_level;
        drop(level);

        if transitioned_up && matches!(new_level, ResourceLevel::Critical | ResourceLevel::Emergency) {
            for cb in self.callbacks.lock().expect("resource monitor mutex poisoned").iter() {
                cb(new_level);
            }
        }
        new_level
    }

    pub fn current_level(&self) -> ResourceLevel {
        *self.level.lock().expect("resource monitor mutex poisoned")
    }

    /// Best-effort current-process RSS reading, platform-specific. Falls
    /// back to 0 (i.e. `Normal`) when unavailable rather than failing the
    /// job — the monitor's job is to lower ambition, never to block it.
    pub fn read_process_rss_bytes() -> u64 {
        #[cfg(target_os = "linux")]
        {
            if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
                for line in status.lines() {
                    if let Some(rest) = line.strip_prefix("VmRSS:") {
                        if let Some(kb) = rest.trim().split_whitespace().next() {
                            if let Ok(kb) = kb.parse::<u64>() {
                                return kb * 1024;
                            }
                        }
                    }
                }
            }
        }
        0
    }
}

pub fn shared(ceiling_bytes: u64) -> Arc<ResourceMonitor> {
    Arc::new(ResourceMonitor::new(ceiling_bytes))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn classify_boundaries_match_spec() {
        assert_eq!(ResourceLevel::classify(0.1), ResourceLevel::Normal);
        assert_eq!(ResourceLevel::classify(0.70), ResourceLevel::Warn);
        assert_eq!(ResourceLevel::classify(0.85), ResourceLevel::Critical);
        assert_eq!(ResourceLevel::classify(0.92), ResourceLevel::Emergency);
    }

    #[test]
    fn downgrade_callback_fires_only_on_transition_into_critical_or_above() {
        let monitor = ResourceMonitor::new(100);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        monitor.register_downgrade_callback(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        monitor.sample(50); // Normal
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        monitor.sample(90); // Critical: fires
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        monitor.sample(91); // still Critical: no repeat fire
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        monitor.sample(95); // Emergency: fires again
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
