use serde::Serialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone, Serialize)]
pub struct PhaseTiming {
    pub phase: String,
    pub duration_ms: u64,
    pub memory_mb: Option<u64>,
}

/// 記錄單次 ingestion 各階段耗時；啟用時額外取樣行程記憶體
pub struct RunMonitor {
    enabled: bool,
    started: Instant,
    phases: Mutex<Vec<PhaseTiming>>,
    #[cfg(feature = "cli")]
    system: Option<Mutex<(System, Pid)>>,
}

impl RunMonitor {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            started: Instant::now(),
            phases: Mutex::new(Vec::new()),
            #[cfg(feature = "cli")]
            system: if enabled {
                sysinfo::get_current_pid()
                    .ok()
                    .map(|pid| Mutex::new((System::new(), pid)))
            } else {
                None
            },
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&self, phase: &str, elapsed: Duration) {
        let timing = PhaseTiming {
            phase: phase.to_string(),
            duration_ms: elapsed.as_millis() as u64,
            memory_mb: self.sample_memory_mb(),
        };

        if self.enabled {
            match timing.memory_mb {
                Some(memory) => tracing::info!(
                    "📊 {} - Time: {:?}, Memory: {}MB",
                    phase,
                    elapsed,
                    memory
                ),
                None => tracing::info!("📊 {} - Time: {:?}", phase, elapsed),
            }
        } else {
            tracing::debug!("{} finished in {:?}", phase, elapsed);
        }

        if let Ok(mut phases) = self.phases.lock() {
            phases.push(timing);
        }
    }

    pub fn phases(&self) -> Vec<PhaseTiming> {
        self.phases
            .lock()
            .map(|phases| phases.clone())
            .unwrap_or_default()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[cfg(feature = "cli")]
    fn sample_memory_mb(&self) -> Option<u64> {
        let mut guard = self.system.as_ref()?.lock().ok()?;
        let (system, pid) = &mut *guard;
        let pid = *pid;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|p| p.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn sample_memory_mb(&self) -> Option<u64> {
        None
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
