//! Worker memory sampling
//!
//! The memory monitor is a sampling policy, not a separate process: workers
//! call [`MemoryProbe::resident_mb`] after completing and reporting a task,
//! before requesting the next one. The probe is a trait so tests can inject
//! deterministic readings.

use crate::PulseError;
use std::sync::Mutex;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Source of resident memory readings for a worker
pub trait MemoryProbe: Send + Sync {
    /// Current resident memory in megabytes
    fn resident_mb(&self) -> u64;
}

/// Probe backed by the hosting process's resident set size
pub struct ProcessMemoryProbe {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessMemoryProbe {
    pub fn new() -> Result<Self, PulseError> {
        let pid = sysinfo::get_current_pid().map_err(|e| PulseError::Memory(e.to_string()))?;
        Ok(Self {
            pid,
            system: Mutex::new(System::new()),
        })
    }
}

impl MemoryProbe for ProcessMemoryProbe {
    fn resident_mb(&self) -> u64 {
        let mut system = self.system.lock().unwrap();
        system.refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        system
            .process(self.pid)
            .map(|p| p.memory() / (1024 * 1024))
            .unwrap_or(0)
    }
}
