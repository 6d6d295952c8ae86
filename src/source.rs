//! Platform counter sources.
//!
//! The sampler only depends on the [`CounterSource`] trait. One implementation
//! per target platform is compiled in and picked by [`default_source`]:
//!
//! - [`ProcfsSource`]: Linux /proc
//! - [`WindowsSource`]: `GetSystemTimes` / `GlobalMemoryStatusEx`

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SampleError;
use crate::system;

/// Cumulative CPU counters since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuCounters {
    /// Ticks spent idle (including I/O wait where the platform reports it).
    pub idle_ticks: u64,
    /// Ticks spent in every state, summed over all cores.
    pub total_ticks: u64,
    /// User + system ticks of this process, in the same unit as `total_ticks`.
    pub process_ticks: Option<u64>,
}

/// Memory totals at one instant, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCounters {
    pub total_bytes: u64,
    /// Free memory including reclaimable cache and buffers.
    pub free_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
    pub process_resident_bytes: Option<u64>,
    pub process_virtual_bytes: Option<u64>,
}

/// A platform's way of reading raw OS counters.
pub trait CounterSource: Send + Sync {
    /// Short name used in logs and the `check` command.
    fn name(&self) -> &'static str;

    fn read_cpu(&self) -> Result<CpuCounters, SampleError>;

    fn read_memory(&self) -> Result<MemoryCounters, SampleError>;
}

/// Counter source backed by the Linux /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl ProcfsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl CounterSource for ProcfsSource {
    fn name(&self) -> &'static str {
        "procfs"
    }

    fn read_cpu(&self) -> Result<CpuCounters, SampleError> {
        let stat = system::read_cpu_stat(&self.root)?;
        // Process ticks are optional; the system-wide figure stands on its own
        let process_ticks = system::read_process_ticks(&self.root).ok();

        Ok(CpuCounters {
            idle_ticks: stat.idle_total(),
            total_ticks: stat.total(),
            process_ticks,
        })
    }

    fn read_memory(&self) -> Result<MemoryCounters, SampleError> {
        let info = system::read_memory_info(&self.root)?;
        let process = system::read_process_memory(&self.root).ok();

        Ok(MemoryCounters {
            total_bytes: info.total_bytes,
            free_bytes: info.available_bytes,
            swap_total_bytes: info.swap_total_bytes,
            swap_free_bytes: info.swap_free_bytes,
            process_resident_bytes: process.map(|p| p.resident_bytes),
            process_virtual_bytes: process.map(|p| p.virtual_bytes),
        })
    }
}

/// Counter source backed by the Win32 system information APIs.
///
/// CPU times are reported in 100ns units; kernel time already includes idle time.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsSource;

#[cfg(windows)]
impl WindowsSource {
    fn filetime_ticks(ft: &windows_sys::Win32::Foundation::FILETIME) -> u64 {
        ((ft.dwHighDateTime as u64) << 32) | ft.dwLowDateTime as u64
    }

    fn process_ticks() -> Option<u64> {
        use windows_sys::Win32::Foundation::FILETIME;
        use windows_sys::Win32::System::Threading::{GetCurrentProcess, GetProcessTimes};

        unsafe {
            let mut creation = std::mem::zeroed::<FILETIME>();
            let mut exit = std::mem::zeroed::<FILETIME>();
            let mut kernel = std::mem::zeroed::<FILETIME>();
            let mut user = std::mem::zeroed::<FILETIME>();
            let ok = GetProcessTimes(
                GetCurrentProcess(),
                &mut creation,
                &mut exit,
                &mut kernel,
                &mut user,
            );
            if ok == 0 {
                return None;
            }
            Some(Self::filetime_ticks(&kernel).wrapping_add(Self::filetime_ticks(&user)))
        }
    }

    fn process_memory() -> Option<(u64, u64)> {
        use windows_sys::Win32::System::ProcessStatus::{
            GetProcessMemoryInfo, PROCESS_MEMORY_COUNTERS,
        };
        use windows_sys::Win32::System::Threading::GetCurrentProcess;

        unsafe {
            let mut counters = std::mem::zeroed::<PROCESS_MEMORY_COUNTERS>();
            counters.cb = std::mem::size_of::<PROCESS_MEMORY_COUNTERS>() as u32;
            let ok = GetProcessMemoryInfo(GetCurrentProcess(), &mut counters, counters.cb);
            if ok == 0 {
                return None;
            }
            Some((counters.WorkingSetSize as u64, counters.PagefileUsage as u64))
        }
    }
}

#[cfg(windows)]
impl CounterSource for WindowsSource {
    fn name(&self) -> &'static str {
        "win32"
    }

    fn read_cpu(&self) -> Result<CpuCounters, SampleError> {
        use windows_sys::Win32::Foundation::FILETIME;
        use windows_sys::Win32::System::Threading::GetSystemTimes;

        let (idle, kernel, user) = unsafe {
            let mut idle = std::mem::zeroed::<FILETIME>();
            let mut kernel = std::mem::zeroed::<FILETIME>();
            let mut user = std::mem::zeroed::<FILETIME>();
            if GetSystemTimes(&mut idle, &mut kernel, &mut user) == 0 {
                return Err(SampleError::Query("GetSystemTimes"));
            }
            (idle, kernel, user)
        };

        Ok(CpuCounters {
            idle_ticks: Self::filetime_ticks(&idle),
            total_ticks: Self::filetime_ticks(&kernel).wrapping_add(Self::filetime_ticks(&user)),
            process_ticks: Self::process_ticks(),
        })
    }

    fn read_memory(&self) -> Result<MemoryCounters, SampleError> {
        use windows_sys::Win32::System::SystemInformation::{
            GlobalMemoryStatusEx, MEMORYSTATUSEX,
        };

        let status = unsafe {
            let mut status = std::mem::zeroed::<MEMORYSTATUSEX>();
            status.dwLength = std::mem::size_of::<MEMORYSTATUSEX>() as u32;
            if GlobalMemoryStatusEx(&mut status) == 0 {
                return Err(SampleError::Query("GlobalMemoryStatusEx"));
            }
            status
        };
        let process = Self::process_memory();

        // The page file total already contains physical memory
        Ok(MemoryCounters {
            total_bytes: status.ullTotalPhys,
            free_bytes: status.ullAvailPhys,
            swap_total_bytes: status.ullTotalPageFile.saturating_sub(status.ullTotalPhys),
            swap_free_bytes: status.ullAvailPageFile.saturating_sub(status.ullAvailPhys),
            process_resident_bytes: process.map(|(rss, _)| rss),
            process_virtual_bytes: process.map(|(_, private)| private),
        })
    }
}

/// Returns the counter source for the platform this binary was built for.
///
/// `proc_root` is only used by the /proc source.
#[cfg(not(windows))]
pub fn default_source(proc_root: &Path) -> Arc<dyn CounterSource> {
    Arc::new(ProcfsSource::new(proc_root))
}

/// Returns the counter source for the platform this binary was built for.
///
/// `proc_root` is only used by the /proc source.
#[cfg(windows)]
pub fn default_source(_proc_root: &Path) -> Arc<dyn CounterSource> {
    Arc::new(WindowsSource)
}
