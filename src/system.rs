//! Host counter collection from the /proc filesystem.
//!
//! This module reads the cumulative CPU tick counters from /proc/stat, memory
//! totals from /proc/meminfo and the server's own CPU time and memory from
//! /proc/self. Every reader takes the proc root so tests can point it at a
//! fake tree.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SampleError;

/// Aggregate CPU tick counters from the `cpu` line of /proc/stat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStat {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    /// Calculate total CPU time (all fields).
    pub fn total(&self) -> u64 {
        self.user
            .wrapping_add(self.nice)
            .wrapping_add(self.system)
            .wrapping_add(self.idle)
            .wrapping_add(self.iowait)
            .wrapping_add(self.irq)
            .wrapping_add(self.softirq)
            .wrapping_add(self.steal)
    }

    /// Calculate non-active time (idle + iowait).
    /// This includes both true idle time and time spent waiting for I/O operations.
    pub fn idle_total(&self) -> u64 {
        self.idle.wrapping_add(self.iowait)
    }
}

/// Memory figures from /proc/meminfo, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_bytes: u64,
    /// Free memory including reclaimable page cache and buffers.
    pub available_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
}

/// Resident and virtual size of the current process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemory {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
}

fn read_proc_file(proc_root: &Path, relative: &str) -> Result<String, SampleError> {
    let path: PathBuf = proc_root.join(relative);
    fs::read_to_string(&path).map_err(|source| SampleError::Read { path, source })
}

/// Reads the aggregate CPU counters from `<proc_root>/stat`.
pub fn read_cpu_stat(proc_root: &Path) -> Result<CpuStat, SampleError> {
    let content = read_proc_file(proc_root, "stat")?;
    parse_cpu_stat(&content)
}

/// Parses the aggregate `cpu` line of /proc/stat.
///
/// Per-core lines (`cpu0`, `cpu1`, ...) are ignored. Kernels older than
/// 2.6.11 do not report `steal`, which then counts as zero.
pub fn parse_cpu_stat(content: &str) -> Result<CpuStat, SampleError> {
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| SampleError::parse("/proc/stat", "no aggregate cpu line"))?;

    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 8 {
        return Err(SampleError::parse(
            "/proc/stat",
            format!("expected at least 7 cpu fields, got {}", parts.len() - 1),
        ));
    }

    let field = |idx: usize| -> Result<u64, SampleError> {
        parts[idx].parse::<u64>().map_err(|e| {
            SampleError::parse("/proc/stat", format!("field {} ({}): {}", idx, parts[idx], e))
        })
    };

    Ok(CpuStat {
        user: field(1)?,
        nice: field(2)?,
        system: field(3)?,
        idle: field(4)?,
        iowait: field(5)?,
        irq: field(6)?,
        softirq: field(7)?,
        steal: if parts.len() > 8 { field(8)? } else { 0 },
    })
}

/// Reads memory totals from `<proc_root>/meminfo`.
pub fn read_memory_info(proc_root: &Path) -> Result<MemInfo, SampleError> {
    let content = read_proc_file(proc_root, "meminfo")?;
    parse_meminfo(&content)
}

fn kb_value(line: &str) -> Option<u64> {
    line.split_whitespace()
        .nth(1)
        .and_then(|v| v.parse::<u64>().ok())
        .map(|kb| kb.saturating_mul(1024))
}

/// Parses /proc/meminfo.
///
/// Falls back to MemFree + Buffers + Cached on kernels without MemAvailable.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, SampleError> {
    let mut total: Option<u64> = None;
    let mut available: Option<u64> = None;
    let mut free: Option<u64> = None;
    let mut buffers: Option<u64> = None;
    let mut cached: Option<u64> = None;
    let mut swap_total: Option<u64> = None;
    let mut swap_free: Option<u64> = None;

    for line in content.lines() {
        let slot = match line.split(':').next() {
            Some("MemTotal") => &mut total,
            Some("MemAvailable") => &mut available,
            Some("MemFree") => &mut free,
            Some("Buffers") => &mut buffers,
            Some("Cached") => &mut cached,
            Some("SwapTotal") => &mut swap_total,
            Some("SwapFree") => &mut swap_free,
            _ => continue,
        };
        *slot = kb_value(line);
    }

    let total_bytes =
        total.ok_or_else(|| SampleError::parse("/proc/meminfo", "missing MemTotal"))?;

    let available_bytes = match (available, free) {
        (Some(avail), _) => avail,
        (None, Some(free)) => free
            .saturating_add(buffers.unwrap_or(0))
            .saturating_add(cached.unwrap_or(0)),
        (None, None) => {
            return Err(SampleError::parse(
                "/proc/meminfo",
                "missing both MemAvailable and MemFree",
            ))
        }
    };

    Ok(MemInfo {
        total_bytes,
        available_bytes,
        swap_total_bytes: swap_total.unwrap_or(0),
        swap_free_bytes: swap_free.unwrap_or(0),
    })
}

/// Reads user + system CPU ticks of the current process from `<proc_root>/self/stat`.
pub fn read_process_ticks(proc_root: &Path) -> Result<u64, SampleError> {
    let content = read_proc_file(proc_root, "self/stat")?;
    parse_process_ticks(&content)
}

/// Parses utime + stime (fields 14 and 15) of a /proc/<pid>/stat line.
///
/// The command name in field 2 may contain spaces and parentheses, so
/// fields are counted from the last closing parenthesis.
pub fn parse_process_ticks(content: &str) -> Result<u64, SampleError> {
    let rest = content
        .rfind(')')
        .map(|idx| &content[idx + 1..])
        .ok_or_else(|| SampleError::parse("/proc/self/stat", "missing command name"))?;

    // rest starts at field 3 (state), so utime is index 11 and stime index 12
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() < 13 {
        return Err(SampleError::parse(
            "/proc/self/stat",
            format!("expected at least 15 fields, got {}", fields.len() + 2),
        ));
    }

    let utime = fields[11]
        .parse::<u64>()
        .map_err(|e| SampleError::parse("/proc/self/stat", format!("utime: {}", e)))?;
    let stime = fields[12]
        .parse::<u64>()
        .map_err(|e| SampleError::parse("/proc/self/stat", format!("stime: {}", e)))?;

    Ok(utime.wrapping_add(stime))
}

/// Reads resident and virtual size of the current process from `<proc_root>/self/status`.
pub fn read_process_memory(proc_root: &Path) -> Result<ProcessMemory, SampleError> {
    let content = read_proc_file(proc_root, "self/status")?;
    parse_process_status(&content)
}

/// Parses VmRSS and VmSize from a /proc/<pid>/status file.
pub fn parse_process_status(content: &str) -> Result<ProcessMemory, SampleError> {
    let mut rss: Option<u64> = None;
    let mut size: Option<u64> = None;

    for line in content.lines() {
        if line.starts_with("VmRSS:") {
            rss = kb_value(line);
        } else if line.starts_with("VmSize:") {
            size = kb_value(line);
        }

        if rss.is_some() && size.is_some() {
            break;
        }
    }

    match (rss, size) {
        (Some(resident_bytes), Some(virtual_bytes)) => Ok(ProcessMemory {
            resident_bytes,
            virtual_bytes,
        }),
        _ => Err(SampleError::parse(
            "/proc/self/status",
            "missing VmRSS or VmSize",
        )),
    }
}

/// Clock ticks per second used by /proc/stat counters.
#[cfg(unix)]
pub fn clock_ticks_per_second() -> Option<u64> {
    // SAFETY: sysconf has no preconditions and only reads a configuration value
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks > 0 {
        Some(ticks as u64)
    } else {
        None
    }
}

/// Reads system information from uname syscall.
/// Returns (sysname, release, machine).
#[cfg(unix)]
pub fn read_uname_info() -> Result<(String, String, String), String> {
    use std::ffi::CStr;
    use std::mem;

    unsafe {
        // SAFETY: libc::utsname is a C struct with only arrays of i8/c_char
        // which are valid for zeroed memory initialization
        let mut utsname: libc::utsname = mem::zeroed();
        if libc::uname(&mut utsname) == 0 {
            let sysname = CStr::from_ptr(utsname.sysname.as_ptr())
                .to_string_lossy()
                .into_owned();
            let release = CStr::from_ptr(utsname.release.as_ptr())
                .to_string_lossy()
                .into_owned();
            let machine = CStr::from_ptr(utsname.machine.as_ptr())
                .to_string_lossy()
                .into_owned();

            Ok((sysname, release, machine))
        } else {
            Err("Failed to call uname".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROC_STAT: &str = "cpu  4705 356 584 3699 23 23 0 0 0 0\n\
                             cpu0 1393 280 224 1781 6 8 0 0 0 0\n\
                             cpu1 3312 76 360 1918 17 15 0 0 0 0\n\
                             intr 114930548 113199788 3 0 5 263 0 4 [...]\n\
                             ctxt 1990473\n\
                             btime 1062191376\n";

    #[test]
    fn test_parse_cpu_stat_uses_aggregate_line() {
        let stat = parse_cpu_stat(PROC_STAT).unwrap();
        assert_eq!(stat.user, 4705);
        assert_eq!(stat.idle, 3699);
        assert_eq!(stat.steal, 0);
        assert_eq!(stat.total(), 4705 + 356 + 584 + 3699 + 23 + 23);
        assert_eq!(stat.idle_total(), 3699 + 23);
    }

    #[test]
    fn test_parse_cpu_stat_without_steal() {
        let stat = parse_cpu_stat("cpu 10 0 5 100 1 0 0\n").unwrap();
        assert_eq!(stat.steal, 0);
        assert_eq!(stat.total(), 116);
    }

    #[test]
    fn test_parse_cpu_stat_invalid() {
        assert!(parse_cpu_stat("cpu0 1 2 3 4 5 6 7\n").is_err());
        assert!(parse_cpu_stat("cpu 1 2 3\n").is_err());
        assert!(parse_cpu_stat("cpu a b c d e f g\n").is_err());
    }

    #[test]
    fn test_parse_meminfo() {
        let content = "MemTotal:        8000 kB\n\
                       MemFree:          500 kB\n\
                       MemAvailable:    2000 kB\n\
                       Buffers:          100 kB\n\
                       Cached:           900 kB\n\
                       SwapTotal:       1000 kB\n\
                       SwapFree:         250 kB\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.total_bytes, 8000 * 1024);
        assert_eq!(info.available_bytes, 2000 * 1024);
        assert_eq!(info.swap_total_bytes, 1000 * 1024);
        assert_eq!(info.swap_free_bytes, 250 * 1024);
    }

    #[test]
    fn test_parse_meminfo_without_mem_available() {
        let content = "MemTotal: 8000 kB\nMemFree: 500 kB\nBuffers: 100 kB\nCached: 900 kB\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.available_bytes, 1500 * 1024);
        assert_eq!(info.swap_total_bytes, 0);
    }

    #[test]
    fn test_parse_meminfo_missing_total() {
        assert!(parse_meminfo("MemFree: 500 kB\n").is_err());
    }

    #[test]
    fn test_parse_process_ticks_with_spaces_in_name() {
        let line = "4242 (my (odd) server) S 1 4242 4242 0 -1 4194560 1200 0 0 0 \
                    37 12 0 0 20 0 9 0 123456 123456789 2048 18446744073709551615";
        assert_eq!(parse_process_ticks(line).unwrap(), 49);
    }

    #[test]
    fn test_parse_process_ticks_truncated() {
        assert!(parse_process_ticks("4242 (server) S 1 2 3").is_err());
        assert!(parse_process_ticks("garbage").is_err());
    }

    #[test]
    fn test_parse_process_status() {
        let content = "Name:\therakles-pulse\nVmPeak:\t  20000 kB\nVmSize:\t  16384 kB\n\
                       VmHWM:\t   5000 kB\nVmRSS:\t   4096 kB\n";
        let mem = parse_process_status(content).unwrap();
        assert_eq!(mem.resident_bytes, 4096 * 1024);
        assert_eq!(mem.virtual_bytes, 16384 * 1024);
    }

    #[test]
    fn test_parse_process_status_kernel_thread() {
        // Kernel threads have no Vm* lines
        assert!(parse_process_status("Name:\tkthreadd\nState:\tS (sleeping)\n").is_err());
    }
}
