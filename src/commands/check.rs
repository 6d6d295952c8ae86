//! Check command implementation.
//!
//! Validates metric sources and configuration.

use herakles_pulse::config::{validate_effective_config, Config};
use herakles_pulse::default_source;
use herakles_pulse::sampler::ram_percent;

/// Validates metric sources and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles Pulse - System Check");
    println!("================================");

    let mut all_ok = true;
    let source = default_source(&config.proc_root());

    #[cfg(unix)]
    {
        if let Ok((sysname, release, machine)) = herakles_pulse::system::read_uname_info() {
            println!("\n🖥️  Host: {} {} ({})", sysname, release, machine);
        }
        if let Some(ticks) = herakles_pulse::system::clock_ticks_per_second() {
            println!("   Clock ticks per second: {}", ticks);
        }
    }

    println!("\n⏱️  Checking CPU counters ({})...", source.name());
    match source.read_cpu() {
        Ok(cpu) => {
            println!(
                "   ✅ idle={} total={} ticks since boot",
                cpu.idle_ticks, cpu.total_ticks
            );
            match cpu.process_ticks {
                Some(ticks) => println!("   ✅ process CPU time readable ({} ticks)", ticks),
                None => println!("   ⚠️  process CPU time unavailable (cpu_process will be -1)"),
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n💾 Checking memory counters...");
    match source.read_memory() {
        Ok(memory) => {
            match ram_percent(memory.total_bytes, memory.free_bytes) {
                Some(ram) => println!(
                    "   ✅ total={} MB free={} MB ({:.1}% used)",
                    memory.total_bytes / 1024 / 1024,
                    memory.free_bytes / 1024 / 1024,
                    ram
                ),
                None => {
                    println!("   ❌ total memory reported as 0");
                    all_ok = false;
                }
            }
            if memory.process_resident_bytes.is_none() {
                println!("   ⚠️  process memory unavailable (process_ram will be -1)");
            }
        }
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
