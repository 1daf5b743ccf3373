//! Process memory headroom probe
//!
//! The governor trips when discoverable headroom falls below the
//! configured floor. Headroom is only *discoverable* when the process has
//! a finite address-space limit; an unlimited or unreadable limit returns
//! `None` and the memory check is skipped entirely.
//!
//! Linux only: the probe reads `RLIMIT_AS` and `/proc/self/statm`. Other
//! platforms compile the stub that reports "not discoverable".

/// Bytes of address space left before the process hits its limit.
///
/// `None` when no finite limit is set or the probe fails; the caller
/// treats that as "check not applicable", never as an error.
#[cfg(target_os = "linux")]
pub fn headroom_bytes() -> Option<u64> {
    let limit = address_space_limit()?;
    let used = current_vm_bytes()?;
    Some(limit.saturating_sub(used))
}

/// RLIMIT_AS soft limit, `None` when unlimited
#[cfg(target_os = "linux")]
fn address_space_limit() -> Option<u64> {
    let mut rl = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: getrlimit writes into the struct we own; no aliasing
    let rc = unsafe { libc::getrlimit(libc::RLIMIT_AS, &mut rl) };
    if rc != 0 || rl.rlim_cur == libc::RLIM_INFINITY {
        return None;
    }
    Some(rl.rlim_cur)
}

/// Current virtual memory size from /proc/self/statm (first field, pages)
#[cfg(target_os = "linux")]
fn current_vm_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().next()?.parse().ok()?;
    // SAFETY: sysconf with a valid name has no side effects
    let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if page_size <= 0 {
        return None;
    }
    Some(pages.saturating_mul(page_size as u64))
}

/// Headroom is not discoverable on this platform
#[cfg(not(target_os = "linux"))]
pub fn headroom_bytes() -> Option<u64> {
    None
}
