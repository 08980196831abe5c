//! Real-time scheduling helpers (Linux SCHED_FIFO + mlockall; mlockall elsewhere on Unix).

use crate::cli::{RtArgs, RtLock};

/// Apply the requested real-time settings once per process. Failures are
/// logged and the loop runs without them.
pub fn setup_rt_once(args: RtArgs) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !args.rt {
        return;
    }
    let lock = args.rt_lock.unwrap_or_else(RtLock::os_default);
    RT_ONCE.get_or_init(|| {
        match try_apply_mem_lock(lock) {
            Ok(()) => tracing::info!(mode = ?lock, "rt: memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "rt: mlockall failed"),
        }
        match try_apply_fifo_priority(args.rt_prio) {
            Ok(prio) => tracing::info!(prio, "rt: SCHED_FIFO enabled"),
            Err(err) => tracing::warn!(
                requested = ?args.rt_prio,
                error = %err,
                "rt: SCHED_FIFO not applied"
            ),
        }
    });
}

#[cfg(unix)]
fn try_apply_mem_lock(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    fn is_retryable(err: &std::io::Error) -> bool {
        matches!(err.raw_os_error(), Some(code) if code == libc::EPERM || code == libc::ENOMEM)
    }

    fn memlock_limit_hint() -> Option<String> {
        let mut rlim = std::mem::MaybeUninit::<libc::rlimit>::uninit();
        // SAFETY: getrlimit only writes into the provided struct.
        let rc = unsafe { libc::getrlimit(libc::RLIMIT_MEMLOCK, rlim.as_mut_ptr()) };
        if rc != 0 {
            return None;
        }
        // SAFETY: rc == 0 means the struct was filled in.
        let cur = unsafe { rlim.assume_init() }.rlim_cur;
        if cur == libc::RLIM_INFINITY {
            Some("memlock limit: unlimited".to_string())
        } else {
            Some(format!("memlock limit: {} KiB", cur / 1024))
        }
    }

    fn lock_with(flags: libc::c_int) -> std::io::Result<()> {
        // SAFETY: plain syscall without pointer arguments.
        if unsafe { mlockall(flags) } != 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    let err = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => match lock_with(MCL_CURRENT) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        },
        RtLock::All => match lock_with(MCL_CURRENT | MCL_FUTURE) {
            Ok(()) => return Ok(()),
            // Future pages may exceed the limit; resident pages alone still help.
            Err(e) if is_retryable(&e) && lock_with(MCL_CURRENT).is_ok() => {
                tracing::warn!(error = %e, "rt: mlockall(current|future) failed, locked current pages only");
                return Ok(());
            }
            Err(e) => e,
        },
    };

    let mut msg = format!("mlockall({lock:?}) failed: {err}");
    if is_retryable(&err) {
        if let Some(h) = memlock_limit_hint() {
            msg.push_str(&format!("; {h}"));
        }
        msg.push_str("; hint: needs CAP_IPC_LOCK (or root) and sufficient 'ulimit -l'");
    }
    Err(eyre::eyre!(msg))
}

#[cfg(not(unix))]
fn try_apply_mem_lock(_lock: RtLock) -> eyre::Result<()> {
    eyre::bail!("memory locking is not supported on this platform")
}

/// Returns the priority actually applied.
#[cfg(target_os = "linux")]
fn try_apply_fifo_priority(prio: Option<i32>) -> eyre::Result<i32> {
    use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

    // SAFETY: plain syscalls without pointer arguments.
    let (min, max) = unsafe {
        let min = sched_get_priority_min(SCHED_FIFO);
        let max = sched_get_priority_max(SCHED_FIFO);
        if min < 0 || max < 0 { (1, 99) } else { (min, max) }
    };
    let wanted = prio.unwrap_or((min + max) / 2).clamp(min, max);
    let param = sched_param {
        sched_priority: wanted,
    };
    // SAFETY: `param` outlives the call.
    let rc = unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::EPERM) {
            eyre::bail!(
                "{err}; hint: run as root or grant CAP_SYS_NICE: 'sudo setcap cap_sys_nice=ep /path/to/fallwatch'"
            );
        }
        return Err(eyre::eyre!(err));
    }
    Ok(wanted)
}

#[cfg(not(target_os = "linux"))]
fn try_apply_fifo_priority(_prio: Option<i32>) -> eyre::Result<i32> {
    eyre::bail!("SCHED_FIFO is only available on Linux")
}
