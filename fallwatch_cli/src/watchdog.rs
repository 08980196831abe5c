//! Service-manager notifications over `$NOTIFY_SOCKET`.
//!
//! A leading `@` in the socket path selects the Linux abstract namespace.
//! Without the variable every call is a no-op, so the same binary runs under
//! a supervisor and from a shell.

use fallwatch_traits::Watchdog;

#[cfg(unix)]
use std::os::unix::net::UnixDatagram;

pub const NOTIFY_SOCKET_ENV: &str = "NOTIFY_SOCKET";

#[derive(Debug, Default)]
pub struct NotifyWatchdog {
    #[cfg(unix)]
    target: Option<(UnixDatagram, String)>,
}

impl NotifyWatchdog {
    pub fn from_env() -> Self {
        match std::env::var(NOTIFY_SOCKET_ENV) {
            Ok(path) if !path.is_empty() => Self::connect(&path),
            _ => Self::default(),
        }
    }

    #[cfg(unix)]
    pub fn connect(path: &str) -> Self {
        match UnixDatagram::unbound() {
            Ok(sock) => Self {
                target: Some((sock, path.to_string())),
            },
            Err(e) => {
                tracing::warn!(error = %e, "notify socket unavailable; watchdog disabled");
                Self::default()
            }
        }
    }

    #[cfg(not(unix))]
    pub fn connect(_path: &str) -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        #[cfg(unix)]
        {
            self.target.is_some()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Send one state line such as `READY=1`. Errors are logged, never returned.
    pub fn notify(&self, state: &str) {
        #[cfg(unix)]
        {
            if let Some((sock, path)) = &self.target
                && let Err(e) = send_to(sock, path, state.as_bytes())
            {
                tracing::warn!(error = %e, state, "notify send failed");
            }
        }
        #[cfg(not(unix))]
        let _ = state;
    }
}

#[cfg(target_os = "linux")]
fn send_to(sock: &UnixDatagram, path: &str, msg: &[u8]) -> std::io::Result<usize> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::SocketAddr;

    match path.strip_prefix('@') {
        Some(name) => {
            let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
            sock.send_to_addr(msg, &addr)
        }
        None => sock.send_to(msg, path),
    }
}

#[cfg(all(unix, not(target_os = "linux")))]
fn send_to(sock: &UnixDatagram, path: &str, msg: &[u8]) -> std::io::Result<usize> {
    sock.send_to(msg, path)
}

impl Watchdog for NotifyWatchdog {
    fn ping(&mut self) {
        self.notify("WATCHDOG=1");
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pings_arrive_as_watchdog_datagrams() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notify.sock");
        let server = UnixDatagram::bind(&path).unwrap();
        server
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let mut wd = NotifyWatchdog::connect(path.to_str().unwrap());
        assert!(wd.is_enabled());
        wd.notify("READY=1");
        wd.ping();

        let mut buf = [0u8; 64];
        let n = server.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"READY=1");
        let n = server.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"WATCHDOG=1");
    }

    #[test]
    fn missing_socket_is_logged_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut wd = NotifyWatchdog::connect(dir.path().join("absent.sock").to_str().unwrap());
        wd.ping();
        wd.notify("STOPPING=1");
    }

    #[test]
    fn default_is_disabled() {
        let mut wd = NotifyWatchdog::default();
        assert!(!wd.is_enabled());
        wd.ping();
    }
}
