//! Free-port probing shared by backend implementations.

use std::net::{Ipv4Addr, SocketAddr, TcpListener};

use thiserror::Error;

/// How many consecutive ports a probe examines before giving up.
pub const FIND_PORT_ATTEMPTS: u16 = 100;

/// Probe failure: every candidate port in the window was taken.
#[derive(Debug, Error)]
#[error("no free port in {attempts} candidates starting at {start}")]
pub struct PortProbeError {
    /// First port probed.
    pub start: u16,
    /// Number of candidates examined.
    pub attempts: u16,
}

/// Finds a free TCP port on the loopback interface, probing sequentially
/// from `start`. Probing stays close to the configured port on purpose so a
/// relocated service remains easy to find.
///
/// # Errors
///
/// Returns [`PortProbeError`] when no port in the window is free.
pub fn find_free_port(start: u16) -> Result<u16, PortProbeError> {
    for offset in 0..FIND_PORT_ATTEMPTS {
        let Some(candidate) = start.checked_add(offset) else {
            break;
        };
        if port_is_free(candidate) {
            return Ok(candidate);
        }
    }
    Err(PortProbeError {
        start,
        attempts: FIND_PORT_ATTEMPTS,
    })
}

fn port_is_free(port: u16) -> bool {
    TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_skips_an_occupied_port() {
        let holder =
            TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).expect("bind ephemeral");
        let taken = holder.local_addr().expect("local addr").port();
        let found = find_free_port(taken).expect("probe");
        assert!(found > taken, "expected a later port, got {found}");
        assert!(u32::from(found) <= u32::from(taken) + u32::from(FIND_PORT_ATTEMPTS));
    }

    #[test]
    fn probe_near_the_port_ceiling_stays_bounded() {
        // Either the last port is genuinely free or the window is exhausted;
        // the probe must never wrap around.
        match find_free_port(u16::MAX) {
            Ok(port) => assert_eq!(port, u16::MAX),
            Err(error) => assert_eq!(error.start, u16::MAX),
        }
    }
}
