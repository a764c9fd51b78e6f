// src/launcher/ports.rs
use std::net::TcpListener;
use tracing::{debug, info};

use super::LaunchError;

/// How many consecutive ports are tried when the preferred one is taken.
pub const MAX_PORT_ATTEMPTS: u16 = 20;

/// First bindable port starting at `port`. With `strict` only `port` itself
/// is acceptable.
///
/// The probe socket is released before returning, so the port can in
/// principle be taken again before the caller binds it.
pub fn ensure_port_available(
    host: &str,
    port: u16,
    description: &str,
    strict: bool,
) -> Result<u16, LaunchError> {
    let attempts = if strict { 1 } else { MAX_PORT_ATTEMPTS };

    for offset in 0..attempts {
        let Some(candidate) = port.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, candidate)) {
            Ok(_) => {
                if offset != 0 {
                    info!(
                        "[{}] port {} is in use, switching to {}",
                        description, port, candidate
                    );
                }
                return Ok(candidate);
            }
            Err(e) if strict => {
                return Err(LaunchError::PortInUse {
                    description: description.to_string(),
                    port: candidate,
                    source: e,
                });
            }
            Err(e) => debug!(port = candidate, error = %e, "port unavailable"),
        }
    }

    Err(LaunchError::NoFreePort {
        description: description.to_string(),
        first: port,
        last: port.saturating_add(MAX_PORT_ATTEMPTS - 1),
    })
}
