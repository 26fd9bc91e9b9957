use crate::error::{DeployError, Result};
use crate::models::Registry;

/// Pick the next free port after the registry's cursor, wrapping around the
/// pool. The port is only reserved once the deployment commits it.
pub fn allocate(registry: &Registry) -> Result<u16> {
    let pool_size = registry.port_pool_size;
    let used = registry.used_ports();
    if used.len() >= usize::from(pool_size) {
        return Err(DeployError::PoolExhausted { pool_size });
    }

    let start = u32::from(registry.port_range_start);
    let end = registry.port_range_end();
    let mut candidate = u32::from(registry.last_allocated_port) + 1;

    // With |used| < pool_size a free slot exists, so one lap of the ring is enough.
    for _ in 0..pool_size {
        if candidate > end || candidate < start {
            candidate = start;
        }
        let port = u16::try_from(candidate).map_err(|_| DeployError::PoolExhausted { pool_size })?;
        if !used.contains(&port) {
            return Ok(port);
        }
        candidate += 1;
    }

    Err(DeployError::PoolExhausted { pool_size })
}
