use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

pub const DEFAULT_START_PORT: u16 = 8000;
pub const DEFAULT_CURRENT_PORT: u16 = 8001;
pub const DEFAULT_MAX_PORTS: u16 = 10;

/// The running instance currently assigned to a service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstanceRecord {
    #[serde(rename = "id")]
    pub instance_id: String,
    pub port: u16,
}

/// Durable assignment table plus the port pool it allocates from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Registry {
    #[serde(rename = "start_port")]
    pub port_range_start: u16,
    #[serde(rename = "current_port")]
    pub last_allocated_port: u16,
    #[serde(rename = "max_ports")]
    pub port_pool_size: u16,
    #[serde(rename = "containers", default)]
    pub services: BTreeMap<String, InstanceRecord>,
}

impl Registry {
    pub fn new(port_range_start: u16, port_pool_size: u16) -> Self {
        Self {
            port_range_start,
            last_allocated_port: port_range_start,
            port_pool_size,
            services: BTreeMap::new(),
        }
    }

    /// Last port of the pool, inclusive. Widened so an oversized pool can be
    /// detected instead of wrapping.
    pub fn port_range_end(&self) -> u32 {
        u32::from(self.port_range_start) + u32::from(self.port_pool_size).saturating_sub(1)
    }

    pub fn in_pool(&self, port: u16) -> bool {
        port >= self.port_range_start && u32::from(port) <= self.port_range_end()
    }

    pub fn used_ports(&self) -> HashSet<u16> {
        self.services.values().map(|r| r.port).collect()
    }

    /// Replace the record for `service` and advance the allocation cursor.
    /// Returns the record that was replaced, if any.
    pub fn commit(&mut self, service: &str, record: InstanceRecord) -> Option<InstanceRecord> {
        self.last_allocated_port = record.port;
        self.services.insert(service.to_string(), record)
    }

    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        if self.port_pool_size == 0 {
            return Err("max_ports must be at least 1".into());
        }
        if self.port_range_end() > u32::from(u16::MAX) {
            return Err(format!(
                "pool {}+{} extends past port {}",
                self.port_range_start,
                self.port_pool_size,
                u16::MAX
            ));
        }
        if self.services.len() > usize::from(self.port_pool_size) {
            return Err(format!(
                "{} services recorded but the pool only holds {}",
                self.services.len(),
                self.port_pool_size
            ));
        }
        let mut seen = HashSet::new();
        for (name, record) in &self.services {
            if !self.in_pool(record.port) {
                return Err(format!(
                    "service '{name}' has port {} outside {}..={}",
                    record.port,
                    self.port_range_start,
                    self.port_range_end()
                ));
            }
            if !seen.insert(record.port) {
                return Err(format!(
                    "port {} is assigned to more than one service",
                    record.port
                ));
            }
        }
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            port_range_start: DEFAULT_START_PORT,
            last_allocated_port: DEFAULT_CURRENT_PORT,
            port_pool_size: DEFAULT_MAX_PORTS,
            services: BTreeMap::new(),
        }
    }
}
