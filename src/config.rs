//! Configuration for Flowerpot
//!
//! Centralized configuration with sensible defaults.

use std::net::ToSocketAddrs;

use crate::error::{FlowerpotError, Result};

/// Port the firmware listens on
pub const DEFAULT_PORT: u16 = 2259;

/// Main configuration for a Flowerpot server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Socket read timeout (milliseconds, 0 = none)
    ///
    /// Applied to the TCP socket only. The dispatcher itself never times out.
    pub read_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Sleep between polls when there is no client or no pending input
    pub poll_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Device Configuration
    // -------------------------------------------------------------------------
    /// Water reservoir capacity (mL)
    pub reservoir_capacity_ml: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: format!("0.0.0.0:{}", DEFAULT_PORT),
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            poll_interval_ms: 10,
            reservoir_capacity_ml: 1000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the config describes a usable server
    pub fn validate(&self) -> Result<()> {
        // Host names resolve the same way `TcpListener::bind` resolves them
        let mut addrs = self.listen_addr.to_socket_addrs().map_err(|e| {
            FlowerpotError::Config(format!(
                "invalid listen address '{}': {}",
                self.listen_addr, e
            ))
        })?;
        if addrs.next().is_none() {
            return Err(FlowerpotError::Config(format!(
                "listen address '{}' resolved to nothing",
                self.listen_addr
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(FlowerpotError::Config(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the idle poll interval (in milliseconds)
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the water reservoir capacity (in mL)
    pub fn reservoir_capacity_ml(mut self, ml: u32) -> Self {
        self.config.reservoir_capacity_ml = ml;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
