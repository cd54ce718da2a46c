//! Channel configuration.

use crate::error::{ChannelError, ChannelResult};
use std::time::Duration;

/// Default capacity of each of the two buffers (1 MiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Configuration for creating a log channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Capacity of each buffer in bytes. A record plus its newline must fit.
    pub buffer_capacity: usize,

    /// How long a swap waits for the in-flight write (`None` = forever).
    /// Close always waits until the final write completes.
    pub write_timeout: Option<Duration>,

    /// Whether to sync the file after the final flush on close.
    pub sync_on_close: bool,

    /// Whether to create missing parent directories of the log file.
    pub create_parent_dirs: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            write_timeout: None,
            sync_on_close: true,
            create_parent_dirs: false,
        }
    }
}

impl ChannelConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity of each buffer.
    #[must_use]
    pub const fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Bounds the wait for an in-flight write.
    #[must_use]
    pub const fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    /// Sets whether to sync the file on close.
    #[must_use]
    pub const fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Sets whether to create missing parent directories.
    #[must_use]
    pub const fn create_parent_dirs(mut self, value: bool) -> Self {
        self.create_parent_dirs = value;
        self
    }

    /// Checks that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidConfig`] if the buffer capacity is zero.
    pub fn validate(&self) -> ChannelResult<()> {
        if self.buffer_capacity == 0 {
            return Err(ChannelError::InvalidConfig(
                "buffer capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChannelConfig::default();
        assert_eq!(config.buffer_capacity, DEFAULT_BUFFER_CAPACITY);
        assert!(config.write_timeout.is_none());
        assert!(config.sync_on_close);
        assert!(!config.create_parent_dirs);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_pattern() {
        let config = ChannelConfig::new()
            .buffer_capacity(16)
            .write_timeout(Duration::from_millis(50))
            .sync_on_close(false)
            .create_parent_dirs(true);

        assert_eq!(config.buffer_capacity, 16);
        assert_eq!(config.write_timeout, Some(Duration::from_millis(50)));
        assert!(!config.sync_on_close);
        assert!(config.create_parent_dirs);
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let config = ChannelConfig::new().buffer_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(ChannelError::InvalidConfig(_))
        ));
    }
}
