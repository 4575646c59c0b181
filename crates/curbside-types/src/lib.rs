//! Shared types for the Curbside portal core.

pub mod clock;
pub mod config;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock, duration_ms};
pub use config::{
    CacheConfigProvider, ConfigProvider, HasCacheConfig, HasSessionConfig,
    SessionConfigProvider, defaults as config_defaults,
};
