//! Session configuration

use std::fmt;
use std::rc::Rc;

use crate::function::Implementation;
use crate::spy::{Recorder, SpyConstructor, SpyRef};
use crate::table::DEFAULT_SWEEP_THRESHOLD;

/// Environment variable overriding the sweep threshold in `Config::from_env`
pub const SWEEP_THRESHOLD_ENV: &str = "LAZYMOCK_SWEEP_THRESHOLD";

/// Configuration injected into a [`Session`](crate::Session)
#[derive(Clone)]
pub struct Config {
    /// Builds spies for `returns_spy`, `spy`, `call` and the spy passthroughs.
    /// Those operations fail until this is set.
    pub spy_constructor: Option<SpyConstructor>,
    /// Inserts between sweeps of the side tables (0 = only explicit sweeps)
    pub sweep_threshold: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            spy_constructor: None,
            sweep_threshold: DEFAULT_SWEEP_THRESHOLD,
        }
    }

    /// Default configuration with the sweep threshold taken from
    /// `LAZYMOCK_SWEEP_THRESHOLD` when it is set to a valid number
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Some(threshold) = std::env::var(SWEEP_THRESHOLD_ENV)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config.sweep_threshold = threshold;
        }
        config
    }

    pub fn with_spy_constructor(mut self, constructor: SpyConstructor) -> Self {
        self.spy_constructor = Some(constructor);
        self
    }

    pub fn with_spy<F>(self, constructor: F) -> Self
    where
        F: Fn(Implementation) -> SpyRef + 'static,
    {
        self.with_spy_constructor(Rc::new(constructor))
    }

    /// Use the built-in [`Recorder`] spy
    pub fn with_recorder(self) -> Self {
        self.with_spy_constructor(Recorder::constructor())
    }

    pub fn with_sweep_threshold(mut self, threshold: usize) -> Self {
        self.sweep_threshold = threshold;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("spy_constructor", &self.spy_constructor.is_some())
            .field("sweep_threshold", &self.sweep_threshold)
            .finish()
    }
}
