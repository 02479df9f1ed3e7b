//! Shared handler dependencies, built once in `main` (or per test server).

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use sprintspace_auth::Hs256JwtCodec;
use sprintspace_infra::CatalogStore;

use crate::config::AppConfig;

/// Source of "now" for handlers.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Fixed(at) => *at,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub struct AppServices {
    pub store: Arc<dyn CatalogStore>,
    pub tokens: Arc<Hs256JwtCodec>,
    pub config: AppConfig,
    pub clock: Clock,
}

impl AppServices {
    pub fn new(config: AppConfig, store: Arc<dyn CatalogStore>) -> Self {
        let tokens = Arc::new(Hs256JwtCodec::new(config.jwt_secret.as_bytes(), config.token_ttl));
        Self {
            store,
            tokens,
            config,
            clock: Clock::System,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}
