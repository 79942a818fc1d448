use std::sync::Arc;

use crate::config::AppConfig;
use crate::learn::{EventQueue, LearnEngine};

pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<LearnEngine>,
    pub events: EventQueue,
}

impl AppState {
    pub fn new(config: AppConfig, engine: Arc<LearnEngine>, events: EventQueue) -> Self {
        Self {
            config,
            engine,
            events,
        }
    }
}

impl Clone for AppState {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            engine: Arc::clone(&self.engine),
            events: self.events.clone(),
        }
    }
}
