use std::sync::Arc;

use crate::evaluation::Evaluator;
use crate::store::FlagStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FlagStore>,
    pub evaluator: Evaluator,
}

impl AppState {
    pub fn new(store: Arc<dyn FlagStore>) -> Self {
        Self {
            store,
            evaluator: Evaluator::new(),
        }
    }
}
