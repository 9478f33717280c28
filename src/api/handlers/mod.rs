pub mod health;
pub mod settings;

use crate::events::EventSink;
use crate::store::SensorStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SensorStore>,
    pub events: EventSink,
}
