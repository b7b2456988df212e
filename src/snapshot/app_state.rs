//! Application state capability handed to the serializer

use serde_json::{Map, Value};

/// Source of the opaque application state stored alongside workspace files.
///
/// The engine stores the returned value verbatim and never looks inside it.
pub trait AppStateProvider: Send + Sync {
    fn app_state(&self) -> Value;
}

/// Provider for hosts that have no application state; yields `{}`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAppState;

impl AppStateProvider for NoAppState {
    fn app_state(&self) -> Value {
        Value::Object(Map::new())
    }
}

/// Provider returning a fixed JSON value captured up front
#[derive(Debug, Clone)]
pub struct JsonAppState(pub Value);

impl AppStateProvider for JsonAppState {
    fn app_state(&self) -> Value {
        self.0.clone()
    }
}

impl<F> AppStateProvider for F
where
    F: Fn() -> Value + Send + Sync,
{
    fn app_state(&self) -> Value {
        self()
    }
}
