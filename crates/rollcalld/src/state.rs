use crate::engine::EngineHandle;
use crate::session::{Credentials, SessionStore};
use rollcall_core::EuclideanMatcher;
use rollcall_store::DocumentStore;
use std::sync::Arc;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub engine: EngineHandle,
    pub sessions: Arc<SessionStore>,
    pub credentials: Arc<Credentials>,
    pub matcher: EuclideanMatcher,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        engine: EngineHandle,
        sessions: SessionStore,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            engine,
            sessions: Arc::new(sessions),
            credentials: Arc::new(credentials),
            matcher: EuclideanMatcher::default(),
        }
    }
}
