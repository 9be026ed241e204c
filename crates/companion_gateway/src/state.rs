use crate::push_registry::PushRegistry;
use crate::tenant::TenantDirectory;
use companion_budget::SharedStore;
use companion_dispatcher::Dispatcher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub tenants: Arc<dyn TenantDirectory>,
    pub push_registry: PushRegistry,
    pub store: SharedStore,
    pub heartbeat_seconds: u64,
}
