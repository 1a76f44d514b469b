use leadflow_config::Settings;
use leadflow_services::{
    AccountService, AuthService, LeadOrchestrator, NotificationInbox, PushGateway, PushQueue,
    TokenRegistry,
    dao::{LeadDao, NotificationDao, UserDao},
    lifecycle::NotificationDispatcher,
    memory::{MemoryLeadStore, MemoryNotificationStore, MemoryUserStore},
    store::{LeadStore, NotificationStore, UserStore},
};
use mongodb::Database;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::ws::{dispatcher::WsBroadcaster, storage::WsStorage};

/// The persistence backends the services run against.
#[derive(Clone)]
pub struct Backends {
    pub leads: Arc<dyn LeadStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub users: Arc<dyn UserStore>,
}

impl Backends {
    pub fn mongo(db: &Database) -> Self {
        Self {
            leads: Arc::new(LeadDao::new(db)),
            notifications: Arc::new(NotificationDao::new(db)),
            users: Arc::new(UserDao::new(db)),
        }
    }

    pub fn memory() -> Self {
        Self {
            leads: Arc::new(MemoryLeadStore::new()),
            notifications: Arc::new(MemoryNotificationStore::new()),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub auth: Arc<AuthService>,
    pub accounts: Arc<AccountService>,
    pub users: Arc<dyn UserStore>,
    pub leads: Arc<LeadOrchestrator>,
    pub inbox: Arc<NotificationInbox>,
    pub tokens: Arc<TokenRegistry>,
    pub ws_storage: Arc<WsStorage>,
    pub push: Option<Arc<PushQueue>>,
}

impl AppState {
    /// Must run inside a Tokio runtime: the push worker is spawned here.
    /// Without a gateway, push delivery is skipped.
    pub fn new(
        settings: Settings,
        backends: Backends,
        gateway: Option<Arc<dyn PushGateway>>,
    ) -> Self {
        let auth = Arc::new(AuthService::new(settings.jwt.clone()));
        let accounts = Arc::new(AccountService::new(auth.clone(), backends.users.clone()));
        let tokens = Arc::new(TokenRegistry::new(backends.users.clone()));
        let ws_storage = Arc::new(WsStorage::new());

        let push = gateway.map(|gateway| {
            info!(capacity = settings.push.queue_capacity, "Starting push queue");
            Arc::new(PushQueue::start(
                gateway,
                tokens.clone(),
                settings.push.queue_capacity,
                Duration::from_secs(settings.push.timeout_secs),
            ))
        });

        let dispatcher = NotificationDispatcher::new(
            backends.notifications.clone(),
            backends.users.clone(),
            Arc::new(WsBroadcaster::new(ws_storage.clone())),
            push.clone(),
            settings.push.click_action.clone(),
        );
        let leads = Arc::new(LeadOrchestrator::new(
            backends.leads.clone(),
            backends.users.clone(),
            backends.notifications.clone(),
            dispatcher,
        ));
        let inbox = Arc::new(NotificationInbox::new(
            backends.notifications.clone(),
            backends.leads.clone(),
        ));

        Self {
            settings,
            auth,
            accounts,
            users: backends.users,
            leads,
            inbox,
            tokens,
            ws_storage,
            push,
        }
    }

    /// Drains queued push jobs. Call once the server has stopped.
    pub async fn shutdown(&self) {
        if let Some(push) = &self.push {
            push.shutdown().await;
        }
    }
}
