pub mod actor;
pub mod auth;
pub mod dao;
pub mod inbox;
pub mod lifecycle;
pub mod memory;
pub mod push;
pub mod realtime;
pub mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod tokens;

pub use actor::Actor;
pub use auth::{AccountService, AuthService};
pub use dao::*;
pub use inbox::NotificationInbox;
pub use lifecycle::LeadOrchestrator;
pub use push::{FcmGateway, PushGateway, PushQueue};
pub use realtime::Broadcaster;
pub use tokens::TokenRegistry;
