pub mod base;
pub mod lead;
pub mod notification;
pub mod user;

pub use base::BaseDao;
pub use lead::LeadDao;
pub use notification::NotificationDao;
pub use user::UserDao;
