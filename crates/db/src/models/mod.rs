pub mod lead;
pub mod notification;
pub mod stage;
pub mod user;

pub use lead::*;
pub use notification::*;
pub use stage::*;
pub use user::*;
