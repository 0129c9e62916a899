//! Session Module
//!
//! Session lifecycle: the persisted token triple, login, the single-flight
//! refresh and logout. The [`SessionManager`] is the only writer of the
//! [`TokenStore`].

mod manager;
mod model;
mod store;

pub use manager::{SessionEvent, SessionManager};
pub use model::{AdminRole, AdminUser, Session};
pub use store::{TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
