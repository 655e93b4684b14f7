//! WagerWave Common Types
//!
//! Record shapes shared by the session store and any surface that renders it.

pub mod protocol;
pub mod session;
pub mod user;

pub use protocol::{AuthenticateParams, RegisterParams, RpcErrorBody};
pub use session::{Session, SessionPointer};
pub use user::{CanonicalUser, Role, Status, UserRecord};
