mod coordinator;
mod gate;
mod state;

pub use coordinator::{SessionCoordinator, TokenRefresher};
pub use state::{AuthStatus, SessionSnapshot, TokenPair, UserInfo};
