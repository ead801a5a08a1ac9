//! Application core: state reducer and the session that runs its effects.

pub mod session;
pub mod state;

pub use session::Session;
pub use state::{reduce, Action, AppState, Effect, Screen};
