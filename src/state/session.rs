mod core;
mod reducer;
mod state;


pub use self::core::Session;
pub use reducer::SessionReducer;
pub use state::{CancelReason, SendOutcome, SendTicket, SessionError, SessionState, SessionUpdate};
