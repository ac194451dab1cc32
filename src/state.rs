mod conversation;
mod session;

pub use conversation::{ActionStatus, Conversation, Message, MessageBody, MessageId, Role};
pub use session::{
    CancelReason, SendOutcome, SendTicket, Session, SessionError, SessionReducer, SessionState,
    SessionUpdate,
};
