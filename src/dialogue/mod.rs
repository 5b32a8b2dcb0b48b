//! 对话层：状态机、会话状态、固定应答

pub mod machine;
pub mod responses;
pub mod state;

pub use machine::DialogueStateMachine;
pub use state::{DialogueState, PendingModificationStatus, PolicyConfirmationStatus};
