//! Voice session management
//!
//! A `SessionController` runs one push-to-talk session:
//! - Capture on press/release and upload to the voice backend
//! - Optional live avatar connection, started on the first gesture
//! - Presentation mode and status published as a `View`
//! - Conversation log shared with the host through `SessionHandle`

mod controller;
mod event;
mod handle;
mod id;
mod log;

pub use controller::SessionController;
pub use event::SessionEvent;
pub use handle::SessionHandle;
pub use id::SessionId;
pub use log::{ConversationLog, LogEntry, Speaker};
