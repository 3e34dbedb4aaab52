mod controller;
mod progress;
mod recorder;
mod state;
mod summary;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{Advance, Current, SessionAnswer, SessionController};
pub use progress::{ElapsedTime, SessionProgress};
pub use recorder::AnswerRecorder;
pub use state::{QuestionPhase, SessionState};
pub use summary::SummaryBuilder;
pub use view::{SessionSummaryId, SessionSummaryListItem, SessionSummaryService};
