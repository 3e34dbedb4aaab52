mod answer;
mod ids;
mod performance;
mod question;
mod session;
mod user;

pub use ids::{ParseIdError, QuestionId, SessionId, TopicError, TopicId, UserId};

pub use answer::{AnswerRecord, AnswerSubmission, Verdict};
pub use performance::{
    CategoryErrors, DailyPerformance, PerformanceReport, ReportRange, percentage,
};
pub use question::{Question, QuestionError, Selection, option_index, option_letter};
pub use session::{SessionSummary, SessionSummaryError};
pub use user::{
    MIN_PASSWORD_LEN, RegistrationDraft, RegistrationError, User, ValidatedRegistration,
};
