pub mod correlation;
pub mod poll_publisher;
pub mod question_selector;
pub mod question_source;
pub mod rotation_store;

pub use poll_publisher::{PollPublisher, TwitterPublisher};
pub use question_selector::QuestionSelector;
pub use question_source::{
    source_for, FileQuestionSource, HttpQuestionSource, QuestionSource, StaticQuestionSource,
};
pub use rotation_store::{JsonRotationStore, RotationStore};
