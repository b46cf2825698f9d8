pub mod loaders;
pub mod question;
pub mod rotation;

pub use loaders::{load_corpus_file, parse_corpus};
pub use question::{Corpus, PostEvent, PostStatus, Question};
pub use rotation::{PendingReply, RotationState};
