mod logger;
pub use logger::*;

mod journal;
pub use journal::DrainJournal;
