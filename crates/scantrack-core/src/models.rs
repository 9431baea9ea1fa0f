mod manga;
mod session;

pub use manga::{Chapter, MangaDraft, MangaPatch, MangaRecord, NewManga, ReadingStatus};
pub use session::{Session, SessionEvent};
