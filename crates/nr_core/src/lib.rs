pub mod callable;
pub mod error;
pub mod speech;
pub mod storage;
pub mod types;

pub use callable::{CallResult, CallableError, ErrorCode};
pub use error::{Error, Result};
pub use speech::SpeechSynthesizer;
pub use storage::{ArticleStorage, ProfileStorage};
pub use types::{
    Article, ArticleView, Caller, ContentUpdate, KeywordQuery, ProcessingStatus, ProfilePatch,
    RecentQuery, SpeechAudio, UserProfile,
};
