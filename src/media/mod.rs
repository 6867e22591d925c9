//! Media analysis: tool output parsing, subtitle grouping and language detection.

pub mod language;
pub mod probe;
pub mod subtitle;

pub use language::{LanguagePolicy, SubtitleLanguage};
pub use probe::{Attachment, TrackDescriptor, TrackListing};
pub use subtitle::{SubtitleCandidate, SubtitleGroup, SubtitleSpec, VideoTarget};
