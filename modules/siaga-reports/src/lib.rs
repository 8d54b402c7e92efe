//! Report core: proximity feed resolution, cursor feeds, vote tallying, and
//! report submission over the document store.

pub mod reader;
pub mod votes;
pub mod writer;

pub use reader::{FeedReader, ReportHit};
pub use votes::{resolve_toggle, VoteEngine};
pub use writer::{NewReport, ReportWriter};
