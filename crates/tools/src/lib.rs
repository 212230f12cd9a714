//! Tool routing and local capability adapters for Ticketsmith.
//!
//! [`ToolRouter`] is the name→capability table the ReAct loop works from.
//! The [`journal`] adapters implement the version-control and tracker ports
//! in process and record every call; [`FilesystemDocs`] serves
//! documentation from Markdown files.

pub mod args;
pub mod docs;
pub mod journal;
pub mod router;

pub use docs::FilesystemDocs;
pub use journal::{Journal, JournalEntry, JournalTracker, JournalVcs};
pub use router::ToolRouter;
