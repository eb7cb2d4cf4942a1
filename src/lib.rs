//! cowfs: copy-on-write write-materialization engine for union filesystems.
//!
//! Lets a file that physically exists only in a read-only lower branch be
//! written through a writable upper branch without immediately duplicating
//! the whole file: writes materialize byte ranges in a sparse upper file,
//! an extent map tracks which ranges are authoritative, and reads stitch
//! upper extents, lower bytes, and zero-filled holes back together. A
//! configurable policy falls back to one full copy-up once enough of the
//! file would be touched anyway.
//!
//! Directory merging, branch selection, whiteouts, and the kernel
//! transport are the surrounding filesystem's business; this crate is the
//! per-file engine underneath them.

pub mod branch;
pub mod error;
pub mod extent;
pub mod file;
pub mod policy;
pub mod session;

pub use branch::{LowerBranch, UpperBranch};
pub use error::{CowError, Result};
pub use extent::{Extent, ExtentMap};
pub use file::{CowFile, UpperFileState};
pub use policy::{CowConfig, CowDecision};
pub use session::{FileSession, SessionRegistry, SessionStat};
