//! POSIX shared memory and process access
//!
//! Named segments live as files in a shared memory directory (`/dev/shm` on
//! Linux, which is also where Wine exposes Windows file mappings created with
//! a name). Process information comes from `/proc`; on systems without it the
//! process table is simply empty.

pub(crate) mod process;
pub mod segment;

pub use segment::FileSegment;
