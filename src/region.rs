//! Named shared memory regions and their typed views.
//!
//! A [`Region`] owns one mapped segment exclusively. Opening a segment that
//! does not exist is a normal outcome (the server is not running, or runs
//! without the plugin) and yields an absent region whose views are all
//! `None`. Closing is idempotent and tolerates the platform reporting that
//! views into the buffer are still alive.

use crate::layout::{RegionKind, SharedRecord};
use crate::{PodError, Result};
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// A mapped, read-only shared memory segment.
pub trait Segment {
    /// Mapping name the segment was opened with.
    fn name(&self) -> &str;

    /// The mapped bytes. Another process may be writing them concurrently.
    fn bytes(&self) -> &[u8];

    /// Unmap the segment. Called at most once by [`Region::close`].
    ///
    /// [`PodError::ViewsOutstanding`] signals the benign case where the
    /// platform refuses because views into the buffer are still referenced.
    fn release(&mut self) -> Result<()>;
}

/// Opens named segments.
pub trait SegmentProvider {
    /// Open `name` read-only. `Ok(None)` when no such segment exists.
    fn open(&self, name: &str) -> Result<Option<Box<dyn Segment>>>;
}

/// The operating system's named shared memory.
///
/// On Windows this opens file mappings by name. On POSIX systems the
/// segments are files under `shm_dir` (normally `/dev/shm`).
#[derive(Debug, Clone)]
pub struct SystemSegments {
    #[cfg_attr(windows, allow(dead_code))]
    shm_dir: PathBuf,
}

impl SystemSegments {
    pub fn new(shm_dir: impl Into<PathBuf>) -> Self {
        Self { shm_dir: shm_dir.into() }
    }
}

impl SegmentProvider for SystemSegments {
    fn open(&self, name: &str) -> Result<Option<Box<dyn Segment>>> {
        #[cfg(windows)]
        {
            Ok(crate::windows::segment::MappedView::open(name)?
                .map(|view| Box::new(view) as Box<dyn Segment>))
        }
        #[cfg(unix)]
        {
            Ok(crate::posix::segment::FileSegment::open(&self.shm_dir, name)?
                .map(|segment| Box::new(segment) as Box<dyn Segment>))
        }
        #[cfg(not(any(windows, unix)))]
        {
            let _ = name;
            Err(PodError::unsupported_platform("Shared memory", "Windows or Unix"))
        }
    }
}

/// Lifecycle of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// The segment did not exist when the region was opened.
    Absent,
    Open,
    Released,
}

/// One plugin region with a typed view of type `T`.
pub struct Region<T: SharedRecord> {
    kind: RegionKind,
    name: String,
    segment: Option<Box<dyn Segment>>,
    state: RegionState,
    _record: PhantomData<fn() -> T>,
}

impl<T: SharedRecord> Region<T> {
    /// Open the region. A missing segment gives an [`RegionState::Absent`] region.
    pub fn open(kind: RegionKind, name: impl Into<String>, provider: &dyn SegmentProvider) -> Result<Self> {
        let name = name.into();
        let segment = provider.open(&name)?;

        let state = match &segment {
            Some(segment) => {
                let len = segment.bytes().len();
                if len < std::mem::size_of::<T>() {
                    warn!(
                        region = %kind,
                        name = name.as_str(),
                        len,
                        expected = std::mem::size_of::<T>(),
                        "Shared memory segment smaller than record, views disabled"
                    );
                } else {
                    info!(region = %kind, name = name.as_str(), len, "Mapped shared memory region");
                }
                RegionState::Open
            }
            None => {
                debug!(region = %kind, name = name.as_str(), "Shared memory region not present");
                RegionState::Absent
            }
        };

        Ok(Self { kind, name, segment, state, _record: PhantomData })
    }

    /// A region that was never mapped.
    pub fn absent(kind: RegionKind, name: impl Into<String>) -> Self {
        Self { kind, name: name.into(), segment: None, state: RegionState::Absent, _record: PhantomData }
    }

    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RegionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == RegionState::Open
    }

    /// Raw mapped bytes while open.
    pub fn bytes(&self) -> Option<&[u8]> {
        self.segment.as_deref().map(|segment| segment.bytes())
    }

    /// Typed view, validated against the mapping on every call.
    ///
    /// `Ok(None)` when the region is absent or released.
    pub fn try_view(&self) -> Result<Option<&T>> {
        let Some(bytes) = self.bytes() else {
            return Ok(None);
        };

        let expected = std::mem::size_of::<T>();
        if bytes.len() < expected {
            return Err(PodError::layout_mismatch(&self.name, expected, bytes.len()));
        }
        if bytes.as_ptr().align_offset(std::mem::align_of::<T>()) != 0 {
            return Err(PodError::shared_memory(format!("{} (misaligned mapping)", self.name)));
        }

        // SAFETY: the mapping is at least size_of::<T>() bytes and aligned for T,
        // T: SharedRecord guarantees every bit pattern is valid, and the borrow
        // ties the view to &self so it cannot outlive close().
        Ok(Some(unsafe { &*(bytes.as_ptr() as *const T) }))
    }

    /// Typed view, `None` when absent, released or structurally incompatible.
    pub fn view(&self) -> Option<&T> {
        self.try_view().ok().flatten()
    }

    /// Release the mapping. Safe to call repeatedly.
    ///
    /// Outstanding-view failures are swallowed; other release failures are
    /// returned, but the region is considered released either way.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut segment) = self.segment.take() else {
            return Ok(());
        };
        self.state = RegionState::Released;

        match segment.release() {
            Ok(()) => {
                debug!(region = %self.kind, name = self.name.as_str(), "Released shared memory region");
                Ok(())
            }
            Err(e) if e.is_benign_release() => {
                debug!(region = %self.kind, name = self.name.as_str(), "Release skipped: views still exist");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl<T: SharedRecord> std::fmt::Debug for Region<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("len", &self.bytes().map(<[u8]>::len))
            .finish()
    }
}
