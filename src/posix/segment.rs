//! File-backed named segments mapped with memmap2

use crate::region::Segment;
use crate::{PodError, Result};
use memmap2::Mmap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::trace;

/// A read-only mapping of `<shm_dir>/<name>`.
#[derive(Debug)]
pub struct FileSegment {
    name: String,
    map: Option<Mmap>,
}

impl FileSegment {
    /// Map the segment, or `Ok(None)` if the backing file does not exist.
    pub fn open(shm_dir: &Path, name: &str) -> Result<Option<Self>> {
        let path = shm_dir.join(name);
        trace!(path = %path.display(), "Opening shared memory file");

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PodError::shared_memory_with_source(name, Box::new(e))),
        };

        // SAFETY: the mapping is read-only. The writer may change the bytes
        // underneath us, which readers treat as torn telemetry, never as layout.
        let map = unsafe { Mmap::map(&file) }
            .map_err(|e| PodError::shared_memory_with_source(name, Box::new(e)))?;

        Ok(Some(Self { name: name.to_string(), map: Some(map) }))
    }
}

impl Segment for FileSegment {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }

    fn release(&mut self) -> Result<()> {
        // munmap happens on drop and cannot be refused while borrows exist,
        // since Region hands out views tied to its own lifetime.
        self.map.take();
        Ok(())
    }
}
