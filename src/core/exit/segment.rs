// ─── Shared Segment ───
// A bounded string shared between the launcher and the VM process it starts.
// The id is a short printable token passed as `-exitdata <id>`; any process
// holding it can attach. Only the creator destroys the segment.
//
// Unix uses SysV shared memory (the id is the shmid in hex). Elsewhere the
// segment is a file in the temp directory named by the id.

use std::io;

use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};

pub const SEGMENT_SIZE: usize = 16 * 1024;

/// Content of a segment nobody has written yet.
pub const UNINITIALIZED: &str = "JVM_BOOTSTRAP_UNINITIALIZED";

#[derive(Debug)]
pub struct SharedSegment {
    id: String,
    owner: bool,
    destroyed: bool,
}

impl SharedSegment {
    pub fn create(size: usize) -> LauncherResult<Self> {
        let id = backend::create(size.max(UNINITIALIZED.len() + 1)).map_err(segment_error)?;
        let segment = Self {
            id,
            owner: true,
            destroyed: false,
        };
        segment.write_raw(UNINITIALIZED)?;
        debug!("Created shared segment {}", segment.id);
        Ok(segment)
    }

    /// Attaches to a segment created by another process. Never destroys it.
    pub fn attach(id: &str) -> LauncherResult<Self> {
        backend::capacity(id).map_err(segment_error)?;
        Ok(Self {
            id: id.to_string(),
            owner: false,
            destroyed: false,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `None` clears the segment to an empty string.
    pub fn set(&self, data: Option<&str>) -> LauncherResult<()> {
        self.write_raw(data.unwrap_or(""))
    }

    /// `None` while the segment still holds the uninitialized sentinel.
    pub fn get(&self) -> LauncherResult<Option<String>> {
        let bytes = backend::read(&self.id).map_err(segment_error)?;
        let text = String::from_utf8_lossy(&bytes).to_string();
        Ok((text != UNINITIALIZED).then_some(text))
    }

    /// Puts the sentinel back, so the next generation starts unwritten.
    pub fn reset(&self) -> LauncherResult<()> {
        self.write_raw(UNINITIALIZED)
    }

    pub fn destroy(mut self) -> LauncherResult<()> {
        self.destroy_inner()
    }

    fn destroy_inner(&mut self) -> LauncherResult<()> {
        if !self.owner || self.destroyed {
            return Ok(());
        }
        self.destroyed = true;
        debug!("Destroying shared segment {}", self.id);
        backend::destroy(&self.id).map_err(segment_error)
    }

    fn write_raw(&self, data: &str) -> LauncherResult<()> {
        let capacity = backend::capacity(&self.id).map_err(segment_error)?;
        let data = truncate_to_capacity(data, capacity);
        backend::write(&self.id, data.as_bytes()).map_err(segment_error)
    }
}

impl Drop for SharedSegment {
    fn drop(&mut self) {
        if let Err(err) = self.destroy_inner() {
            warn!("Failed to destroy shared segment {}: {}", self.id, err);
        }
    }
}

fn segment_error(err: io::Error) -> LauncherError {
    LauncherError::SharedSegment(err.to_string())
}

/// Longest prefix that fits with its terminator, cut on a char boundary.
pub fn truncate_to_capacity(data: &str, capacity: usize) -> &str {
    let limit = capacity.saturating_sub(1);
    if data.len() <= limit {
        return data;
    }
    let mut end = limit;
    while !data.is_char_boundary(end) {
        end -= 1;
    }
    &data[..end]
}

#[cfg(unix)]
mod backend {
    use std::io;

    struct Attached {
        ptr: *mut u8,
        size: usize,
    }

    impl Drop for Attached {
        fn drop(&mut self) {
            unsafe {
                libc::shmdt(self.ptr as *const libc::c_void);
            }
        }
    }

    fn shmid(id: &str) -> io::Result<libc::c_int> {
        libc::c_int::from_str_radix(id, 16)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, format!("invalid segment id {id:?}")))
    }

    fn segment_size(shmid: libc::c_int) -> io::Result<usize> {
        let mut ds: libc::shmid_ds = unsafe { std::mem::zeroed() };
        if unsafe { libc::shmctl(shmid, libc::IPC_STAT, &mut ds) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(ds.shm_segsz as usize)
    }

    fn attach(id: &str) -> io::Result<Attached> {
        let shmid = shmid(id)?;
        let size = segment_size(shmid)?;
        let ptr = unsafe { libc::shmat(shmid, std::ptr::null(), 0) };
        if ptr as isize == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Attached {
            ptr: ptr.cast(),
            size,
        })
    }

    pub fn create(size: usize) -> io::Result<String> {
        let shmid = unsafe { libc::shmget(libc::IPC_PRIVATE, size, libc::IPC_CREAT | 0o600) };
        if shmid == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(format!("{shmid:x}"))
    }

    pub fn capacity(id: &str) -> io::Result<usize> {
        segment_size(shmid(id)?)
    }

    pub fn write(id: &str, bytes: &[u8]) -> io::Result<()> {
        let segment = attach(id)?;
        let len = bytes.len().min(segment.size.saturating_sub(1));
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), segment.ptr, len);
            *segment.ptr.add(len) = 0;
        }
        Ok(())
    }

    pub fn read(id: &str) -> io::Result<Vec<u8>> {
        let segment = attach(id)?;
        let memory = unsafe { std::slice::from_raw_parts(segment.ptr, segment.size) };
        let end = memory.iter().position(|&b| b == 0).unwrap_or(memory.len());
        Ok(memory[..end].to_vec())
    }

    pub fn destroy(id: &str) -> io::Result<()> {
        if unsafe { libc::shmctl(shmid(id)?, libc::IPC_RMID, std::ptr::null_mut()) } == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(not(unix))]
mod backend {
    use std::io;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::SEGMENT_SIZE;

    static NEXT: AtomicUsize = AtomicUsize::new(0);

    fn path(id: &str) -> io::Result<PathBuf> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid segment id {id:?}"),
            ));
        }
        Ok(std::env::temp_dir().join(format!("{id}.exitdata")))
    }

    pub fn create(_size: usize) -> io::Result<String> {
        let id = format!(
            "jvmbootstrap-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        );
        std::fs::write(path(&id)?, b"")?;
        Ok(id)
    }

    pub fn capacity(id: &str) -> io::Result<usize> {
        std::fs::metadata(path(id)?)?;
        Ok(SEGMENT_SIZE)
    }

    pub fn write(id: &str, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(path(id)?, bytes)
    }

    pub fn read(id: &str) -> io::Result<Vec<u8>> {
        std::fs::read(path(id)?)
    }

    pub fn destroy(id: &str) -> io::Result<()> {
        std::fs::remove_file(path(id)?)
    }
}
