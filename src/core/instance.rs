// ─── Running Instance Gate ───
// `--launcher.openFile` hands files to an already running instance instead
// of starting a second one. Launchers racing for the same program serialize
// on a lock file; the holder reads or writes the instance record.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

const GATE_POLL: Duration = Duration::from_millis(250);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);
const STATE_DIR: &str = "jvm-bootstrap";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub official_name: String,
    pub program_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePaths {
    pub lock: PathBuf,
    pub record: PathBuf,
    /// One path per line, appended by launchers, drained by the program.
    pub queue: PathBuf,
}

impl InstancePaths {
    pub fn for_launcher(official_name: &str, program_dir: &Path) -> Self {
        let base = dirs::runtime_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(STATE_DIR);
        Self::in_dir(&base, official_name, program_dir)
    }

    pub fn in_dir(base: &Path, official_name: &str, program_dir: &Path) -> Self {
        let key = instance_key(official_name, program_dir);
        Self {
            lock: base.join(format!("{key}.lock")),
            record: base.join(format!("{key}.json")),
            queue: base.join(format!("{key}.open")),
        }
    }

    /// Recovers the sibling lock and record from a queue path handed to the program.
    pub fn from_queue(queue: &Path) -> Self {
        Self {
            lock: queue.with_extension("lock"),
            record: queue.with_extension("json"),
            queue: queue.to_path_buf(),
        }
    }
}

/// Stable per-program key: launchers of the same install share it.
pub fn instance_key(official_name: &str, program_dir: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(official_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(program_dir.to_string_lossy().as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenFileOutcome {
    /// A live instance will open the files; this launcher can exit.
    Forwarded { pid: u32 },
    /// This launcher is the instance; it passes the files on its own command line.
    Primary,
}

/// Held while deciding who owns the files. Released on drop.
#[derive(Debug)]
pub struct InstanceGate {
    _file: File,
    paths: InstancePaths,
}

impl InstanceGate {
    /// Polls for the lock until `timeout` elapses.
    pub async fn acquire(paths: &InstancePaths, timeout: Duration) -> LauncherResult<Self> {
        ensure_parent(&paths.lock)?;

        let deadline = tokio::time::Instant::now() + timeout;
        let mut attempts = 0_u32;
        loop {
            attempts += 1;
            if let Some(gate) = Self::try_acquire(paths)? {
                return Ok(gate);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(LauncherError::MutexTimeout(timeout.as_secs()));
            }
            if attempts % 20 == 0 {
                info!("Waiting for instance gate at {:?}", paths.lock);
            }
            tokio::time::sleep(GATE_POLL).await;
        }
    }

    /// Blocking variant for callers outside the runtime, such as JNI natives.
    pub fn acquire_blocking(paths: &InstancePaths, timeout: Duration) -> LauncherResult<Self> {
        ensure_parent(&paths.lock)?;

        let deadline = std::time::Instant::now() + timeout;
        loop {
            if let Some(gate) = Self::try_acquire(paths)? {
                return Ok(gate);
            }
            if std::time::Instant::now() >= deadline {
                return Err(LauncherError::MutexTimeout(timeout.as_secs()));
            }
            std::thread::sleep(GATE_POLL);
        }
    }

    fn try_acquire(paths: &InstancePaths) -> LauncherResult<Option<Self>> {
        Ok(try_lock(&paths.lock)?.map(|file| {
            debug!("Acquired instance gate {:?}", paths.lock);
            Self {
                _file: file,
                paths: paths.clone(),
            }
        }))
    }

    /// Forwards `files` to a live instance, or records this process as the
    /// instance. The primary keeps its own files.
    pub fn forward_or_register(&self, official_name: &str, program_dir: &Path, files: &[String]) -> LauncherResult<OpenFileOutcome> {
        let own_pid = std::process::id();
        if let Some(record) = read_record(&self.paths.record) {
            if record.pid != own_pid && is_process_alive(record.pid) {
                append_queue(&self.paths.queue, files)?;
                info!("Forwarded {} file(s) to running instance {}", files.len(), record.pid);
                return Ok(OpenFileOutcome::Forwarded { pid: record.pid });
            }
            debug!("Ignoring stale instance record for pid {}", record.pid);
        }

        let record = InstanceRecord {
            pid: own_pid,
            started_at: Utc::now(),
            official_name: official_name.to_string(),
            program_dir: program_dir.to_path_buf(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        std::fs::write(&self.paths.record, json).map_err(|source| LauncherError::Io {
            path: self.paths.record.clone(),
            source,
        })?;
        Ok(OpenFileOutcome::Primary)
    }
}

fn ensure_parent(path: &Path) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| LauncherError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(not(unix))]
impl Drop for InstanceGate {
    fn drop(&mut self) {
        if let Err(source) = std::fs::remove_file(&self.paths.lock) {
            warn!("Failed to remove lock {:?}: {}", self.paths.lock, source);
        }
    }
}

/// flock on Unix; the kernel drops it if the process dies.
#[cfg(unix)]
fn try_lock(path: &Path) -> LauncherResult<Option<File>> {
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let result = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    Ok((result == 0).then_some(file))
}

/// Exclusive creation elsewhere; a lock left by a dead process is removed.
#[cfg(not(unix))]
fn try_lock(path: &Path) -> LauncherResult<Option<File>> {
    match OpenOptions::new().create_new(true).write(true).open(path) {
        Ok(mut file) => {
            let _ = write!(file, "{}", std::process::id());
            Ok(Some(file))
        }
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
            let holder = std::fs::read_to_string(path)
                .ok()
                .and_then(|pid| pid.trim().parse::<u32>().ok());
            if holder.is_some_and(|pid| !is_process_alive(pid)) {
                let _ = std::fs::remove_file(path);
            }
            Ok(None)
        }
        Err(source) => Err(LauncherError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn read_record(path: &Path) -> Option<InstanceRecord> {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
}

/// Removes the record if it still names this process.
pub fn clear_record(paths: &InstancePaths) {
    if read_record(&paths.record).is_some_and(|record| record.pid == std::process::id()) {
        if let Err(err) = std::fs::remove_file(&paths.record) {
            warn!("Failed to remove instance record {:?}: {}", paths.record, err);
        }
    }
}

fn append_queue(path: &Path, files: &[String]) -> LauncherResult<()> {
    if files.is_empty() {
        return Ok(());
    }
    let mut queue = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    for file in files {
        writeln!(queue, "{file}")?;
    }
    Ok(())
}

/// Takes every forwarded file queued so far and empties the queue.
pub fn drain_queue(queue: &Path) -> LauncherResult<Vec<String>> {
    let paths = InstancePaths::from_queue(queue);
    let _gate = InstanceGate::acquire_blocking(&paths, DRAIN_TIMEOUT)?;

    let contents = match std::fs::read_to_string(queue) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LauncherError::Io {
                path: queue.to_path_buf(),
                source,
            })
        }
    };
    std::fs::write(queue, "").map_err(|source| LauncherError::Io {
        path: queue.to_path_buf(),
        source,
    })?;

    let files: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    debug!("Drained {} forwarded file(s) from {:?}", files.len(), queue);
    Ok(files)
}

/// Zombies count as gone: they will never drain the queue.
pub fn is_process_alive(pid: u32) -> bool {
    let mut system = sysinfo::System::new_all();
    system.refresh_all();
    system
        .process(sysinfo::Pid::from_u32(pid))
        .is_some_and(|process| process.status() != sysinfo::ProcessStatus::Zombie)
}
