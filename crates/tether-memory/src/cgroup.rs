use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const UNLIMITED_THRESHOLD_BYTES: u64 = 1 << 60; // 1 EiB; above this is treated as "unlimited".

const PROC_SELF_CGROUP: &str = "/proc/self/cgroup";
const CGROUP_ROOT: &str = "/sys/fs/cgroup";

/// Which cgroup hierarchy accounts for this process's memory, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CgroupMemory {
    /// Unified hierarchy; files live directly under the mount.
    V2 { mount: PathBuf, path: String },
    /// Legacy hierarchy; the memory controller has its own mount.
    V1 { mount: PathBuf, path: String },
}

impl CgroupMemory {
    /// Probes `/proc/self/cgroup`. `None` when the process is not in a memory cgroup or `/proc`
    /// is unavailable.
    pub fn discover() -> Option<Self> {
        let contents = match std::fs::read_to_string(PROC_SELF_CGROUP) {
            Ok(contents) => contents,
            Err(err) => {
                if err.kind() != io::ErrorKind::NotFound {
                    tracing::debug!(
                        target = "tether.memory",
                        error = %err,
                        "failed to read /proc/self/cgroup"
                    );
                }
                return None;
            }
        };
        Self::from_proc_contents(&contents, Path::new(CGROUP_ROOT))
    }

    /// Pure variant of [`CgroupMemory::discover`] over given `/proc/self/cgroup` contents and a
    /// cgroup filesystem root. v2 wins when both hierarchies are listed.
    pub fn from_proc_contents(contents: &str, root: &Path) -> Option<Self> {
        let mut v1 = None;
        for line in contents.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let mut fields = line.splitn(3, ':');
            let (Some(hierarchy), Some(controllers), Some(path)) =
                (fields.next(), fields.next(), fields.next())
            else {
                continue;
            };
            let path = path.trim();
            if path.is_empty() {
                continue;
            }

            if hierarchy == "0" && controllers.is_empty() {
                return Some(Self::V2 {
                    mount: root.to_path_buf(),
                    path: path.to_string(),
                });
            }
            if v1.is_none() && controllers.split(',').any(|name| name.trim() == "memory") {
                v1 = Some(Self::V1 {
                    mount: root.join("memory"),
                    path: path.to_string(),
                });
            }
        }
        v1
    }

    fn mount(&self) -> &Path {
        match self {
            Self::V2 { mount, .. } | Self::V1 { mount, .. } => mount,
        }
    }

    fn dir(&self) -> PathBuf {
        match self {
            Self::V2 { mount, path } | Self::V1 { mount, path } => {
                mount.join(path.trim_start_matches('/'))
            }
        }
    }

    fn limit_file(&self) -> &'static str {
        match self {
            Self::V2 { .. } => "memory.max",
            Self::V1 { .. } => "memory.limit_in_bytes",
        }
    }

    fn usage_file(&self) -> &'static str {
        match self {
            Self::V2 { .. } => "memory.current",
            Self::V1 { .. } => "memory.usage_in_bytes",
        }
    }

    /// The tightest limit set on this cgroup or any ancestor below the mount.
    pub fn limit_bytes(&self) -> Option<u64> {
        let mount = self.mount();
        let mut dir = self.dir();
        let mut tightest: Option<u64> = None;
        loop {
            let limit = read_trimmed(&dir.join(self.limit_file()))
                .and_then(|raw| parse_limit_bytes(&raw));
            if let Some(limit) = limit {
                tightest = Some(tightest.map_or(limit, |current| current.min(limit)));
            }
            if dir.as_path() == mount || !dir.pop() {
                break;
            }
        }
        tightest
    }

    pub fn usage_bytes(&self) -> Option<u64> {
        let path = self.dir().join(self.usage_file());
        let raw = read_trimmed(&path)?;
        match raw.parse::<u64>() {
            Ok(value) => Some(value),
            Err(err) => {
                static REPORTED: OnceLock<()> = OnceLock::new();
                if REPORTED.set(()).is_ok() {
                    tracing::debug!(
                        target = "tether.memory",
                        path = %path.display(),
                        raw,
                        error = %err,
                        "failed to parse cgroup memory usage"
                    );
                }
                None
            }
        }
    }
}

/// Parses `memory.max` / `memory.limit_in_bytes`. `None` means unlimited or unreadable.
pub fn parse_limit_bytes(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "max" {
        return None;
    }
    match raw.parse::<u64>() {
        Ok(value) if value >= UNLIMITED_THRESHOLD_BYTES => None,
        Ok(value) => Some(value),
        Err(err) => {
            static REPORTED: OnceLock<()> = OnceLock::new();
            if REPORTED.set(()).is_ok() {
                tracing::debug!(
                    target = "tether.memory",
                    raw,
                    error = %err,
                    "failed to parse cgroup memory limit"
                );
            }
            None
        }
    }
}

fn read_trimmed(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text.trim().to_string()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => {
            // Sandboxes commonly restrict cgroup files; report only the first failure.
            static REPORTED: OnceLock<()> = OnceLock::new();
            if REPORTED.set(()).is_ok() {
                tracing::debug!(
                    target = "tether.memory",
                    path = %path.display(),
                    error = %err,
                    "failed to read cgroup file"
                );
            }
            None
        }
    }
}
