//! Backend acquisition and host-environment seams.

use std::path::{Path, PathBuf};

use super::BackendHandle;

/// Failure to acquire an accelerated backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// No driver library was found on any search path.
    #[error("driver library {library} not found in {searched} search directories")]
    DriverNotFound {
        /// Primary library name that was looked for.
        library: String,
        /// Number of directories searched.
        searched: usize,
    },
    /// The platform has no supported driver.
    #[error("no supported accelerated backend for platform {platform}")]
    UnsupportedPlatform {
        /// Target OS name.
        platform: String,
    },
}

impl BackendError {
    /// Variant name, used as the failure kind in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DriverNotFound { .. } => "DriverNotFound",
            Self::UnsupportedPlatform { .. } => "UnsupportedPlatform",
        }
    }
}

/// Acquires a handle to an accelerated compute backend.
pub trait BackendLoader {
    /// Backend name for logs.
    fn backend_name(&self) -> &str;

    /// Try to acquire the backend.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the backend cannot be used.
    fn acquire(&self) -> Result<BackendHandle, BackendError>;
}

/// Read-only view of the host environment used to enrich diagnostics.
pub trait ProbeEnvironment {
    /// Locate an executable on the search path.
    fn find_executable(&self, name: &str) -> Option<PathBuf>;

    /// Read an environment variable.
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl ProbeEnvironment for SystemEnvironment {
    fn find_executable(&self, name: &str) -> Option<PathBuf> {
        let path = std::env::var_os("PATH")?;
        std::env::split_paths(&path).find_map(|dir| {
            executable_candidates(name)
                .into_iter()
                .map(|candidate| dir.join(candidate))
                .find(|candidate| candidate.is_file())
        })
    }

    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

fn executable_candidates(name: &str) -> Vec<String> {
    if cfg!(windows) {
        vec![format!("{name}.exe"), name.to_string()]
    } else {
        vec![name.to_string()]
    }
}

/// Locates the CUDA driver library.
#[derive(Debug, Clone)]
pub struct CudaDriverLoader {
    library_names: Vec<String>,
    search_dirs: Vec<PathBuf>,
}

impl CudaDriverLoader {
    /// Loader with explicit library names and search directories.
    #[must_use]
    pub fn new(library_names: Vec<String>, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            library_names,
            search_dirs,
        }
    }

    /// Loader searching `LD_LIBRARY_PATH`, the CUDA install roots and the
    /// standard system library directories.
    #[must_use]
    pub fn from_env() -> Self {
        let mut search_dirs = Vec::new();

        if let Some(paths) = std::env::var_os("LD_LIBRARY_PATH") {
            search_dirs.extend(std::env::split_paths(&paths));
        }
        for root in ["CUDA_PATH", "CUDA_HOME"] {
            if let Some(dir) = std::env::var_os(root) {
                let dir = PathBuf::from(dir);
                search_dirs.push(dir.join("lib64"));
                search_dirs.push(dir.join("lib64").join("stubs"));
                search_dirs.push(dir.join("bin"));
            }
        }
        search_dirs.extend(
            [
                "/usr/lib/x86_64-linux-gnu",
                "/usr/lib/aarch64-linux-gnu",
                "/usr/lib64",
                "/usr/lib",
                "/usr/local/cuda/lib64",
                "/usr/lib/wsl/lib",
                "C:\\Windows\\System32",
            ]
            .iter()
            .map(PathBuf::from),
        );

        Self::new(default_library_names(), search_dirs)
    }

    /// Directories that will be searched.
    #[must_use]
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    fn locate(&self) -> Option<PathBuf> {
        self.search_dirs.iter().find_map(|dir| {
            self.library_names
                .iter()
                .map(|name| Path::new(dir).join(name))
                .find(|candidate| candidate.is_file())
        })
    }
}

fn default_library_names() -> Vec<String> {
    if cfg!(windows) {
        vec!["nvcuda.dll".to_string()]
    } else if cfg!(target_os = "macos") {
        Vec::new()
    } else {
        vec!["libcuda.so.1".to_string(), "libcuda.so".to_string()]
    }
}

impl BackendLoader for CudaDriverLoader {
    fn backend_name(&self) -> &str {
        "cuda"
    }

    fn acquire(&self) -> Result<BackendHandle, BackendError> {
        let Some(library) = self.library_names.first() else {
            return Err(BackendError::UnsupportedPlatform {
                platform: std::env::consts::OS.to_string(),
            });
        };

        self.locate()
            .map(|driver_path| BackendHandle {
                backend: self.backend_name().to_string(),
                driver_path,
            })
            .ok_or_else(|| BackendError::DriverNotFound {
                library: library.clone(),
                searched: self.search_dirs.len(),
            })
    }
}
