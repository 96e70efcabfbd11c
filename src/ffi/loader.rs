//! SDK Library Loader
//!
//! Locates and loads the `sapnwrfc` shared library.

use std::path::{Path, PathBuf};

use libloading::Library;

use crate::error::SapError;

/// Environment variable pointing at an unpacked NW RFC SDK
pub const SDK_HOME_VAR: &str = "SAPNWRFC_HOME";

/// Library loader with search paths
#[derive(Debug, Clone)]
pub struct LibraryLoader {
    /// Search paths for the SDK, tried in order
    search_paths: Vec<PathBuf>,
}

impl LibraryLoader {
    /// Create a loader that searches `SAPNWRFC_HOME/lib` and the working directory
    pub fn new() -> Self {
        Self {
            search_paths: default_search_paths(),
        }
    }

    /// Create a loader with no search paths; only the platform search applies
    pub fn empty() -> Self {
        Self {
            search_paths: Vec::new(),
        }
    }

    /// Add a search path, tried before the defaults
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) {
        self.search_paths.insert(0, path.as_ref().to_path_buf());
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First search path that contains the SDK library
    pub fn find_library(&self) -> Option<PathBuf> {
        let lib_name = library_filename();
        self.search_paths
            .iter()
            .map(|dir| dir.join(lib_name))
            .find(|path| path.exists())
    }

    /// Load the SDK library.
    ///
    /// Falls back to the platform's own lookup (`PATH`, `LD_LIBRARY_PATH`,
    /// `DYLD_LIBRARY_PATH`) when no search path has it. Failure is reported
    /// as [`SapError::LibraryNotFound`] with the files the platform needs.
    pub fn load(&self) -> Result<Library, SapError> {
        let target = self
            .find_library()
            .unwrap_or_else(|| PathBuf::from(library_filename()));
        tracing::debug!(path = %target.display(), "loading SAP NW RFC library");

        // Safety: loading the SDK runs its initialisers; the library is trusted
        // by configuration.
        unsafe { Library::new(&target) }.map_err(|source| SapError::LibraryNotFound {
            message: remediation_message(),
            source,
        })
    }
}

impl Default for LibraryLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Get the default SDK search paths
fn default_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = std::env::var_os(SDK_HOME_VAR) {
        paths.push(PathBuf::from(home).join("lib"));
    }

    // Next to the executable, the "output folder"
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        paths.push(dir);
    }

    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd);
    }

    paths
}

/// The SDK's library file name on this platform
pub fn library_filename() -> &'static str {
    #[cfg(target_os = "windows")]
    {
        "sapnwrfc.dll"
    }

    #[cfg(target_os = "macos")]
    {
        "libsapnwrfc.dylib"
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        "libsapnwrfc.so"
    }
}

/// Remediation text for a missing SDK on this platform
pub fn remediation_message() -> String {
    #[cfg(target_os = "windows")]
    {
        windows_message()
    }

    #[cfg(target_os = "macos")]
    {
        macos_message()
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        linux_message()
    }
}

fn missing_libraries(search_var: &str, platform: &str, files: &[&str]) -> String {
    let mut message = format!(
        "The SAP RFC libraries were not found in the output folder or in a folder contained in the systems {} environment variable.\n\nRequired files for {}:\n",
        search_var, platform
    );
    for file in files {
        message.push_str("  ");
        message.push_str(file);
        message.push('\n');
    }
    message
}

#[cfg_attr(not(any(test, target_os = "windows")), allow(dead_code))]
pub(crate) fn windows_message() -> String {
    let mut message = missing_libraries(
        "PATH",
        "Windows",
        &["sapnwrfc.dll", "icudtXX.dll", "icuinXX.dll", "icuucXX.dll"],
    );
    message.push_str(
        "\nAlso make sure the 64-bit version of the Visual C++ 2013 Redistributable is installed\n",
    );
    message
}

#[cfg_attr(not(any(test, target_os = "macos")), allow(dead_code))]
pub(crate) fn macos_message() -> String {
    missing_libraries(
        "DYLD_LIBRARY_PATH",
        "macOS",
        &[
            "libsapnwrfc.dylib",
            "libicudata.XX.dylib",
            "libicui18n.XX.dylib",
            "libicuuc.XX.dylib",
        ],
    )
}

#[cfg_attr(any(target_os = "windows", target_os = "macos"), allow(dead_code))]
pub(crate) fn linux_message() -> String {
    missing_libraries(
        "LD_LIBRARY_PATH",
        "Linux",
        &[
            "libsapnwrfc.so",
            "libicudata.so.XX",
            "libicui18n.so.XX",
            "libicuuc.so.XX",
        ],
    )
}
