//! # soffice-locate
//!
//! Find an installed LibreOffice executable, so callers do not have to guess
//! which of `soffice`, `libreoffice`, `libreoffice7.6`, … exists on this host.
//!
//! ## Search order
//!
//! 1. `SOFFICE_PATH`, when it names an existing file.
//! 2. `soffice`, then `libreoffice`, on `PATH`.
//! 3. Well-known install locations for the current platform
//!    (see [`install_locations`]).
//!
//! The `soffice-locate` binary prints the first hit on stdout and exits 0,
//! or exits 1 with a message on stderr.
//!
//! ## Usage
//!
//! ```rust,no_run
//! match soffice_locate::locate() {
//!     Ok(path) => println!("{}", path.display()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable that pins the executable path.
pub const ENV_OVERRIDE: &str = "SOFFICE_PATH";

/// Names looked up on `PATH`, most preferred first.
pub const PATH_NAMES: &[&str] = &["soffice", "libreoffice"];

/// Errors returned by [`locate`].
#[derive(Error, Debug)]
pub enum LocateError {
    /// Nothing usable on PATH or in any known location.
    #[error("No LibreOffice installation found ({searched} locations searched).\nSet SOFFICE_PATH=/path/to/soffice to point at one.")]
    NotFound { searched: usize },
}

/// Find the LibreOffice executable.
pub fn locate() -> Result<PathBuf, LocateError> {
    let override_path = std::env::var_os(ENV_OVERRIDE).map(PathBuf::from);
    locate_with(
        override_path,
        |name| which::which(name).ok(),
        &install_locations(),
    )
}

/// Platform install locations, in search order.
///
/// - **Linux**: distro packages, `/opt/libreoffice*` tarballs (highest
///   version first), `/usr/local/bin`, snap
/// - **macOS**: `/Applications` and `~/Applications` app bundles
/// - **Windows**: `Program Files` and `Program Files (x86)`
pub fn install_locations() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(target_os = "linux")]
    {
        paths.push(PathBuf::from("/usr/lib/libreoffice/program/soffice"));
        paths.push(PathBuf::from("/usr/lib64/libreoffice/program/soffice"));
        paths.extend(opt_installs(Path::new("/opt")));
        paths.push(PathBuf::from("/usr/local/bin/soffice"));
        paths.push(PathBuf::from("/usr/bin/soffice"));
        paths.push(PathBuf::from("/snap/bin/libreoffice"));
    }

    #[cfg(target_os = "macos")]
    {
        const BUNDLE: &str = "LibreOffice.app/Contents/MacOS/soffice";
        paths.push(Path::new("/Applications").join(BUNDLE));
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("Applications").join(BUNDLE));
        }
        paths.push(PathBuf::from("/opt/homebrew/bin/soffice"));
        paths.push(PathBuf::from("/usr/local/bin/soffice"));
    }

    #[cfg(target_os = "windows")]
    {
        for var in ["ProgramFiles", "ProgramFiles(x86)"] {
            if let Some(dir) = std::env::var_os(var) {
                paths.push(
                    PathBuf::from(dir)
                        .join("LibreOffice")
                        .join("program")
                        .join("soffice.exe"),
                );
            }
        }
    }

    paths
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn locate_with(
    override_path: Option<PathBuf>,
    on_path: impl Fn(&str) -> Option<PathBuf>,
    locations: &[PathBuf],
) -> Result<PathBuf, LocateError> {
    if let Some(p) = override_path {
        if p.is_file() {
            return Ok(p);
        }
        // Env var set but file missing → keep searching.
        eprintln!(
            "soffice-locate: {ENV_OVERRIDE} '{}' not found; searching …",
            p.display()
        );
    }

    if let Some(p) = PATH_NAMES.iter().find_map(|name| on_path(name)) {
        return Ok(p);
    }

    if let Some(p) = locations.iter().find(|p| p.is_file()) {
        return Ok(p.clone());
    }

    Err(LocateError::NotFound {
        searched: PATH_NAMES.len() + locations.len(),
    })
}

/// `<root>/libreoffice*/program/soffice`, highest version first.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn opt_installs(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(root) else {
        return Vec::new();
    };
    let mut installs: Vec<(Vec<u32>, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            let suffix = name.strip_prefix("libreoffice")?;
            Some((version_key(suffix), e.path()))
        })
        .collect();
    installs.sort_by(|a, b| b.0.cmp(&a.0));
    installs
        .into_iter()
        .map(|(_, d)| d.join("program").join("soffice"))
        .collect()
}

/// `"7.6"` → `[7, 6]`; unparsable parts count as 0.
fn version_key(suffix: &str) -> Vec<u32> {
    suffix
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().unwrap_or(0))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
