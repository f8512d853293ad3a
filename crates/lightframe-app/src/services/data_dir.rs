// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Data directory resolution.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "lightframe";

/// Return the application data directory, creating it if needed.
pub fn data_dir() -> PathBuf {
    let dir = data_dir_in(&base_dir());
    std::fs::create_dir_all(&dir).ok();
    dir
}

/// `<base>/lightframe`.
pub fn data_dir_in(base: &Path) -> PathBuf {
    base.join(APP_DIR)
}

fn base_dir() -> PathBuf {
    // XDG data dir, then ~/.local/share
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return PathBuf::from(xdg);
    }
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_dir_is_appended() {
        assert_eq!(
            data_dir_in(Path::new("/var/lib")),
            PathBuf::from("/var/lib/lightframe")
        );
    }
}
