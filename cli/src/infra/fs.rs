//! Filesystem infrastructure: implements the `HostFs` port.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::HostFs;

/// Production filesystem implementation of `HostFs`.
pub struct LocalFs;

impl HostFs for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path, mode: u32) -> Result<()> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("creating directory {}", path.display()))?;
        set_mode(path, mode)
    }

    fn write(&self, path: &Path, content: &str, mode: u32) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(mode);
        }
        let mut file = options
            .open(path)
            .with_context(|| format!("opening {}", path.display()))?;
        // `mode` on open only applies to new files; narrow an existing one
        // before any content lands in it.
        set_mode(path, mode)?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
        file.sync_all()
            .with_context(|| format!("syncing {}", path.display()))
    }

    fn symlink(&self, original: &Path, link: &Path) -> Result<()> {
        if link.symlink_metadata().is_ok() {
            std::fs::remove_file(link)
                .with_context(|| format!("removing existing link {}", link.display()))?;
        }
        create_symlink(original, link)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing {}", path.display()))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn create_symlink(original: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(original, link)
        .with_context(|| format!("linking {} -> {}", link.display(), original.display()))
}

#[cfg(not(unix))]
fn create_symlink(original: &Path, link: &Path) -> Result<()> {
    anyhow::bail!(
        "symlinks are only supported on unix hosts ({} -> {})",
        link.display(),
        original.display()
    )
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
