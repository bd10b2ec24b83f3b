use anyhow::Context;
use path_clean::PathClean;
use std::path::{Component, Path, PathBuf, Prefix};
use std::{env, fs};

/// Checks if the given path exists and is accessible.
///
/// # Errors
/// Returns an error if the path does not exist or is not accessible.
/// The error message includes the problematic path for easier debugging.
pub fn check_path(path: &Path) -> anyhow::Result<()> {
    fs::metadata(path).with_context(|| format!("The path or file '{}' is invalid", path.display()))?;
    Ok(())
}

/// Expands a user supplied path into an absolute, lexically cleaned one.
///
/// A leading `~` or `$HOME` is replaced with the user's home directory and
/// relative paths are resolved against the current directory.
pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_home(input);
    let path = Path::new(&expanded);
    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .context("Unable to find current path")?
            .join(path)
    };
    Ok(abs_path.clean())
}

fn expand_home(input: &str) -> String {
    for marker in ["~", "$HOME"] {
        if input == marker || input.starts_with(&format!("{marker}/")) {
            if let Some(home) = dirs::home_dir() {
                return input.replacen(marker, &home.to_string_lossy(), 1);
            }
        }
    }
    input.into()
}

/// The folder name a backup of `source` nests under.
///
/// A volume root has no final component, so a name is synthesized from the
/// volume identifier instead (`C_backup` for `C:\`, `root_backup` for `/`).
pub fn base_name(source: &Path) -> String {
    if let Some(name) = source.file_name() {
        return name.to_string_lossy().into_owned();
    }
    let volume = source
        .components()
        .find_map(|c| match c {
            Component::Prefix(prefix) => Some(volume_name(prefix.kind(), prefix.as_os_str())),
            _ => None,
        })
        .unwrap_or_else(|| "root".to_string());
    format!("{volume}_backup")
}

fn volume_name(kind: Prefix<'_>, raw: &std::ffi::OsStr) -> String {
    match kind {
        Prefix::Disk(letter) | Prefix::VerbatimDisk(letter) => (letter as char).to_string(),
        _ => raw
            .to_string_lossy()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect(),
    }
}
