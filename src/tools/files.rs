/// File helpers behind the `* file` commands
///
/// Each helper returns the text to show the user. Reads and writes only
/// accept paths below the working directory.

use crate::error::{LucienError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Largest file `read file` will load, and largest text `write file` accepts
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

const MAX_PATH_LEN: usize = 260;

/// Reject traversal, absolute paths and stray drive separators.
pub fn validate_path(path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        return Err(LucienError::InvalidPath("path cannot be empty".to_string()));
    }
    if path.len() > MAX_PATH_LEN {
        return Err(LucienError::InvalidPath("path is too long".to_string()));
    }

    let bytes = path.as_bytes();
    let has_drive = bytes.len() > 1 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';

    if Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(LucienError::InvalidPath(
            "parent directory traversal is not allowed".to_string(),
        ));
    }
    if !has_drive && (path.starts_with('/') || path.starts_with('\\')) {
        return Err(LucienError::InvalidPath(
            "absolute paths are not allowed".to_string(),
        ));
    }
    let rest = if has_drive { &path[2..] } else { path };
    if rest.contains(':') {
        return Err(LucienError::InvalidPath(format!("unexpected ':' in {}", path)));
    }

    Ok(PathBuf::from(path))
}

pub fn list_files(dir: &str) -> Result<String> {
    if dir.is_empty() || dir.len() > MAX_PATH_LEN {
        return Err(LucienError::InvalidPath("invalid directory path".to_string()));
    }

    let mut entries: Vec<String> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                format!("[DIR] {}/", name)
            } else {
                name
            }
        })
        .collect();

    if entries.is_empty() {
        return Ok("This folder is empty.".to_string());
    }
    entries.sort();
    Ok(entries.join("\n"))
}

pub fn read_file(path: &str) -> Result<String> {
    let path = validate_path(path)?;

    let size = fs::metadata(&path)
        .map_err(|e| not_found_or(e, &path))?
        .len();
    if size > MAX_FILE_BYTES {
        return Err(LucienError::Blocked(format!(
            "file too large: {} bytes (limit: 10MB)",
            size
        )));
    }

    let content = fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok("The file is empty.".to_string());
    }
    Ok(content)
}

pub fn write_file(path: &str, text: &str) -> Result<String> {
    let validated = validate_path(path)?;
    check_content_size(text)?;

    fs::write(&validated, text)?;
    Ok(format!("✓ File {} has been saved.", path))
}

pub fn append_file(path: &str, text: &str) -> Result<String> {
    use std::io::Write;

    let validated = validate_path(path)?;
    check_content_size(text)?;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&validated)?;
    file.write_all(text.as_bytes())?;
    Ok(format!("✓ Text appended to {}.", path))
}

pub fn delete_file(path: &str) -> Result<String> {
    let target = Path::new(path);
    fs::remove_file(target).map_err(|e| not_found_or(e, target))?;
    Ok(format!("✓ File {} has been deleted.", path))
}

pub fn rename_file(from: &str, to: &str) -> Result<String> {
    fs::rename(from, to).map_err(|e| not_found_or(e, Path::new(from)))?;
    Ok(format!("✓ File renamed to {}.", to))
}

pub fn copy_file(from: &str, to: &str) -> Result<String> {
    fs::copy(from, to).map_err(|e| not_found_or(e, Path::new(from)))?;
    Ok(format!("✓ File copied to {}.", to))
}

pub fn move_file(from: &str, to: &str) -> Result<String> {
    if fs::rename(from, to).is_err() {
        // Across filesystems rename fails; fall back to copy + delete
        fs::copy(from, to).map_err(|e| not_found_or(e, Path::new(from)))?;
        fs::remove_file(from)?;
    }
    Ok(format!("✓ File moved to {}.", to))
}

pub fn file_size(path: &str) -> Result<String> {
    let meta = fs::metadata(path).map_err(|e| not_found_or(e, Path::new(path)))?;
    Ok(format!("{} bytes", meta.len()))
}

pub fn count_lines(path: &str) -> Result<usize> {
    let content = fs::read_to_string(path).map_err(|e| not_found_or(e, Path::new(path)))?;
    Ok(content.lines().count())
}

/// Files under `folder` (recursively) bigger than `min_bytes`.
pub fn find_large(folder: &str, min_bytes: u64) -> Result<String> {
    let mut found = Vec::new();
    collect_large(Path::new(folder), min_bytes, &mut found)?;

    if found.is_empty() {
        return Ok(format!("No files > {} bytes.", min_bytes));
    }
    found.sort();
    Ok(found
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn collect_large(dir: &Path, min_bytes: u64, found: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_large(&entry.path(), min_bytes, found)?;
        } else if file_type.is_file() && entry.metadata()?.len() > min_bytes {
            found.push(entry.path());
        }
    }
    Ok(())
}

fn check_content_size(text: &str) -> Result<()> {
    if text.len() as u64 > MAX_FILE_BYTES {
        return Err(LucienError::Blocked(format!(
            "content too large: {} bytes (limit: 10MB)",
            text.len()
        )));
    }
    Ok(())
}

fn not_found_or(err: std::io::Error, path: &Path) -> LucienError {
    if err.kind() == std::io::ErrorKind::NotFound {
        LucienError::Process(format!("File not found: {}", path.display()))
    } else {
        LucienError::Io(err)
    }
}
