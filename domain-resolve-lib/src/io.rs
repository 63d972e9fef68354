//! Input and output files.
//!
//! Reading fails fast with an input error; writing goes through a sibling
//! `.partial` file and a rename, so a crash or interrupt mid-write never
//! leaves a truncated output that looks complete.

use crate::aggregate::ValidDomainSet;
use crate::error::DomainResolveError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Read an input file as UTF-8 and split it into lines.
pub fn read_input_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, DomainResolveError> {
    let path = path.as_ref();
    let shown = path.to_string_lossy();

    let bytes = fs::read(path).map_err(|e| DomainResolveError::input(shown.as_ref(), describe(&e)))?;
    let content = String::from_utf8(bytes).map_err(|e| {
        DomainResolveError::input(
            shown.as_ref(),
            format!("not valid UTF-8 (at byte {})", e.utf8_error().valid_up_to()),
        )
    })?;

    let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
    Ok(content.lines().map(str::to_string).collect())
}

/// Write the final domain set, creating parent directories as needed.
pub fn write_output<P: AsRef<Path>>(path: P, domains: &ValidDomainSet) -> Result<(), DomainResolveError> {
    let path = path.as_ref();
    let shown = path.to_string_lossy();

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| {
        DomainResolveError::output(
            shown.as_ref(),
            format!("cannot create directory '{}': {}", parent.display(), describe(&e)),
        )
    })?;

    let file_name = path
        .file_name()
        .ok_or_else(|| DomainResolveError::output(shown.as_ref(), "path has no file name"))?;
    let partial = parent.join(format!(".{}.partial", file_name.to_string_lossy()));

    let written = write_file(&partial, domains.render().as_bytes()).and_then(|()| fs::rename(&partial, path));
    if let Err(e) = written {
        let _ = fs::remove_file(&partial);
        return Err(DomainResolveError::output(shown.as_ref(), describe(&e)));
    }

    tracing::info!(path = %shown, domains = domains.len(), "wrote output file");
    Ok(())
}

fn write_file(path: &Path, body: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(body)?;
    file.sync_all()
}

fn describe(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => "file not found".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    }
}
