use crate::config::ResizeConfig;
use crate::container::{Frame, IconContainer};
use crate::error::IconResizeError;
use crate::resample::resample;
use crate::source::read_source;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

//===========================================================================//

/// Returns the line printed after a successful `resize_icon`.
pub fn confirmation_message(config: &ResizeConfig) -> String {
    let name = match config.output_path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => config.output_path.display().to_string(),
    };
    format!("✅ Icon fixed and saved as {}", name)
}

/// Reads the icon at `config.input_path`, resamples it to every size in
/// `config.sizes`, and writes the frames, in order, as a new icon at
/// `config.output_path`.
///
/// The output is first written to a temporary file next to it and then
/// renamed into place, so an existing file at `output_path` is left as it
/// was unless the new icon was written completely.
pub fn resize_icon(config: &ResizeConfig) -> Result<(), IconResizeError> {
    config.validate()?;
    let container = {
        let source = read_source(&config.input_path).map_err(|error| {
            IconResizeError::decode(&config.input_path, error)
        })?;
        log::debug!(
            "Decoded {:?} ({}x{})",
            config.input_path,
            source.width(),
            source.height()
        );
        let mut container = IconContainer::new();
        for &size in config.sizes.iter() {
            let frame = resample(&source, size, config.filter)
                .and_then(|raster| Frame::encode(&raster, config.encoding))
                .map_err(|error| {
                    IconResizeError::encode(&config.output_path, error)
                })?;
            log::debug!(
                "Encoded {} frame ({} bytes, {})",
                size,
                frame.data().len(),
                if frame.is_png() { "PNG" } else { "BMP" }
            );
            container.add_frame(frame);
        }
        container
    };
    let mut data = Vec::new();
    container
        .write(&mut data)
        .and_then(|()| replace_file(&config.output_path, &data))
        .map_err(|error| IconResizeError::encode(&config.output_path, error))?;
    log::info!(
        "Wrote {} frames ({} bytes) to {:?}",
        container.frames().len(),
        data.len(),
        config.output_path
    );
    Ok(())
}

// Writes `data` to a temporary file in the same directory as `path`, then
// renames it over `path`.
fn replace_file(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    temp.write_all(data)?;
    if let Some(permissions) = output_permissions(path) {
        temp.as_file().set_permissions(permissions)?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|error| error.error)?;
    Ok(())
}

// Temporary files are created owner-only; keep the old file's mode, or use
// the usual mode for a new file.
fn output_permissions(path: &Path) -> Option<fs::Permissions> {
    if let Ok(metadata) = fs::metadata(path) {
        return Some(metadata.permissions());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        Some(fs::Permissions::from_mode(0o644))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{confirmation_message, replace_file};
    use crate::config::ResizeConfig;
    use std::fs;

    #[test]
    fn default_confirmation_names_output_file() {
        assert_eq!(
            confirmation_message(&ResizeConfig::default()),
            "✅ Icon fixed and saved as icon_fixed.ico"
        );
    }

    #[test]
    fn replace_file_overwrites_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ico");
        fs::write(&path, b"old").unwrap();
        replace_file(&path, b"new contents").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new contents");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn replace_file_needs_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.ico");
        assert!(replace_file(&path, b"data").is_err());
        assert!(!path.exists());
    }
}

//===========================================================================//
