/// Sound resolver
///
/// Maps a sound name to a playable file below the sounds directory:
///
/// ```text
/// sounds/
///   beep.mp3          <- "beep" (".mp3" wins over ".wav")
///   beep.wav
///   horn/             <- "horn": random entry, or the "@"-marked one first
///     @new.mp3
///     old.mp3
/// ```

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

use crate::error::ResolveError;
use crate::sound::SoundName;

/// Filename prefix marking a file to be played next
pub const PRIORITY_MARKER: char = '@';

/// Extensions tried for standalone files, in order
pub const SOUND_EXTENSIONS: [&str; 2] = ["mp3", "wav"];

/// Resolves sound names against a sounds directory
#[derive(Debug, Clone)]
pub struct SoundResolver {
    root: PathBuf,
}

impl SoundResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find the file to play for `sound`.
    ///
    /// `Ok(None)` means nothing matches and the trigger should be skipped.
    pub fn resolve(&self, sound: &SoundName) -> Result<Option<PathBuf>, ResolveError> {
        let candidate = self.root.join(sound.as_str());

        if candidate.is_dir() {
            return self.pick_from_dir(&candidate).map(Some);
        }

        for ext in SOUND_EXTENSIONS {
            let mut file = candidate.clone().into_os_string();
            file.push(".");
            file.push(ext);
            let file = PathBuf::from(file);
            if file.exists() {
                return Ok(Some(file));
            }
        }

        Ok(None)
    }

    fn pick_from_dir(&self, dir: &Path) -> Result<PathBuf, ResolveError> {
        let entries = list_entries(dir)?;

        let marked = entries
            .iter()
            .find_map(|name| demoted_name(name).map(|demoted| (name, demoted)));

        if let Some((marked, demoted)) = marked {
            let from = dir.join(marked);
            let to = dir.join(demoted);

            match fs::rename(&from, &to) {
                Ok(()) => {
                    tracing::debug!("Demoted priority file {} -> {}", from.display(), to.display());
                    return Ok(to);
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    // Another handler demoted it first
                    tracing::debug!("Priority file {} already taken, picking at random", from.display());
                    let entries = list_entries(dir)?;
                    return pick_random(dir, &entries);
                }
                Err(source) => return Err(ResolveError::Io { path: from, source }),
            }
        }

        pick_random(dir, &entries)
    }
}

/// Entry names exactly as the filesystem returns them
fn list_entries(dir: &Path) -> Result<Vec<OsString>, ResolveError> {
    let io_err = |source: io::Error| ResolveError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        names.push(entry.file_name());
    }
    Ok(names)
}

/// Name with every leading marker stripped, if `name` is marked.
///
/// An entry made only of markers is a normal candidate.
fn demoted_name(name: &OsStr) -> Option<OsString> {
    if let Some(text) = name.to_str() {
        let stripped = text.trim_start_matches(PRIORITY_MARKER);
        return (stripped.len() != text.len() && !stripped.is_empty()).then(|| OsString::from(stripped));
    }

    demoted_raw_name(name)
}

#[cfg(unix)]
fn demoted_raw_name(name: &OsStr) -> Option<OsString> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = name.as_bytes();
    let start = bytes.iter().take_while(|&&b| b == PRIORITY_MARKER as u8).count();
    (start > 0 && start < bytes.len()).then(|| OsStr::from_bytes(&bytes[start..]).to_os_string())
}

// Non-UTF-8 names elsewhere are only played as random candidates
#[cfg(not(unix))]
fn demoted_raw_name(_name: &OsStr) -> Option<OsString> {
    None
}

fn pick_random(dir: &Path, entries: &[OsString]) -> Result<PathBuf, ResolveError> {
    entries
        .choose(&mut rand::thread_rng())
        .map(|name| dir.join(name))
        .ok_or_else(|| ResolveError::NoCandidates(dir.to_path_buf()))
}
