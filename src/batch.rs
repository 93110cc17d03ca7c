//! Batch coordination: pairing audio with annotations and running each pair
//!
//! Audio and TextGrid files are paired by stem (file name without its
//! extension). The working set is sorted by stem so output order does not
//! depend on directory listing order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::annotation::Grid;
use crate::config::ExtractionConfig;
use crate::formant::FormantTrack;
use crate::record::{extract_from_grid, OutputRecord};
use crate::{ExtractError, Result, Sound};

pub const AUDIO_EXTENSION: &str = "wav";
pub const ANNOTATION_EXTENSION: &str = "TextGrid";

/// Files of one kind in a directory, keyed by stem
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    entries: BTreeMap<String, PathBuf>,
}

/// Stems present in both directories, plus the leftovers on either side
#[derive(Debug, Clone, Default)]
pub struct Pairing {
    /// `(stem, audio path, annotation path)`, sorted by stem
    pub pairs: Vec<(String, PathBuf, PathBuf)>,
    pub unpaired_audio: Vec<String>,
    pub unpaired_annotations: Vec<String>,
}

impl Pairing {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FileIndex {
    /// Index the regular files in `dir` whose extension matches `extension`
    /// (ASCII case-insensitive); subdirectories are not searched
    pub fn scan<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Self> {
        let dir = dir.as_ref();
        let read_dir = fs::read_dir(dir).map_err(|err| {
            ExtractError::Configuration(format!(
                "cannot read directory '{}': {err}",
                dir.display()
            ))
        })?;

        let mut entries = BTreeMap::new();
        for entry in read_dir {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
            if !matches {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Some(previous) = entries.insert(stem.to_string(), path.clone()) {
                    warn!(
                        stem = %stem,
                        kept = %path.display(),
                        ignored = %previous.display(),
                        "two files share a stem, keeping one"
                    );
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn from_paths<I: IntoIterator<Item = PathBuf>>(paths: I) -> Self {
        let entries = paths
            .into_iter()
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?.to_string();
                Some((stem, path))
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    fn stems(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Pair this (audio) index with an annotation index by stem
    pub fn pair_with(&self, annotations: &FileIndex) -> Pairing {
        let mut pairing = Pairing::default();

        for (stem, audio) in &self.entries {
            match annotations.entries.get(stem) {
                Some(grid) => pairing
                    .pairs
                    .push((stem.clone(), audio.clone(), grid.clone())),
                None => pairing.unpaired_audio.push(stem.clone()),
            }
        }
        pairing.unpaired_annotations = annotations
            .entries
            .keys()
            .filter(|stem| !self.entries.contains_key(*stem))
            .cloned()
            .collect();

        pairing
    }
}

/// Extract records for one audio/annotation pair
pub fn extract_pair(audio: &Path, annotation: &Path, config: &ExtractionConfig) -> Result<Vec<OutputRecord>> {
    let sound = Sound::from_file(audio)?;
    let track = FormantTrack::from_sound(&sound, &config.settings);
    debug!(
        path = %audio.display(),
        duration = sound.duration(),
        frames = track.num_frames(),
        "formant track ready"
    );
    let grid = Grid::from_textgrid_file(annotation)?;

    Ok(extract_from_grid(
        &grid,
        &track,
        &config.phone,
        &config.formants,
        &config.points,
    ))
}

/// Run the whole batch and return every record, file by file in stem order
///
/// # Errors
/// - [`ExtractError::Usage`] if the configuration is malformed
/// - [`ExtractError::Configuration`] if a directory cannot be read or no
///   stem appears in both directories; raised before any audio is decoded
/// - the first per-file error, unless `keep_going` is set
pub fn run_batch(config: &ExtractionConfig) -> Result<Vec<OutputRecord>> {
    config.validate()?;

    let audio = FileIndex::scan(&config.audio_dir, AUDIO_EXTENSION)?;
    let annotations = FileIndex::scan(&config.textgrid_dir, ANNOTATION_EXTENSION)?;
    let pairing = audio.pair_with(&annotations);

    for stem in &pairing.unpaired_audio {
        warn!(stem = %stem, "audio file has no matching TextGrid, skipping");
    }
    for stem in &pairing.unpaired_annotations {
        warn!(stem = %stem, "TextGrid has no matching audio file, skipping");
    }

    if pairing.is_empty() {
        return Err(ExtractError::Configuration(format!(
            "no file stem appears in both '{}' ({} audio) and '{}' ({} TextGrid)",
            config.audio_dir.display(),
            audio.len(),
            config.textgrid_dir.display(),
            annotations.len()
        )));
    }

    info!(
        pairs = pairing.pairs.len(),
        phone = %config.phone,
        "starting extraction"
    );

    let mut records = Vec::new();
    for (stem, audio_path, grid_path) in &pairing.pairs {
        match extract_pair(audio_path, grid_path, config) {
            Ok(found) => {
                info!(stem = %stem, records = found.len(), "processed");
                records.extend(found);
            }
            Err(err) if config.keep_going => {
                error!(stem = %stem, error = %err, "failed to process, skipping");
            }
            Err(err) => return Err(err),
        }
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formant::FormantIndex;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_scan_filters_by_extension_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.wav");
        touch(dir.path(), "b.WAV");
        touch(dir.path(), "c.TextGrid");
        touch(dir.path(), "notes.txt");
        fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let index = FileIndex::scan(dir.path(), AUDIO_EXTENSION).unwrap();
        assert_eq!(index.stems().collect::<Vec<_>>(), vec!["a", "b"]);

        let grids = FileIndex::scan(dir.path(), ANNOTATION_EXTENSION).unwrap();
        assert_eq!(grids.stems().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_scan_keeps_one_file_per_stem() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.wav");
        touch(dir.path(), "a.WAV");
        touch(dir.path(), "b.wav");

        let index = FileIndex::scan(dir.path(), AUDIO_EXTENSION).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.stems().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileIndex::scan(dir.path().join("nope"), AUDIO_EXTENSION).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration(_)));
    }

    #[test]
    fn test_pairing_is_sorted_and_reports_leftovers() {
        let audio = FileIndex::from_paths(["z.wav", "a.wav", "m.wav"].map(PathBuf::from));
        let grids = FileIndex::from_paths(["m.TextGrid", "a.TextGrid", "q.TextGrid"].map(PathBuf::from));

        let pairing = audio.pair_with(&grids);
        let stems: Vec<&str> = pairing.pairs.iter().map(|(s, _, _)| s.as_str()).collect();
        assert_eq!(stems, vec!["a", "m"]);
        assert_eq!(pairing.pairs[0].1, PathBuf::from("a.wav"));
        assert_eq!(pairing.pairs[0].2, PathBuf::from("a.TextGrid"));
        assert_eq!(pairing.unpaired_audio, vec!["z".to_string()]);
        assert_eq!(pairing.unpaired_annotations, vec!["q".to_string()]);
    }

    #[test]
    fn test_empty_working_set_fails_before_decoding() {
        let audio_dir = tempfile::tempdir().unwrap();
        let grid_dir = tempfile::tempdir().unwrap();
        // Not valid audio: decoding it would fail with a different error
        touch(audio_dir.path(), "a.wav");
        touch(grid_dir.path(), "b.TextGrid");

        let config = ExtractionConfig::new(
            audio_dir.path(),
            grid_dir.path(),
            "out.csv",
            "ae",
            vec![FormantIndex::new(1).unwrap()],
            vec![0.5],
        );
        let err = run_batch(&config).unwrap_err();
        assert!(matches!(err, ExtractError::Configuration(_)));
    }

    #[test]
    fn test_invalid_config_fails_before_scanning() {
        let config = ExtractionConfig::new(
            "/nonexistent/audio",
            "/nonexistent/grids",
            "out.csv",
            "ae",
            vec![FormantIndex::new(1).unwrap()],
            vec![0.1, 0.2, 0.3, 0.4],
        );
        assert!(matches!(run_batch(&config), Err(ExtractError::Usage(_))));
    }

    #[test]
    fn test_keep_going_skips_broken_pairs() {
        let audio_dir = tempfile::tempdir().unwrap();
        let grid_dir = tempfile::tempdir().unwrap();
        touch(audio_dir.path(), "a.wav");
        touch(grid_dir.path(), "a.TextGrid");

        let mut config = ExtractionConfig::new(
            audio_dir.path(),
            grid_dir.path(),
            "out.csv",
            "ae",
            vec![FormantIndex::new(1).unwrap()],
            vec![0.5],
        );
        assert!(run_batch(&config).is_err());

        config.keep_going = true;
        assert!(run_batch(&config).unwrap().is_empty());
    }
}
