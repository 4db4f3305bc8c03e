//! Candidate file discovery and scan summaries.

use playfit_av::{analyze, MediaInfo, RemediationPlan};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Container extensions considered media.
pub const MEDIA_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "m4v", "mov", "wmv", "ts", "m2ts"];

/// Name fragments marking files this tool wrote itself.
const DERIVED_MARKERS: &[&str] = &[".playfit.", ".HDR10.", ".importing."];

/// Check if a path has a media container extension.
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Sample clips: a name containing `sample`, or a `sample` directory on the path.
pub fn is_sample_file(path: &Path) -> bool {
    let in_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase().contains("sample"))
        .unwrap_or(false);

    in_name
        || path
            .components()
            .any(|c| c.as_os_str().to_string_lossy().eq_ignore_ascii_case("sample"))
}

/// Artifacts produced by a previous run.
pub fn is_derived_file(path: &Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    DERIVED_MARKERS.iter().any(|m| name.contains(m))
}

/// Enumerate candidate media files under `source`, sorted and de-duplicated.
///
/// A file yields itself when it qualifies. Samples and derived artifacts are
/// excluded.
pub fn collect_media_files(source: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = if source.is_file() {
        vec![source.to_path_buf()]
    } else {
        WalkDir::new(source)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect()
    };

    files.retain(|f| {
        if !is_media_file(f) || is_derived_file(f) {
            return false;
        }
        if is_sample_file(f) {
            tracing::debug!("Skipping sample file: {:?}", f);
            return false;
        }
        true
    });

    files.sort();
    files.dedup();
    files
}

/// Outcome of probing one candidate.
#[derive(Debug)]
pub enum ScanEntry {
    Probed {
        info: Box<MediaInfo>,
        plan: RemediationPlan,
    },
    ProbeError {
        path: PathBuf,
        error: String,
    },
}

impl ScanEntry {
    pub fn from_probe(path: &Path, result: playfit_av::Result<MediaInfo>) -> Self {
        match result {
            Ok(info) => {
                let plan = analyze(&info);
                ScanEntry::Probed {
                    info: Box::new(info),
                    plan,
                }
            }
            Err(e) => ScanEntry::ProbeError {
                path: path.to_path_buf(),
                error: e.to_string(),
            },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ScanEntry::Probed { info, .. } => &info.path,
            ScanEntry::ProbeError { path, .. } => path,
        }
    }

    /// Tag line for reports: `RECODE SUBS(1txt) DOVI-P8`, `OK`, or the probe error.
    pub fn tag_line(&self) -> String {
        match self {
            ScanEntry::Probed { plan, .. } => {
                let tags = plan.tags();
                if tags.is_empty() {
                    "OK".to_string()
                } else {
                    tags.join(" ")
                }
            }
            ScanEntry::ProbeError { error, .. } => format!("ERROR: {}", error),
        }
    }
}

/// Aggregate counts over a scan.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub total: usize,
    pub compatible: usize,
    pub needs_work: usize,
    pub video_recode: usize,
    pub audio_recode: usize,
    pub subtitle_extract: usize,
    pub dovi_p8: usize,
    pub probe_errors: usize,
}

impl ScanSummary {
    pub fn from_entries(entries: &[ScanEntry]) -> Self {
        let mut summary = ScanSummary {
            total: entries.len(),
            ..Default::default()
        };

        for entry in entries {
            match entry {
                ScanEntry::ProbeError { .. } => summary.probe_errors += 1,
                ScanEntry::Probed { plan, .. } => {
                    if plan.needs_any_work() {
                        summary.needs_work += 1;
                    } else {
                        summary.compatible += 1;
                    }
                    summary.video_recode += plan.needs_video_recode() as usize;
                    summary.audio_recode += plan.needs_audio_recode() as usize;
                    summary.subtitle_extract += plan.has_extractable_subtitles() as usize;
                    summary.dovi_p8 += plan.needs_hdr10_copy() as usize;
                }
            }
        }

        summary
    }

    pub fn render(&self) -> String {
        let rule = "=".repeat(60);
        [
            String::new(),
            rule.clone(),
            "SCAN SUMMARY".to_string(),
            rule.clone(),
            format!("Total files:           {}", self.total),
            format!("Already compatible:    {}", self.compatible),
            format!("Need processing:       {}", self.needs_work),
            format!("  - Video recode:      {}", self.video_recode),
            format!("  - Audio recode:      {}", self.audio_recode),
            format!("  - Subtitle extract:  {}", self.subtitle_extract),
            format!("  - DoVi P8 HDR10:     {}", self.dovi_p8),
            format!("Probe errors:          {}", self.probe_errors),
            rule,
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playfit_av::{AudioTrack, HdrKind, VideoInfo};
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_is_media_file() {
        assert!(is_media_file(Path::new("a.mkv")));
        assert!(is_media_file(Path::new("a.M2TS")));
        assert!(is_media_file(Path::new("/x/y/a.Mp4")));
        assert!(!is_media_file(Path::new("a.srt")));
        assert!(!is_media_file(Path::new("mkv")));
    }

    #[test]
    fn test_is_sample_file() {
        assert!(is_sample_file(Path::new("/m/Movie-sample.mkv")));
        assert!(is_sample_file(Path::new("/m/Sample/clip.mkv")));
        assert!(is_sample_file(Path::new("/m/SAMPLE.mkv")));
        assert!(!is_sample_file(Path::new("/m/Samples of Life/movie.mkv")));
        assert!(!is_sample_file(Path::new("/m/movie.mkv")));
    }

    #[test]
    fn collects_recursively_with_exclusions() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("b.mkv"));
        touch(&root.join("a.AVI"));
        touch(&root.join("nested/c.mp4"));
        touch(&root.join("nested/c.en.srt"));
        touch(&root.join("nested/sample/c.mkv"));
        touch(&root.join("d-sample.mkv"));
        touch(&root.join("e.playfit.mkv"));
        touch(&root.join("f.HDR10.mkv"));

        let files = collect_media_files(root);

        assert_eq!(
            files,
            vec![root.join("a.AVI"), root.join("b.mkv"), root.join("nested/c.mp4")]
        );
    }

    #[test]
    fn single_file_yields_itself() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("movie.mkv");
        touch(&file);
        assert_eq!(collect_media_files(&file), vec![file.clone()]);

        let other = dir.path().join("notes.txt");
        touch(&other);
        assert!(collect_media_files(&other).is_empty());
    }

    fn probed(codec: &str, channels: u32) -> ScanEntry {
        let mut info = MediaInfo::new("/m/movie.mkv");
        info.video = Some(VideoInfo {
            codec: codec.to_string(),
            width: Some(1920),
            height: Some(1080),
            bit_depth: 8,
            hdr: false,
            hdr_kind: HdrKind::None,
            dovi_profile: None,
        });
        info.audio_tracks.push(AudioTrack {
            index: 1,
            codec: "ac3".to_string(),
            channels,
            language: "eng".to_string(),
        });
        ScanEntry::from_probe(Path::new("/m/movie.mkv"), Ok(info))
    }

    #[test]
    fn tag_lines() {
        assert_eq!(probed("h264", 2).tag_line(), "OK");
        assert_eq!(probed("mpeg4", 2).tag_line(), "RECODE");
        let err = ScanEntry::from_probe(
            Path::new("/m/bad.mkv"),
            Err(playfit_av::Error::probe("/m/bad.mkv", "moov atom not found")),
        );
        assert!(err.tag_line().starts_with("ERROR: "));
        assert_eq!(err.path(), Path::new("/m/bad.mkv"));
    }

    #[test]
    fn summary_counts() {
        let entries = vec![
            probed("h264", 2),
            probed("mpeg4", 6),
            probed("hevc", 6),
            ScanEntry::ProbeError {
                path: PathBuf::from("/m/bad.mkv"),
                error: "boom".to_string(),
            },
        ];

        let summary = ScanSummary::from_entries(&entries);

        assert_eq!(
            summary,
            ScanSummary {
                total: 4,
                compatible: 1,
                needs_work: 2,
                video_recode: 1,
                audio_recode: 2,
                subtitle_extract: 0,
                dovi_p8: 0,
                probe_errors: 1,
            }
        );
        assert!(summary.render().contains("Probe errors:          1"));
    }
}
