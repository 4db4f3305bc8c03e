//! Bitmap subtitle OCR.

use super::lang::{is_ocr_language, normalize_lang_code};
use crate::command::ToolRunner;
use crate::error::tail_chars;
use crate::tools::Tool;
use crate::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Default time budget for one OCR run.
pub const DEFAULT_OCR_TIMEOUT: Duration = Duration::from_secs(600);

/// Smallest SRT file accepted as a real transcription.
const MIN_SRT_BYTES: u64 = 100;

/// Filename parts that never carry a language.
const NON_LANGUAGE_PARTS: &[&str] = &["forced", "sdh", "cc", "un"];

/// Language for OCR, read right-to-left from the sidecar's name parts.
///
/// `Movie.en.2.forced.sup` yields `en`. Defaults to `en`.
pub fn detect_sub_language(sup_path: &Path) -> String {
    let stem = sup_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    for part in stem.split('.').rev() {
        if part.chars().all(|c| c.is_ascii_digit()) || NON_LANGUAGE_PARTS.contains(&part) {
            continue;
        }
        if !part.chars().all(|c| c.is_alphabetic()) {
            continue;
        }
        match part.chars().count() {
            2 if is_ocr_language(part) => return part.to_lowercase(),
            3 => {
                if let Some(code) = normalize_lang_code(part) {
                    return code.to_string();
                }
            }
            _ => {}
        }
    }

    "en".to_string()
}

/// Number of cues in SRT text, counted by their timing lines.
pub fn count_srt_cues(text: &str) -> Result<usize> {
    let timing = Regex::new(
        r"(?m)^\s*\d{1,2}:\d{2}:\d{2}[,.]\d{1,3}\s*-->\s*\d{1,2}:\d{2}:\d{2}",
    )
    .map_err(|e| Error::Ocr(e.to_string()))?;
    Ok(timing.find_iter(text).count())
}

/// OCR a `.sup` sidecar into an `.srt` beside it.
///
/// The ripper names its output after the media and language it detects, so
/// it runs on a copy of the sidecar inside a private staging directory and
/// whatever `.srt` it writes there is moved to `<sup stem>.srt`. Nothing
/// else in the sidecar's directory is touched.
///
/// The ripper runs under `timeout`; exceeding it kills the ripper. A missing
/// source, zero cues or an output under 100 bytes count as failure. Partial
/// output is removed on every failure path.
pub fn ocr_sup_to_srt(
    runner: &dyn ToolRunner,
    sup_path: &Path,
    timeout: Duration,
) -> Result<PathBuf> {
    if !sup_path.exists() {
        return Err(Error::Ocr(format!("SUP file not found: {:?}", sup_path)));
    }

    let srt_path = sup_path.with_extension("srt");
    let staging = stage_sup(sup_path)?;
    let staged_sup = staging.path().join(sup_path.file_name().unwrap_or_default());

    let args = vec![
        "--language".to_string(),
        detect_sub_language(sup_path),
        "--force".to_string(),
        staged_sup.to_string_lossy().to_string(),
    ];

    let result = match runner.run(Tool::Ocr, &args, Some(timeout)) {
        Ok(output) if output.success() => {
            collect_output(staging.path(), &srt_path).and_then(|()| check_srt(&srt_path))
        }
        Ok(output) => Err(Error::Ocr(match output.stderr.trim() {
            "" => "OCR tool failed".to_string(),
            stderr => tail_chars(stderr, 200),
        })),
        Err(Error::Timeout { timeout, .. }) => Err(Error::OcrTimeout { timeout }),
        Err(e) => Err(Error::Ocr(e.to_string())),
    };

    if result.is_err() {
        discard(&srt_path);
    }
    if let Err(e) = staging.close() {
        tracing::warn!("Failed to remove OCR staging directory: {}", e);
    }
    result
}

/// Private directory beside the sidecar holding a link (or copy) of it.
fn stage_sup(sup_path: &Path) -> Result<TempDir> {
    let parent = sup_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let staging = tempfile::Builder::new()
        .prefix(".playfit-ocr.")
        .tempdir_in(parent)?;
    let staged = staging.path().join(sup_path.file_name().unwrap_or_default());

    if std::fs::hard_link(sup_path, &staged).is_err() {
        std::fs::copy(sup_path, &staged)?;
    }
    Ok(staging)
}

/// Move the `.srt` the ripper wrote in `staging` to `srt_path`.
///
/// The largest `.srt` wins when the ripper wrote more than one.
fn collect_output(staging: &Path, srt_path: &Path) -> Result<()> {
    let mut written: Vec<(u64, PathBuf)> = std::fs::read_dir(staging)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("srt"))
        })
        .filter_map(|path| Some((std::fs::metadata(&path).ok()?.len(), path)))
        .collect();
    written.sort();

    let Some((_, produced)) = written.pop() else {
        return Err(Error::Ocr("OCR produced no output".to_string()));
    };
    tracing::debug!("Ripper wrote {:?}", produced.file_name());
    std::fs::rename(&produced, srt_path)?;
    Ok(())
}

fn check_srt(srt_path: &Path) -> Result<PathBuf> {
    if !srt_path.exists() {
        return Err(Error::Ocr("OCR produced no output".to_string()));
    }

    let text = String::from_utf8_lossy(&std::fs::read(srt_path)?).to_string();
    if count_srt_cues(&text)? == 0 {
        return Err(Error::Ocr("OCR produced no subtitle entries".to_string()));
    }
    if std::fs::metadata(srt_path)?.len() < MIN_SRT_BYTES {
        return Err(Error::Ocr("SRT file too small (OCR likely failed)".to_string()));
    }

    Ok(srt_path.to_path_buf())
}

fn discard(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove partial OCR output {:?}: {}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::ToolOutput;
    use assert_matches::assert_matches;
    use std::cell::RefCell;

    const GOOD_SRT: &str = "1\n00:00:01,000 --> 00:00:03,500\nHello there, this line came out of the ripper.\n\n\
                            2\n00:00:04,000 --> 00:00:06,000\nAnd a second line for good measure.\n";

    enum Behavior {
        Write(&'static str),
        /// Write under the ripper's own naming, next to the staged sidecar.
        WriteNamed(&'static str, &'static str),
        Fail(&'static str),
        TimeOut,
    }

    struct Ripper {
        behavior: Behavior,
        args: RefCell<Vec<String>>,
    }

    impl Ripper {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                args: RefCell::new(Vec::new()),
            }
        }
    }

    impl ToolRunner for Ripper {
        fn run(&self, tool: Tool, args: &[String], timeout: Option<Duration>) -> Result<ToolOutput> {
            assert_eq!(tool, Tool::Ocr);
            *self.args.borrow_mut() = args.to_vec();
            let srt = PathBuf::from(args.last().unwrap()).with_extension("srt");
            match self.behavior {
                Behavior::Write(text) => {
                    std::fs::write(&srt, text)?;
                    Ok(ToolOutput {
                        exit_code: Some(0),
                        ..Default::default()
                    })
                }
                Behavior::WriteNamed(name, text) => {
                    std::fs::write(srt.with_file_name(name), text)?;
                    Ok(ToolOutput {
                        exit_code: Some(0),
                        ..Default::default()
                    })
                }
                Behavior::Fail(stderr) => Ok(ToolOutput {
                    exit_code: Some(1),
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                }),
                Behavior::TimeOut => {
                    std::fs::write(&srt, "1\n00:00:01,000 --> ")?;
                    Err(Error::Timeout {
                        tool: "pgsrip".to_string(),
                        timeout: timeout.unwrap(),
                    })
                }
            }
        }
    }

    fn sup(dir: &tempfile::TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, b"PG").unwrap();
        path
    }

    #[test]
    fn language_detection() {
        assert_eq!(detect_sub_language(Path::new("Movie.en.sup")), "en");
        assert_eq!(detect_sub_language(Path::new("Movie.fr.2.forced.sdh.sup")), "fr");
        assert_eq!(detect_sub_language(Path::new("Movie.ger.sup")), "de");
        assert_eq!(detect_sub_language(Path::new("Movie.un.sup")), "en");
        assert_eq!(detect_sub_language(Path::new("Movie (2019).sup")), "en");
        assert_eq!(detect_sub_language(Path::new("Movie.xx.sup")), "en");
    }

    #[test]
    fn cue_counting() {
        assert_eq!(count_srt_cues(GOOD_SRT).unwrap(), 2);
        assert_eq!(count_srt_cues("").unwrap(), 0);
        assert_eq!(count_srt_cues("just some words").unwrap(), 0);
    }

    #[test]
    fn successful_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::Write(GOOD_SRT));

        let srt = ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap();

        assert_eq!(srt, dir.path().join("Movie.en.srt"));
        assert_eq!(ripper.args.borrow()[..2], ["--language", "en"]);
    }

    #[test]
    fn output_named_by_the_ripper_is_moved_beside_the_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.2.forced.sup");
        std::fs::write(dir.path().join("Movie.en.srt"), "existing text sidecar").unwrap();
        let ripper = Ripper::new(Behavior::WriteNamed("Movie.en.srt", GOOD_SRT));

        let srt = ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap();

        assert_eq!(srt, dir.path().join("Movie.en.2.forced.srt"));
        assert_eq!(std::fs::read_to_string(&srt).unwrap(), GOOD_SRT);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("Movie.en.srt")).unwrap(),
            "existing text sidecar"
        );
        assert!(sup.exists());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .filter(|n| n.starts_with(".playfit-ocr."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn ripper_runs_on_a_staged_copy() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::Write(GOOD_SRT));

        ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap();

        let staged = PathBuf::from(ripper.args.borrow().last().unwrap());
        assert_ne!(staged, sup);
        assert_eq!(staged.file_name(), sup.file_name());
        assert!(!staged.exists());
    }

    #[test]
    fn success_without_any_srt_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::WriteNamed("Movie.en.txt", GOOD_SRT));

        let err = ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap_err();
        assert_matches!(err, Error::Ocr(msg) if msg == "OCR produced no output");
        assert!(!dir.path().join("Movie.en.srt").exists());
    }

    #[test]
    fn missing_source_fails_without_running() {
        let dir = tempfile::tempdir().unwrap();
        let ripper = Ripper::new(Behavior::Write(GOOD_SRT));
        let err = ocr_sup_to_srt(&ripper, &dir.path().join("gone.en.sup"), DEFAULT_OCR_TIMEOUT)
            .unwrap_err();
        assert_matches!(err, Error::Ocr(msg) if msg.starts_with("SUP file not found"));
        assert!(ripper.args.borrow().is_empty());
    }

    #[test]
    fn empty_transcription_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::Write("\n\n"));

        let err = ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap_err();
        assert_matches!(err, Error::Ocr(msg) if msg.contains("no subtitle entries"));
        assert!(!dir.path().join("Movie.en.srt").exists());
    }

    #[test]
    fn tiny_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::Write("1\n00:00:01,000 --> 00:00:02,000\nHi\n"));

        let err = ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap_err();
        assert_matches!(err, Error::Ocr(msg) if msg.contains("too small"));
        assert!(!dir.path().join("Movie.en.srt").exists());
    }

    #[test]
    fn ripper_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::Fail("no tesseract data"));

        let err = ocr_sup_to_srt(&ripper, &sup, DEFAULT_OCR_TIMEOUT).unwrap_err();
        assert_matches!(err, Error::Ocr(msg) if msg == "no tesseract data");
    }

    #[test]
    fn timeout_cleans_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        let sup = sup(&dir, "Movie.en.sup");
        let ripper = Ripper::new(Behavior::TimeOut);

        let err = ocr_sup_to_srt(&ripper, &sup, Duration::from_secs(5)).unwrap_err();
        assert_matches!(err, Error::OcrTimeout { timeout } if timeout == Duration::from_secs(5));
        assert!(!dir.path().join("Movie.en.srt").exists());
        assert!(sup.exists());
    }
}
