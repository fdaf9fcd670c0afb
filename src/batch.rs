//! Batch conversion of SVG files.
//!
//! The CLI stage that feeds files through the conversion pipeline. Inputs may
//! be files or directories; directories are walked recursively for `*.svg`
//! (any case).
//!
//! ## Output Naming
//!
//! Each file is written as `<stem>.<ext>` next to its source, or into the
//! output directory when one is given:
//!
//! ```text
//! art/logo.svg        →  out/logo.png
//! art/icons/Star.SVG  →  out/Star.png
//! ```
//!
//! ## Parallel Processing
//!
//! Files are converted in parallel using [rayon](https://docs.rs/rayon). Each
//! worker owns its buffers; progress is reported as [`BatchEvent`]s over an
//! optional channel so the caller decides how to display it. A failed file
//! does not stop the others.

use crate::imaging::svg::parse_root;
use crate::imaging::{
    BaselineEncoder, ConvertError, ConvertOptions, Dimensions, Dpi, ImageCrateEncoder, Quality,
    Rasterizer, ResvgRasterizer, convert_with_backend, resolve_pixel_size,
};
use crate::types::{ConvertWarning, OutputFormat};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Input not found: {0}")]
    InputNotFound(PathBuf),
    #[error("No SVG files found")]
    NoInputs,
    #[error("Invalid options: {0}")]
    Options(#[from] ConvertError),
    #[error("{failed} of {total} files failed to convert")]
    Failed { failed: usize, total: usize },
}

/// Progress event emitted once per file.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Converted {
        source: PathBuf,
        output: PathBuf,
        width: u32,
        height: u32,
        bytes: usize,
        warnings: Vec<ConvertWarning>,
    },
    Failed {
        source: PathBuf,
        error: String,
    },
}

/// Outcome of a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub converted: usize,
    pub warnings: usize,
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.converted + self.failed.len()
    }

    /// `Err(Failed)` when any file failed, for the process exit status.
    pub fn into_result(self) -> Result<Self, BatchError> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(BatchError::Failed {
                failed: self.failed.len(),
                total: self.total(),
            })
        }
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}

/// Expand `inputs` into the list of SVG files to convert.
///
/// Files are taken as given regardless of extension. Directories contribute
/// every `*.svg` below them, sorted by path. Duplicates are dropped.
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(input).follow_links(true) {
                let entry = entry?;
                if entry.file_type().is_file() && is_svg(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            files.extend(found);
        } else {
            return Err(BatchError::InputNotFound(input.clone()));
        }
    }

    let mut seen = std::collections::HashSet::new();
    files.retain(|f| seen.insert(f.clone()));

    if files.is_empty() {
        return Err(BatchError::NoInputs);
    }
    Ok(files)
}

/// Where the converted `source` is written.
pub fn output_path(source: &Path, out_dir: Option<&Path>, format: OutputFormat) -> PathBuf {
    let mut name = source
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "image".into());
    name.push(".");
    name.push(format.extension());
    let dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => source.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    dir.join(name)
}

/// Output path for each of `files`, in order.
///
/// A file whose output would land on a path already claimed by an earlier
/// file gets an error instead. Paths are compared ignoring case so that
/// case-insensitive filesystems cannot merge two outputs either.
pub fn plan_outputs(
    files: &[PathBuf],
    out_dir: Option<&Path>,
    format: OutputFormat,
) -> Vec<Result<PathBuf, String>> {
    let mut claimed: HashMap<String, &Path> = HashMap::new();
    files
        .iter()
        .map(|source| {
            let output = output_path(source, out_dir, format);
            let key = output.to_string_lossy().to_lowercase();
            match claimed.get(&key) {
                Some(first) => Err(format!(
                    "output {} is already written from {}",
                    output.display(),
                    first.display()
                )),
                None => {
                    claimed.insert(key, source);
                    Ok(output)
                }
            }
        })
        .collect()
}

/// Convert `files` with the production collaborators.
pub fn convert_files(
    files: &[PathBuf],
    out_dir: Option<&Path>,
    options: &ConvertOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let rasterizer = ResvgRasterizer::new();
    convert_files_with_backend(
        &rasterizer,
        &ImageCrateEncoder,
        files,
        out_dir,
        options,
        progress,
    )
}

/// Convert `files` using the given collaborators (allows testing with mocks).
///
/// Options that would fail every file (format, dpi, quality) are checked
/// once up front and returned as `BatchError::Options`. Per-file failures,
/// including output-name collisions, are reported as events and counted in
/// the summary.
pub fn convert_files_with_backend(
    rasterizer: &impl Rasterizer,
    encoder: &impl BaselineEncoder,
    files: &[PathBuf],
    out_dir: Option<&Path>,
    options: &ConvertOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let format: OutputFormat = options.format.parse()?;
    Dpi::new(options.dpi)?;
    Quality::new(options.quality)?;

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)?;
    }

    let outputs = plan_outputs(files, out_dir, format);
    let events: Vec<BatchEvent> = files
        .par_iter()
        .zip(outputs)
        .map(|(source, output)| {
            let converted = output.and_then(|output| {
                convert_one(rasterizer, encoder, source, &output, options)
                    .map(|converted| (output, converted))
            });
            let event = match converted {
                Ok((output, (width, height, bytes, warnings))) => BatchEvent::Converted {
                    source: source.clone(),
                    output,
                    width,
                    height,
                    bytes,
                    warnings,
                },
                Err(error) => {
                    log::debug!("{}: {error}", source.display());
                    BatchEvent::Failed {
                        source: source.clone(),
                        error,
                    }
                }
            };
            if let Some(tx) = progress.as_ref() {
                tx.send(event.clone()).ok();
            }
            event
        })
        .collect();

    let mut summary = BatchSummary::default();
    for event in events {
        match event {
            BatchEvent::Converted { warnings, .. } => {
                summary.converted += 1;
                summary.warnings += warnings.len();
            }
            BatchEvent::Failed { source, .. } => summary.failed.push(source),
        }
    }
    Ok(summary)
}

/// Result of checking one file without rasterizing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub source: PathBuf,
    /// Pixel size at the requested DPI, or why it could not be resolved.
    pub result: Result<Dimensions, String>,
}

/// Validate each file and resolve its pixel size at `dpi`.
///
/// The rasterizer is only asked for a natural size when the root declares
/// neither `width`/`height` nor a `viewBox`.
pub fn check_files(
    rasterizer: &impl Rasterizer,
    files: &[PathBuf],
    dpi: u32,
) -> Result<Vec<CheckReport>, BatchError> {
    let dpi = Dpi::new(dpi)?;
    Ok(files
        .par_iter()
        .map(|source| CheckReport {
            source: source.clone(),
            result: check_one(rasterizer, source, dpi),
        })
        .collect())
}

fn check_one(rasterizer: &impl Rasterizer, source: &Path, dpi: Dpi) -> Result<Dimensions, String> {
    let markup = fs::read_to_string(source).map_err(|e| format!("read failed: {e}"))?;
    let root = parse_root(&markup).map_err(|e| e.to_string())?;
    let size = match resolve_pixel_size(&root, None, dpi) {
        Err(ConvertError::DimensionUnavailable) => {
            resolve_pixel_size(&root, rasterizer.natural_size(&markup), dpi)
        }
        other => other,
    };
    size.map_err(|e| e.to_string())
}

type Converted = (u32, u32, usize, Vec<ConvertWarning>);

fn convert_one(
    rasterizer: &impl Rasterizer,
    encoder: &impl BaselineEncoder,
    source: &Path,
    output: &Path,
    options: &ConvertOptions,
) -> Result<Converted, String> {
    let markup = fs::read_to_string(source).map_err(|e| format!("read failed: {e}"))?;
    let conversion =
        convert_with_backend(rasterizer, encoder, &markup, options).map_err(|e| e.to_string())?;
    fs::write(output, conversion.artifact.data())
        .map_err(|e| format!("write {} failed: {e}", output.display()))?;
    Ok((
        conversion.width,
        conversion.height,
        conversion.artifact.len(),
        conversion.warnings,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockEncoder, MockRasterizer};
    use std::sync::mpsc;
    use tempfile::TempDir;

    const SQUARE: &str =
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"></svg>"#;

    fn options(format: &str) -> ConvertOptions {
        ConvertOptions {
            format: format.into(),
            dpi: 72,
            timestamp: Some("2024:01:01 00:00:00".into()),
            ..ConvertOptions::default()
        }
    }

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    // =========================================================================
    // collect_inputs
    // =========================================================================

    #[test]
    fn collects_svgs_recursively_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.svg", SQUARE);
        write(tmp.path(), "nested/A.SVG", SQUARE);
        write(tmp.path(), "notes.txt", "x");

        let files = collect_inputs(&[tmp.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"b.svg".to_string()));
        assert!(names.contains(&"A.SVG".to_string()));
    }

    #[test]
    fn explicit_file_kept_and_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "art.xml", SQUARE);
        let files = collect_inputs(&[file.clone(), file.clone()]).unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn missing_input_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = collect_inputs(&[tmp.path().join("nope.svg")]).unwrap_err();
        assert!(matches!(err, BatchError::InputNotFound(_)));
    }

    #[test]
    fn empty_directory_is_error() {
        let tmp = TempDir::new().unwrap();
        let err = collect_inputs(&[tmp.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, BatchError::NoInputs));
    }

    // =========================================================================
    // output_path
    // =========================================================================

    #[test]
    fn output_next_to_source_by_default() {
        let path = output_path(Path::new("art/logo.svg"), None, OutputFormat::Jpeg);
        assert_eq!(path, PathBuf::from("art/logo.jpg"));
    }

    #[test]
    fn output_keeps_dots_in_stem() {
        let path = output_path(Path::new("v1.2.svg"), None, OutputFormat::Png);
        assert_eq!(path, PathBuf::from("v1.2.png"));
    }

    #[test]
    fn output_into_out_dir() {
        let path = output_path(
            Path::new("art/icons/Star.SVG"),
            Some(Path::new("out")),
            OutputFormat::Tiff,
        );
        assert_eq!(path, PathBuf::from("out/Star.tiff"));
    }

    // =========================================================================
    // plan_outputs
    // =========================================================================

    #[test]
    fn distinct_stems_get_distinct_outputs() {
        let files = vec![PathBuf::from("a/logo.svg"), PathBuf::from("a/badge.svg")];
        let plan = plan_outputs(&files, Some(Path::new("out")), OutputFormat::Png);
        assert_eq!(plan[0], Ok(PathBuf::from("out/logo.png")));
        assert_eq!(plan[1], Ok(PathBuf::from("out/badge.png")));
    }

    #[test]
    fn same_stem_from_two_dirs_collides_in_out_dir() {
        let files = vec![PathBuf::from("a/logo.svg"), PathBuf::from("b/logo.svg")];
        let plan = plan_outputs(&files, Some(Path::new("out")), OutputFormat::Jpeg);
        assert_eq!(plan[0], Ok(PathBuf::from("out/logo.jpg")));
        let err = plan[1].as_ref().unwrap_err();
        assert!(err.contains("a/logo.svg"), "{err}");
    }

    #[test]
    fn same_stem_without_out_dir_only_collides_in_same_dir() {
        let files = vec![
            PathBuf::from("a/logo.svg"),
            PathBuf::from("b/logo.svg"),
            PathBuf::from("a/logo.SVG"),
        ];
        let plan = plan_outputs(&files, None, OutputFormat::Tiff);
        assert!(plan[0].is_ok());
        assert!(plan[1].is_ok());
        assert!(plan[2].is_err());
    }

    #[test]
    fn outputs_differing_only_in_case_collide() {
        let files = vec![PathBuf::from("Logo.svg"), PathBuf::from("logo.svg")];
        let plan = plan_outputs(&files, Some(Path::new("out")), OutputFormat::Png);
        assert!(plan[0].is_ok());
        assert!(plan[1].is_err());
    }

    // =========================================================================
    // convert_files_with_backend
    // =========================================================================

    #[test]
    fn converts_all_files_and_reports_events() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", SQUARE);
        let b = write(tmp.path(), "b.svg", SQUARE);
        let out = tmp.path().join("out");

        let rasterizer = MockRasterizer::filled([255, 0, 0, 255]);
        let encoder = MockEncoder::new();
        let (tx, rx) = mpsc::channel();
        let summary = convert_files_with_backend(
            &rasterizer,
            &encoder,
            &[a, b],
            Some(&out),
            &options("png"),
            Some(tx),
        )
        .unwrap();

        assert_eq!(summary.converted, 2);
        assert!(summary.failed.is_empty());
        assert!(out.join("a.png").exists());
        assert!(out.join("b.png").exists());

        let events: Vec<BatchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(
            e,
            BatchEvent::Converted {
                width: 10,
                height: 10,
                ..
            }
        )));
    }

    #[test]
    fn tiff_written_with_tiff_extension() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", SQUARE);
        let summary = convert_files_with_backend(
            &MockRasterizer::filled([0, 0, 0, 255]),
            &MockEncoder::new(),
            &[a],
            None,
            &options("tif"),
            None,
        )
        .unwrap();
        assert_eq!(summary.converted, 1);
        let bytes = fs::read(tmp.path().join("a.tiff")).unwrap();
        assert_eq!(&bytes[..4], b"MM\0\x2A");
    }

    #[test]
    fn one_bad_file_does_not_stop_others() {
        let tmp = TempDir::new().unwrap();
        let good = write(tmp.path(), "good.svg", SQUARE);
        let bad = write(tmp.path(), "bad.svg", "<html></html>");

        let summary = convert_files_with_backend(
            &MockRasterizer::filled([0, 0, 0, 255]),
            &MockEncoder::new(),
            &[good, bad.clone()],
            None,
            &options("png"),
            None,
        )
        .unwrap();

        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failed, vec![bad]);
        assert!(tmp.path().join("good.png").exists());
        assert!(matches!(
            summary.into_result(),
            Err(BatchError::Failed {
                failed: 1,
                total: 2
            })
        ));
    }

    #[test]
    fn same_stem_inputs_do_not_overwrite_each_other() {
        let tmp = TempDir::new().unwrap();
        let small = write(tmp.path(), "a/logo.svg", SQUARE);
        let large = write(
            tmp.path(),
            "b/logo.svg",
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="20"></svg>"#,
        );
        let out = tmp.path().join("out");

        let (tx, rx) = mpsc::channel();
        let summary = convert_files_with_backend(
            &MockRasterizer::filled([0, 0, 0, 255]),
            &MockEncoder::new(),
            &[small, large.clone()],
            Some(&out),
            &options("png"),
            Some(tx),
        )
        .unwrap();

        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failed, vec![large]);
        assert_eq!(fs::read_dir(&out).unwrap().count(), 1);
        // IHDR width of the kept file is the first input's
        let png = fs::read(out.join("logo.png")).unwrap();
        assert_eq!(crate::test_helpers::read_u32_be(&png, 16), 10);

        let failures = rx
            .iter()
            .filter(|e| matches!(e, BatchEvent::Failed { .. }))
            .count();
        assert_eq!(failures, 1);
    }

    #[test]
    fn recoverable_warnings_are_counted() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", SQUARE);
        let summary = convert_files_with_backend(
            &MockRasterizer::filled([0, 0, 0, 255]),
            &MockEncoder::corrupt(),
            &[a],
            None,
            &options("png"),
            None,
        )
        .unwrap();
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.warnings, 1);
    }

    #[test]
    fn invalid_options_fail_before_any_file() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", SQUARE);
        let rasterizer = MockRasterizer::filled([0, 0, 0, 255]);

        let err = convert_files_with_backend(
            &rasterizer,
            &MockEncoder::new(),
            &[a],
            None,
            &options("gif"),
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            BatchError::Options(ConvertError::UnsupportedFormat(_))
        ));
        assert!(rasterizer.get_calls().is_empty());
    }

    // =========================================================================
    // check_files
    // =========================================================================

    #[test]
    fn check_resolves_size_without_rendering() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", SQUARE);
        let rasterizer = MockRasterizer::filled([0, 0, 0, 255]);

        let reports = check_files(&rasterizer, &[a], 300).unwrap();
        // 10 * 300 / 72 = 41.67 -> 42
        assert_eq!(
            reports[0].result,
            Ok(Dimensions {
                width: 42,
                height: 42
            })
        );
        assert!(rasterizer.get_calls().is_empty());
    }

    #[test]
    fn check_uses_natural_size_fallback() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        let mut rasterizer = MockRasterizer::filled([0, 0, 0, 255]);
        rasterizer.natural = Some((100.0, 50.0));

        let reports = check_files(&rasterizer, &[a], 72).unwrap();
        assert_eq!(
            reports[0].result,
            Ok(Dimensions {
                width: 100,
                height: 50
            })
        );
    }

    #[test]
    fn check_reports_invalid_markup() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "a.svg", "<svg><g></svg>");
        let reports = check_files(&MockRasterizer::filled([0; 4]), &[a], 72).unwrap();
        assert!(reports[0].result.is_err());
    }

    #[test]
    fn check_rejects_invalid_dpi() {
        let err = check_files(&MockRasterizer::filled([0; 4]), &[], 0).unwrap_err();
        assert!(matches!(err, BatchError::Options(ConvertError::InvalidDpi(0))));
    }
}
