//! Batch processing of a dataset directory.
//!
//! Layout of a dataset root: one directory per subject, videos anywhere
//! below it. Outputs go to `<out>/<subject>/<video-stem>/`, and the manifest
//! of every successfully processed video goes to `<out>/all_results.json`.

use std::collections::HashSet;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use frameaudit_analyzers::AnalyzerFactory;
use frameaudit_common::{FrameauditError, FrameauditResult};
use frameaudit_summary_model::{Manifest, ManifestEntry};
use frameaudit_video::{is_video_file, VideoOpener};
use tokio::sync::Semaphore;

use crate::pipeline::{FrameProcessingPipeline, PipelineOptions};
use crate::registry::AnalyzerRegistry;

/// File name of the aggregate manifest.
pub const MANIFEST_FILE: &str = "all_results.json";

/// Settings shared by every video of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Analyzer names, in dispatch order.
    pub analyzers: Vec<String>,
    pub frame_stride: u64,
    pub max_seconds: Option<f64>,
    pub save_annotated_frames: bool,
    /// Videos processed at the same time.
    pub jobs: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        let defaults = PipelineOptions::default();
        Self {
            analyzers: frameaudit_common::DEFAULT_ANALYZERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            frame_stride: defaults.frame_stride,
            max_seconds: defaults.max_seconds,
            save_annotated_frames: true,
            jobs: 1,
        }
    }
}

/// One video found under the dataset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoJob {
    pub subject: String,
    pub path: PathBuf,
    key: String,
    output: PathBuf,
}

impl VideoJob {
    /// Manifest key: `"<subject>/<file name>"`, or the full path below the
    /// subject directory when another video of the subject has the same
    /// file name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string())
    }

    /// Directory this video's outputs are written to. Unique within a
    /// batch.
    pub fn output_dir(&self, output_root: &Path) -> PathBuf {
        output_root.join(&self.output)
    }
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchReport {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
    /// Videos left out of the manifest, keyed like manifest entries.
    pub failed: Vec<(String, FrameauditError)>,
    /// Item-level failures (frames, analyzer calls) across all videos.
    pub item_failures: usize,
}

/// Runs the pipeline over every video of a dataset.
#[derive(Clone)]
pub struct BatchDriver {
    opener: Arc<dyn VideoOpener>,
    factory: Arc<dyn AnalyzerFactory>,
    options: BatchOptions,
}

impl std::fmt::Debug for BatchDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchDriver")
            .field("options", &self.options)
            .finish()
    }
}

struct VideoOutcome {
    entry: ManifestEntry,
    item_failures: usize,
}

impl BatchDriver {
    pub fn new(
        opener: Arc<dyn VideoOpener>,
        factory: Arc<dyn AnalyzerFactory>,
        options: BatchOptions,
    ) -> Self {
        Self {
            opener,
            factory,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Process every video under `dataset_root` and write the manifest.
    ///
    /// A video that fails is logged and left out of the manifest. Only a
    /// missing dataset root or an unwritable manifest fails the run.
    pub async fn run(
        &self,
        dataset_root: &Path,
        output_root: &Path,
    ) -> FrameauditResult<BatchReport> {
        let jobs = discover_videos(dataset_root)?;
        tracing::info!(
            root = %dataset_root.display(),
            videos = jobs.len(),
            "Found videos"
        );
        std::fs::create_dir_all(output_root)?;

        let permits = Arc::new(Semaphore::new(self.options.jobs.max(1)));
        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let driver = self.clone();
            let permits = Arc::clone(&permits);
            let output_root = output_root.to_path_buf();
            handles.push(tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| FrameauditError::Other(e.into()))?;
                let worker_job = job.clone();
                // A panicking video fails that video only.
                let result = tokio::task::spawn_blocking(move || {
                    driver.process_video(&worker_job, &output_root)
                })
                .await
                .unwrap_or_else(|e| Err(FrameauditError::Other(e.into())));
                Ok::<_, FrameauditError>((job, result))
            }));
        }

        // Reduce in discovery order so the manifest is deterministic.
        let mut manifest = Manifest::new();
        let mut failed = Vec::new();
        let mut item_failures = 0;
        for handle in handles {
            let (job, result) = handle
                .await
                .map_err(|e| FrameauditError::Other(e.into()))??;
            match result {
                Ok(outcome) => {
                    item_failures += outcome.item_failures;
                    manifest.insert(job.key(), outcome.entry);
                }
                Err(e) => {
                    tracing::error!(video = %job.path.display(), error = %e, "Video failed");
                    failed.push((job.key().to_string(), e));
                }
            }
        }

        let manifest_path = output_root.join(MANIFEST_FILE);
        manifest
            .save(&manifest_path)
            .map_err(|e| FrameauditError::Other(e.into()))?;
        tracing::info!(
            path = %manifest_path.display(),
            processed = manifest.len(),
            failed = failed.len(),
            "Saved manifest"
        );

        Ok(BatchReport {
            manifest,
            manifest_path,
            failed,
            item_failures,
        })
    }

    fn process_video(&self, job: &VideoJob, output_root: &Path) -> FrameauditResult<VideoOutcome> {
        let out_dir = job.output_dir(output_root);
        tracing::info!(
            video = %job.path.display(),
            out = %out_dir.display(),
            "Processing"
        );

        let mut source = self.opener.open(&job.path)?;
        // A fresh registry per video keeps analyzer state from leaking.
        let mut registry =
            AnalyzerRegistry::build(&self.options.analyzers, self.factory.as_ref())?;

        let pipeline = FrameProcessingPipeline::new(PipelineOptions {
            frame_stride: self.options.frame_stride,
            max_seconds: self.options.max_seconds,
            frames_dir: self
                .options
                .save_annotated_frames
                .then(|| out_dir.join("frames")),
        })?;
        let output = pipeline.run(&job.path, source.as_mut(), &mut registry)?;

        let summary_path = out_dir.join(format!("{}_summary.json", job.stem()));
        output
            .summary
            .save(&summary_path)
            .map_err(|e| FrameauditError::Other(e.into()))?;
        tracing::info!(path = %summary_path.display(), "Saved summary");

        Ok(VideoOutcome {
            entry: ManifestEntry {
                summary_path: summary_path.display().to_string(),
                frame_count: output.frames_processed,
                models: registry.names().into_iter().map(String::from).collect(),
            },
            item_failures: output
                .failures
                .iter()
                .filter(|e| e.is_item_scoped())
                .count(),
        })
    }
}

/// Every video under each subject directory of `root`, sorted by subject
/// and then by path.
///
/// Videos of one subject that share a file name get keys spelled out with
/// their path below the subject directory. Videos that share a stem get
/// output directories named after their relative path and extension, so no
/// two videos write to the same place.
pub fn discover_videos(root: &Path) -> FrameauditResult<Vec<VideoJob>> {
    if !root.is_dir() {
        return Err(FrameauditError::DatasetRoot {
            path: root.to_path_buf(),
        });
    }

    let mut subjects: Vec<PathBuf> = std::fs::read_dir(root)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    subjects.sort();

    let mut jobs = Vec::new();
    for subject_dir in subjects {
        let subject = file_name(&subject_dir);
        let mut videos = Vec::new();
        collect_videos(&subject_dir, &mut videos);
        videos.sort();
        jobs.extend(videos.into_iter().map(|path| {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "video".to_string());
            VideoJob {
                key: Manifest::key(&subject, &file_name(&path)),
                output: Path::new(&subject).join(stem),
                subject: subject.clone(),
                path,
            }
        }));
    }

    disambiguate(&mut jobs, root);
    Ok(jobs)
}

fn disambiguate(jobs: &mut [VideoJob], root: &Path) {
    let key_clashes = clashing(jobs.iter().map(|job| job.key.clone()));
    let output_clashes = clashing(jobs.iter().map(|job| job.output.clone()));
    let mut taken: HashSet<PathBuf> = jobs
        .iter()
        .filter(|job| !output_clashes.contains(&job.output))
        .map(|job| job.output.clone())
        .collect();

    for job in jobs.iter_mut() {
        let relative = job
            .path
            .strip_prefix(root.join(&job.subject))
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(file_name(&job.path)));

        if key_clashes.contains(&job.key) {
            let spelled: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            let key = Manifest::key(&job.subject, &spelled.join("/"));
            tracing::warn!(
                video = %job.path.display(),
                key = %key,
                "File name shared with another video of the subject, keying by path"
            );
            job.key = key;
        }

        if output_clashes.contains(&job.output) {
            let extension = job
                .path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = format!("{}_{extension}", job.stem());
            let base = match relative.parent() {
                Some(parent) => Path::new(&job.subject).join(parent).join(&name),
                None => Path::new(&job.subject).join(&name),
            };
            let mut output = base.clone();
            let mut n = 2;
            while !taken.insert(output.clone()) {
                output = base.with_file_name(format!("{name}_{n}"));
                n += 1;
            }
            tracing::warn!(
                video = %job.path.display(),
                output = %output.display(),
                "Stem shared with another video of the subject, using a separate output directory"
            );
            job.output = output;
        }
    }
}

/// Values that occur more than once.
fn clashing<T: Eq + Hash>(values: impl Iterator<Item = T>) -> HashSet<T> {
    let mut seen = HashSet::new();
    let mut clashes = HashSet::new();
    for value in values {
        if let Some(value) = seen.replace(value) {
            clashes.insert(value);
        }
    }
    clashes
}

fn collect_videos(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "Cannot list directory");
            return;
        }
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        if path.is_dir() {
            collect_videos(&path, out);
        } else if is_video_file(&path) {
            out.push(path);
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"").unwrap();
    }

    #[test]
    fn test_discovery_walks_subjects_recursively() {
        let root = std::env::temp_dir().join("frameaudit_test_discovery");
        let _ = std::fs::remove_dir_all(&root);

        touch(&root.join("bob").join("session1").join("cam.MOV"));
        touch(&root.join("alice").join("exam.mp4"));
        touch(&root.join("alice").join("notes.txt"));
        touch(&root.join("loose.mp4"));

        let jobs = discover_videos(&root).unwrap();
        let keys: Vec<&str> = jobs.iter().map(VideoJob::key).collect();
        assert_eq!(keys, ["alice/exam.mp4", "bob/cam.MOV"]);
        assert_eq!(
            jobs[1].output_dir(Path::new("/out")),
            Path::new("/out").join("bob").join("cam")
        );

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_clashing_names_get_distinct_keys_and_outputs() {
        let root = std::env::temp_dir().join("frameaudit_test_discovery_clashes");
        let _ = std::fs::remove_dir_all(&root);

        touch(&root.join("alice").join("exam.mp4"));
        touch(&root.join("alice").join("exam.mkv"));
        touch(&root.join("alice").join("notes.mp4"));
        touch(&root.join("bob").join("s1").join("cam.mp4"));
        touch(&root.join("bob").join("s2").join("cam.mp4"));

        let jobs = discover_videos(&root).unwrap();
        let keys: Vec<&str> = jobs.iter().map(VideoJob::key).collect();
        assert_eq!(
            keys,
            [
                "alice/exam.mkv",
                "alice/exam.mp4",
                "alice/notes.mp4",
                "bob/s1/cam.mp4",
                "bob/s2/cam.mp4"
            ]
        );

        let out = Path::new("/out");
        let dirs: Vec<PathBuf> = jobs.iter().map(|j| j.output_dir(out)).collect();
        assert_eq!(
            dirs,
            [
                out.join("alice").join("exam_mkv"),
                out.join("alice").join("exam_mp4"),
                out.join("alice").join("notes"),
                out.join("bob").join("s1").join("cam_mp4"),
                out.join("bob").join("s2").join("cam_mp4"),
            ]
        );

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_disambiguated_output_avoids_natural_names() {
        let root = std::env::temp_dir().join("frameaudit_test_discovery_suffix");
        let _ = std::fs::remove_dir_all(&root);

        // `exam_mp4.avi` naturally owns `exam_mp4`.
        touch(&root.join("alice").join("exam.mp4"));
        touch(&root.join("alice").join("exam.mov"));
        touch(&root.join("alice").join("exam_mp4.avi"));

        let jobs = discover_videos(&root).unwrap();
        let dirs: HashSet<PathBuf> = jobs.iter().map(|j| j.output_dir(&root)).collect();
        assert_eq!(dirs.len(), 3);
        assert!(dirs.contains(&root.join("alice").join("exam_mp4")));
        assert!(dirs.contains(&root.join("alice").join("exam_mp4_2")));

        std::fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let root = std::env::temp_dir().join("frameaudit_test_no_such_root");
        let _ = std::fs::remove_dir_all(&root);
        assert!(matches!(
            discover_videos(&root),
            Err(FrameauditError::DatasetRoot { .. })
        ));
    }
}
