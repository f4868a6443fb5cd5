use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use frameaudit_analyzers::{Analyzer, AnalyzerError, AnalyzerFactory, AnalyzerOutput};
use frameaudit_common::{FrameauditError, FrameauditResult};
use frameaudit_pipeline::{BatchDriver, BatchOptions};
use frameaudit_processing_core::{ComparisonEngine, RawValue};
use frameaudit_summary_model::{
    AnalyzerDelta, AnalyzerKind, CountDelta, Manifest, MetaValue, VideoSummary,
};
use frameaudit_video::{FrameSource, MemoryFrameSource, RawFrame, VideoOpener};

/// Serves in-memory videos. Opening a file whose name contains "broken"
/// takes the detector models down until the next video is opened.
struct ScriptedOpener {
    models_down: Arc<AtomicBool>,
}

impl VideoOpener for ScriptedOpener {
    fn open(&self, path: &Path) -> FrameauditResult<Box<dyn FrameSource>> {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        self.models_down.store(name.contains("broken"), Ordering::SeqCst);
        if name.contains("unreadable") {
            return Err(FrameauditError::decode(path, "moov atom not found"));
        }
        // Matroska clips are short: 6 frames against 20.
        let frames = if name.ends_with(".mkv") { 6 } else { 20 };
        Ok(Box::new(MemoryFrameSource::solid(frames, 25.0, 8, 8)))
    }
}

/// Reads the frame index from the red channel. Persons sees one person,
/// two on frame 10. Phone sees none and crashes on frame 15.
struct Counter {
    kind: AnalyzerKind,
}

impl Analyzer for Counter {
    fn kind(&self) -> AnalyzerKind {
        self.kind
    }

    fn analyze(&mut self, frame: RawFrame) -> Result<AnalyzerOutput, AnalyzerError> {
        let index = frame.get_pixel(0, 0)[0];
        match self.kind {
            AnalyzerKind::Persons => {
                let count: u64 = if index == 10 { 2 } else { 1 };
                Ok(AnalyzerOutput::new(
                    frame,
                    RawValue::map([("person_count", count)]),
                ))
            }
            _ if index == 15 => Err(AnalyzerError::backend("detector crashed")),
            _ => Ok(AnalyzerOutput::new(
                frame,
                RawValue::map([("phone_count", 0u64)]),
            )),
        }
    }
}

struct ScriptedFactory {
    models_down: Arc<AtomicBool>,
}

impl AnalyzerFactory for ScriptedFactory {
    fn create(&self, kind: AnalyzerKind) -> Result<Box<dyn Analyzer>, AnalyzerError> {
        if self.models_down.load(Ordering::SeqCst) {
            return Err(AnalyzerError::load("weights unavailable"));
        }
        Ok(Box::new(Counter { kind }))
    }
}

fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

fn dataset(name: &str, videos: &[&str]) -> (PathBuf, PathBuf) {
    let base = std::env::temp_dir().join(name);
    let _ = std::fs::remove_dir_all(&base);
    let root = base.join("dataset");
    for video in videos {
        touch(&root.join(video));
    }
    (root, base.join("out"))
}

fn driver(jobs: usize, save_frames: bool) -> BatchDriver {
    let models_down = Arc::new(AtomicBool::new(false));
    BatchDriver::new(
        Arc::new(ScriptedOpener {
            models_down: Arc::clone(&models_down),
        }),
        Arc::new(ScriptedFactory { models_down }),
        BatchOptions {
            analyzers: vec!["persons".to_string(), "phone".to_string()],
            frame_stride: 5,
            max_seconds: None,
            save_annotated_frames: save_frames,
            jobs,
        },
    )
}

#[tokio::test]
async fn failed_videos_are_left_out_and_the_batch_continues() {
    let (root, out) = dataset(
        "frameaudit_test_batch_continues",
        &[
            "alice/exam.mp4",
            "bob/broken.mp4",
            "bob/later.mkv",
            "carol/unreadable.avi",
        ],
    );

    let report = driver(1, false).run(&root, &out).await.unwrap();

    let keys: Vec<&str> = report.manifest.keys().collect();
    assert_eq!(keys, ["alice/exam.mp4", "bob/later.mkv"]);

    let failed: Vec<&str> = report.failed.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(failed, ["bob/broken.mp4", "carol/unreadable.avi"]);
    assert!(matches!(report.failed[0].1, FrameauditError::NoAnalyzersLoaded));
    assert!(matches!(report.failed[1].1, FrameauditError::Decode { .. }));

    // Written manifest matches the returned one.
    let on_disk = Manifest::load(out.join("all_results.json")).unwrap();
    assert_eq!(on_disk, report.manifest);

    let entry = on_disk.get("alice/exam.mp4").unwrap();
    assert_eq!(entry.frame_count, 4);
    assert_eq!(entry.models, ["persons", "phone"]);
    assert!(Path::new(&entry.summary_path).ends_with("alice/exam/exam_summary.json"));

    std::fs::remove_dir_all(out.parent().unwrap()).ok();
}

#[tokio::test]
async fn analyzer_crash_on_one_frame_only_drops_that_record() {
    let (root, out) = dataset("frameaudit_test_batch_crash", &["alice/exam.mp4"]);

    let report = driver(1, true).run(&root, &out).await.unwrap();
    assert_eq!(report.item_failures, 1);

    let entry = report.manifest.get("alice/exam.mp4").unwrap();
    let summary = VideoSummary::load(&entry.summary_path).unwrap();

    let phone: Vec<u64> = summary
        .series("phone")
        .unwrap()
        .iter()
        .map(|r| r.frame_index)
        .collect();
    assert_eq!(phone, [0, 5, 10]);
    assert_eq!(summary.series("persons").unwrap().len(), 4);

    let frames = out.join("alice").join("exam").join("frames");
    assert!(frames.join("frame_00010_persons.jpg").is_file());
    assert!(frames.join("frame_00015_persons.jpg").is_file());
    assert!(!frames.join("frame_00015_phone.jpg").exists());

    std::fs::remove_dir_all(out.parent().unwrap()).ok();
}

#[tokio::test]
async fn videos_sharing_a_name_keep_separate_outputs() {
    let (root, out) = dataset(
        "frameaudit_test_batch_shared_names",
        &[
            "alice/exam.mp4",
            "alice/exam.mkv",
            "bob/s1/cam.mp4",
            "bob/s2/cam.mp4",
        ],
    );

    let report = driver(2, true).run(&root, &out).await.unwrap();

    assert!(report.failed.is_empty());
    let keys: Vec<&str> = report.manifest.keys().collect();
    assert_eq!(
        keys,
        [
            "alice/exam.mkv",
            "alice/exam.mp4",
            "bob/s1/cam.mp4",
            "bob/s2/cam.mp4"
        ]
    );

    let mkv = report.manifest.get("alice/exam.mkv").unwrap();
    let mp4 = report.manifest.get("alice/exam.mp4").unwrap();
    assert_ne!(mkv.summary_path, mp4.summary_path);
    assert_eq!(mkv.frame_count, 2);
    assert_eq!(mp4.frame_count, 4);

    // Each entry points at its own data.
    let short = VideoSummary::load(&mkv.summary_path).unwrap();
    assert_eq!(short.series("persons").unwrap().len(), 2);
    let long = VideoSummary::load(&mp4.summary_path).unwrap();
    assert_eq!(long.series("persons").unwrap().len(), 4);

    let s1 = report.manifest.get("bob/s1/cam.mp4").unwrap();
    let s2 = report.manifest.get("bob/s2/cam.mp4").unwrap();
    assert_ne!(s1.summary_path, s2.summary_path);
    assert!(Path::new(&s1.summary_path).is_file());
    assert!(Path::new(&s2.summary_path).is_file());
    assert!(out
        .join("bob")
        .join("s1")
        .join("cam_mp4")
        .join("frames")
        .join("frame_00000_persons.jpg")
        .is_file());

    std::fs::remove_dir_all(out.parent().unwrap()).ok();
}

#[tokio::test]
async fn parallel_runs_produce_the_same_manifest() {
    let videos = ["a/1.mp4", "a/2.mp4", "b/3.mp4", "b/unreadable.mp4", "c/4.mov"];
    let (root, out) = dataset("frameaudit_test_batch_parallel_seq", &videos);
    let sequential = driver(1, false).run(&root, &out).await.unwrap();

    let (root_par, out_par) = dataset("frameaudit_test_batch_parallel_par", &videos);
    let parallel = driver(3, false).run(&root_par, &out_par).await.unwrap();

    let seq_keys: Vec<&str> = sequential.manifest.keys().collect();
    let par_keys: Vec<&str> = parallel.manifest.keys().collect();
    assert_eq!(seq_keys, par_keys);
    assert_eq!(seq_keys, ["a/1.mp4", "a/2.mp4", "b/3.mp4", "c/4.mov"]);
    assert_eq!(parallel.failed.len(), 1);
    assert_eq!(parallel.item_failures, sequential.item_failures);

    std::fs::remove_dir_all(out.parent().unwrap()).ok();
    std::fs::remove_dir_all(out_par.parent().unwrap()).ok();
}

#[tokio::test]
async fn batch_output_feeds_the_comparison_engine() {
    let (root, out) = dataset("frameaudit_test_batch_compare", &["alice/exam.mp4"]);

    let report = driver(1, false).run(&root, &out).await.unwrap();
    let entry = report.manifest.get("alice/exam.mp4").unwrap();
    let summary = VideoSummary::load(&entry.summary_path).unwrap();

    let comparison = ComparisonEngine::new().compare(&summary, 5, 15).unwrap();

    assert_eq!(comparison.total_comparisons, 2);
    let up = &comparison.pairwise_comparisons[0];
    assert_eq!((up.frame1, up.frame2), (5, 10));
    assert_eq!(
        up.results["persons"],
        AnalyzerDelta::Count(CountDelta { count_diff: 1 })
    );
    assert_eq!(
        up.results["phone"],
        AnalyzerDelta::Count(CountDelta { count_diff: 0 })
    );

    // No phone record at 15: only persons compares across (10, 15).
    let down = &comparison.pairwise_comparisons[1];
    assert_eq!(
        down.results.keys().map(String::as_str).collect::<Vec<_>>(),
        ["persons"]
    );
    assert_eq!(
        summary.series("persons").unwrap()[0].meta.get("person_count"),
        Some(&MetaValue::Int(1))
    );

    std::fs::remove_dir_all(out.parent().unwrap()).ok();
}

#[tokio::test]
async fn missing_dataset_root_fails_the_run() {
    let base = std::env::temp_dir().join("frameaudit_test_batch_no_root");
    let _ = std::fs::remove_dir_all(&base);

    let err = driver(1, false)
        .run(&base.join("dataset"), &base.join("out"))
        .await
        .unwrap_err();
    assert!(matches!(err, FrameauditError::DatasetRoot { .. }));
}
