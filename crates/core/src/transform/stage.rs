//! The ffmpeg transform stage.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::warn;

use crate::metrics::{TRANSFORM_DURATION, TRANSFORM_FAILURES, TRANSFORM_RUNS};

use super::binaries::{BinaryKind, FfmpegBinaries};
use super::error::TransformError;
use super::options::OptionSet;
use super::status::{keys, LogLevel, StatusSink};
use super::task_config::TaskConfig;
use super::traits::{Transcoder, Transform};
use super::types::{FilePair, InputRef, TranscodeMode, TranscodeRequest, TransformState};

/// Transcodes a single input with ffmpeg, reporting progress to the host.
pub struct FfmpegTransform<T: Transcoder> {
    config: TaskConfig,
    transcoder: Arc<T>,
    sink: Arc<dyn StatusSink>,
    binaries: Option<FfmpegBinaries>,
}

impl<T: Transcoder> FfmpegTransform<T> {
    /// Creates a stage for one activation.
    pub fn new(config: TaskConfig, transcoder: Arc<T>, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            config,
            transcoder,
            sink,
            binaries: None,
        }
    }

    /// Binaries validated by `prepare`, if it has run.
    pub fn binaries(&self) -> Option<&FfmpegBinaries> {
        self.binaries.as_ref()
    }

    /// Resolves and validates the binaries, then checks that exactly one
    /// source was matched.
    pub async fn prepare(&mut self, inputs: &[InputRef]) -> Result<(), TransformError> {
        self.binaries = None;

        let binaries =
            FfmpegBinaries::resolve(&self.config).inspect_err(|e| self.fail(e, None))?;

        self.sink.log(
            LogLevel::Debug,
            &format!(
                "FFMPEG binaries ffmpeg=[{}] ffprobe=[{}]",
                binaries.ffmpeg.display(),
                binaries.ffprobe.display()
            ),
        );
        self.sink.set_info(
            keys::FFMPEG_BINARY,
            json!(binaries.ffmpeg.to_string_lossy()),
        );
        self.sink.set_info(
            keys::FFPROBE_BINARY,
            json!(binaries.ffprobe.to_string_lossy()),
        );

        binaries
            .validate(self.transcoder.as_ref())
            .await
            .inspect_err(|e| self.fail(e, None))?;

        if inputs.len() > 1 {
            let err = TransformError::SourceShouldBeUnique {
                count: inputs.len(),
            };
            self.fail(&err, None);
            return Err(err);
        }

        self.binaries = Some(binaries);
        Ok(())
    }

    /// Transforms each pair in turn.
    pub async fn process<I>(&self, pairs: I) -> Result<(), TransformError>
    where
        I: IntoIterator<Item = FilePair>,
    {
        let binaries = self.binaries.as_ref().ok_or_else(|| {
            TransformError::missing_binary(BinaryKind::Ffmpeg, "binaries were not prepared")
        })?;

        for pair in pairs {
            self.transform(binaries, &pair).await?;
        }
        Ok(())
    }

    /// Runs one pair from `Idle` to a terminal state.
    async fn transform(
        &self,
        binaries: &FfmpegBinaries,
        pair: &FilePair,
    ) -> Result<(), TransformError> {
        let start = Instant::now();
        let mut state = StateTracker::new(self.sink.as_ref());

        let result = self.run(binaries, pair, &mut state).await;
        TRANSFORM_DURATION.observe(start.elapsed().as_secs_f64());

        match &result {
            Ok(()) => {
                state.advance(TransformState::Succeeded);
                TRANSFORM_RUNS.with_label_values(&["success"]).inc();
            }
            Err(e) => {
                state.advance(TransformState::Failed);
                TRANSFORM_RUNS.with_label_values(&["failed"]).inc();
                self.fail(e, Some(pair));
            }
        }
        result
    }

    async fn run(
        &self,
        binaries: &FfmpegBinaries,
        pair: &FilePair,
        state: &mut StateTracker<'_>,
    ) -> Result<(), TransformError> {
        let info = match self.transcoder.probe(binaries, &pair.input.path).await {
            Ok(info) => info,
            Err(e) => {
                let err = TransformError::from_probe(e);
                if let TransformError::VideoError(detail) = &err {
                    self.sink.log(
                        LogLevel::Error,
                        &format!("FFMPEG probe error [{}] : {}", pair.input.name, detail),
                    );
                }
                return Err(err);
            }
        };
        self.sink.set_info(keys::FFMPEG_SIZE, json!(info.size_bytes));
        self.sink.set_info(keys::FFMPEG_DURATION, json!(info.duration_secs));
        self.sink
            .set_info(keys::FFMPEG_RESOLUTION, json!(info.resolution()));
        state.advance(TransformState::Probed);

        let mut working = self.config.working_options();
        let options = OptionSet::take_from(&mut working);
        let options_json = json!(options);
        self.sink.set_info(keys::FFMPEG_OPTIONS, options_json.clone());

        let mode = TranscodeMode::unchecked();
        self.sink
            .set_info(keys::TRANSCODER_OPTIONS, json!({ "validate": mode.validate }));
        state.advance(TransformState::OptionsBuilt);

        self.sink.log(
            LogLevel::Info,
            &format!(
                "ffmpeg_command [{}] [{}] > [{}] {}",
                binaries.ffmpeg.display(),
                pair.input.name,
                pair.output.name,
                options_json
            ),
        );

        let request = TranscodeRequest {
            input: pair.input.path.clone(),
            output: pair.output.path.clone(),
            options,
            mode,
            duration_secs: Some(info.duration_secs),
        };

        state.advance(TransformState::Running);
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let transcode = self.transcoder.transcode(binaries, request, progress_tx);
        let forward = async {
            while let Some(event) = progress_rx.recv().await {
                self.sink
                    .set_info(keys::TRANSFER_PROGRESS, json!(event.percent()));
                self.sink
                    .log(LogLevel::Info, &format!("progress {}", event.fraction()));
            }
        };
        let (result, ()) = tokio::join!(transcode, forward);

        result.map_err(TransformError::from_transcode)
    }

    /// Logs a failure with its context before it is returned.
    fn fail(&self, err: &TransformError, pair: Option<&FilePair>) {
        TRANSFORM_FAILURES
            .with_label_values(&[err.kind().as_str()])
            .inc();

        let ffmpeg = self
            .config
            .command
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let files = pair
            .map(|pair| format!(" [{}] > [{}]", pair.input.name, pair.output.name))
            .unwrap_or_default();

        self.sink.log(
            LogLevel::Error,
            &format!(
                "transform failed [{}] ffmpeg=[{}]{}: {}",
                err.kind(),
                ffmpeg,
                files,
                err
            ),
        );
    }
}

#[async_trait]
impl<T: Transcoder> Transform for FfmpegTransform<T> {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn prepare(&mut self, inputs: &[InputRef]) -> Result<(), TransformError> {
        FfmpegTransform::prepare(self, inputs).await
    }

    async fn process(&mut self, pairs: Vec<FilePair>) -> Result<(), TransformError> {
        FfmpegTransform::process(self, pairs).await
    }
}

/// Tracks the state of one pair and reports every transition.
struct StateTracker<'a> {
    sink: &'a dyn StatusSink,
    current: TransformState,
}

impl<'a> StateTracker<'a> {
    fn new(sink: &'a dyn StatusSink) -> Self {
        sink.set_info(keys::TRANSFORM_STATE, json!(TransformState::Idle.as_str()));
        Self {
            sink,
            current: TransformState::Idle,
        }
    }

    fn advance(&mut self, next: TransformState) {
        if !self.current.can_transition_to(next) {
            warn!(from = %self.current, to = %next, "Ignoring illegal transform state transition");
            return;
        }
        self.current = next;
        self.sink
            .set_info(keys::TRANSFORM_STATE, json!(next.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTranscoder, RecordingStatusSink};
    use crate::transform::error::{ErrorKind, TranscoderError};
    use crate::transform::probe::ProbeInfo;
    use crate::transform::types::FileRef;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Harness {
        dir: TempDir,
        transcoder: MockTranscoder,
        sink: Arc<RecordingStatusSink>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            std::fs::write(dir.path().join("ffmpeg"), b"").unwrap();
            std::fs::write(dir.path().join("ffprobe"), b"").unwrap();
            Self {
                dir,
                transcoder: MockTranscoder::new(),
                sink: Arc::new(RecordingStatusSink::new()),
            }
        }

        fn config(&self) -> TaskConfig {
            TaskConfig::with_command(self.dir.path().join("ffmpeg"))
                .with_option("video_codec", "h264")
                .with_option("custom", json!({ "preset": "fast" }))
        }

        fn stage(&self, config: TaskConfig) -> FfmpegTransform<MockTranscoder> {
            FfmpegTransform::new(
                config,
                Arc::new(self.transcoder.clone()),
                self.sink.clone(),
            )
        }

        fn pair(&self) -> FilePair {
            let input = self.dir.path().join("in.mov");
            std::fs::write(&input, b"movie").unwrap();
            FilePair::new(
                FileRef::from_path(input),
                FileRef::from_path(self.dir.path().join("out.mp4")),
            )
        }
    }

    fn probe_info(path: PathBuf) -> ProbeInfo {
        ProbeInfo {
            path,
            size_bytes: 4096,
            duration_secs: 12.0,
            format: "mov".to_string(),
            bitrate_kbps: None,
            video_codec: Some("prores".to_string()),
            width: Some(1920),
            height: Some(1080),
            frame_rate: Some(25.0),
            audio_codec: None,
            audio_sample_rate: None,
            audio_channels: None,
        }
    }

    #[tokio::test]
    async fn test_prepare_requires_command() {
        let harness = Harness::new();
        let mut stage = harness.stage(TaskConfig::default());
        let err = stage.prepare(&[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransformMissingBinary);
        assert!(stage.binaries().is_none());
    }

    #[tokio::test]
    async fn test_prepare_rejects_multiple_inputs() {
        let harness = Harness::new();
        let mut stage = harness.stage(harness.config());
        let inputs = vec![FileRef::from_path("/a.mov"), FileRef::from_path("/b.mov")];

        let err = stage.prepare(&inputs).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceShouldBeUnique);
        assert!(matches!(
            err,
            TransformError::SourceShouldBeUnique { count: 2 }
        ));
    }

    #[tokio::test]
    async fn test_prepare_reports_binaries() {
        let harness = Harness::new();
        let mut stage = harness.stage(harness.config());
        stage.prepare(&[FileRef::from_path("/a.mov")]).await.unwrap();

        let binaries = stage.binaries().unwrap();
        assert_eq!(binaries.ffprobe, harness.dir.path().join("ffprobe"));
        assert_eq!(
            harness.sink.info(keys::FFPROBE_BINARY),
            Some(json!(harness.dir.path().join("ffprobe").to_string_lossy()))
        );
    }

    #[tokio::test]
    async fn test_process_before_prepare_fails() {
        let harness = Harness::new();
        let stage = harness.stage(harness.config());
        let err = stage.process(vec![harness.pair()]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransformMissingBinary);
    }

    #[tokio::test]
    async fn test_successful_transform_states_and_info() {
        let harness = Harness::new();
        let pair = harness.pair();
        harness
            .transcoder
            .set_probe_result(&pair.input.path, probe_info(pair.input.path.clone()))
            .await;
        harness.transcoder.set_progress_steps(vec![0.0, 0.5, 1.0]).await;

        let mut stage = harness.stage(harness.config());
        stage.prepare(&[pair.input.clone()]).await.unwrap();
        stage.process(vec![pair.clone()]).await.unwrap();

        assert_eq!(
            harness.sink.states(),
            vec!["idle", "probed", "options_built", "running", "succeeded"]
        );
        assert_eq!(harness.sink.info(keys::FFMPEG_SIZE), Some(json!(4096)));
        assert_eq!(
            harness.sink.info(keys::FFMPEG_RESOLUTION),
            Some(json!("1920x1080"))
        );
        assert_eq!(
            harness.sink.info(keys::TRANSCODER_OPTIONS),
            Some(json!({ "validate": false }))
        );
        assert_eq!(
            harness.sink.info(keys::FFMPEG_OPTIONS),
            Some(json!({
                "video_codec": "h264",
                "custom": ["-preset", "fast"],
                "threads": 2
            }))
        );
        assert_eq!(harness.sink.progress(), vec![0.0, 50.0, 100.0]);

        let requests = harness.transcoder.recorded_requests().await;
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert!(!request.mode.validate);
        assert_eq!(request.duration_secs, Some(12.0));
        assert_eq!(request.options.video_codec, Some("h264".into()));
        assert_eq!(request.options.custom, vec!["-preset", "fast"]);
        assert_eq!(request.options.threads, 2);
    }

    #[tokio::test]
    async fn test_missing_input_is_video_not_found() {
        let harness = Harness::new();
        let mut stage = harness.stage(harness.config());
        stage.prepare(&[]).await.unwrap();

        let pair = FilePair::new(
            FileRef::from_path(harness.dir.path().join("absent.mov")),
            FileRef::from_path(harness.dir.path().join("out.mp4")),
        );
        let err = stage.process(vec![pair]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ErrorVideoNotFound);
        assert_eq!(harness.sink.states(), vec!["idle", "failed"]);
        assert!(harness.transcoder.recorded_requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_probe_failure_is_logged_video_error() {
        let harness = Harness::new();
        let pair = harness.pair();
        harness
            .transcoder
            .set_probe_error(TranscoderError::probe_failed(
                "ffprobe exited with code: Some(1)",
                Some("moov atom not found".to_string()),
            ))
            .await;

        let mut stage = harness.stage(harness.config());
        stage.prepare(&[pair.input.clone()]).await.unwrap();
        let err = stage.process(vec![pair]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ErrorVideoError);
        assert!(harness
            .sink
            .logs(LogLevel::Error)
            .iter()
            .any(|m| m.contains("moov atom not found")));
    }

    #[tokio::test]
    async fn test_transcode_failure_is_translated() {
        let harness = Harness::new();
        let pair = harness.pair();
        harness.transcoder.set_progress_steps(vec![0.25]).await;
        harness
            .transcoder
            .set_transcode_error(TranscoderError::process_failed(
                "ffmpeg exited with code: Some(1)",
                Some(1),
                Some("Conversion failed!".to_string()),
            ))
            .await;

        let mut stage = harness.stage(harness.config());
        stage.prepare(&[pair.input.clone()]).await.unwrap();
        let err = stage.process(vec![pair]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TranscodeFailed);
        assert_eq!(
            harness.sink.states(),
            vec!["idle", "probed", "options_built", "running", "failed"]
        );
        assert_eq!(harness.sink.progress(), vec![25.0]);
        assert!(harness
            .sink
            .logs(LogLevel::Error)
            .iter()
            .any(|m| m.contains("[transcode_failed]") && m.contains("[in.mov] > [out.mp4]")));
    }

    #[tokio::test]
    async fn test_each_pair_gets_fresh_options() {
        let harness = Harness::new();
        let first = harness.pair();
        let second = first.clone();

        let mut stage = harness.stage(harness.config());
        stage.prepare(&[first.input.clone()]).await.unwrap();
        stage.process(vec![first, second]).await.unwrap();

        let requests = harness.transcoder.recorded_requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests
            .iter()
            .all(|r| r.options.video_codec == Some("h264".into())));
    }

    #[tokio::test]
    async fn test_stage_through_transform_trait() {
        let harness = Harness::new();
        let pair = harness.pair();
        let mut stage: Box<dyn Transform> = Box::new(harness.stage(harness.config()));

        assert_eq!(stage.name(), "ffmpeg");
        stage.prepare(&[pair.input.clone()]).await.unwrap();
        stage.process(vec![pair]).await.unwrap();
        assert_eq!(harness.transcoder.recorded_requests().await.len(), 1);
    }
}
