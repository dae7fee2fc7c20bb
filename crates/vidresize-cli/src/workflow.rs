//! Upload, resize and download workflow.
//!
//! One submission walks `Idle → Validating → RequestingCredential → Uploading →
//! SubmittingJob → Polling → Downloading → Done`; any step can end in `Failed`.
//! Every failure is reported once, by `submit`, through the progress display.
//! Nothing is rolled back: an uploaded object or submitted job stays where it is.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use vidresize_api_client::{wait_for_job, Clock, PollPolicy, ResizeApi, TokioClock};
use vidresize_core::{
    LogLevel, ResizeJobDescriptor, ResizerConfig, UploadRequest, WorkflowError, WorkflowResult,
};

use crate::output::save_result;
use crate::progress::ProgressReporter;

pub const MSG_REQUESTING_URL: &str = "Requesting pre-signed URL...";
pub const MSG_UPLOADING: &str = "Uploading file to S3...";
pub const MSG_PROCESSING: &str = "Processing video...";
pub const MSG_WAITING: &str = "Waiting for processing to complete...";
pub const MSG_DOWNLOADING: &str = "Download starting...";
pub const MSG_DONE: &str = "All done! Have a great day.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    Idle,
    Validating,
    RequestingCredential,
    Uploading,
    SubmittingJob,
    Polling,
    Downloading,
    Done,
    Failed,
}

/// Raw input as the user gave it. Nothing here has been checked yet.
#[derive(Debug, Clone, Default)]
pub struct FormInput {
    pub file: Option<PathBuf>,
    pub width: Option<String>,
    pub height: Option<String>,
}

/// Deployment settings a submission needs.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub input_bucket: String,
    pub output_bucket: String,
    pub poll: PollPolicy,
    pub finish_delay: Duration,
    pub output_dir: PathBuf,
}

impl WorkflowSettings {
    pub fn from_config(config: &ResizerConfig) -> Self {
        Self {
            input_bucket: config.input_bucket.clone(),
            output_bucket: config.output_bucket.clone(),
            poll: PollPolicy::new(config.poll_interval(), config.poll_max_attempts),
            finish_delay: config.finish_delay(),
            output_dir: config.output_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowOutcome {
    pub job_id: String,
    pub download_url: String,
    pub saved_path: PathBuf,
    pub bytes_written: usize,
}

pub struct UploadWorkflow<A: ResizeApi + 'static> {
    api: Arc<A>,
    settings: WorkflowSettings,
    clock: Arc<dyn Clock>,
    progress: ProgressReporter,
    stage: WorkflowStage,
}

impl<A: ResizeApi + 'static> UploadWorkflow<A> {
    pub fn new(api: Arc<A>, settings: WorkflowSettings, progress: ProgressReporter) -> Self {
        Self {
            api,
            settings,
            clock: Arc::new(TokioClock),
            progress,
            stage: WorkflowStage::Idle,
        }
    }

    /// Replace the clock used for poll intervals and the finish delay.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Handle one form submission end to end.
    pub async fn submit(&mut self, form: FormInput) -> WorkflowResult<WorkflowOutcome> {
        self.stage = WorkflowStage::Idle;
        self.progress.reset();

        let result = self.validate_and_run(form).await;

        if let Err(e) = &result {
            let failed_at = self.stage;
            self.transition(WorkflowStage::Failed);
            self.progress.report(&format!("Error: {}", e), Some(0));
            log_failure(e, failed_at);
        }

        result
    }

    async fn validate_and_run(&mut self, form: FormInput) -> WorkflowResult<WorkflowOutcome> {
        self.transition(WorkflowStage::Validating);
        let request = read_form(form).await?;
        self.run(request).await
    }

    /// Drive an already validated request through the remote steps.
    pub async fn run(&mut self, request: UploadRequest) -> WorkflowResult<WorkflowOutcome> {
        tracing::info!(
            file_name = %request.file_name(),
            size_bytes = request.size(),
            width = request.width(),
            height = request.height(),
            "Starting resize"
        );

        self.transition(WorkflowStage::RequestingCredential);
        self.progress.report(MSG_REQUESTING_URL, Some(20));
        let upload_url = self.api.request_upload_url(request.file_name()).await?;

        self.transition(WorkflowStage::Uploading);
        self.progress.report(MSG_UPLOADING, Some(40));
        self.api
            .upload_bytes(&upload_url, request.file_bytes())
            .await?;

        self.transition(WorkflowStage::SubmittingJob);
        self.progress.report(MSG_PROCESSING, Some(60));
        let job = ResizeJobDescriptor::new(
            &request,
            &self.settings.input_bucket,
            &self.settings.output_bucket,
        );
        let handle = self.api.submit_job(&job).await?;

        self.transition(WorkflowStage::Polling);
        self.progress.report(MSG_WAITING, Some(80));
        let download_url = wait_for_job(
            self.api.as_ref(),
            &handle,
            &self.settings.poll,
            self.clock.as_ref(),
        )
        .await?;

        self.transition(WorkflowStage::Downloading);
        self.progress.report(MSG_DOWNLOADING, Some(100));
        let target = self.settings.output_dir.join(request.result_file_name());

        // The download runs alongside the finish delay. A failed download ends the
        // run at once; a successful one still waits out the delay before "done".
        let (saved_path, bytes_written) = {
            let mut download = tokio::spawn(fetch_and_save(
                Arc::clone(&self.api),
                download_url.clone(),
                target,
            ));
            let mut delay = self.clock.sleep(self.settings.finish_delay);
            tokio::select! {
                joined = &mut download => {
                    let saved = downloaded(joined)?;
                    delay.await;
                    saved
                }
                () = &mut delay => downloaded(download.await)?,
            }
        };

        self.progress.report(MSG_DONE, None);
        self.transition(WorkflowStage::Done);

        tracing::info!(
            job_id = %handle.job_id,
            path = %saved_path.display(),
            size_bytes = bytes_written,
            "Resize finished"
        );

        Ok(WorkflowOutcome {
            job_id: handle.job_id,
            download_url,
            saved_path,
            bytes_written,
        })
    }

    fn transition(&mut self, next: WorkflowStage) {
        tracing::debug!(from = ?self.stage, to = ?next, "Workflow stage changed");
        self.stage = next;
    }
}

/// Read the selected file and validate the form. No network access happens here.
pub async fn read_form(form: FormInput) -> WorkflowResult<UploadRequest> {
    let (file_name, bytes) = match &form.file {
        Some(path) => {
            let file_name = file_name_of(path)?;
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                WorkflowError::Validation(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            (Some(file_name), bytes)
        }
        None => (None, Vec::new()),
    };

    UploadRequest::from_form(
        file_name.as_deref(),
        bytes,
        form.width.as_deref(),
        form.height.as_deref(),
    )
}

fn file_name_of(path: &Path) -> WorkflowResult<String> {
    let name = path.file_name().ok_or_else(|| {
        WorkflowError::Validation(format!("Not a file: {}", path.display()))
    })?;
    name.to_str().map(str::to_string).ok_or_else(|| {
        WorkflowError::Validation(format!(
            "File name is not valid UTF-8: {}",
            path.display()
        ))
    })
}

async fn fetch_and_save<A>(
    api: Arc<A>,
    url: String,
    target: PathBuf,
) -> WorkflowResult<(PathBuf, usize)>
where
    A: ResizeApi + ?Sized,
{
    let bytes = api.download(&url).await?;
    let size = bytes.len();

    let saved = tokio::task::spawn_blocking(move || save_result(&target, &bytes))
        .await
        .map_err(|e| WorkflowError::Download(format!("Save task failed: {}", e)))??;

    Ok((saved, size))
}

fn downloaded<T>(joined: Result<WorkflowResult<T>, tokio::task::JoinError>) -> WorkflowResult<T> {
    joined.map_err(|e| WorkflowError::Download(format!("Download task failed: {}", e)))?
}

fn log_failure(error: &WorkflowError, stage: WorkflowStage) {
    let code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(error = %error, code, stage = ?stage, "Submission rejected"),
        LogLevel::Warn => tracing::warn!(error = %error, code, stage = ?stage, "Submission failed"),
        LogLevel::Error => tracing::error!(error = %error, code, stage = ?stage, "Submission failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{MemorySink, ProgressState};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;
    use vidresize_core::{JobHandle, JobState, JobStatus};

    #[derive(Default)]
    struct FakeClock {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Clock for FakeClock {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    /// A finish delay that never elapses.
    struct StalledClock;

    #[async_trait]
    impl Clock for StalledClock {
        async fn sleep(&self, _duration: Duration) {
            std::future::pending::<()>().await;
        }
    }

    /// In-memory API that records every call and answers from a script.
    struct FakeApi {
        calls: Mutex<Vec<String>>,
        statuses: Mutex<Vec<JobStatus>>,
        upload_status: Option<u16>,
        download_body: Option<&'static [u8]>,
    }

    impl FakeApi {
        fn new(statuses: Vec<JobStatus>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                statuses: Mutex::new(statuses),
                upload_status: None,
                download_body: Some(&b"resized-video"[..]),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl ResizeApi for FakeApi {
        async fn request_upload_url(&self, file_name: &str) -> WorkflowResult<String> {
            self.record(format!("presign {}", file_name));
            Ok(format!("https://bucket.example.com/{}?sig=1", file_name))
        }

        async fn upload_bytes(&self, _upload_url: &str, bytes: Bytes) -> WorkflowResult<()> {
            self.record(format!("upload {}", bytes.len()));
            match self.upload_status {
                Some(status) => Err(WorkflowError::Upload {
                    status,
                    body: "AccessDenied".to_string(),
                }),
                None => Ok(()),
            }
        }

        async fn submit_job(&self, job: &ResizeJobDescriptor) -> WorkflowResult<JobHandle> {
            self.record(format!("submit {} {}x{}", job.output_key, job.width, job.height));
            Ok(JobHandle {
                job_id: "abc".to_string(),
                message: None,
            })
        }

        async fn job_status(&self, job_id: &str) -> WorkflowResult<JobStatus> {
            self.record(format!("status {}", job_id));
            let mut statuses = self.statuses.lock().unwrap();
            if statuses.len() > 1 {
                Ok(statuses.remove(0))
            } else {
                Ok(statuses[0].clone())
            }
        }

        async fn download(&self, url: &str) -> WorkflowResult<Bytes> {
            self.record(format!("download {}", url));
            match self.download_body {
                Some(body) => Ok(Bytes::from_static(body)),
                None => Err(WorkflowError::Download("404 - NoSuchKey".to_string())),
            }
        }
    }

    fn status(state: JobState, url: Option<&str>) -> JobStatus {
        JobStatus {
            status: state,
            download_url: url.map(str::to_string),
        }
    }

    fn settings(output_dir: &Path) -> WorkflowSettings {
        WorkflowSettings {
            input_bucket: "videos-in".to_string(),
            output_bucket: "videos-out".to_string(),
            poll: PollPolicy::default(),
            finish_delay: Duration::from_secs(2),
            output_dir: output_dir.to_path_buf(),
        }
    }

    fn workflow(
        api: Arc<FakeApi>,
        output_dir: &Path,
    ) -> (UploadWorkflow<FakeApi>, MemorySink, Arc<FakeClock>) {
        let sink = MemorySink::default();
        let clock = Arc::new(FakeClock::default());
        let wf = UploadWorkflow::new(api, settings(output_dir), ProgressReporter::new(sink.clone()))
            .with_clock(clock.clone());
        (wf, sink, clock)
    }

    fn form(file: Option<PathBuf>, width: &str, height: &str) -> FormInput {
        FormInput {
            file,
            width: Some(width.to_string()),
            height: Some(height.to_string()),
        }
    }

    fn video_file(dir: &Path) -> PathBuf {
        let path = dir.join("clip.mp4");
        std::fs::write(&path, b"raw-video").unwrap();
        path
    }

    fn messages(history: &[ProgressState]) -> Vec<(String, Option<u8>)> {
        history
            .iter()
            .map(|s| (s.message.clone(), s.percentage))
            .collect()
    }

    #[tokio::test]
    async fn happy_path_reaches_done_and_saves_result() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(vec![status(
            JobState::Complete,
            Some("https://out.example.com/resized-clip.mp4"),
        )]));
        let (mut wf, sink, clock) = workflow(api.clone(), dir.path());

        let outcome = wf
            .submit(form(Some(video_file(dir.path())), "640", "360"))
            .await
            .unwrap();

        assert_eq!(wf.stage(), WorkflowStage::Done);
        assert_eq!(outcome.job_id, "abc");
        assert_eq!(outcome.bytes_written, b"resized-video".len());
        assert_eq!(outcome.saved_path, dir.path().join("resized-clip.mp4"));
        assert_eq!(std::fs::read(&outcome.saved_path).unwrap(), b"resized-video");

        assert_eq!(
            api.calls(),
            vec![
                "presign clip.mp4".to_string(),
                "upload 9".to_string(),
                "submit resized-clip.mp4 640x360".to_string(),
                "status abc".to_string(),
                "download https://out.example.com/resized-clip.mp4".to_string(),
            ]
        );

        assert_eq!(
            messages(&sink.history()),
            vec![
                (String::new(), Some(0)),
                (MSG_REQUESTING_URL.to_string(), Some(20)),
                (MSG_UPLOADING.to_string(), Some(40)),
                (MSG_PROCESSING.to_string(), Some(60)),
                (MSG_WAITING.to_string(), Some(80)),
                (MSG_DOWNLOADING.to_string(), Some(100)),
                (MSG_DONE.to_string(), Some(100)),
            ]
        );

        // Only the cosmetic finish delay was waited on.
        assert_eq!(*clock.sleeps.lock().unwrap(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(vec![status(JobState::Pending, None)]));
        let (mut wf, sink, _) = workflow(api.clone(), dir.path());

        let err = wf.submit(form(None, "640", "360")).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert_eq!(wf.stage(), WorkflowStage::Failed);
        assert!(api.calls().is_empty());
        assert_eq!(
            wf.progress().state(),
            Some(ProgressState {
                message: "Error: Invalid input: Please select a file".to_string(),
                percentage: Some(0),
            })
        );
        assert_eq!(sink.history().len(), 2);
    }

    #[tokio::test]
    async fn bad_dimensions_fail_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let file = video_file(dir.path());

        for (w, h) in [("0", "360"), ("640", "-5"), ("abc", "360"), ("640", "")] {
            let api = Arc::new(FakeApi::new(vec![status(JobState::Pending, None)]));
            let (mut wf, _, _) = workflow(api.clone(), dir.path());

            let err = wf.submit(form(Some(file.clone()), w, h)).await.unwrap_err();
            assert!(matches!(err, WorkflowError::Validation(_)), "{}x{}", w, h);
            assert!(api.calls().is_empty());
        }
    }

    #[tokio::test]
    async fn unreadable_file_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(vec![status(JobState::Pending, None)]));
        let (mut wf, _, _) = workflow(api.clone(), dir.path());

        let err = wf
            .submit(form(Some(dir.path().join("missing.mp4")), "640", "360"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn processing_error_stops_after_third_poll() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(vec![
            status(JobState::Pending, None),
            status(JobState::Pending, None),
            status(JobState::Error, None),
            status(JobState::Complete, Some("https://never")),
        ]));
        let (mut wf, _, clock) = workflow(api.clone(), dir.path());

        let err = wf
            .submit(form(Some(video_file(dir.path())), "640", "360"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Processing(_)));
        let polls = api.calls().iter().filter(|c| c.starts_with("status")).count();
        assert_eq!(polls, 3);
        assert!(!api.calls().iter().any(|c| c.starts_with("download")));
        assert_eq!(clock.sleeps.lock().unwrap().len(), 2);
        assert_eq!(wf.stage(), WorkflowStage::Failed);
    }

    #[tokio::test]
    async fn always_pending_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(vec![status(JobState::Pending, None)]));
        let (mut wf, _, clock) = workflow(api.clone(), dir.path());

        let err = wf
            .submit(form(Some(video_file(dir.path())), "640", "360"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Timeout { attempts: 30 }));
        let polls = api.calls().iter().filter(|c| c.starts_with("status")).count();
        assert_eq!(polls, 30);
        let sleeps = clock.sleeps.lock().unwrap();
        assert_eq!(sleeps.len(), 30);
        assert!(sleeps.iter().all(|d| *d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn failed_upload_stops_before_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = FakeApi::new(vec![status(JobState::Pending, None)]);
        api.upload_status = Some(403);
        let api = Arc::new(api);
        let (mut wf, _, _) = workflow(api.clone(), dir.path());

        let err = wf
            .submit(form(Some(video_file(dir.path())), "640", "360"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Upload { status: 403, .. }));
        assert!(!api.calls().iter().any(|c| c.starts_with("submit")));
    }

    #[tokio::test]
    async fn failed_download_never_reports_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = FakeApi::new(vec![status(JobState::Complete, Some("https://out/x.mp4"))]);
        api.download_body = None;
        let api = Arc::new(api);
        let (mut wf, sink, _) = workflow(api.clone(), dir.path());

        let err = wf
            .submit(form(Some(video_file(dir.path())), "640", "360"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Download(_)));
        assert_eq!(wf.stage(), WorkflowStage::Failed);
        let history = sink.history();
        assert!(!history.iter().any(|s| s.message == MSG_DONE));
        assert_eq!(
            history.last().map(|s| s.message.as_str()),
            Some("Error: Failed to download result: 404 - NoSuchKey")
        );
        assert!(!dir.path().join("resized-clip.mp4").exists());
    }

    #[tokio::test]
    async fn next_submission_starts_from_a_clean_display() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(FakeApi::new(vec![status(
            JobState::Complete,
            Some("https://out/x.mp4"),
        )]));
        let (mut wf, sink, _) = workflow(api.clone(), dir.path());

        wf.submit(form(None, "640", "360")).await.unwrap_err();
        wf.submit(form(Some(video_file(dir.path())), "640", "360"))
            .await
            .unwrap();

        let history = sink.history();
        let resets = history
            .iter()
            .filter(|s| s.message.is_empty() && s.percentage == Some(0))
            .count();
        assert_eq!(resets, 2);
        assert_eq!(wf.stage(), WorkflowStage::Done);
    }

    #[tokio::test]
    async fn failed_download_does_not_wait_for_finish_delay() {
        let dir = tempfile::tempdir().unwrap();
        let mut api = FakeApi::new(vec![status(JobState::Complete, Some("https://out/x.mp4"))]);
        api.download_body = None;
        let (wf, sink, _) = workflow(Arc::new(api), dir.path());
        let mut wf = wf.with_clock(Arc::new(StalledClock));

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            wf.submit(form(Some(video_file(dir.path())), "640", "360")),
        )
        .await
        .expect("download failure should end the run without the finish delay");

        assert!(matches!(result, Err(WorkflowError::Download(_))));
        assert_eq!(wf.stage(), WorkflowStage::Failed);
        assert!(!sink.history().iter().any(|s| s.message == MSG_DONE));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_file_name_has_its_own_message() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OsStr::from_bytes(b"clip\xff.mp4"));

        let err = read_form(form(Some(path), "640", "360")).await.unwrap_err();

        assert!(matches!(err, WorkflowError::Validation(_)));
        assert!(err.to_string().contains("not valid UTF-8"), "{}", err);
        assert!(!err.to_string().contains("Please select a file"));
    }

    #[tokio::test]
    async fn path_without_file_name_is_rejected() {
        let err = read_form(form(Some(PathBuf::from("..")), "640", "360"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not a file"), "{}", err);
    }
}
