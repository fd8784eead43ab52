use anyhow::{Context, Result, anyhow};
use sheen_experiment::{Host, Session, SessionConfig, SessionOutcome, SessionReport, write_results};
use sheen_render::{
    ImageWorker, InlineWorker, RendererContext, SceneRenderer, SkiaSceneRenderer, SurfaceSnapshot,
    ThreadWorker,
};
use sheen_timing::KeySender;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A session running on its own thread.
pub struct SessionHandle {
    keys: KeySender,
    frames: watch::Receiver<SurfaceSnapshot>,
    cancel: CancellationToken,
    thread: Option<JoinHandle<Result<SessionReport>>>,
}

impl SessionHandle {
    /// Starts `config` on a new thread. `on_finish` runs on that thread once
    /// the session is over and its results are written.
    pub fn spawn<F>(config: SessionConfig, output: PathBuf, on_finish: F) -> Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let worker = ThreadWorker::spawn().context("starting image worker")?;
        let ctx = RendererContext::new(
            SkiaSceneRenderer::new(config.canvas.width, config.canvas.height),
            worker,
        );
        let frames = ctx.subscribe()?;
        let (keys, host) = Host::channel();
        let cancel = host.cancel.clone();

        let thread = thread::Builder::new()
            .name("sheen-session".into())
            .spawn(move || {
                let report = run_to_file(config, &output, ctx, host);
                on_finish();
                report
            })
            .context("starting session thread")?;

        Ok(Self {
            keys,
            frames,
            cancel,
            thread: Some(thread),
        })
    }

    pub fn keys(&self) -> &KeySender {
        &self.keys
    }

    pub fn frames(&self) -> &watch::Receiver<SurfaceSnapshot> {
        &self.frames
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the session thread and returns its report.
    pub fn join(mut self) -> Result<SessionReport> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| anyhow!("session already joined"))?;
        thread
            .join()
            .map_err(|_| anyhow!("session thread panicked"))?
    }
}

/// Runs `config` on the calling thread with no window and no keyboard.
pub fn run_headless(config: SessionConfig, output: &Path) -> Result<SessionReport> {
    let ctx = RendererContext::new(
        SkiaSceneRenderer::new(config.canvas.width, config.canvas.height),
        InlineWorker,
    );
    // Held so the keyboard stays open; nothing ever presses a key.
    let (_keys, host) = Host::channel();
    run_to_file(config, output, ctx, host)
}

fn run_to_file<R, W>(
    config: SessionConfig,
    output: &Path,
    mut ctx: RendererContext<R, W>,
    mut host: Host,
) -> Result<SessionReport>
where
    R: SceneRenderer,
    W: ImageWorker,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("building session runtime")?;
    let session = Session::new(config);
    let report = runtime.block_on(session.run(&mut ctx, &mut host));
    write_results(output, &report.records)?;
    Ok(report)
}

/// Turns a finished session into the process result.
pub fn summarize(report: SessionReport) -> Result<()> {
    match report.outcome {
        SessionOutcome::Completed => {
            info!(trials = report.records.len(), "all trials done");
            Ok(())
        }
        SessionOutcome::Cancelled => {
            warn!(trials = report.records.len(), "session stopped early");
            Ok(())
        }
        SessionOutcome::Failed(err) => {
            Err(anyhow!(err).context(format!("trial {} failed", report.records.len())))
        }
    }
}
