use crate::config::TrialConfig;
use crate::controller::{TrialRun, Wake};
use crate::error::TrialError;
use crate::host::Host;
use sheen_core::{Marker, TrialResult, TrialState, TrialTimer};
use sheen_render::{
    ImageWorker, RenderError, RendererContext, ReplyReceiver, STIMULUS_ELEMENT_ID,
    SceneRenderer, WorkerReply, WorkerRequest, composite_and_correct, draw_disk, locate_marker,
};
use sheen_timing::TimerHandle;
use std::time::Duration;
use tokio::sync::oneshot::error::{RecvError, TryRecvError};
use tracing::{debug, warn};

type Reply = Result<Result<WorkerReply, RenderError>, RecvError>;

/// Shows the disk frame for the pretrial period, then swaps in the image
/// worker's pip frame and starts listening.
///
/// Renderer state is left as the trial configured it; the caller resets it.
#[derive(Debug, Clone, Copy)]
pub struct TwoPhaseTrial {
    worker_grace: Duration,
}

impl Default for TwoPhaseTrial {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl TwoPhaseTrial {
    pub fn new(worker_grace: Duration) -> Self {
        Self { worker_grace }
    }

    pub async fn run_trial<R: SceneRenderer, W: ImageWorker>(
        &self,
        config: &TrialConfig,
        ctx: &mut RendererContext<R, W>,
        host: &mut Host,
    ) -> Result<TrialResult, TrialError> {
        config.validate()?;
        ctx.surface()?;

        let mut run = TrialRun::new(config);
        let outcome = self.drive(&mut run, config, ctx, host).await;

        run.teardown(host, ctx.surface_mut().ok());
        outcome?;

        let result = run.finish();
        debug!(rt = ?result.reaction_time_ms, key = ?result.key, "two-phase trial finished");
        Ok(result)
    }

    async fn drive<R: SceneRenderer, W: ImageWorker>(
        &self,
        run: &mut TrialRun<'_>,
        config: &TrialConfig,
        ctx: &mut RendererContext<R, W>,
        host: &mut Host,
    ) -> Result<(), TrialError> {
        let stimulus = &config.stimulus;
        ctx.prepare_scene(stimulus, Marker::Pip)?;
        let raw = ctx.render_raw()?;
        let mut submitted = Some(
            ctx.worker()
                .submit(WorkerRequest::from_pixmap(&raw, stimulus.gamma)),
        );

        let mut frame = composite_and_correct(&raw, stimulus.gamma);
        match locate_marker(&raw) {
            Some(index) => {
                let radius = ctx.renderer().marker_radius_px(Marker::Disk);
                draw_disk(&mut frame, index, radius);
            }
            None => warn!("pip not visible in the raw frame, phase one shows no disk"),
        }
        ctx.surface_mut()?.insert(STIMULUS_ELEMENT_ID, frame);
        run.advance(TrialState::PhaseOneDisplayed)?;

        host.timers
            .schedule_once(config.pretrial(), TrialTimer::PrePhaseEnd);
        run.schedule_durations(host);

        // Set once the pretrial period is over and the reply has not arrived.
        let mut awaiting: Option<ReplyReceiver> = None;
        let mut deadline: Option<TimerHandle> = None;

        loop {
            let wake: Wake<Reply> = tokio::select! {
                biased;
                _ = host.cancel.cancelled() => Wake::Cancelled,
                timer = host.timers.fired() => Wake::Timer(timer),
                reply = recv_reply(&mut awaiting) => Wake::Reply(reply),
                key = host.keyboard.next_response() => Wake::Key(key),
            };

            match wake {
                Wake::Cancelled => return Err(TrialError::Cancelled),
                Wake::Timer(TrialTimer::PrePhaseEnd) => {
                    let Some(mut rx) = submitted.take() else {
                        continue;
                    };
                    match rx.try_recv() {
                        Ok(result) => swap(run, ctx, host, result)?,
                        Err(TryRecvError::Empty) => {
                            debug!(
                                grace_ms = self.worker_grace.as_millis() as u64,
                                "phase-two frame not ready, waiting"
                            );
                            deadline = Some(
                                host.timers
                                    .schedule_once(self.worker_grace, TrialTimer::WorkerDeadline),
                            );
                            awaiting = Some(rx);
                        }
                        Err(TryRecvError::Closed) => return Err(RenderError::WorkerGone.into()),
                    }
                }
                Wake::Timer(TrialTimer::WorkerDeadline) => {
                    warn!("image worker missed the phase-two deadline");
                    return Err(TrialError::WorkerTimeout {
                        grace_ms: self.worker_grace.as_millis() as u64,
                    });
                }
                Wake::Timer(TrialTimer::HideStimulus) => run.hide(ctx.surface_mut()?)?,
                Wake::Timer(TrialTimer::EndTrial) => return Ok(()),
                Wake::Reply(reply) => {
                    awaiting = None;
                    if let Some(handle) = deadline.take() {
                        host.timers.cancel(handle);
                    }
                    let result = reply.unwrap_or(Err(RenderError::WorkerGone));
                    swap(run, ctx, host, result)?;
                }
                Wake::Key(key) => {
                    if run.on_key(key, host, ctx.surface_mut()?)? {
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Replaces the phase-one frame with the worker's and arms the keyboard.
fn swap<R: SceneRenderer, W: ImageWorker>(
    run: &mut TrialRun<'_>,
    ctx: &mut RendererContext<R, W>,
    host: &mut Host,
    reply: Result<WorkerReply, RenderError>,
) -> Result<(), TrialError> {
    let reply = reply?;
    ctx.surface_mut()?
        .replace_pixels(STIMULUS_ELEMENT_ID, reply.pixels)?;
    run.advance(TrialState::PhaseTwoDisplayed)?;
    debug!(marker_index = ?reply.marker_index, "phase-two frame displayed");
    run.arm(host)
}

async fn recv_reply(rx: &mut Option<ReplyReceiver>) -> Reply {
    match rx {
        Some(rx) => rx.await,
        None => std::future::pending().await,
    }
}
