use crate::config::TrialConfig;
use crate::controller::{TrialRun, Wake};
use crate::error::TrialError;
use crate::host::Host;
use sheen_core::{TrialResult, TrialState, TrialTimer};
use sheen_render::{
    ImageWorker, RendererContext, STIMULUS_ELEMENT_ID, SceneRenderer, composite_and_correct,
};
use std::convert::Infallible;
use tracing::{debug, trace};

/// Shows one composited frame and waits for a key or the trial duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticTrial;

impl StaticTrial {
    pub async fn run_trial<R: SceneRenderer, W: ImageWorker>(
        config: &TrialConfig,
        ctx: &mut RendererContext<R, W>,
        host: &mut Host,
    ) -> Result<TrialResult, TrialError> {
        config.validate()?;
        ctx.surface()?;

        let mut run = TrialRun::new(config);
        let outcome = drive(&mut run, config, ctx, host).await;

        run.teardown(host, ctx.surface_mut().ok());
        ctx.reset_scene(&config.stimulus);
        outcome?;

        let result = run.finish();
        debug!(rt = ?result.reaction_time_ms, key = ?result.key, "static trial finished");
        Ok(result)
    }
}

async fn drive<R: SceneRenderer, W: ImageWorker>(
    run: &mut TrialRun<'_>,
    config: &TrialConfig,
    ctx: &mut RendererContext<R, W>,
    host: &mut Host,
) -> Result<(), TrialError> {
    let stimulus = &config.stimulus;
    ctx.prepare_scene(stimulus, stimulus.marker())?;
    let raw = ctx.render_raw()?;
    let frame = composite_and_correct(&raw, stimulus.gamma);
    ctx.surface_mut()?.insert(STIMULUS_ELEMENT_ID, frame);
    run.advance(TrialState::PhaseOneDisplayed)?;

    run.arm(host)?;
    run.schedule_durations(host);

    loop {
        let wake: Wake<Infallible> = tokio::select! {
            biased;
            _ = host.cancel.cancelled() => Wake::Cancelled,
            timer = host.timers.fired() => Wake::Timer(timer),
            key = host.keyboard.next_response() => Wake::Key(key),
        };

        match wake {
            Wake::Cancelled => return Err(TrialError::Cancelled),
            Wake::Timer(TrialTimer::HideStimulus) => run.hide(ctx.surface_mut()?)?,
            Wake::Timer(TrialTimer::EndTrial) => return Ok(()),
            Wake::Timer(other) => trace!(timer = ?other, "timer not used by static trials"),
            Wake::Key(key) => {
                if run.on_key(key, host, ctx.surface_mut()?)? {
                    return Ok(());
                }
            }
            Wake::Reply(never) => match never {},
        }
    }
}
