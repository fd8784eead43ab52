mod common;

use common::{assert_rt, inline_context, ms, stimulus};
use sheen_core::{Choices, Key, Marker};
use sheen_experiment::{Host, StaticTrial, TrialConfig, TrialError};
use sheen_render::{
    InlineWorker, RESPONDED_CLASS, RendererContext, STIMULUS_ELEMENT_ID, SkiaSceneRenderer,
};
use tokio::time::{Instant, sleep};

fn config() -> TrialConfig {
    TrialConfig::new("bump_01", stimulus(true))
}

#[tokio::test(start_paused = true)]
async fn times_out_without_a_key() {
    let config = config()
        .with_choices(Choices::keys(["a"]))
        .with_trial_duration(1000);
    let mut ctx = inline_context();
    let (_keys, mut host) = Host::channel();

    let start = Instant::now();
    let result = StaticTrial::run_trial(&config, &mut ctx, &mut host)
        .await
        .unwrap();

    assert_eq!(start.elapsed(), ms(1000));
    assert_eq!(result.reaction_time_ms, None);
    assert_eq!(result.key, None);
    assert_eq!(result.stimulus_name, "bump_01");
    assert!(host.is_idle());
    assert!(ctx.surface().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn first_key_ends_trial() {
    let config = config()
        .with_choices(Choices::keys(["a"]))
        .with_trial_duration(1000);
    let mut ctx = inline_context();
    let (keys, mut host) = Host::channel();

    let start = Instant::now();
    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(300)).await;
        keys.press("a");
    });
    let result = result.unwrap();

    assert_eq!(start.elapsed(), ms(300));
    assert_rt(result.reaction_time_ms, 300.0);
    assert_eq!(result.key, Some(Key::new("a")));
    assert!(host.is_idle());
}

#[tokio::test(start_paused = true)]
async fn keys_outside_choices_are_ignored() {
    let config = config()
        .with_choices(Choices::keys(["f", "j"]))
        .with_trial_duration(1000);
    let mut ctx = inline_context();
    let (keys, mut host) = Host::channel();

    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(100)).await;
        keys.press("x");
        sleep(ms(100)).await;
        keys.press("J");
    });
    let result = result.unwrap();

    assert_rt(result.reaction_time_ms, 200.0);
    assert_eq!(result.key, Some(Key::new("j")));
}

#[tokio::test(start_paused = true)]
async fn second_key_never_overwrites() {
    let config = config()
        .with_choices(Choices::keys(["a", "b"]))
        .with_trial_duration(1000)
        .with_response_ends_trial(false);
    let mut ctx = inline_context();
    let frames = ctx.subscribe().unwrap();
    let (keys, mut host) = Host::channel();

    let start = Instant::now();
    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(100)).await;
        keys.press("a");
        sleep(ms(50)).await;
        let snapshot = frames.borrow().clone();
        let frame = snapshot.frame.expect("stimulus on screen");
        assert!(frame.has_class(RESPONDED_CLASS));
        keys.press("b");
    });
    let result = result.unwrap();

    assert_eq!(start.elapsed(), ms(1000));
    assert_rt(result.reaction_time_ms, 100.0);
    assert_eq!(result.key, Some(Key::new("a")));
}

#[tokio::test(start_paused = true)]
async fn no_keys_ends_only_on_duration() {
    let config = config()
        .with_choices(Choices::NoKeys)
        .with_trial_duration(500);
    let mut ctx = inline_context();
    let (keys, mut host) = Host::channel();

    let start = Instant::now();
    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(100)).await;
        keys.press("a");
    });
    let result = result.unwrap();

    assert_eq!(start.elapsed(), ms(500));
    assert!(!result.responded());
    assert_eq!(result.reaction_time_ms, None);
}

#[tokio::test(start_paused = true)]
async fn stimulus_hides_before_trial_ends() {
    let config = config()
        .with_stimulus_duration(200)
        .with_trial_duration(800);
    let mut ctx = inline_context();
    let frames = ctx.subscribe().unwrap();
    let (_keys, mut host) = Host::channel();

    let start = Instant::now();
    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(199)).await;
        assert!(frames.borrow().visible_pixmap().is_some());
        sleep(ms(2)).await;
        let snapshot = frames.borrow().clone();
        assert!(snapshot.visible_pixmap().is_none());
        let frame = snapshot.frame.expect("hidden, not removed");
        assert_eq!(frame.id, STIMULUS_ELEMENT_ID);
    });
    result.unwrap();

    assert_eq!(start.elapsed(), ms(800));
    assert!(frames.borrow().frame.is_none());
}

#[tokio::test(start_paused = true)]
async fn displayed_frame_has_no_background_and_shows_marker() {
    let config = config().with_trial_duration(50);
    let mut ctx = inline_context();
    let frames = ctx.subscribe().unwrap();
    let (_keys, mut host) = Host::channel();

    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(10)).await;
        let snapshot = frames.borrow().clone();
        let pixmap = snapshot.visible_pixmap().expect("frame visible").clone();
        assert_eq!(pixmap.pixel(0, 0).unwrap().alpha(), 0);
        assert!(common::marker_pixels(&pixmap) > 100);
    });
    result.unwrap();
}

#[tokio::test(start_paused = true)]
async fn renderer_is_reset_after_the_trial() {
    let config = config().with_trial_duration(10);
    let mut ctx = inline_context();
    let (_keys, mut host) = Host::channel();

    StaticTrial::run_trial(&config, &mut ctx, &mut host)
        .await
        .unwrap();

    let renderer = ctx.renderer();
    assert!(!renderer.marker_visible(Marker::Disk));
    assert_eq!(renderer.active_light_count(), 0);
    assert_eq!(renderer.model(), glam::Mat4::IDENTITY);
}

#[tokio::test(start_paused = true)]
async fn missing_surface_is_reported_before_anything_runs() {
    let config = config().with_trial_duration(100);
    let mut ctx: RendererContext<SkiaSceneRenderer, InlineWorker> =
        RendererContext::detached(SkiaSceneRenderer::new(64, 64), InlineWorker);
    let (_keys, mut host) = Host::channel();

    let err = StaticTrial::run_trial(&config, &mut ctx, &mut host)
        .await
        .unwrap_err();
    assert!(matches!(err, TrialError::RenderTargetUnavailable(_)));
    assert!(host.is_idle());
}

#[tokio::test(start_paused = true)]
async fn invalid_configuration_starts_no_timers() {
    let mut config = config().with_trial_duration(100);
    config.stimulus.gamma.red = -1.0;
    let mut ctx = inline_context();
    let (_keys, mut host) = Host::channel();

    let err = StaticTrial::run_trial(&config, &mut ctx, &mut host)
        .await
        .unwrap_err();
    assert!(matches!(err, TrialError::Configuration(_)));
    assert!(host.is_idle());
    assert!(ctx.surface().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancellation_tears_the_trial_down() {
    let config = config().with_trial_duration(1000);
    let mut ctx = inline_context();
    let (_keys, mut host) = Host::channel();
    let token = host.cancel.clone();

    let start = Instant::now();
    let (result, ()) = tokio::join!(StaticTrial::run_trial(&config, &mut ctx, &mut host), async {
        sleep(ms(250)).await;
        token.cancel();
    });

    assert!(matches!(result, Err(TrialError::Cancelled)));
    assert_eq!(start.elapsed(), ms(250));
    assert!(host.is_idle());
    assert!(ctx.surface().unwrap().is_empty());
}
