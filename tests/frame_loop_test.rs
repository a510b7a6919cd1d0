use std::{f32::consts::PI, time::Duration};

use approx::assert_relative_eq;
use haunt_ngin::{
    frame::{FrameError, FrameOutcome, LoopState},
    render::RenderError,
    resources::TextureLoader,
    scenes,
};

use crate::common::test_utils::{RecordingRenderer, test_loop};

mod common;

fn loader() -> TextureLoader {
    TextureLoader::new(tokio::runtime::Handle::current())
}

#[test]
fn default_cube_renders_one_instance() {
    let (mut frame_loop, _clock) = test_loop(scenes::default_cube(), RecordingRenderer::new());
    frame_loop.on_resize(1024, 512);
    frame_loop.start().unwrap();

    assert_eq!(frame_loop.on_frame().unwrap(), FrameOutcome::Presented);

    let renderer = frame_loop.renderer();
    assert_eq!(renderer.resizes(), &[(1024, 512, 1.0)]);
    assert_eq!(renderer.aspects(), &[2.0]);
    assert_eq!(renderer.instances_per_frame(), &[1]);
    assert_eq!(frame_loop.scheduler().requested(), 2);
}

#[tokio::test]
async fn ghosts_follow_the_clock() {
    let (mut frame_loop, clock) =
        test_loop(scenes::haunted_house(&loader()), RecordingRenderer::new());
    frame_loop.start().unwrap();

    clock.set(Duration::from_secs_f32(PI));
    frame_loop.on_frame().unwrap();

    let objects = &frame_loop.scene().objects;
    let ghost = objects.find_by_name("ghost 1").unwrap();
    let position = objects.world_transform(ghost).unwrap().position;
    assert!(position.x.abs() < 1e-4, "{:?}", position);
    assert_relative_eq!(position.z, 4.0, epsilon = 1e-4);
    assert!(position.y.abs() < 1e-4, "{:?}", position);

    // floor, walls, roof, door, four bushes and the graves
    assert_eq!(
        frame_loop.renderer().instances_per_frame(),
        &[4 + 4 + scenes::GRAVE_COUNT]
    );
}

#[tokio::test]
async fn same_time_same_scene() {
    let (mut first, first_clock) =
        test_loop(scenes::haunted_house(&loader()), RecordingRenderer::new());
    let (mut second, second_clock) =
        test_loop(scenes::haunted_house(&loader()), RecordingRenderer::new());
    first.start().unwrap();
    second.start().unwrap();

    // Different frame pacing, same final reading.
    for step in 1..=10 {
        first_clock.set(Duration::from_millis(step * 160));
        first.on_frame().unwrap();
    }
    second_clock.set(Duration::from_millis(1600));
    second.on_frame().unwrap();

    for name in ["ghost 1", "ghost 2", "ghost 3"] {
        let a = first.scene().objects.find_by_name(name).unwrap();
        let b = second.scene().objects.find_by_name(name).unwrap();
        assert_eq!(
            first.scene().objects.world_transform(a).unwrap().position,
            second.scene().objects.world_transform(b).unwrap().position
        );
    }
}

#[test]
fn recovers_from_a_lost_surface() {
    let renderer = RecordingRenderer::new().failing_with([Some(RenderError::Lost), None]);
    let (mut frame_loop, _clock) = test_loop(scenes::default_cube(), renderer);
    frame_loop.on_resize(640, 480);
    frame_loop.start().unwrap();

    assert_eq!(
        frame_loop.on_frame().unwrap(),
        FrameOutcome::Dropped(RenderError::Lost)
    );
    assert_eq!(frame_loop.on_frame().unwrap(), FrameOutcome::Presented);

    let renderer = frame_loop.renderer();
    assert_eq!(renderer.frames(), 2);
    assert_eq!(renderer.resizes(), &[(640, 480, 1.0), (640, 480, 1.0)]);
    assert_eq!(frame_loop.frame_count(), 1);
}

#[test]
fn fatal_errors_end_the_loop() {
    let renderer =
        RecordingRenderer::new().failing_with([Some(RenderError::Fatal("gone".to_string()))]);
    let (mut frame_loop, _clock) = test_loop(scenes::default_cube(), renderer);
    frame_loop.start().unwrap();

    assert!(matches!(
        frame_loop.on_frame(),
        Err(FrameError::Render(RenderError::Fatal(_)))
    ));
    assert_eq!(frame_loop.state(), LoopState::Stopped);
    assert_eq!(frame_loop.on_frame().unwrap(), FrameOutcome::Skipped);
    assert_eq!(frame_loop.renderer().frames(), 1);
}

#[test]
fn stopping_cancels_the_next_frame() {
    let (mut frame_loop, _clock) = test_loop(scenes::default_cube(), RecordingRenderer::new());
    frame_loop.start().unwrap();
    frame_loop.on_frame().unwrap();
    frame_loop.stop();
    frame_loop.stop();

    assert_eq!(frame_loop.scheduler().cancelled(), 1);
    assert_eq!(frame_loop.scheduler().outstanding(), None);
    assert_eq!(frame_loop.on_frame().unwrap(), FrameOutcome::Skipped);
    assert!(matches!(frame_loop.start(), Err(FrameError::Stopped)));
}

#[test]
fn resizes_wait_for_the_next_frame_and_density_is_capped() {
    let (mut frame_loop, _clock) = test_loop(scenes::default_cube(), RecordingRenderer::new());
    frame_loop.start().unwrap();
    frame_loop.on_resize(300, 300);
    frame_loop.on_resize(900, 300);
    assert!(frame_loop.renderer().resizes().is_empty());

    frame_loop.on_frame().unwrap();
    assert_eq!(frame_loop.renderer().resizes(), &[(900, 300, 1.0)]);
    assert_eq!(frame_loop.renderer().aspects(), &[3.0]);

    frame_loop.set_pixel_density(3.0);
    assert_eq!(frame_loop.renderer().resizes().last(), Some(&(900, 300, 2.0)));
}

#[test]
fn density_change_does_not_lose_a_queued_resize() {
    let (mut frame_loop, _clock) = test_loop(scenes::default_cube(), RecordingRenderer::new());
    frame_loop.start().unwrap();
    frame_loop.on_resize(1000, 500);
    frame_loop.set_pixel_density(1.5);

    frame_loop.on_frame().unwrap();

    let surface = frame_loop.viewport().surface();
    assert_eq!((surface.width, surface.height), (1000, 500));
    assert_relative_eq!(frame_loop.viewport().camera().aspect, 2.0);
    assert_eq!(frame_loop.renderer().resizes(), &[(1000, 500, 1.5)]);
    assert_eq!(frame_loop.renderer().aspects(), &[2.0]);
}
