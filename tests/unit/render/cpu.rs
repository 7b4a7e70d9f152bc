use super::*;
use crate::compile::instances::{NoteInstance, RenderParams};

// 100x100 surface, strike at 85px, falling 40px/s, 10px notes, no rounding.
fn params() -> RenderParams {
    RenderParams::from_raw(Canvas::new(100, 100).unwrap(), 40.0, 85.0, 10.0, 5.0, 0.0).unwrap()
}

fn scene(instances: Vec<NoteInstance>, statics: Vec<StaticQuad>) -> Scene {
    Scene {
        params: params(),
        instances,
        statics,
    }
}

// Left half of the screen, bottom edge at the strike line at `start_time`.
fn note_instance(start_time: f32, color: [f32; 3]) -> NoteInstance {
    NoteInstance {
        base_rect: [-1.0, -0.7, 1.0, 0.2],
        color,
        timing: [start_time, 0.0],
        size_pixels: [50.0, 10.0],
    }
}

#[test]
fn read_before_render_is_an_error() {
    let mut ctx = CpuContext::new(scene(vec![], vec![])).unwrap();
    assert!(ctx.read_frame().is_err());
}

#[test]
fn empty_scene_renders_black() {
    let mut ctx = CpuContext::new(scene(vec![], vec![])).unwrap();
    ctx.render_frame(0.0).unwrap();
    let frame = ctx.read_frame().unwrap();
    assert_eq!(frame.data.len(), 100 * 100 * 3);
    assert!(frame.data.iter().all(|&b| b == 0));
}

#[test]
fn static_quads_cover_the_full_surface() {
    let overlay = StaticQuad {
        rect: [-1.0, -1.0, 2.0, 2.0],
        color: [0.5, 0.0, 0.0],
        size_pixels: [100.0, 100.0],
    };
    let mut ctx = CpuContext::new(scene(vec![], vec![overlay])).unwrap();
    ctx.render_frame(0.0).unwrap();
    let frame = ctx.read_frame().unwrap();
    assert_eq!(frame.pixel(0, 0), [128, 0, 0]);
    assert_eq!(frame.pixel(99, 99), [128, 0, 0]);
}

#[test]
fn note_lands_on_the_strike_line_in_top_origin_pixels() {
    let mut ctx = CpuContext::new(scene(vec![note_instance(0.0, [1.0, 0.0, 0.0])], vec![])).unwrap();
    ctx.render_frame(0.0).unwrap();
    let frame = ctx.read_frame().unwrap();

    // Bottom edge at the strike line (85px): rows 75..85 on the left half.
    assert_eq!(frame.pixel(10, 80), [255, 0, 0]);
    assert_eq!(frame.pixel(49, 76), [255, 0, 0]);
    // Above the note, right of the note, below the strike line: all empty.
    assert_eq!(frame.pixel(10, 70), [0, 0, 0]);
    assert_eq!(frame.pixel(60, 80), [0, 0, 0]);
    assert_eq!(frame.pixel(10, 90), [0, 0, 0]);
}

#[test]
fn notes_fall_between_frames() {
    let mut ctx = CpuContext::new(scene(vec![note_instance(0.0, [1.0, 0.0, 0.0])], vec![])).unwrap();

    // 0.25s after the strike: down 10px, fading but still visible.
    ctx.render_frame(0.25).unwrap();
    let frame = ctx.read_frame().unwrap();
    assert_ne!(frame.pixel(10, 90), [0, 0, 0]);
    assert!(frame.pixel(10, 90)[0] < 255);
    assert_eq!(frame.pixel(10, 78), [0, 0, 0]);
}

#[test]
fn instance_order_does_not_change_pixels() {
    let a = note_instance(0.0, [0.8, 0.1, 0.0]);
    let b = note_instance(0.1, [0.0, 0.3, 0.7]);

    let mut ctx_ab = CpuContext::new(scene(vec![a, b], vec![])).unwrap();
    let mut ctx_ba = CpuContext::new(scene(vec![b, a], vec![])).unwrap();
    for t in [0.0, 0.05, 0.2] {
        ctx_ab.render_frame(t).unwrap();
        ctx_ba.render_frame(t).unwrap();
        assert_eq!(
            ctx_ab.read_frame().unwrap(),
            ctx_ba.read_frame().unwrap(),
            "frames diverged at t={t}"
        );
    }
}

#[test]
fn additive_compositing_saturates() {
    let white = note_instance(0.0, [1.0, 1.0, 1.0]);
    let mut ctx = CpuContext::new(scene(vec![white, white], vec![])).unwrap();
    ctx.render_frame(0.0).unwrap();
    let frame = ctx.read_frame().unwrap();
    assert_eq!(frame.pixel(10, 80), [255, 255, 255]);
}
