use super::*;

fn note(time: f64, lane: i32) -> Note {
    Note {
        pitch_id: 38,
        time,
        velocity: 127,
        lane,
        color: [255, 255, 255],
        label: String::new(),
    }
}

fn opts_120() -> RenderOpts {
    let mut opts = RenderOpts::new(
        Canvas::new(120, 120).unwrap(),
        Fps::whole(60).unwrap(),
    );
    opts.draw_overlay = false;
    opts.duration_override = Some(3.0);
    opts
}

// t = 0, 0.5, 1.0 in three lanes plus a kick bar at 1.5s.
fn kit_notes() -> Vec<Note> {
    vec![
        note(0.0, 0),
        note(0.5, 1),
        note(1.0, 2),
        note(1.5, -1),
    ]
}

#[test]
fn opts_defaults_match_the_classic_renderer() {
    let opts = RenderOpts::new(Canvas::new(1920, 1080).unwrap(), Fps::whole(60).unwrap());
    assert_eq!(opts.fall_speed_multiplier, 1.0);
    assert_eq!(opts.corner_radius, 8.0);
    assert_eq!(opts.tail_seconds, 3.0);
    assert!(opts.duration_override.is_none());
    assert!(opts.draw_overlay);
    assert_eq!(opts.backend, BackendKind::Cpu);
}

#[test]
fn build_scene_compacts_lanes_and_derives_duration() {
    let mut opts = opts_120();
    opts.duration_override = None;
    opts.tail_seconds = 2.0;

    let notes = vec![note(0.0, 3), note(1.5, 7)];
    let (scene, duration) = build_scene(&notes, &opts).unwrap();
    assert_eq!(duration, 3.5);
    assert_eq!(scene.instances.len(), 2);
    // Lanes 3 and 7 compact to two adjacent columns.
    assert_eq!(scene.instances[0].base_rect[0], -1.0);
    assert_eq!(scene.instances[1].base_rect[0], 0.0);
    assert!(scene.statics.is_empty());

    opts.draw_overlay = true;
    let (scene, _) = build_scene(&notes, &opts).unwrap();
    assert!(!scene.statics.is_empty());
}

#[test]
fn build_scene_rejects_non_positive_durations() {
    let mut opts = opts_120();
    opts.duration_override = None;
    opts.tail_seconds = 0.0;
    assert!(build_scene(&[], &opts).is_err());

    opts.duration_override = Some(-1.0);
    assert!(build_scene(&kit_notes(), &opts).is_err());

    opts.duration_override = Some(5.0);
    let (_, duration) = build_scene(&kit_notes(), &opts).unwrap();
    assert_eq!(duration, 5.0);
}

#[test]
fn frames_arrive_complete_and_in_order() {
    let opts = opts_120();
    let mut indices = Vec::new();
    let stats = render_frames(&kit_notes(), &opts, |idx, frame| {
        frame.validate()?;
        assert_eq!(frame.width, 120);
        assert_eq!(frame.height, 120);
        indices.push(idx.0);
        Ok(())
    })
    .unwrap();

    assert_eq!(stats.frames, 180);
    assert_eq!(indices, (0..180).collect::<Vec<u64>>());
}

#[test]
fn nothing_renders_below_the_strike_line_at_frame_zero() {
    // Strike line at 85% of 120px = 102px; at t=0 every note is at or above
    // it, so the bottom rows must be black.
    let opts = opts_120();
    let mut checked = false;
    render_frames(&kit_notes(), &opts, |idx, frame| {
        if idx.0 == 0 {
            for y in 103..120 {
                for x in 0..120 {
                    assert_eq!(frame.pixel(x, y), [0, 0, 0], "pixel ({x}, {y})");
                }
            }
            checked = true;
        }
        Ok(())
    })
    .unwrap();
    assert!(checked);
}

#[test]
fn notes_are_visible_mid_video() {
    let opts = opts_120();
    let mut lit = 0usize;
    render_frames(&kit_notes(), &opts, |idx, frame| {
        if idx.0 == 60 {
            lit = frame.data.iter().filter(|&&b| b != 0).count();
        }
        Ok(())
    })
    .unwrap();
    assert!(lit > 0, "frame 60 should contain visible notes");
}

#[test]
fn notes_fade_below_the_strike_line_without_vanishing() {
    let opts = opts_120();
    let mut checked = false;
    render_frames(&kit_notes(), &opts, |idx, frame| {
        // Frame 72 (t=1.2s): the 1.0s note is 9.6px past the strike line,
        // mid-fade in lane 2.
        if idx.0 == 72 {
            let px = frame.pixel(100, 108);
            assert!(px[0] > 0, "faded note should stay visible");
            assert!(px[0] < 255, "note past the strike line should be dimmed");
            checked = true;
        }
        // By the last frame every note has fallen off screen.
        if idx.0 == 179 {
            assert!(frame.data.iter().all(|&b| b == 0));
        }
        Ok(())
    })
    .unwrap();
    assert!(checked);
}

#[test]
fn input_order_does_not_change_any_frame() {
    let opts = opts_120();
    let forward = kit_notes();
    let reversed: Vec<Note> = forward.iter().rev().cloned().collect();

    let mut grab = |notes: &[Note]| {
        let mut bytes = Vec::new();
        render_frames(notes, &opts, |idx, frame| {
            if idx.0 == 60 {
                bytes = frame.data.clone();
            }
            Ok(())
        })
        .unwrap();
        bytes
    };

    assert_eq!(grab(&forward), grab(&reversed));
}

#[test]
fn sink_errors_abort_the_loop() {
    let opts = opts_120();
    let mut calls = 0u64;
    let result = render_frames(&kit_notes(), &opts, |idx, _| {
        calls += 1;
        if idx.0 == 2 {
            return Err(NotefallError::stream_write("pipe closed", ""));
        }
        Ok(())
    });
    assert!(result.is_err());
    assert_eq!(calls, 3);
}

#[test]
fn mp4_encoding_requires_whole_frame_rates() {
    let mut opts = opts_120();
    opts.fps = Fps::new(30000, 1001).unwrap();
    let err = render_to_mp4(
        &kit_notes(),
        std::path::Path::new("out/never-written.mp4"),
        None,
        &opts,
    )
    .unwrap_err();
    assert!(matches!(err, NotefallError::Configuration(_)));
}
