use super::*;

fn note(time: f64, lane: i32, velocity: u8, color: [u8; 3]) -> Note {
    Note {
        pitch_id: 38,
        time,
        velocity,
        lane,
        color,
        label: String::new(),
    }
}

fn params_1080p() -> RenderParams {
    RenderParams::new(Canvas::new(1920, 1080).unwrap(), 1.0, 8.0).unwrap()
}

#[test]
fn derived_params_follow_the_layout_rules() {
    let p = params_1080p();
    assert_eq!(p.pixels_per_second, 432.0); // 40% of 1080 per second
    assert_eq!(p.strike_line_y_pixels, 918.0); // 85% of 1080
    assert!((p.lookahead_seconds - 918.0 / 432.0).abs() < 1e-6);
    assert!((p.passthrough_seconds - (162.0 + 60.0) / 432.0).abs() < 1e-6);
    assert_eq!(p.canvas(), Canvas::new(1920, 1080).unwrap());
}

#[test]
fn params_reject_invalid_configurations() {
    let canvas = Canvas::new(1920, 1080).unwrap();
    assert!(RenderParams::from_raw(canvas, 0.0, 918.0, 60.0, 30.0, 8.0).is_err());
    assert!(RenderParams::from_raw(canvas, -5.0, 918.0, 60.0, 30.0, 8.0).is_err());
    assert!(RenderParams::from_raw(canvas, 432.0, 2000.0, 60.0, 30.0, 8.0).is_err());
    assert!(RenderParams::from_raw(canvas, 432.0, 918.0, 0.0, 30.0, 8.0).is_err());
    assert!(RenderParams::from_raw(canvas, 432.0, 918.0, 60.0, 30.0, -1.0).is_err());
    assert!(RenderParams::from_raw(canvas, 432.0, 918.0, 60.0, 30.0, 8.0).is_ok());
}

#[test]
fn lanes_split_the_width_evenly() {
    let p = params_1080p();
    let notes = vec![
        note(0.0, 0, 127, [255, 0, 0]),
        note(0.5, 1, 127, [0, 255, 0]),
    ];
    let (instances, num_lanes) = compile_instances(&notes, &p).unwrap();
    assert_eq!(num_lanes, 2);

    // Two lanes: each is half the screen, starting at -1.0 and 0.0.
    assert_eq!(instances[0].base_rect[0], -1.0);
    assert_eq!(instances[0].base_rect[2], 1.0);
    assert_eq!(instances[1].base_rect[0], 0.0);
    assert_eq!(instances[1].base_rect[2], 1.0);
    assert_eq!(instances[0].size_pixels, [960.0, 60.0]);

    // Both sit at the strike line NDC with the fixed note height.
    assert_eq!(instances[0].base_rect[1], p.strike_line_y_norm);
    assert_eq!(instances[0].base_rect[3], pixels_to_norm_h(60.0, 1080.0));
}

#[test]
fn special_lane_becomes_a_full_width_bar() {
    let p = params_1080p();
    let (instances, num_lanes) =
        compile_instances(&[note(1.0, -1, 127, [200, 40, 40])], &p).unwrap();
    assert_eq!(num_lanes, 1);
    let kick = &instances[0];
    assert_eq!(kick.base_rect[0], -1.0);
    assert_eq!(kick.base_rect[2], 2.0);
    assert_eq!(kick.size_pixels, [1920.0, 30.0]);
    assert_eq!(kick.base_rect[3], pixels_to_norm_h(30.0, 1080.0));
}

#[test]
fn colors_are_normalized_and_velocity_scaled() {
    let p = params_1080p();
    let (instances, _) = compile_instances(
        &[
            note(0.0, 0, 127, [255, 0, 0]),
            note(0.0, 0, 0, [255, 255, 255]),
        ],
        &p,
    )
    .unwrap();
    assert_eq!(instances[0].color, [1.0, 0.0, 0.0]);
    // Zero velocity keeps notes visible at the 0.3 brightness floor.
    for c in instances[1].color {
        assert!((c - 0.3).abs() < 1e-6);
    }
}

#[test]
fn compilation_preserves_input_order_and_handles_empty_input() {
    let p = params_1080p();
    let notes = vec![
        note(2.0, 0, 100, [1, 2, 3]),
        note(0.5, 1, 100, [1, 2, 3]),
        note(1.0, 0, 100, [1, 2, 3]),
    ];
    let (instances, _) = compile_instances(&notes, &p).unwrap();
    let times: Vec<f32> = instances.iter().map(|i| i.timing[0]).collect();
    assert_eq!(times, vec![2.0, 0.5, 1.0]);

    let (empty, num_lanes) = compile_instances(&[], &p).unwrap();
    assert!(empty.is_empty());
    assert_eq!(num_lanes, 1);
}

#[test]
fn invalid_notes_fail_compilation() {
    let p = params_1080p();
    let bad = note(-1.0, 0, 100, [0, 0, 0]);
    assert!(compile_instances(&[bad], &p).is_err());
}

#[test]
fn static_overlay_has_markers_and_strike_line() {
    let p = params_1080p();
    let quads = compile_static_elements(4, &p);
    // One marker per lane boundary (5 for 4 lanes) plus the strike line.
    assert_eq!(quads.len(), 6);

    for marker in &quads[..5] {
        assert_eq!(marker.color, [0.3, 0.3, 0.3]);
        assert_eq!(marker.size_pixels, [2.0, 1080.0]);
        assert_eq!(marker.rect[1], -1.0);
        assert_eq!(marker.rect[3], 2.0);
    }

    let strike = &quads[5];
    assert_eq!(strike.color, [1.0, 1.0, 1.0]);
    assert_eq!(strike.rect[0], -1.0);
    assert_eq!(strike.rect[2], 2.0);
    assert_eq!(strike.size_pixels, [1920.0, 4.0]);
}
