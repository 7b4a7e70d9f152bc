use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert!(Fps::whole(0).is_err());
}

#[test]
fn fps_frame_to_secs_is_exact_for_whole_rates() {
    let fps = Fps::whole(60).unwrap();
    assert_eq!(fps.frame_to_secs(FrameIndex(0)), 0.0);
    assert_eq!(fps.frame_to_secs(FrameIndex(30)), 0.5);
    assert_eq!(fps.frame_to_secs(FrameIndex(60)), 1.0);
}

#[test]
fn fps_supports_ntsc_rationals() {
    let fps = Fps::new(30000, 1001).unwrap();
    assert!((fps.as_f64() - 29.97).abs() < 1e-2);
}

#[test]
fn frames_for_duration_truncates() {
    let fps = Fps::whole(60).unwrap();
    assert_eq!(fps.frames_for_duration(3.0), 180);
    assert_eq!(fps.frames_for_duration(2.999), 179);
    assert_eq!(fps.frames_for_duration(0.0), 0);
    assert_eq!(fps.frames_for_duration(-1.0), 0);
}

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    let c = Canvas::new(4, 3).unwrap();
    assert_eq!(c.rgb_len(), 36);
}

#[test]
fn frame_validate_checks_byte_count() {
    let good = FrameRgb {
        width: 2,
        height: 2,
        data: vec![0; 12],
    };
    assert!(good.validate().is_ok());

    let bad = FrameRgb {
        width: 2,
        height: 2,
        data: vec![0; 11],
    };
    assert!(bad.validate().is_err());
}

#[test]
fn frame_pixel_indexes_top_left_origin() {
    let mut data = vec![0u8; 12];
    // Pixel (1, 0) = top-right of a 2x2 frame.
    data[3] = 200;
    data[4] = 100;
    data[5] = 50;
    let frame = FrameRgb {
        width: 2,
        height: 2,
        data,
    };
    assert_eq!(frame.pixel(1, 0), [200, 100, 50]);
    assert_eq!(frame.pixel(0, 1), [0, 0, 0]);
}
