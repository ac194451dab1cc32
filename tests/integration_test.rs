use desksurf::config::Config;
use desksurf::scaling::{
    compute_scaled, ModelPoint, OriginalPoint, Resolution, ScaleBounds, ScaleError, ScaleTransform,
};

fn transform(width: u32, height: u32) -> ScaleTransform {
    ScaleTransform::new(Resolution::new(width, height), ScaleBounds::default())
        .expect("valid resolution")
}

#[test]
fn test_config_validation_rejects_non_http_endpoint() {
    let config = Config {
        api_url: "ws://localhost:8000/chat".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_rejects_empty_resolution() {
    let config = Config {
        resolution: Resolution::new(0, 1080),
        ..Config::default()
    };
    assert!(config.validate().is_err());
    assert!(matches!(
        config.scale_transform(),
        Err(ScaleError::EmptyResolution(_))
    ));
}

#[test]
fn test_config_validation_allows_remote_https_endpoint() {
    let config = Config {
        api_url: "https://agent.example.com/chat".to_string(),
        resolution: Resolution::new(2560, 1440),
        ..Config::default()
    };
    assert!(config.validate().is_ok());
}

#[test]
fn test_full_hd_click_maps_into_model_space_and_back() {
    let transform = transform(1920, 1080);
    assert_eq!(transform.scaled(), Resolution::new(1024, 576));

    let model = transform.to_model_space(OriginalPoint::new(960, 540));
    assert_eq!(model, ModelPoint::new(512, 288));
    assert_eq!(
        transform.to_original_space(ModelPoint::new(1023, 575)),
        OriginalPoint::new(1918, 1078)
    );
}

#[test]
fn test_scaled_resolution_respects_bounds_for_common_displays() {
    let bounds = ScaleBounds::default();
    let displays = [
        (1920, 1080),
        (2560, 1440),
        (3840, 2160),
        (1280, 800),
        (1366, 768),
        (1600, 1200),
        (320, 240),
        (800, 600),
    ];
    for (width, height) in displays {
        let scaled = compute_scaled(Resolution::new(width, height), bounds)
            .expect("valid resolution")
            .scaled();
        assert!(scaled.width <= bounds.max_width, "{width}x{height} -> {scaled}");
        assert!(scaled.height <= bounds.max_height, "{width}x{height} -> {scaled}");
        assert!(scaled.width >= bounds.min_width, "{width}x{height} -> {scaled}");
        assert!(scaled.height >= bounds.min_height, "{width}x{height} -> {scaled}");
    }
}

#[test]
fn test_round_trip_stays_within_one_pixel_when_downscaling_moderately() {
    for (width, height) in [(1920, 1080), (1280, 800), (1600, 1200), (1366, 768), (320, 240)] {
        let transform = transform(width, height);
        assert!(transform.scale_factor() >= 0.5);
        assert_eq!(transform.round_trip_bound(), 1);

        for x in 0..width as i32 {
            let trip = transform.round_trip(OriginalPoint::new(x, 0));
            assert!(trip.error.0.abs() <= 1, "{width}x{height} x={x}: {trip:?}");
        }
        for y in 0..height as i32 {
            let trip = transform.round_trip(OriginalPoint::new(0, y));
            assert!(trip.error.1.abs() <= 1, "{width}x{height} y={y}: {trip:?}");
        }
    }
}

#[test]
fn test_round_trip_error_never_exceeds_reported_bound() {
    let transform = transform(3840, 2160);
    let bound = transform.round_trip_bound() as i32;
    assert!(bound >= 1);
    for x in (0..3840).step_by(7) {
        let trip = transform.round_trip(OriginalPoint::new(x, x % 2160));
        assert!(trip.error.0.abs() <= bound, "{trip:?}");
        assert!(trip.error.1.abs() <= bound, "{trip:?}");
    }
}
