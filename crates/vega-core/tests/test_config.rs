use vega_core::config::PipelineConfig;
use vega_core::error::VegaError;

#[test]
fn defaults_validate() {
    assert!(PipelineConfig::default().validate().is_ok());
}

#[test]
fn partial_json_fills_in_defaults() {
    let config: PipelineConfig = serde_json::from_str(r#"{"fwhm": 4.5}"#).unwrap();
    assert_eq!(config.fwhm, 4.5);
    assert_eq!(config.threshold_nsigma, 5.0);
    assert_eq!(config.aperture_radius, 8.0);
    assert!(config.validate().is_ok());
}

#[test]
fn empty_json_equals_default() {
    let config: PipelineConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn json_round_trip_preserves_every_field() {
    let config = PipelineConfig {
        fwhm: 2.5,
        threshold_nsigma: 4.0,
        min_separation: 6.0,
        ..PipelineConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: PipelineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn invalid_fields_report_their_name() {
    let cases: Vec<(&str, PipelineConfig)> = vec![
        (
            "fwhm",
            PipelineConfig {
                fwhm: 0.0,
                ..PipelineConfig::default()
            },
        ),
        (
            "fwhm",
            PipelineConfig {
                fwhm: f64::NAN,
                ..PipelineConfig::default()
            },
        ),
        (
            "threshold_nsigma",
            PipelineConfig {
                threshold_nsigma: -2.0,
                ..PipelineConfig::default()
            },
        ),
        (
            "clip_max_iterations",
            PipelineConfig {
                clip_max_iterations: 0,
                ..PipelineConfig::default()
            },
        ),
        (
            "sharp_lo",
            PipelineConfig {
                sharp_lo: 1.5,
                sharp_hi: 1.0,
                ..PipelineConfig::default()
            },
        ),
        (
            "round_lo",
            PipelineConfig {
                round_lo: 1.0,
                round_hi: 1.0,
                ..PipelineConfig::default()
            },
        ),
        (
            "min_separation",
            PipelineConfig {
                min_separation: -1.0,
                ..PipelineConfig::default()
            },
        ),
        (
            "bg_inner_radius",
            PipelineConfig {
                bg_inner_radius: 16.0,
                bg_outer_radius: 15.0,
                ..PipelineConfig::default()
            },
        ),
        (
            "max_centroid_iterations",
            PipelineConfig {
                max_centroid_iterations: 0,
                ..PipelineConfig::default()
            },
        ),
        (
            "centroid_epsilon",
            PipelineConfig {
                centroid_epsilon: 0.0,
                ..PipelineConfig::default()
            },
        ),
    ];

    for (field, config) in cases {
        match config.validate() {
            Err(VegaError::InvalidConfiguration(message)) => {
                assert!(
                    message.contains(field),
                    "message {message:?} should name {field}"
                );
            }
            other => panic!("{field} case should fail validation, got {other:?}"),
        }
    }
}

#[test]
fn zero_min_separation_is_allowed() {
    let config = PipelineConfig {
        min_separation: 0.0,
        ..PipelineConfig::default()
    };
    assert!(config.validate().is_ok());
}
