use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        SlidecastError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        SlidecastError::surface("x")
            .to_string()
            .contains("surface error:")
    );
    assert!(
        SlidecastError::capture("x")
            .to_string()
            .contains("capture error:")
    );
    assert!(
        SlidecastError::encode("x")
            .to_string()
            .contains("encode error:")
    );
    assert!(
        SlidecastError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = SlidecastError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn only_validation_reports_is_validation() {
    assert!(SlidecastError::validation("x").is_validation());
    assert!(!SlidecastError::capture("x").is_validation());
}
