use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert_eq!(FilterError::NotConfigured.to_string(), "backend not configured");
    assert!(
        FilterError::resource("x")
            .to_string()
            .contains("resource acquisition failure:")
    );
    assert!(
        FilterError::invalid_state("x")
            .to_string()
            .contains("invalid state:")
    );
    assert!(
        FilterError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = FilterError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
