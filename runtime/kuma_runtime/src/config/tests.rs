use pretty_assertions::assert_eq;

use super::*;

#[test]
fn defaults() {
    let config = RuntimeConfig::default();
    assert_eq!(config.lookup_cache_depth, 3);
    assert_eq!(config.max_call_depth, None);
    assert_eq!(config.trace_depth, 16);
    assert_eq!(config.equivalence_warn_threshold, 12);
}

#[test]
fn lookup_overrides_only_set_variables() {
    let config = RuntimeConfig::from_lookup(|var| match var {
        ENV_MAX_CALL_DEPTH => Some("64".to_string()),
        ENV_TRACE_DEPTH => Some(" 4 ".to_string()),
        _ => None,
    });
    assert_eq!(
        config,
        Ok(RuntimeConfig {
            max_call_depth: Some(64),
            trace_depth: 4,
            ..RuntimeConfig::default()
        })
    );
}

#[test]
fn invalid_number_is_reported() {
    let err = RuntimeConfig::from_lookup(|var| {
        (var == ENV_LOOKUP_CACHE_DEPTH).then(|| "deep".to_string())
    });
    assert_eq!(
        err,
        Err(ConfigError::InvalidNumber {
            var: ENV_LOOKUP_CACHE_DEPTH,
            value: "deep".to_string(),
        })
    );
    assert!(err
        .unwrap_err()
        .to_string()
        .contains("KUMA_LOOKUP_CACHE_DEPTH"));
}

#[test]
fn configure_is_thread_local() {
    configure(RuntimeConfig {
        trace_depth: 2,
        ..RuntimeConfig::default()
    });
    assert_eq!(RuntimeConfig::current().trace_depth, 2);

    let other = std::thread::spawn(|| RuntimeConfig::current().trace_depth);
    assert_eq!(other.join().ok(), Some(16));

    configure(RuntimeConfig::default());
}

#[test]
fn builder_overrides_defaults() {
    let config = RuntimeConfig::default()
        .with_lookup_cache_depth(0)
        .with_max_call_depth(Some(8))
        .with_trace_depth(1)
        .with_equivalence_warn_threshold(4);
    assert_eq!(
        config,
        RuntimeConfig {
            lookup_cache_depth: 0,
            max_call_depth: Some(8),
            trace_depth: 1,
            equivalence_warn_threshold: 4,
        }
    );
}
