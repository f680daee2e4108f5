//! Tests for channel addresses

use crate::{ChannelAddress, RoutingError, Scope, is_valid_channel};

#[test]
fn test_parse_channel() {
    let addr = ChannelAddress::parse("stream/telegraf/cpu").unwrap();
    assert_eq!(addr.scope, Scope::Stream);
    assert_eq!(addr.namespace, "telegraf");
    assert_eq!(addr.path, "cpu");
}

#[test]
fn test_path_keeps_inner_slashes() {
    let addr: ChannelAddress = "ds/abc123/query/1".parse().unwrap();
    assert_eq!(addr.scope, Scope::DataSource);
    assert_eq!(addr.path, "query/1");
    assert_eq!(addr.to_string(), "ds/abc123/query/1");
}

#[test]
fn test_missing_parts_rejected() {
    for channel in ["stream", "stream/ns", "stream//path", "/ns/path"] {
        assert!(
            matches!(
                ChannelAddress::parse(channel),
                Err(RoutingError::InvalidChannel { .. })
            ),
            "{channel} should be rejected"
        );
    }
}

#[test]
fn test_unknown_scope_rejected() {
    let err = ChannelAddress::parse("bogus/ns/path").unwrap_err();
    assert!(err.to_string().contains("unknown scope 'bogus'"));
}

#[test]
fn test_scope_round_trip_names() {
    for scope in Scope::ALL {
        assert_eq!(scope.as_str().parse::<Scope>().unwrap(), scope);
    }
}

#[test]
fn test_channel_characters() {
    assert!(is_valid_channel("stream/a-b_c/x=1.2"));
    assert!(!is_valid_channel(""));
    assert!(!is_valid_channel("stream/a b/c"));
    assert!(!is_valid_channel("stream/ä/c"));
}
