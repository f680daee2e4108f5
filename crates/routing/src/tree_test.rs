//! Tests for RouteTree
//!
//! Tests cover priority, backtracking, parameter capture, collisions and
//! totality over malformed channels.

use crate::{RouteTree, RoutingError};

fn tree_of(patterns: &[&'static str]) -> RouteTree<&'static str> {
    let mut tree = RouteTree::new();
    for p in patterns {
        tree.insert(p, *p).unwrap();
    }
    tree
}

// =============================================================================
// Matching
// =============================================================================

#[test]
fn test_new_tree_is_empty() {
    let tree: RouteTree<u32> = RouteTree::new();
    assert!(tree.is_empty());
    assert!(tree.lookup("a/b").is_none());
}

#[test]
fn test_literal_match() {
    let tree = tree_of(&["stream/cpu", "stream/mem"]);
    assert_eq!(tree.len(), 2);
    assert_eq!(*tree.lookup("stream/cpu").unwrap().value, "stream/cpu");
    assert_eq!(*tree.lookup("stream/mem").unwrap().value, "stream/mem");
    assert!(tree.lookup("stream/disk").is_none());
    assert!(tree.lookup("stream").is_none());
    assert!(tree.lookup("stream/cpu/extra").is_none());
}

#[test]
fn test_literal_wins_over_wildcard() {
    // Insertion order must not matter
    for patterns in [["a/b", "a/*"], ["a/*", "a/b"]] {
        let tree = tree_of(&patterns);
        assert_eq!(tree.lookup("a/b").unwrap().pattern, "a/b");
        assert_eq!(tree.lookup("a/c").unwrap().pattern, "a/*");
    }
}

#[test]
fn test_param_wins_over_catch_all() {
    let tree = tree_of(&["a/:x", "a/*rest"]);
    assert_eq!(tree.lookup("a/b").unwrap().pattern, "a/:x");
    assert_eq!(tree.lookup("a/b/c").unwrap().pattern, "a/*rest");
}

#[test]
fn test_lookup_is_deterministic() {
    let tree = tree_of(&["a/b", "a/:x", "a/*", "a/:x/c", "b/*"]);
    for channel in ["a/b", "a/z", "a/z/c", "a/z/d", "b/q/r"] {
        let first = tree.lookup(channel).map(|m| m.pattern.to_string());
        for _ in 0..10 {
            assert_eq!(tree.lookup(channel).map(|m| m.pattern.to_string()), first);
        }
    }
}

#[test]
fn test_backtracks_from_dead_end_literal() {
    let tree = tree_of(&["a/b/d", "a/:x/c"]);
    let m = tree.lookup("a/b/c").unwrap();
    assert_eq!(m.pattern, "a/:x/c");
    assert_eq!(m.params.get("x"), Some("b"));
}

#[test]
fn test_backtracking_drops_stale_params() {
    let tree = tree_of(&["a/:x/c", "a/*rest"]);
    let m = tree.lookup("a/b/d").unwrap();
    assert_eq!(m.pattern, "a/*rest");
    assert_eq!(m.params.get("x"), None);
    assert_eq!(m.params.get("rest"), Some("b/d"));
    assert_eq!(m.params.len(), 1);
}

#[test]
fn test_param_capture() {
    let tree = tree_of(&["stream/:host/:metric"]);
    let m = tree.lookup("stream/web1/cpu").unwrap();
    let params: Vec<_> = m.params.iter().collect();
    assert_eq!(params, vec![("host", "web1"), ("metric", "cpu")]);
}

#[test]
fn test_catch_all_requires_a_segment() {
    let tree = tree_of(&["a/*"]);
    assert!(tree.lookup("a").is_none());
    assert!(tree.lookup("a/b/c/d").is_some());
    assert!(tree.lookup("a/b").unwrap().params.is_empty());
}

#[test]
fn test_root_catch_all() {
    let tree = tree_of(&["*"]);
    assert!(tree.lookup("anything/at/all").is_some());
    assert!(tree.lookup("").is_none());
}

#[test]
fn test_channels_are_case_sensitive() {
    let tree = tree_of(&["Stream/CPU"]);
    assert!(tree.lookup("stream/cpu").is_none());
    assert!(tree.lookup("Stream/CPU").is_some());
}

// =============================================================================
// Normalization and totality
// =============================================================================

#[test]
fn test_trailing_slash_normalization() {
    let tree = tree_of(&["/a/b/"]);
    assert_eq!(tree.lookup("a/b").unwrap().pattern, "a/b");
    assert!(tree.lookup("/a/b").is_some());
    assert!(tree.lookup("a/b/").is_some());
}

#[test]
fn test_malformed_channels_do_not_match() {
    let tree = tree_of(&["*", "a/:x"]);
    for channel in ["", "/", "//", "a//b", "a/ /b\u{0}", "\u{1F600}/x"] {
        // Must not panic; only well-formed channels can match
        let _ = tree.lookup(channel);
    }
    assert!(tree.lookup("a//b").is_none());
    assert!(tree.lookup("//").is_none());
}

// =============================================================================
// Collisions
// =============================================================================

#[test]
fn test_duplicate_pattern_collides() {
    let mut tree = tree_of(&["a/b"]);
    assert_eq!(
        tree.insert("/a/b/", "again"),
        Err(RoutingError::collision("a/b", "a/b"))
    );
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_param_name_conflict_collides() {
    let mut tree = tree_of(&["a/:x/c"]);
    let err = tree.insert("a/:y/d", "other").unwrap_err();
    assert_eq!(err, RoutingError::collision("a/:y/d", "a/:x/c"));
}

#[test]
fn test_catch_all_conflict_collides() {
    let mut tree = tree_of(&["a/*"]);
    assert!(matches!(
        tree.insert("a/*rest", "named"),
        Err(RoutingError::Collision { .. })
    ));
}

#[test]
fn test_collision_leaves_tree_unchanged() {
    let mut tree = tree_of(&["a/:x"]);
    assert!(tree.insert("a/:y/new/branch", "x").is_err());
    assert!(tree.lookup("a/q/new/branch").is_none());
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_distinct_shapes_do_not_collide() {
    let mut tree = tree_of(&["a/b", "a/:x", "a/*", "a/b/c"]);
    assert!(tree.insert("a/:x/c", "ok").is_ok());
    assert_eq!(tree.len(), 5);
}

#[test]
fn test_invalid_pattern_is_reported() {
    let mut tree: RouteTree<()> = RouteTree::new();
    assert_eq!(tree.insert("", ()), Err(RoutingError::EmptyPattern));
    assert!(tree.insert("a/*/b", ()).is_err());
    assert!(tree.is_empty());
}
