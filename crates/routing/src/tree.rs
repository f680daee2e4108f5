//! Route tree - pattern to value resolver
//!
//! The tree is built once per organization and then shared read-only by all
//! publish/subscribe calls. Rebuilding means building a new tree and swapping
//! it in; nothing mutates a tree that readers can see.

use std::collections::HashMap;

use crate::error::{Result, RoutingError};
use crate::pattern::{Pattern, Segment};

/// Parameters captured by `:name` and `*name` segments, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<(String, String)>);

impl Params {
    /// Value captured for a parameter name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over (name, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a successful lookup
#[derive(Debug, Clone)]
pub struct RouteMatch<'a, T> {
    /// Value registered for the matching pattern
    pub value: &'a T,
    /// The matching pattern, normalized
    pub pattern: &'a str,
    /// Captured parameters
    pub params: Params,
}

#[derive(Debug)]
struct Leaf<T> {
    pattern: String,
    /// Catch-all parameter name, if this leaf is a named catch-all
    rest: Option<String>,
    value: T,
}

#[derive(Debug)]
struct ParamEdge<T> {
    name: String,
    /// First pattern that introduced this parameter, for collision messages
    pattern: String,
    node: Box<Node<T>>,
}

#[derive(Debug)]
struct Node<T> {
    literals: HashMap<String, Node<T>>,
    param: Option<ParamEdge<T>>,
    catch_all: Option<Leaf<T>>,
    leaf: Option<Leaf<T>>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            literals: HashMap::new(),
            param: None,
            catch_all: None,
            leaf: None,
        }
    }
}

impl<T> Node<T> {
    /// Depth-first search: literal, then parameter, then catch-all
    fn find<'a>(
        &'a self,
        segments: &[&str],
        params: &mut Vec<(String, String)>,
    ) -> Option<&'a Leaf<T>> {
        let Some((first, rest)) = segments.split_first() else {
            return self.leaf.as_ref();
        };

        if let Some(child) = self.literals.get(*first)
            && let Some(leaf) = child.find(rest, params)
        {
            return Some(leaf);
        }

        if let Some(edge) = &self.param {
            params.push((edge.name.clone(), (*first).to_string()));
            if let Some(leaf) = edge.node.find(rest, params) {
                return Some(leaf);
            }
            params.pop();
        }

        let leaf = self.catch_all.as_ref()?;
        if let Some(name) = &leaf.rest {
            params.push((name.clone(), segments.join("/")));
        }
        Some(leaf)
    }
}

/// Segment tree mapping channel patterns to values
///
/// # Collisions
///
/// Two patterns collide when they would match exactly the same channels:
/// the same literals with parameters at the same positions. Parameters at
/// the same position must also share a name. Insertion reports collisions
/// as `RoutingError::Collision` and leaves the tree unchanged.
#[derive(Debug)]
pub struct RouteTree<T> {
    root: Node<T>,
    len: usize,
}

impl<T> Default for RouteTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RouteTree<T> {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            len: 0,
        }
    }

    /// Parse and insert a pattern
    pub fn insert(&mut self, pattern: &str, value: T) -> Result<()> {
        let parsed = Pattern::parse(pattern)?;
        self.insert_pattern(&parsed, value)
    }

    /// Insert an already parsed pattern
    pub fn insert_pattern(&mut self, pattern: &Pattern, value: T) -> Result<()> {
        let segments = pattern.segments();
        let (walk, rest) = match segments.split_last() {
            Some((Segment::CatchAll(name), init)) => (init, Some(name.clone())),
            _ => (segments, None),
        };

        // Check the whole path first so a collision leaves no empty nodes behind
        self.check_collision(pattern, walk, rest.is_some())?;

        let mut node = &mut self.root;
        for segment in walk {
            node = match segment {
                Segment::Literal(text) => node.literals.entry(text.clone()).or_default(),
                Segment::Param(name) => {
                    let edge = node.param.get_or_insert_with(|| ParamEdge {
                        name: name.clone(),
                        pattern: pattern.as_str().to_string(),
                        node: Box::default(),
                    });
                    edge.node.as_mut()
                }
                Segment::CatchAll(_) => {
                    return Err(RoutingError::invalid_pattern(
                        pattern.as_str(),
                        "catch-all must be the last segment",
                    ));
                }
            };
        }

        let is_catch_all = rest.is_some();
        let leaf = Leaf {
            pattern: pattern.as_str().to_string(),
            rest: rest.flatten(),
            value,
        };
        if is_catch_all {
            node.catch_all = Some(leaf);
        } else {
            node.leaf = Some(leaf);
        }
        self.len += 1;
        Ok(())
    }

    fn check_collision(&self, pattern: &Pattern, walk: &[Segment], catch_all: bool) -> Result<()> {
        let mut node = &self.root;
        for segment in walk {
            let next = match segment {
                Segment::Literal(text) => node.literals.get(text),
                Segment::Param(name) => match &node.param {
                    Some(edge) if edge.name != *name => {
                        return Err(RoutingError::collision(pattern.as_str(), &edge.pattern));
                    }
                    Some(edge) => Some(edge.node.as_ref()),
                    None => None,
                },
                Segment::CatchAll(_) => None,
            };
            match next {
                Some(child) => node = child,
                // Fresh branch, nothing below can collide
                None => return Ok(()),
            }
        }

        let slot = if catch_all { &node.catch_all } else { &node.leaf };
        match slot {
            Some(existing) => Err(RoutingError::collision(pattern.as_str(), &existing.pattern)),
            None => Ok(()),
        }
    }

    /// Resolve a channel to the best matching pattern
    ///
    /// Total over all inputs: empty channels and channels with empty inner
    /// segments simply do not match.
    pub fn lookup(&self, channel: &str) -> Option<RouteMatch<'_, T>> {
        let trimmed = channel.trim_matches('/');
        if trimmed.is_empty() {
            return None;
        }
        let segments: Vec<&str> = trimmed.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return None;
        }

        let mut params = Vec::new();
        let leaf = self.root.find(&segments, &mut params)?;
        Some(RouteMatch {
            value: &leaf.value,
            pattern: &leaf.pattern,
            params: Params(params),
        })
    }

    /// Number of registered patterns
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the tree has no patterns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
