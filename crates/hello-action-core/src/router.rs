// crates/hello-action-core/src/router.rs
// ============================================================================
// Module: Interaction Router
// Description: Declarative first-match routing of interactions to handlers.
// Purpose: Resolve an inbound interaction to a registered handler.
// Dependencies: crate::interaction, serde, thiserror
// ============================================================================

//! ## Overview
//! Patterns are registered in order together with a handler value. Routing
//! walks the table in registration order and returns the first pattern whose
//! interaction type matches and whose name or id predicate matches.
//!
//! Id entries ending in `*` are compiled into prefix matchers at registration
//! time. Malformed patterns are rejected by [`InteractionRouter::register`];
//! routing itself never fails, it only reports "no match".

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::interaction::ActionRequest;
use crate::interaction::InteractionType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Trailing wildcard marker for id entries.
pub const WILDCARD: char = '*';

// ============================================================================
// SECTION: Patterns
// ============================================================================

/// Declarative interaction matcher, as published in action metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionPattern {
    /// Interaction type the pattern applies to.
    #[serde(rename = "type")]
    pub kind: InteractionType,
    /// Command names (exact match).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub names: Vec<String>,
    /// Custom ids (exact, or prefix when ending in `*`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

impl InteractionPattern {
    /// Pattern matching commands or autocomplete requests by name.
    #[must_use]
    pub fn names(kind: InteractionType, names: &[&str]) -> Self {
        Self {
            kind,
            names: names.iter().map(ToString::to_string).collect(),
            ids: Vec::new(),
        }
    }

    /// Pattern matching components or modal submissions by custom id.
    #[must_use]
    pub fn ids(kind: InteractionType, ids: &[&str]) -> Self {
        Self {
            kind,
            names: Vec::new(),
            ids: ids.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Pattern registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The pattern lists neither names nor ids for its type.
    #[error("pattern for interaction type {0} lists no names or ids")]
    MissingPredicate(u8),
    /// The pattern uses the predicate that does not apply to its type.
    #[error("pattern for interaction type {kind} cannot match on {field}")]
    UnexpectedPredicate {
        /// Interaction type code.
        kind: u8,
        /// Offending field.
        field: &'static str,
    },
    /// A name or id entry is empty.
    #[error("pattern entry must not be empty")]
    EmptyEntry,
    /// A wildcard appears somewhere other than the end of an id.
    #[error("wildcard must be the final character: {0}")]
    InvalidWildcard(String),
    /// The interaction type cannot be routed.
    #[error("interaction type {0} is not routable")]
    UnroutableType(u8),
}

/// Compiled id predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdMatcher {
    /// Whole id must match.
    Exact(String),
    /// Id must start with the literal prefix.
    Prefix(String),
}

impl IdMatcher {
    /// Compiles an id entry.
    fn compile(entry: &str) -> Result<Self, RouterError> {
        if entry.is_empty() {
            return Err(RouterError::EmptyEntry);
        }
        let (literal, wildcard) = match entry.strip_suffix(WILDCARD) {
            Some(prefix) => (prefix, true),
            None => (entry, false),
        };
        if literal.contains(WILDCARD) {
            return Err(RouterError::InvalidWildcard(entry.to_string()));
        }
        if wildcard {
            Ok(Self::Prefix(literal.to_string()))
        } else {
            Ok(Self::Exact(literal.to_string()))
        }
    }

    /// Tests an id.
    fn matches(&self, id: &str) -> bool {
        match self {
            Self::Exact(expected) => id == expected,
            Self::Prefix(prefix) => id.starts_with(prefix.as_str()),
        }
    }
}

/// Registered route.
#[derive(Debug, Clone)]
struct Route<H> {
    /// Published pattern.
    pattern: InteractionPattern,
    /// Compiled id predicates.
    ids: Vec<IdMatcher>,
    /// Handler value.
    handler: H,
}

impl<H> Route<H> {
    /// Tests the route against a request.
    fn matches(&self, request: &ActionRequest) -> bool {
        if request.kind != self.pattern.kind {
            return false;
        }
        if self.pattern.kind.matches_by_name() {
            return request
                .command_name()
                .is_some_and(|name| self.pattern.names.iter().any(|candidate| candidate == name));
        }
        request.custom_id().is_some_and(|id| self.ids.iter().any(|matcher| matcher.matches(id)))
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Successful route resolution.
#[derive(Debug, Clone, Copy)]
pub struct RouteMatch<'a, H> {
    /// Matched pattern.
    pub pattern: &'a InteractionPattern,
    /// Handler registered with the pattern.
    pub handler: &'a H,
    /// Registration index.
    pub index: usize,
}

/// Ordered routing table.
#[derive(Debug, Clone)]
pub struct InteractionRouter<H> {
    /// Routes in registration order.
    routes: Vec<Route<H>>,
}

impl<H> Default for InteractionRouter<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> InteractionRouter<H> {
    /// Creates an empty router.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            routes: Vec::new(),
        }
    }

    /// Registers a pattern and its handler after validating the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when the pattern is malformed.
    pub fn register(&mut self, pattern: InteractionPattern, handler: H) -> Result<(), RouterError> {
        let kind = pattern.kind;
        if kind == InteractionType::Ping {
            return Err(RouterError::UnroutableType(kind.code()));
        }
        let (required, other, other_field) = if kind.matches_by_name() {
            (&pattern.names, &pattern.ids, "ids")
        } else {
            (&pattern.ids, &pattern.names, "names")
        };
        if required.is_empty() {
            return Err(RouterError::MissingPredicate(kind.code()));
        }
        if !other.is_empty() {
            return Err(RouterError::UnexpectedPredicate {
                kind: kind.code(),
                field: other_field,
            });
        }
        if required.iter().any(String::is_empty) {
            return Err(RouterError::EmptyEntry);
        }
        let ids = if kind.matches_by_id() {
            pattern.ids.iter().map(|entry| IdMatcher::compile(entry)).collect::<Result<_, _>>()?
        } else {
            Vec::new()
        };
        self.routes.push(Route {
            pattern,
            ids,
            handler,
        });
        Ok(())
    }

    /// Builder form of [`Self::register`].
    ///
    /// # Errors
    ///
    /// Returns [`RouterError`] when the pattern is malformed.
    pub fn with_route(mut self, pattern: InteractionPattern, handler: H) -> Result<Self, RouterError> {
        self.register(pattern, handler)?;
        Ok(self)
    }

    /// Resolves a request to the first matching route.
    #[must_use]
    pub fn route(&self, request: &ActionRequest) -> Option<RouteMatch<'_, H>> {
        self.routes.iter().enumerate().find(|(_, route)| route.matches(request)).map(
            |(index, route)| RouteMatch {
                pattern: &route.pattern,
                handler: &route.handler,
                index,
            },
        )
    }

    /// Returns registered patterns in order.
    pub fn patterns(&self) -> impl Iterator<Item = &InteractionPattern> {
        self.routes.iter().map(|route| &route.pattern)
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true when no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
