use rolegate_schema::TraversalNode;

/// Best-effort reconstruction of the named, non-leaf ancestor chain of the
/// field being resolved.
///
/// The state depends on the order fields are visited in, so one tracker must
/// never be shared between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTracker {
    segments: Vec<String>,
}

impl PathTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the tracker to `node`. Runs before every authorization decision.
    pub fn update(&mut self, node: &TraversalNode<'_>) {
        let level = node.named_depth();

        // pop back to the parent frame, dropping whatever a sibling subtree left
        self.segments.truncate(level.saturating_sub(1));

        if self.segments.len() != level && node.has_selection_set {
            self.segments.push(node.field_name.to_string());
        }

        if node.is_root_selection() {
            self.segments.clear();
            self.segments.push(node.field_name.to_string());
        }
    }

    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// `operation.seg1.seg2.`, or just `operation.` while nothing is tracked.
    pub fn full_path(&self, operation: &str) -> String {
        if self.segments.is_empty() {
            format!("{operation}.")
        } else {
            format!("{operation}.{}.", self.segments.join("."))
        }
    }
}

#[cfg(test)]
mod tests {
    use parser::types::OperationType;
    use rolegate_schema::{PathSegment, TypeRef};

    use super::*;

    struct Visit {
        path: Vec<PathSegment>,
        parent_type: &'static str,
        has_selection_set: bool,
    }

    fn visit(path: &str, parent_type: &'static str, has_selection_set: bool) -> Visit {
        let path = path
            .split('.')
            .map(|segment| match segment.parse::<usize>() {
                Ok(idx) => PathSegment::Index(idx),
                Err(_) => PathSegment::Field(segment.to_string()),
            })
            .collect();
        Visit {
            path,
            parent_type,
            has_selection_set,
        }
    }

    fn apply(tracker: &mut PathTracker, visit: &Visit, operation: OperationType) {
        let ty = TypeRef::named("String");
        let field_name = match visit.path.iter().rev().find(|segment| segment.is_field()) {
            Some(PathSegment::Field(name)) => name.as_str(),
            _ => unreachable!(),
        };
        tracker.update(&TraversalNode {
            field_name,
            response_key: field_name,
            parent_type: visit.parent_type,
            operation,
            path: &visit.path,
            has_selection_set: visit.has_selection_set,
            return_type: &ty,
        });
    }

    #[test]
    fn leaves_are_never_tracked() {
        let mut tracker = PathTracker::new();
        apply(&mut tracker, &visit("user", "Query", true), OperationType::Query);
        apply(&mut tracker, &visit("user.email", "User", false), OperationType::Query);
        assert_eq!(tracker.segments(), ["user"]);
        assert_eq!(tracker.full_path("query"), "query.user.");
    }

    #[test]
    fn list_positions_do_not_count_as_depth() {
        let mut tracker = PathTracker::new();
        apply(&mut tracker, &visit("users", "Query", true), OperationType::Query);
        apply(&mut tracker, &visit("users.0.profile", "User", true), OperationType::Query);
        apply(&mut tracker, &visit("users.0.profile.phone", "Profile", false), OperationType::Query);
        assert_eq!(tracker.full_path("query"), "query.users.profile.");

        apply(&mut tracker, &visit("users.1.profile", "User", true), OperationType::Query);
        assert_eq!(tracker.full_path("query"), "query.users.profile.");
    }

    #[test]
    fn sibling_subtree_is_discarded() {
        let mut tracker = PathTracker::new();
        apply(&mut tracker, &visit("user", "Query", true), OperationType::Query);
        apply(&mut tracker, &visit("user.profile", "User", true), OperationType::Query);
        apply(&mut tracker, &visit("user.profile.settings", "Profile", true), OperationType::Query);
        apply(&mut tracker, &visit("user.orders", "User", true), OperationType::Query);
        assert_eq!(tracker.segments(), ["user", "orders"]);
    }

    #[test]
    fn root_selection_resets_the_path() {
        let mut tracker = PathTracker::new();
        apply(&mut tracker, &visit("a", "Query", true), OperationType::Query);
        apply(&mut tracker, &visit("a.b", "A", true), OperationType::Query);
        apply(&mut tracker, &visit("a.b.c", "B", true), OperationType::Query);
        apply(&mut tracker, &visit("x", "Query", false), OperationType::Query);
        assert_eq!(tracker.segments(), ["x"]);

        apply(&mut tracker, &visit("x", "Mutation", true), OperationType::Mutation);
        assert_eq!(tracker.full_path("mutation"), "mutation.x.");
    }

    #[test]
    fn empty_tracker_ends_with_a_dot() {
        assert_eq!(PathTracker::new().full_path("subscription"), "subscription.");
    }
}
