use std::collections::HashMap;

use parser::{
    types::{OperationDefinition, Selection, SelectionSet},
    Positioned,
};
use value::Name;

use crate::{Visitor, VisitorContext};

/// Rejects operations nested deeper than the limit. Root fields are at depth 0.
pub struct MaxDepth {
    max_depth: Option<usize>,
}

impl MaxDepth {
    pub fn new(max_depth: Option<usize>) -> Self {
        Self { max_depth }
    }
}

impl<'a> Visitor<'a> for MaxDepth {
    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        operation_definition: &'a Positioned<OperationDefinition>,
    ) {
        let Some(max_depth) = self.max_depth else {
            return;
        };
        let depth = DepthWalk::new(ctx).selection_set(&operation_definition.node.selection_set.node, 0);
        if depth > max_depth {
            ctx.report_error(
                vec![operation_definition.pos],
                format!("Max query depth should be {max_depth} but got {depth}."),
            );
        }
    }
}

/// Depth of a selection set below `depth`. A fragment's own depth is computed
/// once and added to the depth of every spread.
struct DepthWalk<'c, 'a> {
    ctx: &'c VisitorContext<'a>,
    visiting: Vec<&'a str>,
    fragments: HashMap<&'a str, usize>,
}

impl<'c, 'a> DepthWalk<'c, 'a> {
    fn new(ctx: &'c VisitorContext<'a>) -> Self {
        Self {
            ctx,
            visiting: Vec::new(),
            fragments: HashMap::new(),
        }
    }

    fn selection_set(&mut self, selection_set: &'a SelectionSet, depth: usize) -> usize {
        let mut max = depth;
        for selection in &selection_set.items {
            let nested = match &selection.node {
                Selection::Field(field) if field.node.selection_set.node.items.is_empty() => depth,
                Selection::Field(field) => self.selection_set(&field.node.selection_set.node, depth + 1),
                Selection::InlineFragment(inline_fragment) => {
                    self.selection_set(&inline_fragment.node.selection_set.node, depth)
                },
                Selection::FragmentSpread(fragment_spread) => {
                    depth.saturating_add(self.fragment(fragment_spread.node.fragment_name.node.as_str()))
                },
            };
            max = max.max(nested);
        }
        max
    }

    fn fragment(&mut self, name: &'a str) -> usize {
        if let Some(depth) = self.fragments.get(name) {
            return *depth;
        }
        let Some(fragment) = self.ctx.fragment(name) else {
            return 0;
        };
        if self.visiting.contains(&name) {
            return 0;
        }
        self.visiting.push(name);
        let depth = self.selection_set(&fragment.node.selection_set.node, 0);
        self.visiting.pop();
        self.fragments.insert(name, depth);
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_limit() {
        expect_passes_rule!(
            || MaxDepth::new(Some(2)),
            r#"
            {
              user {
                profile {
                  email
                }
              }
            }
            "#,
        );
    }

    #[test]
    fn too_deep() {
        expect_fails_rule!(
            || MaxDepth::new(Some(1)),
            r#"
            {
              user {
                profile {
                  email
                }
              }
            }
            "#,
        );
    }

    #[test]
    fn counts_through_fragments() {
        expect_fails_rule!(
            || MaxDepth::new(Some(1)),
            r#"
            {
              user {
                ...Profile
              }
            }

            fragment Profile on User {
              profile {
                email
              }
            }
            "#,
        );
    }

    #[test]
    fn disabled_limit() {
        expect_passes_rule!(
            || MaxDepth::new(None),
            r#"
            { a { b { c { d { e } } } } }
            "#,
        );
    }

    #[test]
    fn reports_depth() {
        let doc = parser::parse_query("{ a { b { c } } }").unwrap();
        let errors = crate::test_harness::validate(&doc, || MaxDepth::new(Some(1))).unwrap_err();
        assert_eq!(errors[0].message, "Max query depth should be 1 but got 2.");
    }
}
