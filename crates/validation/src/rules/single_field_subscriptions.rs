use std::collections::HashSet;

use parser::{
    types::{OperationDefinition, OperationType, Selection, SelectionSet},
    Positioned,
};
use value::Name;

use crate::{Visitor, VisitorContext};

#[derive(Default)]
pub struct SingleFieldSubscriptions;

impl<'a> Visitor<'a> for SingleFieldSubscriptions {
    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        operation_definition: &'a Positioned<OperationDefinition>,
    ) {
        if operation_definition.node.ty != OperationType::Subscription {
            return;
        }
        let selection_set = &operation_definition.node.selection_set;
        if root_fields(ctx, &selection_set.node, &mut HashSet::new()) > 1 {
            ctx.report_error(
                vec![selection_set.pos],
                "Subscription operations must have exactly one root field",
            );
        }
    }
}

fn root_fields<'a>(
    ctx: &VisitorContext<'a>,
    selection_set: &'a SelectionSet,
    visited: &mut HashSet<&'a str>,
) -> usize {
    let mut count = 0;
    for selection in &selection_set.items {
        count += match &selection.node {
            Selection::Field(_) => 1,
            Selection::InlineFragment(inline_fragment) => root_fields(ctx, &inline_fragment.node.selection_set.node, visited),
            Selection::FragmentSpread(fragment_spread) => {
                let name = fragment_spread.node.fragment_name.node.as_str();
                match ctx.fragment(name) {
                    Some(fragment) if visited.insert(name) => root_fields(ctx, &fragment.node.selection_set.node, visited),
                    _ => 0,
                }
            },
        };
    }
    count
}
