use std::collections::HashMap;

use parser::{
    types::{OperationDefinition, Selection, SelectionSet},
    Positioned,
};
use value::Name;

use crate::{Visitor, VisitorContext};

/// Rejects operations whose complexity exceeds the limit. Every field costs
/// one plus the complexity of its own selection.
pub struct MaxComplexity {
    max_complexity: Option<usize>,
}

impl MaxComplexity {
    pub fn new(max_complexity: Option<usize>) -> Self {
        Self { max_complexity }
    }
}

impl<'a> Visitor<'a> for MaxComplexity {
    fn enter_operation_definition(
        &mut self,
        ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        operation_definition: &'a Positioned<OperationDefinition>,
    ) {
        let Some(max_complexity) = self.max_complexity else {
            return;
        };
        let complexity = ComplexityWalk::new(ctx).selection_set(&operation_definition.node.selection_set.node);
        if complexity > max_complexity {
            ctx.report_error(
                vec![operation_definition.pos],
                format!("Max query complexity should be {max_complexity} but got {complexity}."),
            );
        }
    }
}

/// Complexity of a selection set. Each fragment is costed once and reused
/// wherever it is spread.
struct ComplexityWalk<'c, 'a> {
    ctx: &'c VisitorContext<'a>,
    visiting: Vec<&'a str>,
    fragments: HashMap<&'a str, usize>,
}

impl<'c, 'a> ComplexityWalk<'c, 'a> {
    fn new(ctx: &'c VisitorContext<'a>) -> Self {
        Self {
            ctx,
            visiting: Vec::new(),
            fragments: HashMap::new(),
        }
    }

    fn selection_set(&mut self, selection_set: &'a SelectionSet) -> usize {
        selection_set
            .items
            .iter()
            .map(|selection| match &selection.node {
                Selection::Field(field) => 1usize.saturating_add(self.selection_set(&field.node.selection_set.node)),
                Selection::InlineFragment(inline_fragment) => self.selection_set(&inline_fragment.node.selection_set.node),
                Selection::FragmentSpread(fragment_spread) => self.fragment(fragment_spread.node.fragment_name.node.as_str()),
            })
            .fold(0, usize::saturating_add)
    }

    fn fragment(&mut self, name: &'a str) -> usize {
        if let Some(complexity) = self.fragments.get(name) {
            return *complexity;
        }
        let Some(fragment) = self.ctx.fragment(name) else {
            return 0;
        };
        if self.visiting.contains(&name) {
            return 0;
        }
        self.visiting.push(name);
        let complexity = self.selection_set(&fragment.node.selection_set.node);
        self.visiting.pop();
        self.fragments.insert(name, complexity);
        complexity
    }
}
