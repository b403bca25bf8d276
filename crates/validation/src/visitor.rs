use std::collections::HashMap;

use parser::{
    types::{
        ExecutableDocument,
        Field,
        FragmentDefinition,
        FragmentSpread,
        InlineFragment,
        OperationDefinition,
        Selection,
        SelectionSet,
    },
    Pos,
    Positioned,
};
use value::Name;

use crate::RuleError;

pub struct VisitorContext<'a> {
    pub errors: Vec<RuleError>,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
}

impl<'a> VisitorContext<'a> {
    pub fn new(document: &'a ExecutableDocument) -> Self {
        Self {
            errors: Vec::new(),
            fragments: &document.fragments,
        }
    }

    pub fn report_error<T: Into<String>>(&mut self, locations: Vec<Pos>, msg: T) {
        self.errors.push(RuleError {
            locations,
            message: msg.into(),
        })
    }

    #[inline]
    pub fn fragment(&self, name: &str) -> Option<&'a Positioned<FragmentDefinition>> {
        self.fragments.get(name)
    }
}

pub trait Visitor<'a> {
    fn enter_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {}
    fn exit_document(&mut self, _ctx: &mut VisitorContext<'a>, _doc: &'a ExecutableDocument) {}

    fn enter_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation_definition: &'a Positioned<OperationDefinition>,
    ) {
    }
    fn exit_operation_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: Option<&'a Name>,
        _operation_definition: &'a Positioned<OperationDefinition>,
    ) {
    }

    fn enter_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment_definition: &'a Positioned<FragmentDefinition>,
    ) {
    }
    fn exit_fragment_definition(
        &mut self,
        _ctx: &mut VisitorContext<'a>,
        _name: &'a Name,
        _fragment_definition: &'a Positioned<FragmentDefinition>,
    ) {
    }

    fn enter_selection_set(&mut self, _ctx: &mut VisitorContext<'a>, _selection_set: &'a Positioned<SelectionSet>) {}
    fn exit_selection_set(&mut self, _ctx: &mut VisitorContext<'a>, _selection_set: &'a Positioned<SelectionSet>) {}

    fn enter_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {}
    fn exit_field(&mut self, _ctx: &mut VisitorContext<'a>, _field: &'a Positioned<Field>) {}

    fn enter_fragment_spread(&mut self, _ctx: &mut VisitorContext<'a>, _fragment_spread: &'a Positioned<FragmentSpread>) {
    }
    fn exit_fragment_spread(&mut self, _ctx: &mut VisitorContext<'a>, _fragment_spread: &'a Positioned<FragmentSpread>) {
    }

    fn enter_inline_fragment(&mut self, _ctx: &mut VisitorContext<'a>, _inline_fragment: &'a Positioned<InlineFragment>) {
    }
    fn exit_inline_fragment(&mut self, _ctx: &mut VisitorContext<'a>, _inline_fragment: &'a Positioned<InlineFragment>) {
    }
}

/// The empty visitor, the start of a `.with(..)` chain.
pub struct VisitorNil;

impl VisitorNil {
    pub fn with<V>(self, visitor: V) -> VisitorCons<V, Self> {
        VisitorCons(visitor, self)
    }
}

pub struct VisitorCons<A, B>(A, B);

impl<A, B> VisitorCons<A, B> {
    pub fn with<V>(self, visitor: V) -> VisitorCons<V, Self> {
        VisitorCons(visitor, self)
    }
}

impl<'a> Visitor<'a> for VisitorNil {}

impl<'a, A, B> Visitor<'a> for VisitorCons<A, B>
where
    A: Visitor<'a> + 'a,
    B: Visitor<'a> + 'a,
{
    fn enter_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {
        self.0.enter_document(ctx, doc);
        self.1.enter_document(ctx, doc);
    }

    fn exit_document(&mut self, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {
        self.0.exit_document(ctx, doc);
        self.1.exit_document(ctx, doc);
    }

    fn enter_operation_definition(&mut self, ctx: &mut VisitorContext<'a>, name: Option<&'a Name>, operation_definition: &'a Positioned<OperationDefinition>) {
        self.0.enter_operation_definition(ctx, name, operation_definition);
        self.1.enter_operation_definition(ctx, name, operation_definition);
    }

    fn exit_operation_definition(&mut self, ctx: &mut VisitorContext<'a>, name: Option<&'a Name>, operation_definition: &'a Positioned<OperationDefinition>) {
        self.0.exit_operation_definition(ctx, name, operation_definition);
        self.1.exit_operation_definition(ctx, name, operation_definition);
    }

    fn enter_fragment_definition(&mut self, ctx: &mut VisitorContext<'a>, name: &'a Name, fragment_definition: &'a Positioned<FragmentDefinition>) {
        self.0.enter_fragment_definition(ctx, name, fragment_definition);
        self.1.enter_fragment_definition(ctx, name, fragment_definition);
    }

    fn exit_fragment_definition(&mut self, ctx: &mut VisitorContext<'a>, name: &'a Name, fragment_definition: &'a Positioned<FragmentDefinition>) {
        self.0.exit_fragment_definition(ctx, name, fragment_definition);
        self.1.exit_fragment_definition(ctx, name, fragment_definition);
    }

    fn enter_selection_set(&mut self, ctx: &mut VisitorContext<'a>, selection_set: &'a Positioned<SelectionSet>) {
        self.0.enter_selection_set(ctx, selection_set);
        self.1.enter_selection_set(ctx, selection_set);
    }

    fn exit_selection_set(&mut self, ctx: &mut VisitorContext<'a>, selection_set: &'a Positioned<SelectionSet>) {
        self.0.exit_selection_set(ctx, selection_set);
        self.1.exit_selection_set(ctx, selection_set);
    }

    fn enter_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        self.0.enter_field(ctx, field);
        self.1.enter_field(ctx, field);
    }

    fn exit_field(&mut self, ctx: &mut VisitorContext<'a>, field: &'a Positioned<Field>) {
        self.0.exit_field(ctx, field);
        self.1.exit_field(ctx, field);
    }

    fn enter_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {
        self.0.enter_fragment_spread(ctx, fragment_spread);
        self.1.enter_fragment_spread(ctx, fragment_spread);
    }

    fn exit_fragment_spread(&mut self, ctx: &mut VisitorContext<'a>, fragment_spread: &'a Positioned<FragmentSpread>) {
        self.0.exit_fragment_spread(ctx, fragment_spread);
        self.1.exit_fragment_spread(ctx, fragment_spread);
    }

    fn enter_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, inline_fragment: &'a Positioned<InlineFragment>) {
        self.0.enter_inline_fragment(ctx, inline_fragment);
        self.1.enter_inline_fragment(ctx, inline_fragment);
    }

    fn exit_inline_fragment(&mut self, ctx: &mut VisitorContext<'a>, inline_fragment: &'a Positioned<InlineFragment>) {
        self.0.exit_inline_fragment(ctx, inline_fragment);
        self.1.exit_inline_fragment(ctx, inline_fragment);
    }
}

pub fn visit<'a, V: Visitor<'a>>(v: &mut V, ctx: &mut VisitorContext<'a>, doc: &'a ExecutableDocument) {
    v.enter_document(ctx, doc);

    for (name, fragment) in &doc.fragments {
        v.enter_fragment_definition(ctx, name, fragment);
        visit_selection_set(v, ctx, &fragment.node.selection_set);
        v.exit_fragment_definition(ctx, name, fragment);
    }

    for (name, operation) in doc.operations.iter() {
        v.enter_operation_definition(ctx, name, operation);
        visit_selection_set(v, ctx, &operation.node.selection_set);
        v.exit_operation_definition(ctx, name, operation);
    }

    v.exit_document(ctx, doc);
}

fn visit_selection_set<'a, V: Visitor<'a>>(
    v: &mut V,
    ctx: &mut VisitorContext<'a>,
    selection_set: &'a Positioned<SelectionSet>,
) {
    v.enter_selection_set(ctx, selection_set);
    for selection in &selection_set.node.items {
        match &selection.node {
            Selection::Field(field) => {
                v.enter_field(ctx, field);
                if !field.node.selection_set.node.items.is_empty() {
                    visit_selection_set(v, ctx, &field.node.selection_set);
                }
                v.exit_field(ctx, field);
            },
            Selection::FragmentSpread(fragment_spread) => {
                v.enter_fragment_spread(ctx, fragment_spread);
                v.exit_fragment_spread(ctx, fragment_spread);
            },
            Selection::InlineFragment(inline_fragment) => {
                v.enter_inline_fragment(ctx, inline_fragment);
                visit_selection_set(v, ctx, &inline_fragment.node.selection_set);
                v.exit_inline_fragment(ctx, inline_fragment);
            },
        }
    }
    v.exit_selection_set(ctx, selection_set);
}
