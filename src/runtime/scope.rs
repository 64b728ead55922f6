use crate::language::ast::{Ast, BindingKind, DeclaredType, NodeId};
use crate::runtime::value::NumericValue;

/// Result of a successful symbol lookup: either a `let` binding whose
/// expression still needs evaluating (and possibly coercing), or a lambda
/// parameter already holding a concrete value.
#[derive(Clone, Copy, Debug)]
pub enum SymbolLookup {
    Variable {
        expr: NodeId,
        declared_type: DeclaredType,
    },
    Parameter(NumericValue),
}

/// Resolves `name` as a variable reference starting at `from` and walking
/// the parent chain toward the root. At each node the scope table is
/// scanned first (first match in table order wins, which gives inner-first
/// shadowing), then the parameter table. Returns owned data so the caller
/// can re-borrow the arena mutably to recurse.
pub fn resolve_symbol(ast: &Ast, from: NodeId, name: &str) -> Option<SymbolLookup> {
    let mut cursor = Some(from);
    while let Some(id) = cursor {
        let node = ast.node(id);
        if let Some(entry) = node
            .scope
            .iter()
            .find(|entry| entry.kind == BindingKind::Variable && entry.name == name)
        {
            return Some(SymbolLookup::Variable {
                expr: entry.expr,
                declared_type: entry.declared_type,
            });
        }
        if let Some(slot) = node.params.iter().find(|slot| slot.name == name) {
            return Some(SymbolLookup::Parameter(slot.value));
        }
        cursor = node.parent;
    }
    None
}

/// Resolves `name` as a lambda and returns its body node along with the
/// binding's declared type (applied to the call result). Same walk as
/// [`resolve_symbol`] but only `Lambda`-kind entries match, so a variable
/// never shadows a function of the same name for call resolution.
pub fn resolve_lambda(ast: &Ast, from: NodeId, name: &str) -> Option<(NodeId, DeclaredType)> {
    let mut cursor = Some(from);
    while let Some(id) = cursor {
        let node = ast.node(id);
        if let Some(entry) = node
            .scope
            .iter()
            .find(|entry| entry.kind == BindingKind::Lambda && entry.name == name)
        {
            return Some((entry.expr, entry.declared_type));
        }
        cursor = node.parent;
    }
    None
}
