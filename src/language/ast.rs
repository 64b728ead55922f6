use crate::language::ops::Operator;
use crate::runtime::value::NumericValue;

/// Index of a node inside an [`Ast`] arena. Copyable, so parent links and
/// sibling links are plain non-owning handles; only the arena owns nodes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(usize);

/// Declared type of a `let` binding. `Any` means the binding carries no
/// annotation and the bound value passes through uncoerced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeclaredType {
    Int,
    Float,
    #[default]
    Any,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Lambda,
}

/// One named binding introduced by a `let` block. For `Lambda` entries
/// `expr` is the function body, which carries the parameter table.
#[derive(Clone, Debug)]
pub struct ScopeEntry {
    pub name: String,
    pub declared_type: DeclaredType,
    pub expr: NodeId,
    pub kind: BindingKind,
}

impl ScopeEntry {
    pub fn variable(declared_type: DeclaredType, name: impl Into<String>, expr: NodeId) -> Self {
        Self {
            name: name.into(),
            declared_type,
            expr,
            kind: BindingKind::Variable,
        }
    }
}

/// A formal-parameter slot of a lambda. The value is overwritten on every
/// call and holds whatever the most recent invocation bound.
#[derive(Clone, Debug)]
pub struct ParamSlot {
    pub name: String,
    pub value: NumericValue,
}

impl ParamSlot {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            // Unreachable until the first call binds it; NaN keeps any
            // future misuse loud.
            value: NumericValue::Float(f64::NAN),
        }
    }
}

#[derive(Clone, Debug)]
pub enum Payload {
    Number(NumericValue),
    Call {
        op: Operator,
        /// Retained only for `Operator::Custom`; built-in names resolve to
        /// the enum and drop the string.
        name: Option<String>,
        /// Head of the operand sibling chain.
        args: Option<NodeId>,
    },
    Symbol(String),
    Conditional {
        condition: NodeId,
        if_true: NodeId,
        if_false: NodeId,
    },
}

#[derive(Clone, Debug)]
pub struct Node {
    /// Syntactic parent, used only for the upward scope search. Never
    /// followed during teardown.
    pub parent: Option<NodeId>,
    /// Next sibling in an operand or declaration chain.
    pub next: Option<NodeId>,
    /// Bindings introduced here; empty means no scope table.
    pub scope: Vec<ScopeEntry>,
    /// Lambda parameter slots; empty means no parameter table.
    pub params: Vec<ParamSlot>,
    pub payload: Payload,
}

/// The arena owning every node of one program unit. Construction happens
/// through the builder methods below (driven by the parser); everything is
/// torn down together when the arena is dropped.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, payload: Payload) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            next: None,
            scope: Vec::new(),
            params: Vec::new(),
            payload,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn number(&mut self, value: NumericValue) -> NodeId {
        self.push(Payload::Number(value))
    }

    pub fn symbol(&mut self, name: impl Into<String>) -> NodeId {
        self.push(Payload::Symbol(name.into()))
    }

    /// Builds a call node. `name` is resolved against the built-in operator
    /// set; unresolved names become `Custom` calls that keep the name. The
    /// new node becomes the parent of every node in the operand chain.
    pub fn function_call(&mut self, name: &str, args: Option<NodeId>) -> NodeId {
        let (op, name) = match Operator::resolve(name) {
            Some(op) => (op, None),
            None => (Operator::Custom, Some(name.to_string())),
        };
        let id = self.push(Payload::Call { op, name, args });
        let mut cursor = args;
        while let Some(child) = cursor {
            self.nodes[child.0].parent = Some(id);
            cursor = self.nodes[child.0].next;
        }
        id
    }

    pub fn conditional(&mut self, condition: NodeId, if_true: NodeId, if_false: NodeId) -> NodeId {
        let id = self.push(Payload::Conditional {
            condition,
            if_true,
            if_false,
        });
        for child in [condition, if_true, if_false] {
            self.nodes[child.0].parent = Some(id);
        }
        id
    }

    /// Prepends `new_head` to `chain` and returns the new head.
    pub fn link_sibling(&mut self, new_head: NodeId, chain: Option<NodeId>) -> NodeId {
        self.nodes[new_head.0].next = chain;
        new_head
    }

    /// Binds a finished scope table to `target` and reparents every bound
    /// expression onto it, so names inside those expressions resolve
    /// outward through `target`'s parent chain. When nested binding blocks
    /// collapse onto one node the tables concatenate, inner block first,
    /// which keeps inner-first shadowing under first-match lookup.
    pub fn attach_scope(&mut self, table: Vec<ScopeEntry>, target: NodeId) -> NodeId {
        let exprs: Vec<NodeId> = table.iter().map(|entry| entry.expr).collect();
        self.nodes[target.0].scope.extend(table);
        for expr in exprs {
            self.nodes[expr.0].parent = Some(target);
        }
        target
    }

    /// Builds a lambda scope entry and hangs the parameter table off the
    /// body node, where the call protocol overwrites it per invocation.
    pub fn lambda_binding(
        &mut self,
        declared_type: DeclaredType,
        name: impl Into<String>,
        params: Vec<ParamSlot>,
        body: NodeId,
    ) -> ScopeEntry {
        self.nodes[body.0].params = params;
        ScopeEntry {
            name: name.into(),
            declared_type,
            expr: body,
            kind: BindingKind::Lambda,
        }
    }

    /// In-place payload swap for the `read`/`rand` memoizing rewrite. The
    /// node keeps its identity: parent, sibling link, and any attached
    /// scope or parameter table are untouched.
    pub fn replace_payload(&mut self, id: NodeId, payload: Payload) {
        self.nodes[id.0].payload = payload;
    }

    /// Iterates a sibling chain starting at `head`.
    pub fn siblings(&self, head: Option<NodeId>) -> Siblings<'_> {
        Siblings { ast: self, cursor: head }
    }
}

pub struct Siblings<'a> {
    ast: &'a Ast,
    cursor: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cursor?;
        self.cursor = self.ast.node(id).next;
        Some(id)
    }
}
