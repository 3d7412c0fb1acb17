//! Python syntax tree lowering
//!
//! Parses generated Python with tree-sitter and lowers the concrete tree into a
//! small tagged union that only distinguishes the shapes the safety analyzer
//! cares about. Everything else collapses into `Other` with its children kept,
//! so a walk over `SyntaxNode` still reaches every nested call.

use std::fmt;

use tree_sitter::{Node, Parser};
use tracing::debug;

/// Maximum concrete-tree nesting accepted before lowering gives up
///
/// Lowering, walking and teardown all use explicit stacks, so this only bounds
/// memory; CPython itself rejects much shallower expressions.
const MAX_DEPTH: usize = 10_000;

/// Generic node of a lowered Python module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
    /// `callee(arguments...)`
    Call {
        callee: Box<SyntaxNode>,
        arguments: Vec<SyntaxNode>,
    },
    /// `def name(...)` or `async def name(...)`, with any decorators attached to it
    FunctionDef {
        name: String,
        decorators: Vec<SyntaxNode>,
        /// Parameters followed by the statements of the body
        body: Vec<SyntaxNode>,
        returns: Option<Box<SyntaxNode>>,
    },
    /// `base.attr`
    Attribute { base: Box<SyntaxNode>, attr: String },
    /// A bare identifier
    Name(String),
    /// Any other construct
    Other(Vec<SyntaxNode>),
}

impl SyntaxNode {
    /// Dotted name of a callee: `base.attr` on a plain identifier, or the identifier itself
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Self::Name(id) => Some(id.clone()),
            Self::Attribute { base, attr } => match base.as_ref() {
                Self::Name(base) => Some(format!("{}.{}", base, attr)),
                _ => None,
            },
            _ => None,
        }
    }

    /// Dotted name of a decorator, looking through one layer of call (`@ns.kind(args)`)
    pub fn decorator_name(&self) -> Option<String> {
        match self {
            Self::Call { callee, .. } => callee.dotted_name(),
            other => other.dotted_name(),
        }
    }
}

/// A lowered module
///
/// Owns the tree and tears it down iteratively, so arbitrarily deep
/// expressions never recurse on drop.
#[derive(Debug)]
pub struct Module {
    root: SyntaxNode,
}

impl Module {
    /// The module node; its children are the top-level statements
    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }
}

impl Drop for Module {
    fn drop(&mut self) {
        dismantle(std::mem::replace(&mut self.root, SyntaxNode::Other(Vec::new())));
    }
}

/// Drop a tree one node at a time
fn dismantle(node: SyntaxNode) {
    let mut stack = vec![node];
    while let Some(node) = stack.pop() {
        match node {
            SyntaxNode::Call { callee, arguments } => {
                stack.push(*callee);
                stack.extend(arguments);
            }
            SyntaxNode::FunctionDef {
                decorators,
                body,
                returns,
                ..
            } => {
                stack.extend(decorators);
                stack.extend(body);
                stack.extend(returns.map(|r| *r));
            }
            SyntaxNode::Attribute { base, .. } => stack.push(*base),
            SyntaxNode::Name(_) => {}
            SyntaxNode::Other(children) => stack.extend(children),
        }
    }
}

/// Parse failure with the position of the first offending token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// 1-based
    pub line: usize,
    /// 1-based
    pub column: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl std::error::Error for SyntaxError {}

/// Parse `source` as a Python 3 module and lower it
pub fn parse_module(source: &str) -> Result<Module, SyntaxError> {
    debug!(source_len = %source.len(), "parse_module: called");
    let mut parser = Parser::new();
    parser.set_language(tree_sitter_python::language()).map_err(|e| SyntaxError {
        message: format!("python grammar unavailable: {}", e),
        line: 1,
        column: 1,
    })?;

    let tree = parser.parse(source, None).ok_or_else(|| SyntaxError {
        message: "parser produced no tree".to_string(),
        line: 1,
        column: 1,
    })?;

    let root = tree.root_node();
    if root.has_error() {
        debug!("parse_module: tree contains errors");
        return Err(first_error(root));
    }

    let mut values = Vec::new();
    match lower(root, source.as_bytes(), &mut values) {
        Ok(()) if values.len() == 1 => Ok(Module {
            root: values.remove(0),
        }),
        Ok(()) => {
            values.into_iter().for_each(dismantle);
            Err(error_at(root, "incomplete syntax tree".to_string()))
        }
        Err(e) => {
            values.into_iter().for_each(dismantle);
            Err(e)
        }
    }
}

/// Locate the first error or missing node in document order
fn first_error(root: Node<'_>) -> SyntaxError {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_missing() {
            return error_at(node, format!("expected '{}'", node.kind()));
        }
        if node.is_error() {
            return error_at(node, "invalid syntax".to_string());
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    // has_error() was true on the root, so some node above matched
    error_at(root, "invalid syntax".to_string())
}

/// Constructs the grammar still accepts from Python 2
fn python2_construct(node: Node<'_>) -> Option<SyntaxError> {
    match node.kind() {
        "print_statement" => Some(error_at(node, "Missing parentheses in call to 'print'".to_string())),
        "exec_statement" => Some(error_at(node, "Missing parentheses in call to 'exec'".to_string())),
        "comparison_operator" => {
            let mut cursor = node.walk();
            let operator = node.children(&mut cursor).find(|c| c.kind() == "<>");
            operator.map(|op| error_at(op, "invalid syntax".to_string()))
        }
        _ => None,
    }
}

fn error_at(node: Node<'_>, message: String) -> SyntaxError {
    let pos = node.start_position();
    SyntaxError {
        message,
        line: pos.row + 1,
        column: pos.column + 1,
    }
}

fn text(node: Node<'_>, src: &[u8]) -> String {
    node.utf8_text(src).unwrap_or_default().to_string()
}

fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    let children: Vec<_> = node.named_children(&mut cursor).filter(|c| c.kind() != "comment").collect();
    children
}

/// How to assemble a node once its lowered children are on the value stack
enum Shape {
    Attribute {
        attr: String,
    },
    Call {
        arguments: usize,
    },
    Parenthesized {
        count: usize,
    },
    FunctionDef {
        name: String,
        decorators: usize,
        body: usize,
        has_returns: bool,
    },
    Other {
        count: usize,
    },
}

impl Shape {
    /// Number of lowered children this shape consumes
    fn arity(&self) -> usize {
        match self {
            Self::Attribute { .. } => 1,
            Self::Call { arguments } => 1 + arguments,
            Self::Parenthesized { count } | Self::Other { count } => *count,
            Self::FunctionDef {
                decorators,
                body,
                has_returns,
                ..
            } => decorators + body + usize::from(*has_returns),
        }
    }

    fn build(self, values: &mut Vec<SyntaxNode>) -> SyntaxNode {
        let start = values.len().saturating_sub(self.arity());
        let mut children = values.split_off(start).into_iter();
        match self {
            Self::Attribute { attr } => match children.next() {
                Some(base) => SyntaxNode::Attribute {
                    base: Box::new(base),
                    attr,
                },
                None => SyntaxNode::Other(Vec::new()),
            },
            Self::Call { .. } => match children.next() {
                Some(callee) => SyntaxNode::Call {
                    callee: Box::new(callee),
                    arguments: children.collect(),
                },
                None => SyntaxNode::Other(Vec::new()),
            },
            Self::Parenthesized { .. } => {
                let mut inner: Vec<_> = children.collect();
                match inner.len() {
                    1 => inner.remove(0),
                    _ => SyntaxNode::Other(inner),
                }
            }
            Self::FunctionDef {
                name,
                decorators,
                body,
                has_returns,
            } => {
                let decorators = children.by_ref().take(decorators).collect();
                let body = children.by_ref().take(body).collect();
                let returns = if has_returns { children.next().map(Box::new) } else { None };
                SyntaxNode::FunctionDef {
                    name,
                    decorators,
                    body,
                    returns,
                }
            }
            Self::Other { .. } => SyntaxNode::Other(children.collect()),
        }
    }
}

enum Task<'t> {
    Visit(Node<'t>, usize),
    Build(Shape),
}

/// Lower the concrete tree rooted at `root` onto `values`
///
/// Post-order with an explicit task stack: a node's children are visited in
/// source order, then its `Build` task folds their results into one node.
fn lower(root: Node<'_>, src: &[u8], values: &mut Vec<SyntaxNode>) -> Result<(), SyntaxError> {
    let mut tasks = vec![Task::Visit(root, 0)];

    while let Some(task) = tasks.pop() {
        match task {
            Task::Visit(node, depth) => {
                if depth > MAX_DEPTH {
                    debug!(%depth, "lower: nesting limit reached");
                    return Err(error_at(node, "too many nested expressions".to_string()));
                }
                if let Some(e) = python2_construct(node) {
                    debug!(kind = %node.kind(), "lower: python 2 construct");
                    return Err(e);
                }
                if node.kind() == "identifier" {
                    values.push(SyntaxNode::Name(text(node, src)));
                    continue;
                }

                let (shape, children) = plan(node, src);
                tasks.push(Task::Build(shape));
                tasks.extend(children.into_iter().rev().map(|c| Task::Visit(c, depth + 1)));
            }
            Task::Build(shape) => {
                let node = shape.build(values);
                values.push(node);
            }
        }
    }

    Ok(())
}

/// Decide the shape of `node` and which concrete children feed it, in order
fn plan<'t>(node: Node<'t>, src: &[u8]) -> (Shape, Vec<Node<'t>>) {
    match node.kind() {
        "attribute" => {
            if let (Some(object), Some(attr)) = (node.child_by_field_name("object"), node.child_by_field_name("attribute"))
            {
                return (Shape::Attribute { attr: text(attr, src) }, vec![object]);
            }
        }
        "call" => {
            if let Some(function) = node.child_by_field_name("function") {
                let arguments = match node.child_by_field_name("arguments") {
                    Some(args) if args.kind() == "argument_list" => named_children(args),
                    Some(args) => vec![args],
                    None => Vec::new(),
                };
                let shape = Shape::Call {
                    arguments: arguments.len(),
                };
                let mut children = vec![function];
                children.extend(arguments);
                return (shape, children);
            }
        }
        "parenthesized_expression" => {
            let children = named_children(node);
            return (Shape::Parenthesized { count: children.len() }, children);
        }
        "function_definition" => return plan_function(node, Vec::new(), src),
        "decorated_definition" => {
            // `@` is anonymous; the expression is the decorator's only named child
            let decorators: Vec<_> = named_children(node)
                .into_iter()
                .filter(|c| c.kind() == "decorator")
                .filter_map(|c| c.named_child(0))
                .collect();

            return match node.child_by_field_name("definition") {
                Some(def) if def.kind() == "function_definition" => plan_function(def, decorators, src),
                Some(def) => {
                    let mut children = decorators;
                    children.push(def);
                    (Shape::Other { count: children.len() }, children)
                }
                None => (Shape::Other { count: decorators.len() }, decorators),
            };
        }
        _ => {}
    }

    let children = named_children(node);
    (Shape::Other { count: children.len() }, children)
}

fn plan_function<'t>(node: Node<'t>, decorators: Vec<Node<'t>>, src: &[u8]) -> (Shape, Vec<Node<'t>>) {
    let name = node.child_by_field_name("name").map(|n| text(n, src)).unwrap_or_default();
    debug!(%name, decorator_count = %decorators.len(), "plan_function: called");

    let params = node.child_by_field_name("parameters").map(named_children).unwrap_or_default();
    let block = node.child_by_field_name("body").map(named_children).unwrap_or_default();
    let returns = node.child_by_field_name("return_type");

    let shape = Shape::FunctionDef {
        name,
        decorators: decorators.len(),
        body: params.len() + block.len(),
        has_returns: returns.is_some(),
    };
    let mut children = decorators;
    children.extend(params);
    children.extend(block);
    children.extend(returns);
    (shape, children)
}
