//! XPath 1.0 subset evaluated over the in-memory [`Dom`].
//!
//! Location paths with the common axes, name/`*`/`text()`/`node()` tests,
//! predicates, comparisons, `and`/`or`, `|` and the string/boolean core
//! functions. Arithmetic and namespaces are not supported.

use super::dom::{Dom, NodeType};
use super::*;

fn xpath_error(message: impl Into<String>) -> Error {
    Error::XPath(message.into())
}

/// Evaluates `expression` with `context` as the context node and returns the
/// element nodes of the resulting node-set in document order.
pub(crate) fn evaluate(dom: &Dom, context: NodeId, expression: &str) -> Result<Vec<NodeId>> {
    let expr = compile(expression)?;
    let evaluator = Evaluator::new(dom);
    let start = EvalContext {
        node: XNode::Node(context),
        position: 1,
        size: 1,
    };
    match evaluator.eval(&expr, &start)? {
        Value::Nodes(nodes) => Ok(nodes
            .into_iter()
            .filter_map(|node| match node {
                XNode::Node(id) if dom.element(id).is_some() => Some(id),
                _ => None,
            })
            .collect()),
        _ => Err(xpath_error(format!(
            "expression '{expression}' does not evaluate to a node-set"
        ))),
    }
}

/// Checks that `expression` parses, without evaluating it.
pub(crate) fn validate(expression: &str) -> Result<()> {
    compile(expression).map(|_| ())
}

fn compile(expression: &str) -> Result<Expr> {
    let tokens = lex(expression)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(xpath_error(format!(
            "unexpected token in expression '{expression}'"
        )));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Slash,
    DoubleSlash,
    Dot,
    DotDot,
    At,
    Star,
    ColonColon,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Pipe,
    Op(CmpOp),
    Name(String),
    Literal(String),
    Number(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CmpOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

fn lex(expression: &str) -> Result<Vec<Tok>> {
    let chars = expression.chars().collect::<Vec<_>>();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let (token, len) = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => (Tok::DoubleSlash, 2),
            '/' => (Tok::Slash, 1),
            '.' if next == Some('.') => (Tok::DotDot, 2),
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => lex_number(&chars, i)?,
            '.' => (Tok::Dot, 1),
            '@' => (Tok::At, 1),
            '*' => (Tok::Star, 1),
            ':' if next == Some(':') => (Tok::ColonColon, 2),
            '[' => (Tok::LBracket, 1),
            ']' => (Tok::RBracket, 1),
            '(' => (Tok::LParen, 1),
            ')' => (Tok::RParen, 1),
            ',' => (Tok::Comma, 1),
            '|' => (Tok::Pipe, 1),
            '=' => (Tok::Op(CmpOp::Eq), 1),
            '!' if next == Some('=') => (Tok::Op(CmpOp::NotEq), 2),
            '<' if next == Some('=') => (Tok::Op(CmpOp::Le), 2),
            '<' => (Tok::Op(CmpOp::Lt), 1),
            '>' if next == Some('=') => (Tok::Op(CmpOp::Ge), 2),
            '>' => (Tok::Op(CmpOp::Gt), 1),
            '"' | '\'' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|c| *c == ch)
                    .ok_or_else(|| xpath_error("unterminated string literal"))?;
                let literal = chars[i + 1..i + 1 + end].iter().collect::<String>();
                (Tok::Literal(literal), end + 2)
            }
            c if c.is_ascii_digit() => lex_number(&chars, i)?,
            c if c.is_alphabetic() || c == '_' => {
                let len = chars[i..]
                    .iter()
                    .take_while(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
                    .count();
                (Tok::Name(chars[i..i + len].iter().collect()), len)
            }
            other => return Err(xpath_error(format!("unexpected character '{other}'"))),
        };
        tokens.push(token);
        i += len;
    }
    Ok(tokens)
}

fn lex_number(chars: &[char], start: usize) -> Result<(Tok, usize)> {
    let len = chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_digit() || **c == '.')
        .count();
    let raw = chars[start..start + len].iter().collect::<String>();
    let value = raw
        .parse::<f64>()
        .map_err(|_| xpath_error(format!("invalid number '{raw}'")))?;
    Ok((Tok::Number(value), len))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Axis {
    Child,
    Descendant,
    DescendantOrSelf,
    Parent,
    Ancestor,
    AncestorOrSelf,
    FollowingSibling,
    PrecedingSibling,
    SelfAxis,
    Attribute,
}

impl Axis {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "child" => Self::Child,
            "descendant" => Self::Descendant,
            "descendant-or-self" => Self::DescendantOrSelf,
            "parent" => Self::Parent,
            "ancestor" => Self::Ancestor,
            "ancestor-or-self" => Self::AncestorOrSelf,
            "following-sibling" => Self::FollowingSibling,
            "preceding-sibling" => Self::PrecedingSibling,
            "self" => Self::SelfAxis,
            "attribute" => Self::Attribute,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeTest {
    Name(String),
    Any,
    Text,
    Node,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
struct LocationPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
    Union(Box<Expr>, Box<Expr>),
    Path(LocationPath),
    Literal(String),
    Number(f64),
    Function(String, Vec<Expr>),
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Tok> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Tok) -> Result<()> {
        match self.bump() {
            Some(token) if token == *expected => Ok(()),
            other => Err(xpath_error(format!("expected {expected:?}, found {other:?}"))),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Tok::Name(name)) if name == keyword)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.at_keyword("or") {
            self.bump();
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_comparison()?;
        while self.at_keyword("and") {
            self.bump();
            let right = self.parse_comparison()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_union()?;
        while let Some(Tok::Op(op)) = self.peek() {
            let op = *op;
            self.bump();
            let right = self.parse_union()?;
            left = Expr::Compare(Box::new(left), op, Box::new(right));
        }
        Ok(left)
    }

    fn parse_union(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        while self.peek() == Some(&Tok::Pipe) {
            self.bump();
            let right = self.parse_primary()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Tok::Literal(_)) => match self.bump() {
                Some(Tok::Literal(value)) => Ok(Expr::Literal(value)),
                _ => Err(xpath_error("expected literal")),
            },
            Some(Tok::Number(value)) => {
                let value = *value;
                self.bump();
                Ok(Expr::Number(value))
            }
            Some(Tok::LParen) => {
                self.bump();
                let inner = self.parse_or()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Some(Tok::Name(name))
                if self.peek_at(1) == Some(&Tok::LParen) && !is_node_type(name) =>
            {
                let name = name.clone();
                self.bump();
                self.bump();
                let mut args = Vec::new();
                if self.peek() != Some(&Tok::RParen) {
                    args.push(self.parse_or()?);
                    while self.peek() == Some(&Tok::Comma) {
                        self.bump();
                        args.push(self.parse_or()?);
                    }
                }
                self.expect(&Tok::RParen)?;
                Ok(Expr::Function(name, args))
            }
            _ => Ok(Expr::Path(self.parse_location_path()?)),
        }
    }

    fn parse_location_path(&mut self) -> Result<LocationPath> {
        let mut path = LocationPath {
            absolute: false,
            steps: Vec::new(),
        };

        match self.peek() {
            Some(Tok::Slash) => {
                self.bump();
                path.absolute = true;
                if !self.starts_step() {
                    return Ok(path);
                }
            }
            Some(Tok::DoubleSlash) => {
                self.bump();
                path.absolute = true;
                path.steps.push(descendant_or_self_step());
            }
            _ => {}
        }

        path.steps.push(self.parse_step()?);
        loop {
            match self.peek() {
                Some(Tok::Slash) => {
                    self.bump();
                }
                Some(Tok::DoubleSlash) => {
                    self.bump();
                    path.steps.push(descendant_or_self_step());
                }
                _ => break,
            }
            path.steps.push(self.parse_step()?);
        }
        Ok(path)
    }

    fn starts_step(&self) -> bool {
        matches!(
            self.peek(),
            Some(Tok::Dot | Tok::DotDot | Tok::At | Tok::Star | Tok::Name(_))
        )
    }

    fn parse_step(&mut self) -> Result<Step> {
        match self.peek() {
            Some(Tok::Dot) => {
                self.bump();
                return Ok(Step {
                    axis: Axis::SelfAxis,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            Some(Tok::DotDot) => {
                self.bump();
                return Ok(Step {
                    axis: Axis::Parent,
                    test: NodeTest::Node,
                    predicates: Vec::new(),
                });
            }
            _ => {}
        }

        let mut axis = Axis::Child;
        if self.peek() == Some(&Tok::At) {
            self.bump();
            axis = Axis::Attribute;
        } else if let (Some(Tok::Name(name)), Some(Tok::ColonColon)) = (self.peek(), self.peek_at(1))
        {
            axis = Axis::from_name(name)
                .ok_or_else(|| xpath_error(format!("unsupported axis '{name}'")))?;
            self.bump();
            self.bump();
        }

        let test = match self.bump() {
            Some(Tok::Star) => NodeTest::Any,
            Some(Tok::Name(name)) if is_node_type(&name) => {
                self.expect(&Tok::LParen)?;
                self.expect(&Tok::RParen)?;
                if name == "text" {
                    NodeTest::Text
                } else {
                    NodeTest::Node
                }
            }
            Some(Tok::Name(name)) => NodeTest::Name(name.to_ascii_lowercase()),
            other => return Err(xpath_error(format!("expected node test, found {other:?}"))),
        };

        let mut predicates = Vec::new();
        while self.peek() == Some(&Tok::LBracket) {
            self.bump();
            predicates.push(self.parse_or()?);
            self.expect(&Tok::RBracket)?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "text" | "node")
}

fn descendant_or_self_step() -> Step {
    Step {
        axis: Axis::DescendantOrSelf,
        test: NodeTest::Node,
        predicates: Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum XNode {
    Node(NodeId),
    Attr(NodeId, String),
}

#[derive(Debug, Clone)]
enum Value {
    Nodes(Vec<XNode>),
    Str(String),
    Num(f64),
    Bool(bool),
}

struct EvalContext {
    node: XNode,
    position: usize,
    size: usize,
}

struct Evaluator<'a> {
    dom: &'a Dom,
    order: HashMap<NodeId, usize>,
}

impl<'a> Evaluator<'a> {
    fn new(dom: &'a Dom) -> Self {
        let mut order = HashMap::new();
        let mut stack = vec![dom.root];
        while let Some(node) = stack.pop() {
            order.insert(node, order.len());
            for child in dom.children(node).iter().rev() {
                stack.push(*child);
            }
        }
        Self { dom, order }
    }

    fn sort_document_order(&self, nodes: &mut Vec<XNode>) {
        let key = |node: &XNode| match node {
            XNode::Node(id) => (self.order.get(id).copied().unwrap_or(usize::MAX), None),
            XNode::Attr(id, name) => (
                self.order.get(id).copied().unwrap_or(usize::MAX),
                Some(name.clone()),
            ),
        };
        nodes.sort_by_key(key);
        nodes.dedup();
    }

    fn eval(&self, expr: &Expr, ctx: &EvalContext) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(Value::Str(value.clone())),
            Expr::Number(value) => Ok(Value::Num(*value)),
            Expr::Or(left, right) => Ok(Value::Bool(
                self.boolean(&self.eval(left, ctx)?) || self.boolean(&self.eval(right, ctx)?),
            )),
            Expr::And(left, right) => Ok(Value::Bool(
                self.boolean(&self.eval(left, ctx)?) && self.boolean(&self.eval(right, ctx)?),
            )),
            Expr::Compare(left, op, right) => {
                let left = self.eval(left, ctx)?;
                let right = self.eval(right, ctx)?;
                Ok(Value::Bool(self.compare(&left, *op, &right)))
            }
            Expr::Union(left, right) => {
                let (Value::Nodes(mut left), Value::Nodes(right)) =
                    (self.eval(left, ctx)?, self.eval(right, ctx)?)
                else {
                    return Err(xpath_error("union operands must be node-sets"));
                };
                left.extend(right);
                self.sort_document_order(&mut left);
                Ok(Value::Nodes(left))
            }
            Expr::Path(path) => self.eval_path(path, ctx),
            Expr::Function(name, args) => self.call(name, args, ctx),
        }
    }

    fn eval_path(&self, path: &LocationPath, ctx: &EvalContext) -> Result<Value> {
        let mut current = if path.absolute {
            vec![XNode::Node(self.dom.root)]
        } else {
            vec![ctx.node.clone()]
        };

        for step in &path.steps {
            let mut next = Vec::new();
            for node in &current {
                next.extend(self.eval_step(node, step)?);
            }
            self.sort_document_order(&mut next);
            current = next;
        }
        Ok(Value::Nodes(current))
    }

    fn eval_step(&self, node: &XNode, step: &Step) -> Result<Vec<XNode>> {
        let mut candidates = self
            .axis_nodes(node, step.axis)
            .into_iter()
            .filter(|candidate| self.node_test(candidate, step))
            .collect::<Vec<_>>();

        for predicate in &step.predicates {
            let size = candidates.len();
            let mut kept = Vec::with_capacity(size);
            for (index, candidate) in candidates.into_iter().enumerate() {
                let ctx = EvalContext {
                    node: candidate.clone(),
                    position: index + 1,
                    size,
                };
                let keep = match self.eval(predicate, &ctx)? {
                    Value::Num(n) => n == ctx.position as f64,
                    other => self.boolean(&other),
                };
                if keep {
                    kept.push(candidate);
                }
            }
            candidates = kept;
        }
        Ok(candidates)
    }

    // Reverse axes come out nearest-first so positional predicates count from the context node.
    fn axis_nodes(&self, node: &XNode, axis: Axis) -> Vec<XNode> {
        let id = match node {
            XNode::Node(id) => *id,
            XNode::Attr(owner, _) => {
                return match axis {
                    Axis::Parent => vec![XNode::Node(*owner)],
                    Axis::Ancestor | Axis::AncestorOrSelf => {
                        let mut out = if axis == Axis::AncestorOrSelf {
                            vec![node.clone()]
                        } else {
                            Vec::new()
                        };
                        out.push(XNode::Node(*owner));
                        out.extend(self.ancestors(*owner).into_iter().map(XNode::Node));
                        out
                    }
                    Axis::SelfAxis => vec![node.clone()],
                    _ => Vec::new(),
                };
            }
        };

        let ids = match axis {
            Axis::Child => self.dom.children(id).to_vec(),
            Axis::Descendant => self.descendants(id),
            Axis::DescendantOrSelf => {
                let mut out = vec![id];
                out.extend(self.descendants(id));
                out
            }
            Axis::Parent => self.dom.parent(id).into_iter().collect(),
            Axis::Ancestor => self.ancestors(id),
            Axis::AncestorOrSelf => {
                let mut out = vec![id];
                out.extend(self.ancestors(id));
                out
            }
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = self.dom.parent(id) else {
                    return Vec::new();
                };
                let siblings = self.dom.children(parent);
                let Some(pos) = siblings.iter().position(|sibling| *sibling == id) else {
                    return Vec::new();
                };
                if axis == Axis::FollowingSibling {
                    siblings[pos + 1..].to_vec()
                } else {
                    siblings[..pos].iter().rev().copied().collect()
                }
            }
            Axis::SelfAxis => vec![id],
            Axis::Attribute => {
                return self
                    .dom
                    .element(id)
                    .map(|element| {
                        element
                            .attrs
                            .iter()
                            .map(|(name, _)| XNode::Attr(id, name.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
            }
        };
        ids.into_iter().map(XNode::Node).collect()
    }

    fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = self.dom.children(id).iter().rev().copied().collect::<Vec<_>>();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.dom.children(node).iter().rev().copied());
        }
        out
    }

    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.dom.parent(id);
        while let Some(node) = cursor {
            out.push(node);
            cursor = self.dom.parent(node);
        }
        out
    }

    fn node_test(&self, node: &XNode, step: &Step) -> bool {
        match node {
            XNode::Attr(_, name) => match &step.test {
                NodeTest::Name(expected) => step.axis == Axis::Attribute && name == expected,
                NodeTest::Any => step.axis == Axis::Attribute,
                NodeTest::Node => true,
                NodeTest::Text => false,
            },
            XNode::Node(id) => {
                let node_type = self.dom.node(*id).map(|n| &n.node_type);
                match &step.test {
                    NodeTest::Node => true,
                    NodeTest::Text => matches!(node_type, Some(NodeType::Text(_))),
                    NodeTest::Any => matches!(node_type, Some(NodeType::Element(_))),
                    NodeTest::Name(expected) => matches!(
                        node_type,
                        Some(NodeType::Element(element)) if element.tag_name == *expected
                    ),
                }
            }
        }
    }

    fn string_value(&self, node: &XNode) -> String {
        match node {
            XNode::Node(id) => match self.dom.node(*id).map(|n| &n.node_type) {
                Some(NodeType::Comment(text)) => text.clone(),
                _ => self.dom.text_content(*id),
            },
            XNode::Attr(id, name) => self.dom.attr(*id, name).unwrap_or_default(),
        }
    }

    fn string(&self, value: &Value) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|node| self.string_value(node))
                .unwrap_or_default(),
            Value::Str(value) => value.clone(),
            Value::Num(value) => format_number(*value),
            Value::Bool(value) => value.to_string(),
        }
    }

    fn number(&self, value: &Value) -> f64 {
        match value {
            Value::Num(value) => *value,
            Value::Bool(value) => f64::from(u8::from(*value)),
            other => self.string(other).trim().parse::<f64>().unwrap_or(f64::NAN),
        }
    }

    fn boolean(&self, value: &Value) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Str(value) => !value.is_empty(),
            Value::Num(value) => *value != 0.0 && !value.is_nan(),
            Value::Bool(value) => *value,
        }
    }

    fn compare(&self, left: &Value, op: CmpOp, right: &Value) -> bool {
        match (left, right) {
            (Value::Nodes(nodes), other) | (other, Value::Nodes(nodes))
                if !matches!(other, Value::Nodes(_)) =>
            {
                let node_on_left = matches!(left, Value::Nodes(_));
                if let Value::Bool(expected) = other {
                    return compare_atoms(
                        &Value::Bool(!nodes.is_empty()),
                        op,
                        &Value::Bool(*expected),
                        self,
                    );
                }
                nodes.iter().any(|node| {
                    let atom = Value::Str(self.string_value(node));
                    if node_on_left {
                        compare_atoms(&atom, op, other, self)
                    } else {
                        compare_atoms(other, op, &atom, self)
                    }
                })
            }
            (Value::Nodes(left_nodes), Value::Nodes(right_nodes)) => {
                left_nodes.iter().any(|l| {
                    let l = Value::Str(self.string_value(l));
                    right_nodes
                        .iter()
                        .any(|r| compare_atoms(&l, op, &Value::Str(self.string_value(r)), self))
                })
            }
            _ => compare_atoms(left, op, right, self),
        }
    }

    fn call(&self, name: &str, args: &[Expr], ctx: &EvalContext) -> Result<Value> {
        let arg = |index: usize| -> Result<Value> {
            let expr = args
                .get(index)
                .ok_or_else(|| xpath_error(format!("missing argument for {name}()")))?;
            self.eval(expr, ctx)
        };
        let string_arg_or_context = |index: usize| -> Result<String> {
            if args.len() > index {
                Ok(self.string(&arg(index)?))
            } else {
                Ok(self.string_value(&ctx.node))
            }
        };

        let value = match name {
            "last" => Value::Num(ctx.size as f64),
            "position" => Value::Num(ctx.position as f64),
            "count" => match arg(0)? {
                Value::Nodes(nodes) => Value::Num(nodes.len() as f64),
                _ => return Err(xpath_error("count() expects a node-set")),
            },
            "not" => Value::Bool(!self.boolean(&arg(0)?)),
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "boolean" => Value::Bool(self.boolean(&arg(0)?)),
            "number" => Value::Num(self.number(&arg(0)?)),
            "string" => Value::Str(string_arg_or_context(0)?),
            "contains" => {
                Value::Bool(self.string(&arg(0)?).contains(&self.string(&arg(1)?)))
            }
            "starts-with" => {
                Value::Bool(self.string(&arg(0)?).starts_with(&self.string(&arg(1)?)))
            }
            "concat" => {
                let mut out = String::new();
                for index in 0..args.len() {
                    out.push_str(&self.string(&arg(index)?));
                }
                Value::Str(out)
            }
            "normalize-space" => Value::Str(
                string_arg_or_context(0)?
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" "),
            ),
            "string-length" => Value::Num(string_arg_or_context(0)?.chars().count() as f64),
            "name" | "local-name" => {
                let node = if args.is_empty() {
                    Some(ctx.node.clone())
                } else {
                    match arg(0)? {
                        Value::Nodes(nodes) => nodes.into_iter().next(),
                        _ => return Err(xpath_error(format!("{name}() expects a node-set"))),
                    }
                };
                Value::Str(match node {
                    Some(XNode::Node(id)) => self.dom.tag_name(id).unwrap_or_default().to_string(),
                    Some(XNode::Attr(_, attr)) => attr,
                    None => String::new(),
                })
            }
            other => return Err(xpath_error(format!("unsupported function '{other}()'"))),
        };
        Ok(value)
    }
}

fn compare_atoms(left: &Value, op: CmpOp, right: &Value, evaluator: &Evaluator<'_>) -> bool {
    match op {
        CmpOp::Eq | CmpOp::NotEq => {
            let equal = match (left, right) {
                (Value::Bool(_), _) | (_, Value::Bool(_)) => {
                    evaluator.boolean(left) == evaluator.boolean(right)
                }
                (Value::Num(_), _) | (_, Value::Num(_)) => {
                    evaluator.number(left) == evaluator.number(right)
                }
                _ => evaluator.string(left) == evaluator.string(right),
            };
            equal == (op == CmpOp::Eq)
        }
        CmpOp::Lt => evaluator.number(left) < evaluator.number(right),
        CmpOp::Le => evaluator.number(left) <= evaluator.number(right),
        CmpOp::Gt => evaluator.number(left) > evaluator.number(right),
        CmpOp::Ge => evaluator.number(left) >= evaluator.number(right),
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
