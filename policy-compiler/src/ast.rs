//! Statement and expression tagged unions making up the parsed program tree.
//!
//! Every node shares the `Node` capability (`range`, `kind_tag`, `render`)
//! instead of an open class hierarchy.

use policy_core::{Fqn, Range, Trinary};
use serde::{Deserialize, Serialize};

/// Shared capability of every AST node.
pub trait Node {
    fn range(&self) -> &Range;
    fn kind_tag(&self) -> &'static str;
    fn render(&self) -> String;
}

// ── Statements ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Namespace(NamespaceStmt),
    Policy(PolicyStmt),
    Shape(ShapeStmt),
    VarDecl(VarDeclStmt),
    Fact(FactStmt),
    Rule(RuleStmt),
    RuleExport(RuleExportStmt),
    ShapeExport(ShapeExportStmt),
    Use(UseStmt),
    Comment(CommentStmt),
}

impl Node for Statement {
    fn range(&self) -> &Range {
        match self {
            Statement::Namespace(s) => &s.range,
            Statement::Policy(s) => &s.range,
            Statement::Shape(s) => &s.range,
            Statement::VarDecl(s) => &s.range,
            Statement::Fact(s) => &s.range,
            Statement::Rule(s) => &s.range,
            Statement::RuleExport(s) => &s.range,
            Statement::ShapeExport(s) => &s.range,
            Statement::Use(s) => &s.range,
            Statement::Comment(s) => &s.range,
        }
    }

    fn kind_tag(&self) -> &'static str {
        match self {
            Statement::Namespace(_) => "Namespace",
            Statement::Policy(_) => "Policy",
            Statement::Shape(_) => "Shape",
            Statement::VarDecl(_) => "VarDecl",
            Statement::Fact(_) => "Fact",
            Statement::Rule(_) => "Rule",
            Statement::RuleExport(_) => "RuleExport",
            Statement::ShapeExport(_) => "ShapeExport",
            Statement::Use(_) => "Use",
            Statement::Comment(_) => "Comment",
        }
    }

    fn render(&self) -> String {
        match self {
            Statement::Namespace(s) => format!("namespace {}", s.fqn),
            Statement::Policy(s) => format!(
                "policy {} {{ {} }}",
                s.name,
                s.body.iter().map(|st| st.render()).collect::<Vec<_>>().join(" ")
            ),
            Statement::Shape(s) => match &s.body {
                ShapeBody::Simple(ty) => format!("shape {} {}", s.name, ty.render()),
                ShapeBody::Complex { with, fields } => {
                    let with = with
                        .as_ref()
                        .map(|f| format!("with {f} "))
                        .unwrap_or_default();
                    let fields = fields
                        .iter()
                        .map(|(name, f)| {
                            format!(
                                "{name}{}{}: {}",
                                if f.not_null { "!" } else { "" },
                                if f.optional { "?" } else { "" },
                                f.type_ref.render()
                            )
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("shape {} {}{{ {fields} }}", s.name, with)
                }
            },
            Statement::VarDecl(s) => format!(
                "let {}{} = {}",
                s.name,
                s.type_ref
                    .as_ref()
                    .map(|t| format!(": {}", t.render()))
                    .unwrap_or_default(),
                s.value.render()
            ),
            Statement::Fact(s) => format!(
                "fact {}{}: {}{}{}",
                s.name,
                if s.optional { "?" } else { "" },
                s.type_ref.render(),
                format!(" as {}", s.alias),
                s.default
                    .as_ref()
                    .map(|d| format!(" default {}", d.render()))
                    .unwrap_or_default()
            ),
            Statement::Rule(s) => format!(
                "rule {} ={}{} {}",
                s.name,
                s.default
                    .as_ref()
                    .map(|d| format!(" default {}", d.render()))
                    .unwrap_or_default(),
                s.when
                    .as_ref()
                    .map(|w| format!(" when {}", w.render()))
                    .unwrap_or_default(),
                s.body.render()
            ),
            Statement::RuleExport(s) => format!(
                "export decision of {}{}",
                s.of,
                s.attachments
                    .iter()
                    .map(|a| format!(" {}", a.render()))
                    .collect::<String>()
            ),
            Statement::ShapeExport(s) => format!("export shape {}", s.name),
            Statement::Use(s) => format!(
                "use {{ {} }} from {} as {}",
                s.modules.join(", "),
                s.from_string
                    .clone()
                    .or_else(|| s.from_lib_parts.as_ref().map(|p| format!("@{}", p.join("/"))))
                    .unwrap_or_default(),
                s.alias
            ),
            Statement::Comment(s) => format!("-- {}", s.text),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceStmt {
    pub fqn: Fqn,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyStmt {
    pub name: String,
    pub body: Vec<Statement>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeField {
    pub type_ref: TypeRef,
    pub not_null: bool,
    pub optional: bool,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ShapeBody {
    Simple(TypeRef),
    Complex {
        with: Option<Fqn>,
        fields: Vec<(String, ShapeField)>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeStmt {
    pub name: String,
    pub body: ShapeBody,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDeclStmt {
    pub name: String,
    pub type_ref: Option<TypeRef>,
    pub value: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactStmt {
    pub name: String,
    pub type_ref: TypeRef,
    pub alias: String,
    pub default: Option<Box<Expression>>,
    pub optional: bool,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleStmt {
    pub name: String,
    pub default: Option<Box<Expression>>,
    pub when: Option<Box<Expression>>,
    pub body: Box<Expression>,
    pub range: Range,
}

/// `attach <what> as <expr>`, shared shape between `RuleExportStmt` and
/// `Expression::Attachment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentNode {
    pub what: String,
    pub as_expr: Box<Expression>,
    pub range: Range,
}

/// Each entry is an `Expression::Attachment`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleExportStmt {
    pub of: String,
    pub attachments: Vec<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeExportStmt {
    pub name: String,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseStmt {
    pub modules: Vec<String>,
    pub from_string: Option<String>,
    pub from_lib_parts: Option<Vec<String>>,
    pub alias: String,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentStmt {
    pub text: String,
    pub range: Range,
}

// ── Expressions ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Xor,
    Is,
    In,
    NotIn,
    Contains,
    NotContains,
    Matches,
    NotMatches,
}

impl InfixOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::LtEq => "<=",
            InfixOp::Gt => ">",
            InfixOp::GtEq => ">=",
            InfixOp::And => "and",
            InfixOp::Or => "or",
            InfixOp::Xor => "xor",
            InfixOp::Is => "is",
            InfixOp::In => "in",
            InfixOp::NotIn => "not in",
            InfixOp::Contains => "contains",
            InfixOp::NotContains => "not contains",
            InfixOp::Matches => "matches",
            InfixOp::NotMatches => "not matches",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
        }
    }
}

/// The quantifier family, all sharing `{ collection, value_iter, index_iter?,
/// body }`. `First` is retained as a dead surface form reserved for future use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantifierKind {
    Any,
    All,
    Filter,
    Map,
    Distinct,
    First,
    Count,
}

impl QuantifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantifierKind::Any => "any",
            QuantifierKind::All => "all",
            QuantifierKind::Filter => "filter",
            QuantifierKind::Map => "map",
            QuantifierKind::Distinct => "distinct",
            QuantifierKind::First => "first",
            QuantifierKind::Count => "count",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEntry {
    pub key: Box<Expression>,
    pub value: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantifierExpr {
    pub kind: QuantifierKind,
    pub collection: Box<Expression>,
    pub value_iter: String,
    pub index_iter: Option<String>,
    pub body: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReduceExpr {
    pub collection: Box<Expression>,
    pub from_expr: Box<Expression>,
    pub accumulator: String,
    pub value_iter: String,
    pub index_iter: Option<String>,
    pub body: Box<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithClause {
    pub name: String,
    pub value: Box<Expression>,
    pub range: Range,
}

/// Each entry is an `Expression::With`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportExpr {
    pub rule_to_import: String,
    pub from_policy_fqn: Fqn,
    pub with_clauses: Vec<Expression>,
    pub range: Range,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    StringLit(String, Range),
    IntLit(i64, String, Range),
    FloatLit(f64, String, Range),
    TrinaryLit(Trinary, Range),
    Null(Range),
    Identifier(String, Range),
    ListLiteral(Vec<Expression>, Range),
    MapLiteral(Vec<MapEntry>, Range),
    FieldAccess {
        left: Box<Expression>,
        field: String,
        range: Range,
    },
    IndexAccess {
        left: Box<Expression>,
        index: Box<Expression>,
        range: Range,
    },
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        memoized: bool,
        memoize_ttl_seconds: Option<i64>,
        range: Range,
    },
    Infix {
        left: Box<Expression>,
        op: InfixOp,
        right: Box<Expression>,
        range: Range,
    },
    Unary {
        op: UnaryOp,
        right: Box<Expression>,
        range: Range,
    },
    Ternary {
        cond: Box<Expression>,
        then_branch: Box<Expression>,
        else_branch: Box<Expression>,
        range: Range,
    },
    Quantifier(QuantifierExpr),
    Reduce(ReduceExpr),
    Cast {
        expr: Box<Expression>,
        target_type: TypeRef,
        range: Range,
    },
    Transform {
        expr: Box<Expression>,
        jq_program: String,
        range: Range,
    },
    IsDefined {
        left: Box<Expression>,
        range: Range,
    },
    IsEmpty {
        left: Box<Expression>,
        range: Range,
    },
    Import(ImportExpr),
    With(WithClause),
    Attachment(AttachmentNode),
    Block {
        statements: Vec<Statement>,
        yield_expr: Box<Expression>,
        range: Range,
    },
    PrecedingComment {
        text: String,
        wrapped: Box<Expression>,
        range: Range,
    },
    TrailingComment {
        text: String,
        wrapped: Box<Expression>,
        range: Range,
    },
}

impl Node for Expression {
    fn range(&self) -> &Range {
        match self {
            Expression::StringLit(_, r)
            | Expression::IntLit(_, _, r)
            | Expression::FloatLit(_, _, r)
            | Expression::TrinaryLit(_, r)
            | Expression::Null(r)
            | Expression::Identifier(_, r)
            | Expression::ListLiteral(_, r)
            | Expression::MapLiteral(_, r) => r,
            Expression::FieldAccess { range, .. }
            | Expression::IndexAccess { range, .. }
            | Expression::Call { range, .. }
            | Expression::Infix { range, .. }
            | Expression::Unary { range, .. }
            | Expression::Ternary { range, .. }
            | Expression::Cast { range, .. }
            | Expression::Transform { range, .. }
            | Expression::IsDefined { range, .. }
            | Expression::IsEmpty { range, .. }
            | Expression::Block { range, .. }
            | Expression::PrecedingComment { range, .. }
            | Expression::TrailingComment { range, .. } => range,
            Expression::Quantifier(q) => &q.range,
            Expression::Reduce(r) => &r.range,
            Expression::Import(i) => &i.range,
            Expression::With(w) => &w.range,
            Expression::Attachment(a) => &a.range,
        }
    }

    fn kind_tag(&self) -> &'static str {
        match self {
            Expression::StringLit(..) => "String",
            Expression::IntLit(..) => "Integer",
            Expression::FloatLit(..) => "Float",
            Expression::TrinaryLit(..) => "Trinary",
            Expression::Null(_) => "Null",
            Expression::Identifier(..) => "Identifier",
            Expression::ListLiteral(..) => "ListLiteral",
            Expression::MapLiteral(..) => "MapLiteral",
            Expression::FieldAccess { .. } => "FieldAccess",
            Expression::IndexAccess { .. } => "IndexAccess",
            Expression::Call { .. } => "Call",
            Expression::Infix { .. } => "Infix",
            Expression::Unary { .. } => "Unary",
            Expression::Ternary { .. } => "Ternary",
            Expression::Quantifier(q) => q.kind.as_str(),
            Expression::Reduce(_) => "Reduce",
            Expression::Cast { .. } => "Cast",
            Expression::Transform { .. } => "Transform",
            Expression::IsDefined { .. } => "IsDefined",
            Expression::IsEmpty { .. } => "IsEmpty",
            Expression::Import(_) => "Import",
            Expression::With(_) => "With",
            Expression::Attachment(_) => "Attachment",
            Expression::Block { .. } => "Block",
            Expression::PrecedingComment { .. } => "PrecedingComment",
            Expression::TrailingComment { .. } => "TrailingComment",
        }
    }

    fn render(&self) -> String {
        match self {
            Expression::StringLit(s, _) => format!("{s:?}"),
            Expression::IntLit(_, lexeme, _) => lexeme.clone(),
            Expression::FloatLit(_, lexeme, _) => lexeme.clone(),
            Expression::TrinaryLit(t, _) => t.to_string(),
            Expression::Null(_) => "null".to_string(),
            Expression::Identifier(name, _) => name.clone(),
            Expression::ListLiteral(items, _) => format!(
                "[{}]",
                items.iter().map(Node::render).collect::<Vec<_>>().join(", ")
            ),
            Expression::MapLiteral(entries, _) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|e| format!("{}: {}", e.key.render(), e.value.render()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Expression::FieldAccess { left, field, .. } => format!("{}.{}", left.render(), field),
            Expression::IndexAccess { left, index, .. } => {
                format!("{}[{}]", left.render(), index.render())
            }
            Expression::Call {
                callee,
                args,
                memoized,
                memoize_ttl_seconds,
                ..
            } => {
                let args = args.iter().map(Node::render).collect::<Vec<_>>().join(", ");
                let suffix = match (memoized, memoize_ttl_seconds) {
                    (true, Some(ttl)) => format!("!{ttl}"),
                    (true, None) => "!".to_string(),
                    (false, _) => String::new(),
                };
                format!("{}({args}){suffix}", callee.render())
            }
            Expression::Infix { left, op, right, .. } => {
                format!("({} {} {})", left.render(), op.as_str(), right.render())
            }
            Expression::Unary { op, right, .. } => format!("({}{})", op.as_str(), right.render()),
            Expression::Ternary {
                cond,
                then_branch,
                else_branch,
                ..
            } => format!(
                "({} ? {} : {})",
                cond.render(),
                then_branch.render(),
                else_branch.render()
            ),
            Expression::Quantifier(q) => format!(
                "{} {} as {}{} {{ {} }}",
                q.kind.as_str(),
                q.collection.render(),
                q.value_iter,
                q.index_iter
                    .as_ref()
                    .map(|i| format!(", {i}"))
                    .unwrap_or_default(),
                q.body.render()
            ),
            Expression::Reduce(r) => format!(
                "reduce {} from {} as {} over {}{} {{ {} }}",
                r.collection.render(),
                r.from_expr.render(),
                r.accumulator,
                r.value_iter,
                r.index_iter
                    .as_ref()
                    .map(|i| format!(", {i}"))
                    .unwrap_or_default(),
                r.body.render()
            ),
            Expression::Cast {
                expr, target_type, ..
            } => format!("cast({}, {})", expr.render(), target_type.render()),
            Expression::Transform { expr, jq_program, .. } => {
                format!("transform({}, {jq_program:?})", expr.render())
            }
            Expression::IsDefined { left, .. } => format!("{} is defined", left.render()),
            Expression::IsEmpty { left, .. } => format!("{} is empty", left.render()),
            Expression::Import(i) => format!(
                "import decision {} from {}{}",
                i.rule_to_import,
                i.from_policy_fqn,
                i.with_clauses
                    .iter()
                    .map(|w| format!(" {}", w.render()))
                    .collect::<String>()
            ),
            Expression::With(w) => format!("with {} as {}", w.name, w.value.render()),
            Expression::Attachment(a) => format!("attach {} as {}", a.what, a.as_expr.render()),
            Expression::Block {
                statements,
                yield_expr,
                ..
            } => format!(
                "{{ {}yield {} }}",
                statements
                    .iter()
                    .map(|s| format!("{}; ", s.render()))
                    .collect::<String>(),
                yield_expr.render()
            ),
            Expression::PrecedingComment { wrapped, .. } | Expression::TrailingComment { wrapped, .. } => {
                wrapped.render()
            }
        }
    }
}

impl Expression {
    pub fn as_attachment(&self) -> Option<&AttachmentNode> {
        match self {
            Expression::Attachment(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_with(&self) -> Option<&WithClause> {
        match self {
            Expression::With(w) => Some(w),
            _ => None,
        }
    }
}

// ── Type references ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstraintArg {
    String(String),
    Int(i64),
    Float(f64),
    Trinary(Trinary),
    Null,
    List(Vec<ConstraintArg>),
    Map(Vec<(String, ConstraintArg)>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub args: Vec<ConstraintArg>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRefKind {
    String,
    Int,
    Float,
    /// Indexer-only surface; never produced by the parser directly.
    Number,
    Boolean,
    Document,
    List(Box<TypeRef>),
    Map(Box<TypeRef>),
    Record(Vec<TypeRef>),
    Shape(Fqn),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub kind: TypeRefKind,
    pub constraints: Vec<Constraint>,
    pub range: Range,
}

impl TypeRef {
    pub fn render(&self) -> String {
        let base = match &self.kind {
            TypeRefKind::String => "string".to_string(),
            TypeRefKind::Int => "int".to_string(),
            TypeRefKind::Float => "float".to_string(),
            TypeRefKind::Number => "number".to_string(),
            TypeRefKind::Boolean => "boolean".to_string(),
            TypeRefKind::Document => "document".to_string(),
            TypeRefKind::List(elem) => format!("list[{}]", elem.render()),
            TypeRefKind::Map(value) => format!("map[{}]", value.render()),
            TypeRefKind::Record(fields) => format!(
                "record[{}]",
                fields.iter().map(|f| f.render()).collect::<Vec<_>>().join(", ")
            ),
            TypeRefKind::Shape(fqn) => fqn.to_string(),
        };
        let constraints = self
            .constraints
            .iter()
            .map(|c| format!(" @{}({})", c.name, c.args.len()))
            .collect::<String>();
        format!("{base}{constraints}")
    }
}

/// Name of the per-kind constraint whitelist key a `TypeRefKind` validates
/// against; `int`/`float`/`number` share one set.
pub fn constraint_whitelist_key(kind: &TypeRefKind) -> &'static str {
    match kind {
        TypeRefKind::String => "string",
        TypeRefKind::Int | TypeRefKind::Float | TypeRefKind::Number => "number",
        TypeRefKind::List(_) => "list",
        TypeRefKind::Map(_) | TypeRefKind::Document => "map",
        TypeRefKind::Boolean => "boolean",
        TypeRefKind::Shape(_) | TypeRefKind::Record(_) => "shape",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub file: std::sync::Arc<str>,
    pub statements: Vec<Statement>,
    pub range: Range,
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy_core::Pos;
    use std::sync::Arc;

    fn r() -> Range {
        Range::point(Arc::from("t.pl"), Pos::start())
    }

    fn int(n: i64) -> Box<Expression> {
        Box::new(Expression::IntLit(n, n.to_string(), r()))
    }

    #[test]
    fn precedence_round_trip_renders_fully_parenthesized() {
        // 1 + 2 * 3 => Infix(+, 1, Infix(*, 2, 3))
        let expr = Expression::Infix {
            left: int(1),
            op: InfixOp::Add,
            right: Box::new(Expression::Infix {
                left: int(2),
                op: InfixOp::Mul,
                right: int(3),
                range: r(),
            }),
            range: r(),
        };
        assert_eq!(expr.render(), "(1 + (2 * 3))");
    }

    #[test]
    fn ternary_degenerate_form_defaults_then_branch_to_cond() {
        let cond = Box::new(Expression::Identifier("x".into(), r()));
        let expr = Expression::Ternary {
            cond: cond.clone(),
            then_branch: cond,
            else_branch: Box::new(Expression::Identifier("y".into(), r())),
            range: r(),
        };
        assert_eq!(expr.render(), "(x ? x : y)");
    }

    #[test]
    fn statement_range_contains_child_ranges() {
        let decl = Statement::VarDecl(VarDeclStmt {
            name: "r".into(),
            type_ref: None,
            value: int(1),
            range: r(),
        });
        assert_eq!(decl.kind_tag(), "VarDecl");
    }
}
