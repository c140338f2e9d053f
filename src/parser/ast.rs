//! Typed AST for PHP sources.
//!
//! Every node carries its byte range. Malformed regions are represented by
//! [`Stmt::Error`] / [`Expr::Error`] nodes so consumers can skip them while
//! still walking the rest of the tree.

use text_size::TextRange;

/// Root of a parsed document
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub stmts: Vec<Stmt>,
    pub range: TextRange,
}

/// A doc-comment token attached to a declaration or statement
#[derive(Debug, Clone, PartialEq)]
pub struct DocComment {
    pub text: String,
    pub range: TextRange,
}

/// A plain identifier
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub text: String,
    pub range: TextRange,
}

/// A variable name, including the `$` sigil
#[derive(Debug, Clone, PartialEq)]
pub struct VarName {
    pub text: String,
    pub range: TextRange,
}

/// A possibly-qualified name exactly as written (`C`, `B\C`, `\A\B`,
/// `namespace\C`, `self`, `parent`, `static`)
#[derive(Debug, Clone, PartialEq)]
pub struct Name {
    pub text: String,
    pub range: TextRange,
}

impl Name {
    /// Unqualified tail of the written name
    pub fn tail(&self) -> &str {
        self.text.rsplit('\\').next().unwrap_or(&self.text)
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Namespace(NamespaceDecl),
    Use(UseDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    Trait(TraitDecl),
    Function(FunctionDecl),
    Const(ConstDecl),
    Global(GlobalDecl),
    StaticVar(StaticVarDecl),
    Echo(EchoStmt),
    Expr(ExprStmt),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    Foreach(ForeachStmt),
    Switch(SwitchStmt),
    Try(TryStmt),
    Return(ReturnStmt),
    Break(TextRange),
    Continue(TextRange),
    Throw(ThrowStmt),
    Block(BlockStmt),
    InlineHtml(TextRange),
    Nop(TextRange),
    Error(TextRange),
}

impl Stmt {
    pub fn range(&self) -> TextRange {
        match self {
            Stmt::Namespace(s) => s.range,
            Stmt::Use(s) => s.range,
            Stmt::Class(s) => s.range,
            Stmt::Interface(s) => s.range,
            Stmt::Trait(s) => s.range,
            Stmt::Function(s) => s.range,
            Stmt::Const(s) => s.range,
            Stmt::Global(s) => s.range,
            Stmt::StaticVar(s) => s.range,
            Stmt::Echo(s) => s.range,
            Stmt::Expr(s) => s.range,
            Stmt::If(s) => s.range,
            Stmt::While(s) => s.range,
            Stmt::DoWhile(s) => s.range,
            Stmt::For(s) => s.range,
            Stmt::Foreach(s) => s.range,
            Stmt::Switch(s) => s.range,
            Stmt::Try(s) => s.range,
            Stmt::Return(s) => s.range,
            Stmt::Break(r) | Stmt::Continue(r) => *r,
            Stmt::Throw(s) => s.range,
            Stmt::Block(s) => s.range,
            Stmt::InlineHtml(r) | Stmt::Nop(r) | Stmt::Error(r) => *r,
        }
    }
}

/// `namespace A\B;` or `namespace A\B { ... }` or `namespace { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDecl {
    pub name: Option<Name>,
    /// `Some` for the braced form
    pub body: Option<Vec<Stmt>>,
    pub range: TextRange,
}

/// Import kind on a `use` declaration or group clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseKind {
    Class,
    Function,
    Const,
}

/// One clause of a `use` declaration, group prefixes already expanded
#[derive(Debug, Clone, PartialEq)]
pub struct UseClause {
    pub kind: UseKind,
    /// Full target as written (leading `\` stripped by the parser)
    pub target: Name,
    pub alias: Option<Ident>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseDecl {
    pub clauses: Vec<UseClause>,
    pub range: TextRange,
}

/// Modifier keywords on class-likes and members
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberModifier {
    Public,
    Protected,
    Private,
    Static,
    Abstract,
    Final,
    Readonly,
    Var,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub doc: Option<DocComment>,
    pub modifiers: Vec<MemberModifier>,
    pub name: Ident,
    pub extends: Option<Name>,
    pub implements: Vec<Name>,
    pub members: Vec<Member>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceDecl {
    pub doc: Option<DocComment>,
    pub name: Ident,
    /// Interfaces may extend several bases
    pub extends: Vec<Name>,
    pub members: Vec<Member>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub doc: Option<DocComment>,
    pub name: Ident,
    pub members: Vec<Member>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Method(MethodDecl),
    Property(PropertyDecl),
    ClassConst(ClassConstDecl),
    UseTrait(TraitUse),
    Error(TextRange),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitUse {
    pub names: Vec<Name>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub doc: Option<DocComment>,
    pub modifiers: Vec<MemberModifier>,
    pub by_ref: bool,
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<TypeDecl>,
    /// `None` for abstract/interface methods
    pub body: Option<Vec<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDecl {
    pub doc: Option<DocComment>,
    pub modifiers: Vec<MemberModifier>,
    pub type_decl: Option<TypeDecl>,
    pub entries: Vec<PropertyEntry>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub name: VarName,
    pub default: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassConstDecl {
    pub doc: Option<DocComment>,
    pub modifiers: Vec<MemberModifier>,
    pub entries: Vec<ConstElement>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstElement {
    pub name: Ident,
    pub value: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub doc: Option<DocComment>,
    pub by_ref: bool,
    pub name: Ident,
    pub params: Vec<Param>,
    pub return_type: Option<TypeDecl>,
    pub body: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Constructor property promotion modifiers, empty otherwise
    pub modifiers: Vec<MemberModifier>,
    pub type_decl: Option<TypeDecl>,
    pub by_ref: bool,
    pub variadic: bool,
    pub name: VarName,
    pub default: Option<Expr>,
    pub range: TextRange,
}

/// A written type declaration: `?int`, `A|B|null`, `A&B`, `array`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    /// Union/intersection atoms in written order
    pub names: Vec<Name>,
    pub nullable: bool,
    pub range: TextRange,
}

impl TypeDecl {
    /// Written type as a `|`-joined string, with `?T` expanded to `T|null`
    pub fn written(&self) -> String {
        let mut parts: Vec<&str> = self.names.iter().map(|n| n.text.as_str()).collect();
        if self.nullable {
            parts.push("null");
        }
        parts.join("|")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDecl {
    pub doc: Option<DocComment>,
    pub elements: Vec<ConstElement>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalDecl {
    pub doc: Option<DocComment>,
    pub vars: Vec<VarName>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticVarDecl {
    pub entries: Vec<PropertyEntry>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EchoStmt {
    pub exprs: Vec<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub doc: Option<DocComment>,
    pub expr: Expr,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then: Box<Stmt>,
    pub elseifs: Vec<(Expr, Stmt)>,
    pub else_: Option<Box<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Box<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhileStmt {
    pub body: Box<Stmt>,
    pub cond: Expr,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: Vec<Expr>,
    pub cond: Vec<Expr>,
    pub step: Vec<Expr>,
    pub body: Box<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeachStmt {
    pub collection: Expr,
    pub key: Option<VarName>,
    pub by_ref: bool,
    pub value: Option<VarName>,
    pub body: Box<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchStmt {
    pub subject: Expr,
    pub cases: Vec<SwitchCase>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TryStmt {
    pub body: Vec<Stmt>,
    pub catches: Vec<CatchClause>,
    pub finally: Option<Vec<Stmt>>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub types: Vec<Name>,
    pub var: Option<VarName>,
    pub body: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub expr: Option<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThrowStmt {
    pub expr: Expr,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockStmt {
    pub stmts: Vec<Stmt>,
    pub range: TextRange,
}

// ============================================================================
// EXPRESSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Int,
    Float,
    String,
    Bool,
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub kind: LiteralKind,
    /// Literal source text (quotes included for strings)
    pub text: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Concat,
    Coalesce,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    NotEq,
    Identical,
    NotIdentical,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Spaceship,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Silence,
    Print,
}

/// Compound assignment operators collapse to their plain effect on typing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Coalesce,
    Concat,
    Arith,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    String,
    Bool,
    Array,
    Object,
}

/// The class part of `new`, `instanceof`, and static member accesses
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    /// A written name, including `self`/`parent`/`static`
    Name(Name),
    /// Dynamic: `new $cls`, `$obj::CONST`
    Expr(Box<Expr>),
}

/// Member name after `->` / `::`
#[derive(Debug, Clone, PartialEq)]
pub enum MemberName {
    Name(Ident),
    /// Dynamic: `$obj->{$name}` or `$obj->$name`
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<Ident>,
    pub spread: bool,
    pub value: Expr,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayEntry {
    pub key: Option<Expr>,
    pub by_ref: bool,
    pub spread: bool,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureUse {
    pub by_ref: bool,
    pub name: VarName,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureExpr {
    pub doc: Option<DocComment>,
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub uses: Vec<ClosureUse>,
    pub return_type: Option<TypeDecl>,
    pub body: Vec<Stmt>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrowFnExpr {
    pub is_static: bool,
    pub by_ref: bool,
    pub params: Vec<Param>,
    pub return_type: Option<TypeDecl>,
    pub body: Box<Expr>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonClassExpr {
    pub doc: Option<DocComment>,
    pub args: Vec<Arg>,
    pub extends: Option<Name>,
    pub implements: Vec<Name>,
    pub members: Vec<Member>,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NewClass {
    Name(Name),
    Anonymous(AnonClassExpr),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub conditions: Option<Vec<Expr>>,
    pub body: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Error(TextRange),
    Literal(Literal),
    Variable(VarName),
    /// Bare name in expression position: constant fetch or callee
    Name(Name),
    Array {
        entries: Vec<ArrayEntry>,
        range: TextRange,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Arg>,
        range: TextRange,
    },
    New {
        class: NewClass,
        args: Vec<Arg>,
        range: TextRange,
    },
    MethodCall {
        recv: Box<Expr>,
        nullsafe: bool,
        name: MemberName,
        args: Vec<Arg>,
        range: TextRange,
    },
    PropFetch {
        recv: Box<Expr>,
        nullsafe: bool,
        name: MemberName,
        range: TextRange,
    },
    StaticCall {
        class: ClassRef,
        name: MemberName,
        args: Vec<Arg>,
        range: TextRange,
    },
    StaticPropFetch {
        class: ClassRef,
        name: VarName,
        range: TextRange,
    },
    ClassConstFetch {
        class: ClassRef,
        name: Ident,
        range: TextRange,
    },
    Subscript {
        base: Box<Expr>,
        index: Option<Box<Expr>>,
        range: TextRange,
    },
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        by_ref: bool,
        value: Box<Expr>,
        range: TextRange,
    },
    Binary {
        lhs: Box<Expr>,
        op: BinaryOp,
        rhs: Box<Expr>,
        range: TextRange,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        range: TextRange,
    },
    Instanceof {
        expr: Box<Expr>,
        class: ClassRef,
        range: TextRange,
    },
    Ternary {
        cond: Box<Expr>,
        then: Option<Box<Expr>>,
        else_: Box<Expr>,
        range: TextRange,
    },
    Match {
        subject: Box<Expr>,
        arms: Vec<MatchArm>,
        range: TextRange,
    },
    Closure(ClosureExpr),
    ArrowFn(ArrowFnExpr),
    Cast {
        kind: CastKind,
        expr: Box<Expr>,
        range: TextRange,
    },
    Clone {
        expr: Box<Expr>,
        range: TextRange,
    },
    Yield {
        expr: Option<Box<Expr>>,
        range: TextRange,
    },
    Paren {
        expr: Box<Expr>,
        range: TextRange,
    },
}

impl Expr {
    pub fn range(&self) -> TextRange {
        match self {
            Expr::Error(r) => *r,
            Expr::Literal(l) => l.range,
            Expr::Variable(v) => v.range,
            Expr::Name(n) => n.range,
            Expr::Closure(c) => c.range,
            Expr::ArrowFn(f) => f.range,
            Expr::Array { range, .. }
            | Expr::Call { range, .. }
            | Expr::New { range, .. }
            | Expr::MethodCall { range, .. }
            | Expr::PropFetch { range, .. }
            | Expr::StaticCall { range, .. }
            | Expr::StaticPropFetch { range, .. }
            | Expr::ClassConstFetch { range, .. }
            | Expr::Subscript { range, .. }
            | Expr::Assign { range, .. }
            | Expr::Binary { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Instanceof { range, .. }
            | Expr::Ternary { range, .. }
            | Expr::Match { range, .. }
            | Expr::Cast { range, .. }
            | Expr::Clone { range, .. }
            | Expr::Yield { range, .. }
            | Expr::Paren { range, .. } => *range,
        }
    }
}
