//! Recursive descent parser for PHP
//!
//! Builds a typed, spanned AST from tokens. Supports error recovery: an
//! unparsable region becomes an Error node and parsing resumes at the next
//! statement boundary, so a document always yields a tree.

use text_size::{TextRange, TextSize};

use super::ast::*;
use super::lexer::{Token, TokenKind, tokenize};

/// Parse result containing the tree and any errors
#[derive(Debug, Clone, PartialEq)]
pub struct Parse {
    pub file: SourceFile,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse PHP source code into an AST
pub fn parse(input: &str) -> Parse {
    let tokens = tokenize(input);
    let mut parser = Parser::new(tokens);
    let mut stmts = Vec::new();
    while !parser.at(TokenKind::Eof) {
        stmts.push(parser.parse_stmt());
    }
    let range = TextRange::new(TextSize::new(0), TextSize::new(input.len() as u32));
    Parse {
        file: SourceFile { stmts, range },
        errors: parser.errors,
    }
}

struct Parser {
    tokens: Vec<Token>,
    /// Cursor, always positioned on a non-trivia token (or Eof)
    pos: usize,
    errors: Vec<SyntaxError>,
    pending_doc: Option<DocComment>,
    last_end: TextSize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        let mut parser = Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            pending_doc: None,
            last_end: TextSize::new(0),
        };
        parser.skip_trivia();
        parser
    }

    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    fn skip_trivia(&mut self) {
        while let Some(tok) = self.tokens.get(self.pos) {
            if tok.kind == TokenKind::DocComment {
                self.pending_doc = Some(DocComment {
                    text: tok.text.to_string(),
                    range: tok.range,
                });
                self.pos += 1;
            } else if tok.kind.is_trivia() || tok.kind == TokenKind::Error {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    /// Lookahead over non-trivia tokens; `nth(0)` == `peek()`
    fn nth(&self, n: usize) -> TokenKind {
        let mut seen = 0;
        let mut i = self.pos;
        while let Some(tok) = self.tokens.get(i) {
            if !(tok.kind.is_trivia() || tok.kind == TokenKind::Error) {
                if seen == n {
                    return tok.kind;
                }
                seen += 1;
            }
            i += 1;
        }
        TokenKind::Eof
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        if tok.kind != TokenKind::Eof {
            self.last_end = tok.range.end();
            self.pos += 1;
            self.skip_trivia();
        }
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            self.error(format!("expected {:?}, found {:?}", kind, self.peek()));
            None
        }
    }

    fn error(&mut self, message: String) {
        let range = self.current().range;
        self.errors.push(SyntaxError::new(message, range));
    }

    fn start(&self) -> TextSize {
        self.current().range.start()
    }

    fn finish(&self, start: TextSize) -> TextRange {
        TextRange::new(start, self.last_end.max(start))
    }

    fn take_doc(&mut self) -> Option<DocComment> {
        self.pending_doc.take()
    }

    /// Skip an attribute list `#[ ... ]`, tracking bracket nesting.
    /// Attributes between a doc-comment and a declaration do not invalidate
    /// the doc-comment.
    fn skip_attributes(&mut self) {
        while self.at(TokenKind::AttributeStart) {
            let doc = self.pending_doc.take();
            self.advance();
            let mut depth = 1;
            while depth > 0 && !self.at(TokenKind::Eof) {
                match self.peek() {
                    TokenKind::AttributeStart | TokenKind::LBracket => depth += 1,
                    TokenKind::RBracket => depth -= 1,
                    _ => {}
                }
                self.advance();
            }
            self.pending_doc = doc;
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_stmt(&mut self) -> Stmt {
        self.skip_attributes();
        match self.peek() {
            // `namespace\name(...)` is a relative-name expression, not a
            // namespace definition
            TokenKind::NamespaceKw if self.nth(1) != TokenKind::Backslash => {
                self.parse_namespace()
            }
            TokenKind::UseKw => self.parse_use(),
            TokenKind::ClassKw => {
                let doc = self.take_doc();
                self.parse_class(doc, Vec::new())
            }
            TokenKind::AbstractKw | TokenKind::FinalKw | TokenKind::ReadonlyKw
                if self.class_after_modifiers() =>
            {
                let doc = self.take_doc();
                let mut modifiers = Vec::new();
                while let Some(m) = self.eat_member_modifier() {
                    modifiers.push(m);
                }
                self.parse_class(doc, modifiers)
            }
            TokenKind::InterfaceKw => self.parse_interface(),
            TokenKind::TraitKw => self.parse_trait(),
            TokenKind::FunctionKw if self.is_function_decl() => self.parse_function(),
            TokenKind::ConstKw => self.parse_const(),
            TokenKind::GlobalKw => self.parse_global(),
            TokenKind::StaticKw if self.nth(1) == TokenKind::VariableName => {
                self.parse_static_var()
            }
            TokenKind::EchoKw | TokenKind::OpenTagEcho => self.parse_echo(),
            TokenKind::IfKw => self.parse_if(),
            TokenKind::WhileKw => self.parse_while(),
            TokenKind::DoKw => self.parse_do_while(),
            TokenKind::ForKw => self.parse_for(),
            TokenKind::ForeachKw => self.parse_foreach(),
            TokenKind::SwitchKw => self.parse_switch(),
            TokenKind::TryKw => self.parse_try(),
            TokenKind::ReturnKw => self.parse_return(),
            TokenKind::BreakKw => {
                let start = self.start();
                self.advance();
                // optional break level
                if !self.at(TokenKind::Semicolon) {
                    self.parse_expr();
                }
                self.eat(TokenKind::Semicolon);
                Stmt::Break(self.finish(start))
            }
            TokenKind::ContinueKw => {
                let start = self.start();
                self.advance();
                if !self.at(TokenKind::Semicolon) {
                    self.parse_expr();
                }
                self.eat(TokenKind::Semicolon);
                Stmt::Continue(self.finish(start))
            }
            TokenKind::ThrowKw => {
                let start = self.start();
                self.advance();
                let expr = self.parse_expr();
                self.eat(TokenKind::Semicolon);
                Stmt::Throw(ThrowStmt {
                    expr,
                    range: self.finish(start),
                })
            }
            TokenKind::LBrace => {
                let start = self.start();
                let stmts = self.parse_block();
                Stmt::Block(BlockStmt {
                    stmts,
                    range: self.finish(start),
                })
            }
            TokenKind::Semicolon => {
                let start = self.start();
                self.advance();
                Stmt::Nop(self.finish(start))
            }
            TokenKind::DeclareKw => {
                // declare(strict_types=1);
                let start = self.start();
                self.advance();
                if self.eat(TokenKind::LParen) {
                    self.skip_until_matching(TokenKind::LParen, TokenKind::RParen, 1);
                }
                self.eat(TokenKind::Semicolon);
                Stmt::Nop(self.finish(start))
            }
            TokenKind::Eof => {
                let start = self.start();
                Stmt::Nop(self.finish(start))
            }
            _ => self.parse_expr_stmt(),
        }
    }

    /// `abstract`/`final`/`readonly` modifiers followed by `class`
    fn class_after_modifiers(&self) -> bool {
        let mut n = 0;
        loop {
            match self.nth(n) {
                TokenKind::AbstractKw | TokenKind::FinalKw | TokenKind::ReadonlyKw => n += 1,
                TokenKind::ClassKw => return true,
                _ => return false,
            }
        }
    }

    /// `function` beginning a declaration rather than a closure expression
    fn is_function_decl(&self) -> bool {
        match self.nth(1) {
            TokenKind::Identifier => true,
            // function &name()
            TokenKind::Amp => self.nth(2) == TokenKind::Identifier,
            _ => false,
        }
    }

    fn parse_expr_stmt(&mut self) -> Stmt {
        let doc = self.take_doc();
        let start = self.start();
        let before = self.pos;
        let expr = self.parse_expr();
        if self.pos == before {
            // The expression parser made no progress; resynchronize
            self.advance();
            self.recover_to_stmt_boundary();
            return Stmt::Error(self.finish(start));
        }
        self.eat(TokenKind::Semicolon);
        Stmt::Expr(ExprStmt {
            doc,
            expr,
            range: self.finish(start),
        })
    }

    fn recover_to_stmt_boundary(&mut self) {
        loop {
            match self.peek() {
                TokenKind::Eof | TokenKind::RBrace => break,
                TokenKind::Semicolon => {
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn skip_until_matching(&mut self, open: TokenKind, close: TokenKind, mut depth: u32) {
        while depth > 0 && !self.at(TokenKind::Eof) {
            let kind = self.peek();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth -= 1;
            }
            self.advance();
        }
    }

    fn parse_block(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        if self.expect(TokenKind::LBrace).is_none() {
            return stmts;
        }
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            stmts.push(self.parse_stmt());
        }
        // A closing brace ends any pending doc-comment's currency; clearing
        // before consuming `}` keeps a doc-comment that follows the brace
        self.pending_doc = None;
        self.expect(TokenKind::RBrace);
        stmts
    }

    fn parse_namespace(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        let name = if self.at(TokenKind::Identifier) || self.at(TokenKind::Backslash) {
            Some(self.parse_name())
        } else {
            None
        };
        let body = if self.at(TokenKind::LBrace) {
            Some(self.parse_block())
        } else {
            self.eat(TokenKind::Semicolon);
            None
        };
        Stmt::Namespace(NamespaceDecl {
            name,
            body,
            range: self.finish(start),
        })
    }

    fn parse_use(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        let decl_kind = match self.peek() {
            TokenKind::FunctionKw => {
                self.advance();
                UseKind::Function
            }
            TokenKind::ConstKw => {
                self.advance();
                UseKind::Const
            }
            _ => UseKind::Class,
        };
        let mut clauses = Vec::new();
        loop {
            let clause_start = self.start();
            let prefix = self.parse_name();
            if self.at(TokenKind::Backslash) && self.nth(1) == TokenKind::LBrace {
                self.advance();
            }
            if self.at(TokenKind::LBrace) {
                // Group form: use A\{B, function c as d};
                self.advance();
                loop {
                    let inner_start = self.start();
                    let inner_kind = match self.peek() {
                        TokenKind::FunctionKw => {
                            self.advance();
                            UseKind::Function
                        }
                        TokenKind::ConstKw => {
                            self.advance();
                            UseKind::Const
                        }
                        _ => decl_kind,
                    };
                    let suffix = self.parse_name();
                    let target = Name {
                        text: format!("{}\\{}", prefix.text, suffix.text),
                        range: suffix.range,
                    };
                    let alias = self.parse_use_alias();
                    clauses.push(UseClause {
                        kind: inner_kind,
                        target,
                        alias,
                        range: TextRange::new(inner_start, self.last_end),
                    });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                    if self.at(TokenKind::RBrace) {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace);
            } else {
                let alias = self.parse_use_alias();
                clauses.push(UseClause {
                    kind: decl_kind,
                    target: prefix,
                    alias,
                    range: TextRange::new(clause_start, self.last_end),
                });
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Stmt::Use(UseDecl {
            clauses,
            range: self.finish(start),
        })
    }

    fn parse_use_alias(&mut self) -> Option<Ident> {
        if self.eat(TokenKind::AsKw) {
            self.parse_ident()
        } else {
            None
        }
    }

    fn eat_member_modifier(&mut self) -> Option<MemberModifier> {
        let modifier = match self.peek() {
            TokenKind::PublicKw => MemberModifier::Public,
            TokenKind::ProtectedKw => MemberModifier::Protected,
            TokenKind::PrivateKw => MemberModifier::Private,
            TokenKind::StaticKw => MemberModifier::Static,
            TokenKind::AbstractKw => MemberModifier::Abstract,
            TokenKind::FinalKw => MemberModifier::Final,
            TokenKind::ReadonlyKw => MemberModifier::Readonly,
            TokenKind::VarKw => MemberModifier::Var,
            _ => return None,
        };
        self.advance();
        Some(modifier)
    }

    fn parse_class(&mut self, doc: Option<DocComment>, modifiers: Vec<MemberModifier>) -> Stmt {
        let start = self.start();
        self.advance(); // `class`
        let name = self.parse_ident().unwrap_or_else(|| Ident {
            text: String::new(),
            range: self.current().range,
        });
        let extends = if self.eat(TokenKind::ExtendsKw) {
            Some(self.parse_name())
        } else {
            None
        };
        let mut implements = Vec::new();
        if self.eat(TokenKind::ImplementsKw) {
            loop {
                implements.push(self.parse_name());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let members = self.parse_member_list();
        Stmt::Class(ClassDecl {
            doc,
            modifiers,
            name,
            extends,
            implements,
            members,
            range: self.finish(start),
        })
    }

    fn parse_interface(&mut self) -> Stmt {
        let doc = self.take_doc();
        let start = self.start();
        self.advance();
        let name = self.parse_ident().unwrap_or_else(|| Ident {
            text: String::new(),
            range: self.current().range,
        });
        let mut extends = Vec::new();
        if self.eat(TokenKind::ExtendsKw) {
            loop {
                extends.push(self.parse_name());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        let members = self.parse_member_list();
        Stmt::Interface(InterfaceDecl {
            doc,
            name,
            extends,
            members,
            range: self.finish(start),
        })
    }

    fn parse_trait(&mut self) -> Stmt {
        let doc = self.take_doc();
        let start = self.start();
        self.advance();
        let name = self.parse_ident().unwrap_or_else(|| Ident {
            text: String::new(),
            range: self.current().range,
        });
        let members = self.parse_member_list();
        Stmt::Trait(TraitDecl {
            doc,
            name,
            members,
            range: self.finish(start),
        })
    }

    fn parse_member_list(&mut self) -> Vec<Member> {
        let mut members = Vec::new();
        if self.expect(TokenKind::LBrace).is_none() {
            return members;
        }
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            members.push(self.parse_member());
        }
        self.pending_doc = None;
        self.expect(TokenKind::RBrace);
        members
    }

    fn parse_member(&mut self) -> Member {
        self.skip_attributes();
        let doc = self.take_doc();
        let start = self.start();

        if self.at(TokenKind::UseKw) {
            self.advance();
            let mut names = Vec::new();
            loop {
                names.push(self.parse_name());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            // Conflict-resolution block: skip its contents
            if self.at(TokenKind::LBrace) {
                self.advance();
                self.skip_until_matching(TokenKind::LBrace, TokenKind::RBrace, 1);
            } else {
                self.eat(TokenKind::Semicolon);
            }
            return Member::UseTrait(TraitUse {
                names,
                range: self.finish(start),
            });
        }

        let mut modifiers = Vec::new();
        while let Some(m) = self.eat_member_modifier() {
            modifiers.push(m);
        }

        match self.peek() {
            TokenKind::ConstKw => {
                self.advance();
                // Optional const type: `const int X = 1`
                if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::Identifier {
                    self.advance();
                }
                let mut entries = Vec::new();
                loop {
                    let el_start = self.start();
                    let Some(name) = self.parse_ident() else {
                        break;
                    };
                    let value = if self.eat(TokenKind::Eq) {
                        Some(self.parse_expr())
                    } else {
                        None
                    };
                    entries.push(ConstElement {
                        name,
                        value,
                        range: TextRange::new(el_start, self.last_end),
                    });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                self.eat(TokenKind::Semicolon);
                Member::ClassConst(ClassConstDecl {
                    doc,
                    modifiers,
                    entries,
                    range: self.finish(start),
                })
            }
            TokenKind::FunctionKw => {
                self.advance();
                let by_ref = self.eat(TokenKind::Amp);
                let name = self.parse_member_name_ident().unwrap_or_else(|| Ident {
                    text: String::new(),
                    range: self.current().range,
                });
                let params = self.parse_param_list();
                let return_type = self.parse_return_type();
                let body = if self.at(TokenKind::LBrace) {
                    Some(self.parse_block())
                } else {
                    self.eat(TokenKind::Semicolon);
                    None
                };
                Member::Method(MethodDecl {
                    doc,
                    modifiers,
                    by_ref,
                    name,
                    params,
                    return_type,
                    body,
                    range: self.finish(start),
                })
            }
            TokenKind::VariableName => {
                self.parse_property_tail(doc, modifiers, None, start)
            }
            _ if self.at_type_start() => {
                let type_decl = self.parse_type_decl();
                if self.at(TokenKind::VariableName) {
                    self.parse_property_tail(doc, modifiers, type_decl, start)
                } else {
                    self.error("expected property name".into());
                    self.recover_to_stmt_boundary();
                    Member::Error(self.finish(start))
                }
            }
            _ => {
                self.error(format!("unexpected token in class body: {:?}", self.peek()));
                self.advance();
                self.recover_to_stmt_boundary();
                Member::Error(self.finish(start))
            }
        }
    }

    fn parse_property_tail(
        &mut self,
        doc: Option<DocComment>,
        modifiers: Vec<MemberModifier>,
        type_decl: Option<TypeDecl>,
        start: TextSize,
    ) -> Member {
        let mut entries = Vec::new();
        loop {
            let el_start = self.start();
            let Some(name) = self.parse_var_name() else {
                break;
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr())
            } else {
                None
            };
            entries.push(PropertyEntry {
                name,
                default,
                range: TextRange::new(el_start, self.last_end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Member::Property(PropertyDecl {
            doc,
            modifiers,
            type_decl,
            entries,
            range: self.finish(start),
        })
    }

    fn parse_function(&mut self) -> Stmt {
        let doc = self.take_doc();
        let start = self.start();
        self.advance(); // `function`
        let by_ref = self.eat(TokenKind::Amp);
        let name = self.parse_ident().unwrap_or_else(|| Ident {
            text: String::new(),
            range: self.current().range,
        });
        let params = self.parse_param_list();
        let return_type = self.parse_return_type();
        let body = if self.at(TokenKind::LBrace) {
            self.parse_block()
        } else {
            self.eat(TokenKind::Semicolon);
            Vec::new()
        };
        Stmt::Function(FunctionDecl {
            doc,
            by_ref,
            name,
            params,
            return_type,
            body,
            range: self.finish(start),
        })
    }

    fn parse_param_list(&mut self) -> Vec<Param> {
        let mut params = Vec::new();
        if self.expect(TokenKind::LParen).is_none() {
            return params;
        }
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            self.skip_attributes();
            let start = self.start();
            let mut modifiers = Vec::new();
            while let Some(m) = self.eat_member_modifier() {
                modifiers.push(m);
            }
            let type_decl = if self.at_type_start() {
                self.parse_type_decl()
            } else {
                None
            };
            let by_ref = self.eat(TokenKind::Amp);
            let variadic = self.eat(TokenKind::Ellipsis);
            let Some(name) = self.parse_var_name() else {
                self.error("expected parameter name".into());
                // Resynchronize inside the parameter list
                while !matches!(
                    self.peek(),
                    TokenKind::Comma | TokenKind::RParen | TokenKind::Eof
                ) {
                    self.advance();
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                continue;
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr())
            } else {
                None
            };
            params.push(Param {
                modifiers,
                type_decl,
                by_ref,
                variadic,
                name,
                default,
                range: TextRange::new(start, self.last_end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen);
        params
    }

    fn parse_return_type(&mut self) -> Option<TypeDecl> {
        if self.eat(TokenKind::Colon) {
            self.parse_type_decl()
        } else {
            None
        }
    }

    fn at_type_start(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::Identifier
                | TokenKind::Backslash
                | TokenKind::Question
                | TokenKind::ArrayKw
                | TokenKind::CallableKw
                | TokenKind::StaticKw
                | TokenKind::NamespaceKw
                | TokenKind::LParen
        )
    }

    /// Parse a written type: `?T`, `A|B|null`, `A&B`, `(A&B)|C`
    fn parse_type_decl(&mut self) -> Option<TypeDecl> {
        let start = self.start();
        let nullable = self.eat(TokenKind::Question);
        let mut names = Vec::new();
        loop {
            if self.eat(TokenKind::LParen) {
                // DNF group: flatten its atoms
                loop {
                    if let Some(name) = self.parse_type_atom() {
                        names.push(name);
                    } else {
                        break;
                    }
                    if !(self.eat(TokenKind::Amp) || self.eat(TokenKind::Pipe)) {
                        break;
                    }
                }
                self.expect(TokenKind::RParen);
            } else if let Some(name) = self.parse_type_atom() {
                names.push(name);
            } else {
                break;
            }
            let continues = match self.peek() {
                TokenKind::Pipe => true,
                // `A&B $x` type intersection vs by-ref `&$x`
                TokenKind::Amp => !matches!(
                    self.nth(1),
                    TokenKind::VariableName | TokenKind::Ellipsis
                ),
                _ => false,
            };
            if !continues {
                break;
            }
            self.advance();
        }
        if names.is_empty() && !nullable {
            return None;
        }
        Some(TypeDecl {
            names,
            nullable,
            range: TextRange::new(start, self.last_end),
        })
    }

    fn parse_type_atom(&mut self) -> Option<Name> {
        match self.peek() {
            TokenKind::Identifier | TokenKind::Backslash | TokenKind::NamespaceKw => {
                Some(self.parse_name())
            }
            TokenKind::ArrayKw | TokenKind::CallableKw | TokenKind::StaticKw => {
                let tok = self.advance();
                Some(Name {
                    text: tok.text.to_ascii_lowercase(),
                    range: tok.range,
                })
            }
            _ => None,
        }
    }

    fn parse_const(&mut self) -> Stmt {
        let doc = self.take_doc();
        let start = self.start();
        self.advance();
        let mut elements = Vec::new();
        loop {
            let el_start = self.start();
            let Some(name) = self.parse_ident() else {
                break;
            };
            let value = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr())
            } else {
                None
            };
            elements.push(ConstElement {
                name,
                value,
                range: TextRange::new(el_start, self.last_end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Stmt::Const(ConstDecl {
            doc,
            elements,
            range: self.finish(start),
        })
    }

    fn parse_global(&mut self) -> Stmt {
        let doc = self.take_doc();
        let start = self.start();
        self.advance();
        let mut vars = Vec::new();
        loop {
            let Some(name) = self.parse_var_name() else {
                break;
            };
            vars.push(name);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Stmt::Global(GlobalDecl {
            doc,
            vars,
            range: self.finish(start),
        })
    }

    fn parse_static_var(&mut self) -> Stmt {
        let start = self.start();
        self.advance(); // `static`
        let mut entries = Vec::new();
        loop {
            let el_start = self.start();
            let Some(name) = self.parse_var_name() else {
                break;
            };
            let default = if self.eat(TokenKind::Eq) {
                Some(self.parse_expr())
            } else {
                None
            };
            entries.push(PropertyEntry {
                name,
                default,
                range: TextRange::new(el_start, self.last_end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Stmt::StaticVar(StaticVarDecl {
            entries,
            range: self.finish(start),
        })
    }

    fn parse_echo(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        let mut exprs = Vec::new();
        loop {
            exprs.push(self.parse_expr());
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.eat(TokenKind::Semicolon);
        Stmt::Echo(EchoStmt {
            exprs,
            range: self.finish(start),
        })
    }

    fn parse_if(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        self.expect(TokenKind::LParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen);
        let then = Box::new(self.parse_stmt());
        let mut elseifs = Vec::new();
        let mut else_ = None;
        loop {
            if self.at(TokenKind::ElseifKw) {
                self.advance();
                self.expect(TokenKind::LParen);
                let c = self.parse_expr();
                self.expect(TokenKind::RParen);
                let body = self.parse_stmt();
                elseifs.push((c, body));
            } else if self.at(TokenKind::ElseKw) {
                self.advance();
                if self.at(TokenKind::IfKw) {
                    // `else if` chains as a nested if in the else branch
                    else_ = Some(Box::new(self.parse_if()));
                } else {
                    else_ = Some(Box::new(self.parse_stmt()));
                }
                break;
            } else {
                break;
            }
        }
        Stmt::If(IfStmt {
            cond,
            then,
            elseifs,
            else_,
            range: self.finish(start),
        })
    }

    fn parse_while(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        self.expect(TokenKind::LParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen);
        let body = Box::new(self.parse_stmt());
        Stmt::While(WhileStmt {
            cond,
            body,
            range: self.finish(start),
        })
    }

    fn parse_do_while(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        let body = Box::new(self.parse_stmt());
        self.expect(TokenKind::WhileKw);
        self.expect(TokenKind::LParen);
        let cond = self.parse_expr();
        self.expect(TokenKind::RParen);
        self.eat(TokenKind::Semicolon);
        Stmt::DoWhile(DoWhileStmt {
            body,
            cond,
            range: self.finish(start),
        })
    }

    fn parse_for(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        self.expect(TokenKind::LParen);
        let init = self.parse_expr_list_until(TokenKind::Semicolon);
        self.eat(TokenKind::Semicolon);
        let cond = self.parse_expr_list_until(TokenKind::Semicolon);
        self.eat(TokenKind::Semicolon);
        let step = self.parse_expr_list_until(TokenKind::RParen);
        self.expect(TokenKind::RParen);
        let body = Box::new(self.parse_stmt());
        Stmt::For(ForStmt {
            init,
            cond,
            step,
            body,
            range: self.finish(start),
        })
    }

    fn parse_expr_list_until(&mut self, stop: TokenKind) -> Vec<Expr> {
        let mut exprs = Vec::new();
        while !self.at(stop) && !self.at(TokenKind::Eof) {
            let before = self.pos;
            exprs.push(self.parse_expr());
            if self.pos == before {
                self.advance();
                break;
            }
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        exprs
    }

    fn parse_foreach(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        self.expect(TokenKind::LParen);
        let collection = self.parse_expr();
        self.expect(TokenKind::AsKw);

        let mut key = None;
        let mut by_ref = self.eat(TokenKind::Amp);
        let mut value = None;
        if self.at(TokenKind::VariableName) {
            let first = self.parse_var_name();
            if self.eat(TokenKind::DoubleArrow) {
                key = first;
                by_ref = self.eat(TokenKind::Amp);
                if self.at(TokenKind::VariableName) {
                    value = self.parse_var_name();
                } else {
                    // `as $k => [$a, $b]` destructuring: skip the pattern
                    self.parse_expr();
                }
            } else {
                value = first;
            }
        } else {
            // list()/[] destructuring: skip the pattern
            self.parse_expr();
        }
        self.expect(TokenKind::RParen);
        let body = Box::new(self.parse_stmt());
        Stmt::Foreach(ForeachStmt {
            collection,
            key,
            by_ref,
            value,
            body,
            range: self.finish(start),
        })
    }

    fn parse_switch(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        self.expect(TokenKind::LParen);
        let subject = self.parse_expr();
        self.expect(TokenKind::RParen);
        self.expect(TokenKind::LBrace);
        let mut cases = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let case_start = self.start();
            let test = if self.eat(TokenKind::CaseKw) {
                let t = self.parse_expr();
                if !self.eat(TokenKind::Colon) {
                    self.eat(TokenKind::Semicolon);
                }
                Some(t)
            } else if self.eat(TokenKind::DefaultKw) {
                if !self.eat(TokenKind::Colon) {
                    self.eat(TokenKind::Semicolon);
                }
                None
            } else {
                self.error("expected case or default".into());
                self.advance();
                continue;
            };
            let mut body = Vec::new();
            while !matches!(
                self.peek(),
                TokenKind::CaseKw | TokenKind::DefaultKw | TokenKind::RBrace | TokenKind::Eof
            ) {
                body.push(self.parse_stmt());
            }
            cases.push(SwitchCase {
                test,
                body,
                range: TextRange::new(case_start, self.last_end),
            });
        }
        self.pending_doc = None;
        self.expect(TokenKind::RBrace);
        Stmt::Switch(SwitchStmt {
            subject,
            cases,
            range: self.finish(start),
        })
    }

    fn parse_try(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        let body = self.parse_block();
        let mut catches = Vec::new();
        while self.at(TokenKind::CatchKw) {
            let catch_start = self.start();
            self.advance();
            self.expect(TokenKind::LParen);
            let mut types = Vec::new();
            loop {
                types.push(self.parse_name());
                if !self.eat(TokenKind::Pipe) {
                    break;
                }
            }
            let var = self.parse_var_name();
            self.expect(TokenKind::RParen);
            let catch_body = self.parse_block();
            catches.push(CatchClause {
                types,
                var,
                body: catch_body,
                range: TextRange::new(catch_start, self.last_end),
            });
        }
        let finally = if self.eat(TokenKind::FinallyKw) {
            Some(self.parse_block())
        } else {
            None
        };
        Stmt::Try(TryStmt {
            body,
            catches,
            finally,
            range: self.finish(start),
        })
    }

    fn parse_return(&mut self) -> Stmt {
        let start = self.start();
        self.advance();
        let expr = if self.at(TokenKind::Semicolon) || self.at(TokenKind::Eof) {
            None
        } else {
            Some(self.parse_expr())
        };
        self.eat(TokenKind::Semicolon);
        Stmt::Return(ReturnStmt {
            expr,
            range: self.finish(start),
        })
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    /// Parse a possibly-qualified name as written.
    fn parse_name(&mut self) -> Name {
        let start = self.start();
        let mut text = String::new();
        if self.at(TokenKind::Backslash) {
            self.advance();
            text.push('\\');
        } else if self.at(TokenKind::NamespaceKw) && self.nth(1) == TokenKind::Backslash {
            // relative form `namespace\C`
            self.advance();
            self.advance();
            text.push_str("namespace\\");
        }
        loop {
            if self.at(TokenKind::Identifier) {
                let tok = self.advance();
                text.push_str(&tok.text);
            } else {
                self.error(format!("expected identifier, found {:?}", self.peek()));
                break;
            }
            if self.at(TokenKind::Backslash) && self.nth(1) == TokenKind::Identifier {
                self.advance();
                text.push('\\');
            } else {
                break;
            }
        }
        Name {
            text,
            range: TextRange::new(start, self.last_end.max(start)),
        }
    }

    fn parse_ident(&mut self) -> Option<Ident> {
        if self.at(TokenKind::Identifier) {
            let tok = self.advance();
            Some(Ident {
                text: tok.text.to_string(),
                range: tok.range,
            })
        } else {
            None
        }
    }

    /// Method names may collide with keywords (`list`, `for`, `use`, ...)
    fn parse_member_name_ident(&mut self) -> Option<Ident> {
        if matches!(self.peek(), TokenKind::Identifier) || self.peek_is_keyword() {
            let tok = self.advance();
            Some(Ident {
                text: tok.text.to_string(),
                range: tok.range,
            })
        } else {
            None
        }
    }

    fn peek_is_keyword(&self) -> bool {
        matches!(
            self.peek(),
            TokenKind::ListKw
                | TokenKind::ArrayKw
                | TokenKind::PrintKw
                | TokenKind::EchoKw
                | TokenKind::ForKw
                | TokenKind::ForeachKw
                | TokenKind::UseKw
                | TokenKind::NewKw
                | TokenKind::MatchKw
                | TokenKind::DefaultKw
        )
    }

    fn parse_var_name(&mut self) -> Option<VarName> {
        if self.at(TokenKind::VariableName) {
            let tok = self.advance();
            Some(VarName {
                text: tok.text.to_string(),
                range: tok.range,
            })
        } else {
            None
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Expr {
        self.parse_low_logical()
    }

    /// `and` / `or` / `xor` bind looser than assignment
    fn parse_low_logical(&mut self) -> Expr {
        let start = self.start();
        let mut lhs = self.parse_assignment();
        loop {
            let op = match self.peek() {
                TokenKind::AndKw => BinaryOp::And,
                TokenKind::OrKw => BinaryOp::Or,
                TokenKind::XorKw => BinaryOp::BitXor,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_assignment();
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                range: TextRange::new(start, self.last_end),
            };
        }
        lhs
    }

    fn parse_assignment(&mut self) -> Expr {
        let start = self.start();
        let lhs = self.parse_ternary();
        let op = match self.peek() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::CoalesceEq => AssignOp::Coalesce,
            TokenKind::DotEq => AssignOp::Concat,
            TokenKind::PlusEq
            | TokenKind::MinusEq
            | TokenKind::StarEq
            | TokenKind::SlashEq
            | TokenKind::PercentEq
            | TokenKind::StarStarEq
            | TokenKind::AmpEq
            | TokenKind::PipeEq
            | TokenKind::CaretEq
            | TokenKind::ShlEq
            | TokenKind::ShrEq => AssignOp::Arith,
            _ => return lhs,
        };
        self.advance();
        let by_ref = op == AssignOp::Assign && self.eat(TokenKind::Amp);
        let value = self.parse_assignment();
        Expr::Assign {
            target: Box::new(lhs),
            op,
            by_ref,
            value: Box::new(value),
            range: TextRange::new(start, self.last_end),
        }
    }

    fn parse_ternary(&mut self) -> Expr {
        let start = self.start();
        let cond = self.parse_coalesce();
        if self.eat(TokenKind::Question) {
            let then = if self.at(TokenKind::Colon) {
                None
            } else {
                Some(Box::new(self.parse_expr()))
            };
            self.expect(TokenKind::Colon);
            let else_ = Box::new(self.parse_assignment());
            Expr::Ternary {
                cond: Box::new(cond),
                then,
                else_,
                range: TextRange::new(start, self.last_end),
            }
        } else {
            cond
        }
    }

    fn parse_coalesce(&mut self) -> Expr {
        let start = self.start();
        let lhs = self.parse_binary(0);
        if self.eat(TokenKind::Coalesce) {
            // right-associative
            let rhs = self.parse_coalesce();
            Expr::Binary {
                lhs: Box::new(lhs),
                op: BinaryOp::Coalesce,
                rhs: Box::new(rhs),
                range: TextRange::new(start, self.last_end),
            }
        } else {
            lhs
        }
    }

    fn binary_op(kind: TokenKind) -> Option<(BinaryOp, u8)> {
        Some(match kind {
            TokenKind::PipePipe => (BinaryOp::Or, 1),
            TokenKind::AmpAmp => (BinaryOp::And, 2),
            TokenKind::Pipe => (BinaryOp::BitOr, 3),
            TokenKind::Caret => (BinaryOp::BitXor, 4),
            TokenKind::Amp => (BinaryOp::BitAnd, 5),
            TokenKind::EqEq => (BinaryOp::Eq, 6),
            TokenKind::BangEq => (BinaryOp::NotEq, 6),
            TokenKind::EqEqEq => (BinaryOp::Identical, 6),
            TokenKind::BangEqEq => (BinaryOp::NotIdentical, 6),
            TokenKind::Lt => (BinaryOp::Lt, 7),
            TokenKind::Gt => (BinaryOp::Gt, 7),
            TokenKind::LtEq => (BinaryOp::LtEq, 7),
            TokenKind::GtEq => (BinaryOp::GtEq, 7),
            TokenKind::Spaceship => (BinaryOp::Spaceship, 7),
            TokenKind::Shl => (BinaryOp::Shl, 8),
            TokenKind::Shr => (BinaryOp::Shr, 8),
            TokenKind::Plus => (BinaryOp::Add, 9),
            TokenKind::Minus => (BinaryOp::Sub, 9),
            TokenKind::Dot => (BinaryOp::Concat, 9),
            TokenKind::Star => (BinaryOp::Mul, 10),
            TokenKind::Slash => (BinaryOp::Div, 10),
            TokenKind::Percent => (BinaryOp::Mod, 10),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8) -> Expr {
        let start = self.start();
        let mut lhs = self.parse_instanceof();
        while let Some((op, prec)) = Self::binary_op(self.peek()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1);
            lhs = Expr::Binary {
                lhs: Box::new(lhs),
                op,
                rhs: Box::new(rhs),
                range: TextRange::new(start, self.last_end),
            };
        }
        lhs
    }

    fn parse_instanceof(&mut self) -> Expr {
        let start = self.start();
        let mut expr = self.parse_unary();
        while self.eat(TokenKind::InstanceofKw) {
            let class = self.parse_class_ref();
            expr = Expr::Instanceof {
                expr: Box::new(expr),
                class,
                range: TextRange::new(start, self.last_end),
            };
        }
        expr
    }

    fn parse_class_ref(&mut self) -> ClassRef {
        match self.peek() {
            TokenKind::Identifier | TokenKind::Backslash | TokenKind::NamespaceKw => {
                ClassRef::Name(self.parse_name())
            }
            TokenKind::StaticKw => {
                let tok = self.advance();
                ClassRef::Name(Name {
                    text: "static".to_string(),
                    range: tok.range,
                })
            }
            _ => ClassRef::Expr(Box::new(self.parse_unary())),
        }
    }

    fn parse_unary(&mut self) -> Expr {
        let start = self.start();
        let op = match self.peek() {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::PlusPlus => Some(UnaryOp::PreInc),
            TokenKind::MinusMinus => Some(UnaryOp::PreDec),
            TokenKind::At => Some(UnaryOp::Silence),
            TokenKind::PrintKw => Some(UnaryOp::Print),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let expr = self.parse_unary();
            return Expr::Unary {
                op,
                expr: Box::new(expr),
                range: TextRange::new(start, self.last_end),
            };
        }

        // Cast: `(int) $x` and friends
        if self.at(TokenKind::LParen) {
            if let Some(kind) = self.peek_cast() {
                self.advance(); // (
                self.advance(); // type word
                self.advance(); // )
                let expr = self.parse_unary();
                return Expr::Cast {
                    kind,
                    expr: Box::new(expr),
                    range: TextRange::new(start, self.last_end),
                };
            }
        }

        if self.at(TokenKind::CloneKw) {
            self.advance();
            let expr = self.parse_unary();
            return Expr::Clone {
                expr: Box::new(expr),
                range: TextRange::new(start, self.last_end),
            };
        }

        if self.at(TokenKind::YieldKw) {
            self.advance();
            let expr = if matches!(
                self.peek(),
                TokenKind::Semicolon | TokenKind::RParen | TokenKind::Comma | TokenKind::Eof
            ) {
                None
            } else {
                let e = self.parse_expr();
                Some(Box::new(e))
            };
            return Expr::Yield {
                expr,
                range: TextRange::new(start, self.last_end),
            };
        }

        if self.at(TokenKind::ThrowKw) {
            // throw expression (PHP 8)
            self.advance();
            let expr = self.parse_expr();
            return Expr::Unary {
                op: UnaryOp::Silence,
                expr: Box::new(expr),
                range: TextRange::new(start, self.last_end),
            };
        }

        self.parse_pow()
    }

    fn peek_cast(&self) -> Option<CastKind> {
        if self.nth(2) != TokenKind::RParen {
            return None;
        }
        let kind = match self.nth(1) {
            TokenKind::ArrayKw => CastKind::Array,
            TokenKind::Identifier => {
                let mut i = self.pos;
                // locate the identifier token after `(`
                let mut seen = 0;
                let mut text = None;
                while let Some(tok) = self.tokens.get(i) {
                    if !(tok.kind.is_trivia() || tok.kind == TokenKind::Error) {
                        if seen == 1 {
                            text = Some(tok.text.to_ascii_lowercase());
                            break;
                        }
                        seen += 1;
                    }
                    i += 1;
                }
                match text.as_deref() {
                    Some("int") | Some("integer") => CastKind::Int,
                    Some("float") | Some("double") => CastKind::Float,
                    Some("string") => CastKind::String,
                    Some("bool") | Some("boolean") => CastKind::Bool,
                    Some("object") => CastKind::Object,
                    _ => return None,
                }
            }
            _ => return None,
        };
        Some(kind)
    }

    fn parse_pow(&mut self) -> Expr {
        let start = self.start();
        let base = self.parse_postfix();
        if self.eat(TokenKind::StarStar) {
            let exp = self.parse_unary(); // right-associative
            Expr::Binary {
                lhs: Box::new(base),
                op: BinaryOp::Pow,
                rhs: Box::new(exp),
                range: TextRange::new(start, self.last_end),
            }
        } else {
            base
        }
    }

    fn parse_postfix(&mut self) -> Expr {
        let start = self.start();
        let mut expr = self.parse_primary();
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    let args = self.parse_arg_list();
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        range: TextRange::new(start, self.last_end),
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = if self.at(TokenKind::RBracket) {
                        None
                    } else {
                        Some(Box::new(self.parse_expr()))
                    };
                    self.expect(TokenKind::RBracket);
                    expr = Expr::Subscript {
                        base: Box::new(expr),
                        index,
                        range: TextRange::new(start, self.last_end),
                    };
                }
                TokenKind::Arrow | TokenKind::NullsafeArrow => {
                    let nullsafe = self.peek() == TokenKind::NullsafeArrow;
                    self.advance();
                    let name = self.parse_member_name();
                    if self.at(TokenKind::LParen) {
                        let args = self.parse_arg_list();
                        expr = Expr::MethodCall {
                            recv: Box::new(expr),
                            nullsafe,
                            name,
                            args,
                            range: TextRange::new(start, self.last_end),
                        };
                    } else {
                        expr = Expr::PropFetch {
                            recv: Box::new(expr),
                            nullsafe,
                            name,
                            range: TextRange::new(start, self.last_end),
                        };
                    }
                }
                TokenKind::DoubleColon => {
                    self.advance();
                    let class = match &expr {
                        Expr::Name(name) => ClassRef::Name(name.clone()),
                        _ => ClassRef::Expr(Box::new(expr.clone())),
                    };
                    expr = self.parse_static_member(start, class);
                }
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = Expr::Unary {
                        op: UnaryOp::PostInc,
                        expr: Box::new(expr),
                        range: TextRange::new(start, self.last_end),
                    };
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = Expr::Unary {
                        op: UnaryOp::PostDec,
                        expr: Box::new(expr),
                        range: TextRange::new(start, self.last_end),
                    };
                }
                _ => break,
            }
        }
        expr
    }

    fn parse_static_member(&mut self, start: TextSize, class: ClassRef) -> Expr {
        match self.peek() {
            TokenKind::VariableName => {
                let name = self.parse_var_name().unwrap_or(VarName {
                    text: String::new(),
                    range: self.current().range,
                });
                if self.at(TokenKind::LParen) {
                    // `C::$method()` dynamic call by variable
                    let args = self.parse_arg_list();
                    Expr::StaticCall {
                        class,
                        name: MemberName::Expr(Box::new(Expr::Variable(name))),
                        args,
                        range: TextRange::new(start, self.last_end),
                    }
                } else {
                    Expr::StaticPropFetch {
                        class,
                        name,
                        range: TextRange::new(start, self.last_end),
                    }
                }
            }
            TokenKind::ClassKw => {
                let tok = self.advance();
                Expr::ClassConstFetch {
                    class,
                    name: Ident {
                        text: "class".to_string(),
                        range: tok.range,
                    },
                    range: TextRange::new(start, self.last_end),
                }
            }
            TokenKind::LBrace => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::RBrace);
                Expr::StaticCall {
                    class,
                    name: MemberName::Expr(Box::new(inner)),
                    args: if self.at(TokenKind::LParen) {
                        self.parse_arg_list()
                    } else {
                        Vec::new()
                    },
                    range: TextRange::new(start, self.last_end),
                }
            }
            _ => {
                let Some(name) = self.parse_member_name_ident() else {
                    self.error("expected member name after ::".into());
                    return Expr::Error(TextRange::new(start, self.last_end));
                };
                if self.at(TokenKind::LParen) {
                    let args = self.parse_arg_list();
                    Expr::StaticCall {
                        class,
                        name: MemberName::Name(name),
                        args,
                        range: TextRange::new(start, self.last_end),
                    }
                } else {
                    Expr::ClassConstFetch {
                        class,
                        name,
                        range: TextRange::new(start, self.last_end),
                    }
                }
            }
        }
    }

    fn parse_member_name(&mut self) -> MemberName {
        match self.peek() {
            TokenKind::VariableName => {
                let name = self.parse_var_name().unwrap_or(VarName {
                    text: String::new(),
                    range: self.current().range,
                });
                MemberName::Expr(Box::new(Expr::Variable(name)))
            }
            TokenKind::LBrace => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::RBrace);
                MemberName::Expr(Box::new(inner))
            }
            _ => {
                if let Some(name) = self.parse_member_name_ident() {
                    MemberName::Name(name)
                } else {
                    self.error("expected member name".into());
                    MemberName::Name(Ident {
                        text: String::new(),
                        range: self.current().range,
                    })
                }
            }
        }
    }

    fn parse_arg_list(&mut self) -> Vec<Arg> {
        let mut args = Vec::new();
        if self.expect(TokenKind::LParen).is_none() {
            return args;
        }
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let start = self.start();
            // Named argument: `name: expr`
            let name = if self.at(TokenKind::Identifier) && self.nth(1) == TokenKind::Colon {
                let ident = self.parse_ident();
                self.advance(); // :
                ident
            } else {
                None
            };
            let spread = self.eat(TokenKind::Ellipsis);
            let before = self.pos;
            let value = self.parse_expr();
            if self.pos == before {
                self.advance();
                continue;
            }
            args.push(Arg {
                name,
                spread,
                value,
                range: TextRange::new(start, self.last_end),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen);
        args
    }

    fn parse_primary(&mut self) -> Expr {
        let start = self.start();
        match self.peek() {
            TokenKind::VariableName => {
                let name = self.parse_var_name().unwrap_or(VarName {
                    text: String::new(),
                    range: self.current().range,
                });
                Expr::Variable(name)
            }
            TokenKind::IntLiteral => {
                let tok = self.advance();
                Expr::Literal(Literal {
                    kind: LiteralKind::Int,
                    text: tok.text.to_string(),
                    range: tok.range,
                })
            }
            TokenKind::FloatLiteral => {
                let tok = self.advance();
                Expr::Literal(Literal {
                    kind: LiteralKind::Float,
                    text: tok.text.to_string(),
                    range: tok.range,
                })
            }
            TokenKind::StringLiteral | TokenKind::HeredocLiteral => {
                let tok = self.advance();
                Expr::Literal(Literal {
                    kind: LiteralKind::String,
                    text: tok.text.to_string(),
                    range: tok.range,
                })
            }
            TokenKind::Identifier | TokenKind::Backslash | TokenKind::NamespaceKw => {
                let name = self.parse_name();
                // true/false/null are constants with literal typing
                let folded = name.text.to_ascii_lowercase();
                match folded.as_str() {
                    "true" | "false" => Expr::Literal(Literal {
                        kind: LiteralKind::Bool,
                        text: name.text,
                        range: name.range,
                    }),
                    "null" => Expr::Literal(Literal {
                        kind: LiteralKind::Null,
                        text: name.text,
                        range: name.range,
                    }),
                    _ => Expr::Name(name),
                }
            }
            TokenKind::NewKw => self.parse_new(),
            TokenKind::LBracket => self.parse_array_literal(TokenKind::RBracket),
            TokenKind::ArrayKw if self.nth(1) == TokenKind::LParen => {
                self.advance();
                self.parse_array_literal(TokenKind::RParen)
            }
            TokenKind::ListKw if self.nth(1) == TokenKind::LParen => {
                self.advance();
                self.parse_array_literal(TokenKind::RParen)
            }
            TokenKind::FunctionKw => self.parse_closure(false),
            TokenKind::FnKw => self.parse_arrow_fn(false),
            TokenKind::StaticKw => match self.nth(1) {
                TokenKind::FunctionKw => {
                    self.advance();
                    self.parse_closure(true)
                }
                TokenKind::FnKw => {
                    self.advance();
                    self.parse_arrow_fn(true)
                }
                _ => {
                    // `static::` late static binding handled in postfix
                    let tok = self.advance();
                    Expr::Name(Name {
                        text: "static".to_string(),
                        range: tok.range,
                    })
                }
            },
            TokenKind::MatchKw => self.parse_match(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr();
                self.expect(TokenKind::RParen);
                Expr::Paren {
                    expr: Box::new(expr),
                    range: TextRange::new(start, self.last_end),
                }
            }
            _ => {
                self.error(format!("unexpected token in expression: {:?}", self.peek()));
                Expr::Error(self.current().range)
            }
        }
    }

    fn parse_new(&mut self) -> Expr {
        let start = self.start();
        self.advance(); // `new`
        if self.at(TokenKind::ClassKw) {
            // anonymous class
            let doc = self.take_doc();
            self.advance();
            let args = if self.at(TokenKind::LParen) {
                self.parse_arg_list()
            } else {
                Vec::new()
            };
            let extends = if self.eat(TokenKind::ExtendsKw) {
                Some(self.parse_name())
            } else {
                None
            };
            let mut implements = Vec::new();
            if self.eat(TokenKind::ImplementsKw) {
                loop {
                    implements.push(self.parse_name());
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            let members = self.parse_member_list();
            let range = TextRange::new(start, self.last_end);
            return Expr::New {
                class: NewClass::Anonymous(AnonClassExpr {
                    doc,
                    args: args.clone(),
                    extends,
                    implements,
                    members,
                    range,
                }),
                args,
                range,
            };
        }
        let class = match self.peek() {
            TokenKind::Identifier | TokenKind::Backslash | TokenKind::NamespaceKw => {
                NewClass::Name(self.parse_name())
            }
            TokenKind::StaticKw => {
                let tok = self.advance();
                NewClass::Name(Name {
                    text: "static".to_string(),
                    range: tok.range,
                })
            }
            TokenKind::VariableName => {
                let name = self.parse_var_name().unwrap_or(VarName {
                    text: String::new(),
                    range: self.current().range,
                });
                NewClass::Expr(Box::new(Expr::Variable(name)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(TokenKind::RParen);
                NewClass::Expr(Box::new(inner))
            }
            _ => {
                self.error("expected class name after new".into());
                return Expr::Error(TextRange::new(start, self.last_end));
            }
        };
        let args = if self.at(TokenKind::LParen) {
            self.parse_arg_list()
        } else {
            Vec::new()
        };
        Expr::New {
            class,
            args,
            range: TextRange::new(start, self.last_end),
        }
    }

    fn parse_array_literal(&mut self, close: TokenKind) -> Expr {
        let start = self.start();
        self.advance(); // `[` or `(`
        let mut entries = Vec::new();
        while !self.at(close) && !self.at(TokenKind::Eof) {
            let spread = self.eat(TokenKind::Ellipsis);
            let by_ref = self.eat(TokenKind::Amp);
            let before = self.pos;
            let first = self.parse_ternary();
            if self.pos == before {
                self.advance();
                continue;
            }
            let entry = if self.eat(TokenKind::DoubleArrow) {
                let by_ref = self.eat(TokenKind::Amp);
                let value = self.parse_ternary();
                ArrayEntry {
                    key: Some(first),
                    by_ref,
                    spread,
                    value,
                }
            } else {
                ArrayEntry {
                    key: None,
                    by_ref,
                    spread,
                    value: first,
                }
            };
            entries.push(entry);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(close);
        Expr::Array {
            entries,
            range: TextRange::new(start, self.last_end),
        }
    }

    fn parse_closure(&mut self, is_static: bool) -> Expr {
        let doc = self.take_doc();
        let start = self.start();
        self.advance(); // `function`
        let by_ref = self.eat(TokenKind::Amp);
        let params = self.parse_param_list();
        let mut uses = Vec::new();
        if self.eat(TokenKind::UseKw) {
            self.expect(TokenKind::LParen);
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                let by_ref = self.eat(TokenKind::Amp);
                if let Some(name) = self.parse_var_name() {
                    uses.push(ClosureUse { by_ref, name });
                } else {
                    self.advance();
                }
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen);
        }
        let return_type = self.parse_return_type();
        let body = self.parse_block();
        Expr::Closure(ClosureExpr {
            doc,
            is_static,
            by_ref,
            params,
            uses,
            return_type,
            body,
            range: TextRange::new(start, self.last_end),
        })
    }

    fn parse_arrow_fn(&mut self, is_static: bool) -> Expr {
        let start = self.start();
        self.advance(); // `fn`
        let by_ref = self.eat(TokenKind::Amp);
        let params = self.parse_param_list();
        let return_type = self.parse_return_type();
        self.expect(TokenKind::DoubleArrow);
        let body = Box::new(self.parse_expr());
        Expr::ArrowFn(ArrowFnExpr {
            is_static,
            by_ref,
            params,
            return_type,
            body,
            range: TextRange::new(start, self.last_end),
        })
    }

    fn parse_match(&mut self) -> Expr {
        let start = self.start();
        self.advance(); // `match`
        self.expect(TokenKind::LParen);
        let subject = self.parse_expr();
        self.expect(TokenKind::RParen);
        self.expect(TokenKind::LBrace);
        let mut arms = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let conditions = if self.eat(TokenKind::DefaultKw) {
                None
            } else {
                let mut conds = Vec::new();
                loop {
                    let before = self.pos;
                    conds.push(self.parse_ternary());
                    if self.pos == before {
                        self.advance();
                        break;
                    }
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                    if self.at(TokenKind::DoubleArrow) {
                        break;
                    }
                }
                Some(conds)
            };
            self.expect(TokenKind::DoubleArrow);
            let body = self.parse_expr();
            arms.push(MatchArm { conditions, body });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.pending_doc = None;
        self.expect(TokenKind::RBrace);
        Expr::Match {
            subject: Box::new(subject),
            arms,
            range: TextRange::new(start, self.last_end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> SourceFile {
        let parse = parse(input);
        assert!(parse.ok(), "unexpected errors: {:?}", parse.errors);
        parse.file
    }

    fn first_stmt(input: &str) -> Stmt {
        parse_ok(input).stmts.into_iter().next().unwrap()
    }

    #[test]
    fn test_namespace_unbraced() {
        let stmt = first_stmt("<?php namespace A\\B;");
        let Stmt::Namespace(ns) = stmt else {
            panic!("expected namespace, got {stmt:?}")
        };
        assert_eq!(ns.name.unwrap().text, "A\\B");
        assert!(ns.body.is_none());
    }

    #[test]
    fn test_use_grouped() {
        let stmt = first_stmt("<?php use A\\{B, function c as d, const E};");
        let Stmt::Use(decl) = stmt else {
            panic!("expected use")
        };
        assert_eq!(decl.clauses.len(), 3);
        assert_eq!(decl.clauses[0].target.text, "A\\B");
        assert_eq!(decl.clauses[0].kind, UseKind::Class);
        assert_eq!(decl.clauses[1].target.text, "A\\c");
        assert_eq!(decl.clauses[1].kind, UseKind::Function);
        assert_eq!(decl.clauses[1].alias.as_ref().unwrap().text, "d");
        assert_eq!(decl.clauses[2].kind, UseKind::Const);
    }

    #[test]
    fn test_class_full_header() {
        let stmt = first_stmt(
            "<?php abstract class C extends B implements I, J { public function m(int $a = 1): ?string {} }",
        );
        let Stmt::Class(class) = stmt else {
            panic!("expected class")
        };
        assert_eq!(class.name.text, "C");
        assert_eq!(class.modifiers, vec![MemberModifier::Abstract]);
        assert_eq!(class.extends.as_ref().unwrap().text, "B");
        assert_eq!(class.implements.len(), 2);
        let Member::Method(method) = &class.members[0] else {
            panic!("expected method")
        };
        assert_eq!(method.name.text, "m");
        assert_eq!(method.params.len(), 1);
        assert_eq!(method.params[0].name.text, "$a");
        assert!(method.params[0].default.is_some());
        let ret = method.return_type.as_ref().unwrap();
        assert!(ret.nullable);
        assert_eq!(ret.names[0].text, "string");
    }

    #[test]
    fn test_property_and_const_members() {
        let stmt = first_stmt(
            "<?php class C { private ?A $x = null, $y; const K = 1; use T1, T2; }",
        );
        let Stmt::Class(class) = stmt else {
            panic!("expected class")
        };
        let Member::Property(prop) = &class.members[0] else {
            panic!("expected property")
        };
        assert_eq!(prop.entries.len(), 2);
        assert_eq!(prop.modifiers, vec![MemberModifier::Private]);
        assert!(prop.type_decl.as_ref().unwrap().nullable);
        let Member::ClassConst(konst) = &class.members[1] else {
            panic!("expected const")
        };
        assert_eq!(konst.entries[0].name.text, "K");
        let Member::UseTrait(use_trait) = &class.members[2] else {
            panic!("expected trait use")
        };
        assert_eq!(use_trait.names.len(), 2);
    }

    #[test]
    fn test_doc_comment_attaches() {
        let stmt = first_stmt("<?php /** Doc. */ class C {}");
        let Stmt::Class(class) = stmt else {
            panic!("expected class")
        };
        assert!(class.doc.as_ref().unwrap().text.contains("Doc."));
    }

    #[test]
    fn test_doc_comment_survives_attribute() {
        let stmt = first_stmt("<?php /** Doc. */ #[Attr(1)] class C {}");
        let Stmt::Class(class) = stmt else {
            panic!("expected class")
        };
        assert!(class.doc.is_some());
    }

    #[test]
    fn test_doc_comment_not_stolen_by_earlier_stmt() {
        let file = parse_ok("<?php $a = 1; /** Doc. */ function f() {}");
        let Stmt::Function(func) = &file.stmts[1] else {
            panic!("expected function")
        };
        assert!(func.doc.is_some());
        let Stmt::Expr(expr) = &file.stmts[0] else {
            panic!("expected expr stmt")
        };
        assert!(expr.doc.is_none());
    }

    #[test]
    fn test_new_and_member_chain() {
        let stmt = first_stmt("<?php (new B\\C())->m()->p;");
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expr")
        };
        let Expr::PropFetch { recv, .. } = &expr_stmt.expr else {
            panic!("expected prop fetch, got {:?}", expr_stmt.expr)
        };
        assert!(matches!(**recv, Expr::MethodCall { .. }));
    }

    #[test]
    fn test_static_members() {
        let file = parse_ok("<?php A::CONST_X; A::$prop; A::m(); A::class;");
        assert!(matches!(
            &file.stmts[0],
            Stmt::Expr(ExprStmt {
                expr: Expr::ClassConstFetch { .. },
                ..
            })
        ));
        assert!(matches!(
            &file.stmts[1],
            Stmt::Expr(ExprStmt {
                expr: Expr::StaticPropFetch { .. },
                ..
            })
        ));
        assert!(matches!(
            &file.stmts[2],
            Stmt::Expr(ExprStmt {
                expr: Expr::StaticCall { .. },
                ..
            })
        ));
        assert!(matches!(
            &file.stmts[3],
            Stmt::Expr(ExprStmt {
                expr: Expr::ClassConstFetch { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_closure_with_uses() {
        let stmt = first_stmt("<?php $f = function ($a) use ($b, &$c): int { return $a; };");
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expr")
        };
        let Expr::Assign { value, .. } = &expr_stmt.expr else {
            panic!("expected assign")
        };
        let Expr::Closure(closure) = value.as_ref() else {
            panic!("expected closure")
        };
        assert_eq!(closure.uses.len(), 2);
        assert!(closure.uses[1].by_ref);
    }

    #[test]
    fn test_anonymous_class() {
        let stmt = first_stmt("<?php $x = new class(1) extends B { public $p; };");
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expr")
        };
        let Expr::Assign { value, .. } = &expr_stmt.expr else {
            panic!("expected assign")
        };
        let Expr::New {
            class: NewClass::Anonymous(anon),
            ..
        } = value.as_ref()
        else {
            panic!("expected anonymous class")
        };
        assert_eq!(anon.extends.as_ref().unwrap().text, "B");
        assert_eq!(anon.members.len(), 1);
    }

    #[test]
    fn test_foreach_key_value() {
        let stmt = first_stmt("<?php foreach ($rows as $k => $v) {}");
        let Stmt::Foreach(foreach) = stmt else {
            panic!("expected foreach")
        };
        assert_eq!(foreach.key.as_ref().unwrap().text, "$k");
        assert_eq!(foreach.value.as_ref().unwrap().text, "$v");
    }

    #[test]
    fn test_try_catch_types() {
        let stmt = first_stmt("<?php try {} catch (A | B\\C $e) {} finally {}");
        let Stmt::Try(try_stmt) = stmt else {
            panic!("expected try")
        };
        assert_eq!(try_stmt.catches.len(), 1);
        assert_eq!(try_stmt.catches[0].types.len(), 2);
        assert_eq!(try_stmt.catches[0].var.as_ref().unwrap().text, "$e");
        assert!(try_stmt.finally.is_some());
    }

    #[test]
    fn test_instanceof_and_ternary() {
        let stmt = first_stmt("<?php $y = $x instanceof A ? $x : null;");
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expr")
        };
        let Expr::Assign { value, .. } = &expr_stmt.expr else {
            panic!("expected assign")
        };
        assert!(matches!(value.as_ref(), Expr::Ternary { .. }));
    }

    #[test]
    fn test_error_recovery_keeps_following_decls() {
        let parse = parse("<?php class { junk; function ok() {}");
        assert!(!parse.ok());
        // The parser must not lose subsequent statements entirely
        assert!(!parse.file.stmts.is_empty());
    }

    #[test]
    fn test_global_and_static_var() {
        let file = parse_ok("<?php function f() { global $db; static $cache = []; }");
        let Stmt::Function(func) = &file.stmts[0] else {
            panic!("expected function")
        };
        assert!(matches!(func.body[0], Stmt::Global(_)));
        assert!(matches!(func.body[1], Stmt::StaticVar(_)));
    }

    #[test]
    fn test_match_expression() {
        let stmt = first_stmt("<?php $r = match ($x) { 1, 2 => new A(), default => null, };");
        let Stmt::Expr(expr_stmt) = stmt else {
            panic!("expected expr")
        };
        let Expr::Assign { value, .. } = &expr_stmt.expr else {
            panic!("expected assign")
        };
        let Expr::Match { arms, .. } = value.as_ref() else {
            panic!("expected match")
        };
        assert_eq!(arms.len(), 2);
        assert_eq!(arms[0].conditions.as_ref().unwrap().len(), 2);
        assert!(arms[1].conditions.is_none());
    }
}
