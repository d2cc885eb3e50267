use dclass_schema::{DataType, FieldId, FieldKind, File, Parameter, Range, Transform, TransformOp, TypeId};
use tracing::debug;

use crate::{
    codec::pack_default,
    diagnostic::Diagnostic,
    lexer::{line_of, Lexer},
    literal::{parse_literal, Literal, LiteralError},
    token::{Token, TokenKind},
};

/// Why a parse function gave up. `Recover` means a diagnostic was recorded
/// and the caller should resynchronize; `Halt` means the token stream is
/// over (end of input or a lex error).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Recover,
    Halt,
}

type Parse<T> = Result<T, Stop>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefKind {
    Keyword,
    Struct,
    Class,
}

impl RefKind {
    fn name(self) -> &'static str {
        match self {
            RefKind::Keyword => "keyword",
            RefKind::Struct => "struct",
            RefKind::Class => "dclass",
        }
    }
}

/// A place to fill in once a forward-referenced type is declared.
#[derive(Debug, Clone, Copy)]
enum PatchSite {
    FieldType(FieldId),
    Parent { class: TypeId, slot: usize },
}

#[derive(Debug)]
struct Pending {
    kind:  RefKind,
    name:  String,
    line:  usize,
    sites: Vec<PatchSite>,
}

/// A data type with its transform and range, before the parameter name.
struct TypeSpec {
    param:      Parameter,
    /// Name of a struct that is not declared yet; the data type holds
    /// `Invalid` in its place.
    unresolved: Option<String>,
    line:       usize,
}

/// Recursive-descent parser building a [`File`] from DC source.
///
/// Errors never abort the parse: each one is recorded as a [`Diagnostic`]
/// and the parser resynchronizes at the next statement. Only a lex error
/// or the end of input stops it.
pub struct Parser<'a> {
    lexer:       Lexer<'a>,
    file:        File,
    diagnostics: Vec<Diagnostic>,
    pending:     Vec<Pending>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Parser<'a> {
        Parser {
            lexer:       Lexer::new(source),
            file:        File::new(),
            diagnostics: Vec::new(),
            pending:     Vec::new(),
        }
    }

    /// Parses every declaration, then reports each name still pending as a
    /// definition error in first-use order.
    pub fn parse(mut self) -> (File, Vec<Diagnostic>) {
        let _ = self.parse_declarations();

        for pending in std::mem::take(&mut self.pending) {
            debug!(kind = pending.kind.name(), name = %pending.name, "never defined");
            self.diagnostics
                .push(Diagnostic::undefined(pending.kind.name(), &pending.name, pending.line));
        }
        (self.file, self.diagnostics)
    }

    fn parse_declarations(&mut self) -> Parse<()> {
        loop {
            let token = self.next();
            let result = match token.kind {
                TokenKind::Eof => return Ok(()),
                TokenKind::Keyword => self.parse_keyword(),
                TokenKind::Struct => self.parse_struct(),
                TokenKind::DClass => self.parse_class(),
                _ => {
                    let stop = self.unexpected(&token, "a declaration");
                    match token.kind {
                        TokenKind::Endline => Ok(()),
                        TokenKind::LeftCurly => self.skip_nested_block(),
                        _ => Err(stop),
                    }
                }
            };
            match result {
                Err(Stop::Recover) => self.skip_declaration()?,
                other => other?,
            }
        }
    }

    // keyword <name> ;
    fn parse_keyword(&mut self) -> Parse<()> {
        let name = self.expect(TokenKind::Identifier, "a name in 'keyword' declaration")?;
        if self.file.add_keyword(&name.text) {
            debug!(keyword = %name.text, "declared keyword");
        }
        self.resolve(RefKind::Keyword, &name.text, |_, _| {});
        self.expect_endline()
    }

    // struct <name> { <parameter>* } ;?
    fn parse_struct(&mut self) -> Parse<()> {
        let name = self.expect(TokenKind::Identifier, "a name in 'struct' declaration")?;
        self.check_new_type(&name)?;
        self.expect_peek(TokenKind::LeftCurly, &format!("'{{' after 'struct {}'", name.text))?;

        let id = self.file.add_struct(&name.text, self.line());
        debug!(name = %name.text, id = id.0, "declared struct");

        // A class may inherit from a struct, so pending parents resolve too.
        self.resolve(RefKind::Struct, &name.text, |file, site| patch(file, site, id));
        self.resolve(RefKind::Class, &name.text, |file, site| patch(file, site, id));

        self.parse_block(id, true)
    }

    // dclass <name> (: <parent> (, <parent>)*)? { <field>* } ;?
    fn parse_class(&mut self) -> Parse<()> {
        let name = self.expect(TokenKind::Identifier, "a name in 'dclass' declaration")?;
        self.check_new_type(&name)?;

        let id = self.file.add_class(&name.text, self.line());
        debug!(name = %name.text, id = id.0, "declared dclass");

        self.resolve(RefKind::Class, &name.text, |file, site| patch(file, site, id));
        if let Some(index) = self.pending_index(RefKind::Struct, &name.text) {
            let pending = self.pending.remove(index);
            self.diagnostics.push(Diagnostic::parse(
                format!("dclass '{}' cannot be used as a struct type", pending.name),
                pending.line,
            ));
        }

        if self.peek_is(TokenKind::Composition) {
            self.next();
            loop {
                let parent = self.expect(TokenKind::Identifier, "a parent class name")?;
                self.add_parent(id, &parent);
                if !self.peek_is(TokenKind::Separator) {
                    break;
                }
                self.next();
            }
        }

        self.expect_peek(TokenKind::LeftCurly, &format!("'{{' after 'dclass {}'", name.text))?;
        self.parse_block(id, false)
    }

    fn add_parent(&mut self, class: TypeId, parent: &Token) {
        if parent.text == self.file.ty(class).name {
            let msg = format!("dclass '{}' cannot inherit from itself", parent.text);
            self.error(msg);
            return;
        }
        match self.file.type_by_name(&parent.text) {
            Some(parent_id) => {
                self.file.add_parent(class, Some(parent_id));
            }
            None => {
                let slot = self.file.add_parent(class, None);
                let line = self.line();
                self.expect_later(RefKind::Class, &parent.text, line, Some(PatchSite::Parent { class, slot }));
            }
        }
    }

    fn check_new_type(&mut self, name: &Token) -> Parse<()> {
        if let Some(existing) = self.file.type_by_name(&name.text) {
            let existing = self.file.ty(existing);
            let msg = format!(
                "'{}' is already defined as a {} on line {}",
                name.text,
                existing.kind_name(),
                existing.line
            );
            self.error(msg);
            return Err(Stop::Recover);
        }
        Ok(())
    }

    /// Parses `{ field* }` and the optional `;` after it.
    fn parse_block(&mut self, owner: TypeId, in_struct: bool) -> Parse<()> {
        self.next();
        loop {
            if self.peek_is(TokenKind::RightCurly) {
                self.next();
                break;
            }
            match self.parse_field(owner, in_struct) {
                Err(Stop::Recover) => self.skip_statement()?,
                other => other?,
            }
        }
        if self.peek_is(TokenKind::Endline) {
            self.next();
        }
        Ok(())
    }

    fn parse_field(&mut self, owner: TypeId, in_struct: bool) -> Parse<()> {
        let token = self.next();
        match token.kind {
            TokenKind::Identifier if self.peek_is(TokenKind::LeftParen) => {
                if in_struct {
                    return Err(self.fail(format!("atomic field '{}' is not allowed in a struct", token.text)));
                }
                self.parse_atomic(owner, &token)
            }
            TokenKind::Identifier if self.peek_is(TokenKind::Composition) => {
                if in_struct {
                    return Err(self.fail(format!("molecular field '{}' is not allowed in a struct", token.text)));
                }
                self.parse_molecular(owner, &token)
            }
            kind if kind == TokenKind::Identifier || kind.is_data_type() => {
                let spec = self.parse_type_spec(&token)?;
                let field = self.parse_parameter(owner, None, spec)?;
                self.parse_field_keywords(field)?;
                self.expect_endline()
            }
            TokenKind::LeftCurly => {
                let stop = self.unexpected(&token, "a field");
                self.skip_nested_block()?;
                Err(stop)
            }
            _ => Err(self.unexpected(&token, "a field")),
        }
    }

    // <name> ( <argument> (, <argument>)* ) <keyword>* ;
    fn parse_atomic(&mut self, owner: TypeId, name: &Token) -> Parse<()> {
        self.check_new_field(owner, &name.text)?;
        self.next();

        let field = self.file.add_field(owner, None, &name.text, self.line(), FieldKind::Atomic { args: Vec::new() });
        debug!(name = %name.text, number = field.0, "atomic field");

        if self.peek_is(TokenKind::RightParen) {
            self.next();
        } else {
            loop {
                match self.parse_argument(owner, field) {
                    Err(Stop::Recover) => self.skip_argument()?,
                    other => other?,
                }
                let token = self.next();
                match token.kind {
                    TokenKind::Separator => continue,
                    TokenKind::RightParen => break,
                    _ => return Err(self.unexpected(&token, "',' or ')' after an argument")),
                }
            }
        }

        self.parse_field_keywords(field)?;
        self.expect_endline()
    }

    fn parse_argument(&mut self, owner: TypeId, atomic: FieldId) -> Parse<()> {
        let token = self.next();
        if token.kind != TokenKind::Identifier && !token.kind.is_data_type() {
            return Err(self.unexpected(&token, "an argument type"));
        }
        let spec = self.parse_type_spec(&token)?;
        self.parse_parameter(owner, Some(atomic), spec)?;
        Ok(())
    }

    // <name> : <component> (, <component>)* ;
    fn parse_molecular(&mut self, owner: TypeId, name: &Token) -> Parse<()> {
        self.check_new_field(owner, &name.text)?;
        self.next();

        let mut components = Vec::new();
        loop {
            let component = self.expect(TokenKind::Identifier, "a component field name")?;
            match self.file.find_field(owner, &component.text) {
                None => {
                    return Err(self.fail(format!(
                        "unknown field '{}' in molecular field '{}'",
                        component.text, name.text
                    )))
                }
                Some(id) if self.file.field(id).is_molecular() => {
                    return Err(self.fail(format!(
                        "molecular field '{}' cannot contain molecular field '{}'",
                        name.text, component.text
                    )))
                }
                Some(id) => components.push(id),
            }
            if !self.peek_is(TokenKind::Separator) {
                break;
            }
            self.next();
        }

        let field = self.file.add_field(owner, None, &name.text, self.line(), FieldKind::Molecular { components });
        debug!(name = %name.text, number = field.0, "molecular field");
        self.expect_endline()
    }

    /// Reads the rest of a parameter after its type: name, array suffixes
    /// and default. Arguments of an atomic field may omit the name.
    fn parse_parameter(&mut self, owner: TypeId, enclosing: Option<FieldId>, spec: TypeSpec) -> Parse<FieldId> {
        let TypeSpec { mut param, unresolved, line: type_line } = spec;
        self.parse_array_suffixes(&mut param.data_type)?;
        self.parse_count_range(&mut param)?;

        let name = if self.peek_is(TokenKind::Identifier) {
            self.next().text
        } else if enclosing.is_some() {
            String::new()
        } else {
            let found = self.peek().to_string();
            let msg = format!("missing name for {} parameter, found {}", param.data_type, found);
            return Err(self.fail(msg));
        };

        match enclosing {
            Some(atomic) => self.check_new_arg(atomic, &name)?,
            None => self.check_new_field(owner, &name)?,
        }

        self.parse_array_suffixes(&mut param.data_type)?;
        self.parse_count_range(&mut param)?;

        if self.peek_is(TokenKind::Assignment) {
            self.next();
            let line = self.line();
            let literal = self.parse_default_literal()?;
            match &unresolved {
                Some(struct_name) => self.diagnostics.push(Diagnostic::parse(
                    format!(
                        "default value for '{}' needs struct '{}' to be declared first",
                        name, struct_name
                    ),
                    line,
                )),
                None => match pack_default(&self.file, &name, &param, &literal) {
                    Ok(bytes) => param.default = Some(bytes),
                    Err(err) => self.diagnostics.push(Diagnostic::parse(
                        format!("invalid default value for '{}': {}", name, err),
                        line,
                    )),
                },
            }
        }

        let field = self.file.add_field(owner, enclosing, &name, self.line(), FieldKind::Parameter(param));
        debug!(name = %name, number = field.0, "parameter");
        if let Some(struct_name) = unresolved {
            self.expect_later(RefKind::Struct, &struct_name, type_line, Some(PatchSite::FieldType(field)));
        }
        Ok(field)
    }

    fn parse_default_literal(&mut self) -> Parse<Literal> {
        parse_literal(&mut self.lexer).map_err(|err| self.literal_error(err))
    }

    fn literal_error(&mut self, err: LiteralError) -> Stop {
        let line = line_of(self.lexer.input(), err.pos);
        match err.found {
            TokenKind::Error => {
                self.diagnostics.push(Diagnostic::lex(err.msg, line));
                Stop::Halt
            }
            TokenKind::Eof => {
                self.diagnostics.push(Diagnostic::parse(err.msg, line));
                Stop::Halt
            }
            _ => {
                self.diagnostics.push(Diagnostic::parse(err.msg, line));
                Stop::Recover
            }
        }
    }

    fn parse_array_suffixes(&mut self, data_type: &mut DataType) -> Parse<()> {
        loop {
            if self.peek_is(TokenKind::VarArray) {
                self.next();
                *data_type = DataType::VarArray(Box::new(data_type.clone()));
            } else if self.peek_is(TokenKind::LeftSquare) {
                self.next();
                let size = self.expect(TokenKind::Number, "an array size")?;
                self.expect(TokenKind::RightSquare, "']' after the array size")?;
                let literal = Literal::Number { text: size.text.clone(), negative: false };
                let Some(len) = literal.as_integer().and_then(|n| usize::try_from(n).ok()) else {
                    return Err(self.fail(format!("array size {} is not a whole number", size.text)));
                };
                *data_type = DataType::Array(Box::new(data_type.clone()), len);
            } else {
                return Ok(());
            }
        }
    }

    fn parse_field_keywords(&mut self, field: FieldId) -> Parse<()> {
        while self.peek_is(TokenKind::Identifier) {
            let keyword = self.next();
            if !self.file.has_keyword(&keyword.text) {
                let line = self.line();
                self.expect_later(RefKind::Keyword, &keyword.text, line, None);
            }
            self.file.field_mut(field).keywords.add(&keyword.text);
        }
        Ok(())
    }

    /// Reads a data type keyword or struct name, then any transform ops and
    /// a range.
    fn parse_type_spec(&mut self, first: &Token) -> Parse<TypeSpec> {
        let line = self.line();
        let mut unresolved = None;
        let data_type = match first.kind.data_type() {
            Some(builtin) => builtin,
            None => match self.file.type_by_name(&first.text) {
                Some(id) if self.file.ty(id).is_struct() => DataType::Struct(id),
                Some(_) => {
                    let msg = format!("dclass '{}' cannot be used as a struct type", first.text);
                    self.error(msg);
                    DataType::Invalid
                }
                None => {
                    unresolved = Some(first.text.clone());
                    DataType::Invalid
                }
            },
        };
        let mut param = Parameter::new(data_type);

        while self.peek_is(TokenKind::Operator) {
            let op = self.next();
            let operand = self.expect(TokenKind::Number, &format!("a number after '{}'", op.text))?;
            let literal = Literal::Number { text: operand.text.clone(), negative: false };
            let value = literal.as_float().unwrap_or(f64::NAN);
            let op = match op.text.as_str() {
                "+" => TransformOp::Add(value),
                "-" => TransformOp::Sub(value),
                "*" => TransformOp::Mul(value),
                "/" => TransformOp::Div(value),
                _ => TransformOp::Mod(value),
            };

            if !param.data_type.is_numeric() {
                let msg = format!("transform is only allowed on numeric types, not {}", first.text);
                self.error(msg);
            } else if value.is_nan() {
                let msg = format!("bad transform operand {}", operand.text);
                self.error(msg);
            } else if value == 0.0 && matches!(op, TransformOp::Div(_) | TransformOp::Mod(_)) {
                self.error("transform divides by zero".to_owned());
            } else {
                param.transform.get_or_insert_with(Transform::new).push(op);
            }
        }

        if self.peek_is(TokenKind::LeftParen) {
            let (min, max) = self.parse_range()?;
            match make_range(&param.data_type, param.transform.is_some(), &min, &max) {
                Ok(range) => param.range = Some(range),
                Err(msg) => self.error(msg),
            }
        }

        Ok(TypeSpec { param, unresolved, line })
    }

    /// A range written after an array suffix bounds the element count,
    /// as in `uint8 ids[] (1-8)`.
    fn parse_count_range(&mut self, param: &mut Parameter) -> Parse<()> {
        if !param.data_type.is_array() || !self.peek_is(TokenKind::LeftParen) {
            return Ok(());
        }
        let (min, max) = self.parse_range()?;
        match make_count_range(&param.data_type, &min, &max) {
            Ok(count) => param.count = Some(count),
            Err(msg) => self.error(msg),
        }
        Ok(())
    }

    // ( <bound> (- <bound>)? )
    fn parse_range(&mut self) -> Parse<(Literal, Literal)> {
        self.next();
        let min = self.parse_range_bound()?;
        let max = if self.peek_is(TokenKind::Operator) && self.peek().text == "-" {
            self.next();
            self.parse_range_bound()?
        } else {
            min.clone()
        };
        self.expect(TokenKind::RightParen, "')' to close the range")?;
        Ok((min, max))
    }

    fn parse_range_bound(&mut self) -> Parse<Literal> {
        let mut negative = false;
        if self.peek_is(TokenKind::Operator) && matches!(self.peek().text.as_str(), "-" | "+") {
            negative = self.next().text == "-";
        }
        let number = self.expect(TokenKind::Number, "a range bound")?;
        Ok(Literal::Number { text: number.text, negative })
    }

    fn check_new_field(&mut self, owner: TypeId, name: &str) -> Parse<()> {
        let duplicate = self.file.ty(owner).fields.iter().any(|f| self.file.field(*f).name == name);
        if duplicate {
            let owner_name = self.file.ty(owner).name.clone();
            return Err(self.fail(format!("field '{}' is already defined in '{}'", name, owner_name)));
        }
        Ok(())
    }

    fn check_new_arg(&mut self, atomic: FieldId, name: &str) -> Parse<()> {
        if name.is_empty() {
            return Ok(());
        }
        let duplicate = self.file.field(atomic).nested_fields().iter().any(|f| self.file.field(*f).name == name);
        if duplicate {
            let atomic_name = self.file.field(atomic).name.clone();
            return Err(self.fail(format!("argument '{}' is already defined in '{}'", name, atomic_name)));
        }
        Ok(())
    }

    // forward references

    fn pending_index(&self, kind: RefKind, name: &str) -> Option<usize> {
        self.pending.iter().position(|p| p.kind == kind && p.name == name)
    }

    fn expect_later(&mut self, kind: RefKind, name: &str, line: usize, site: Option<PatchSite>) {
        let index = match self.pending_index(kind, name) {
            Some(index) => index,
            None => {
                debug!(kind = kind.name(), name, line, "forward reference");
                self.pending.push(Pending {
                    kind,
                    name: name.to_owned(),
                    line,
                    sites: Vec::new(),
                });
                self.pending.len() - 1
            }
        };
        self.pending[index].sites.extend(site);
    }

    fn resolve(&mut self, kind: RefKind, name: &str, mut apply: impl FnMut(&mut File, PatchSite)) {
        if let Some(index) = self.pending_index(kind, name) {
            let pending = self.pending.remove(index);
            debug!(kind = kind.name(), name, sites = pending.sites.len(), "resolved forward reference");
            for site in pending.sites {
                apply(&mut self.file, site);
            }
        }
    }

    // recovery

    /// Skips the rest of a bad top-level statement: through the next `;`,
    /// or through a whole `{ ... }` block and its optional `;`.
    fn skip_declaration(&mut self) -> Parse<()> {
        loop {
            match self.peek().kind {
                TokenKind::Endline => {
                    self.next();
                    return Ok(());
                }
                TokenKind::LeftCurly => {
                    self.next();
                    self.skip_nested_block()?;
                    if self.peek_is(TokenKind::Endline) {
                        self.next();
                    }
                    return Ok(());
                }
                _ => {
                    self.skip_token()?;
                }
            }
        }
    }

    /// Skips the rest of a bad field: through the next `;`, stopping before
    /// the `}` that closes the enclosing block.
    fn skip_statement(&mut self) -> Parse<()> {
        loop {
            match self.peek().kind {
                TokenKind::Endline => {
                    self.next();
                    return Ok(());
                }
                TokenKind::RightCurly => return Ok(()),
                TokenKind::LeftCurly => {
                    self.next();
                    self.skip_nested_block()?;
                }
                _ => {
                    self.skip_token()?;
                }
            }
        }
    }

    /// Skips to the `,` or `)` after a bad argument.
    fn skip_argument(&mut self) -> Parse<()> {
        let mut depth = 0usize;
        loop {
            match self.peek().kind {
                TokenKind::Separator if depth == 0 => return Ok(()),
                TokenKind::RightParen if depth == 0 => return Ok(()),
                TokenKind::Endline | TokenKind::RightCurly | TokenKind::LeftCurly => return Err(Stop::Recover),
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => depth -= 1,
                _ => {}
            }
            self.skip_token()?;
        }
    }

    /// Skips tokens through the `}` matching an already consumed `{`.
    fn skip_nested_block(&mut self) -> Parse<()> {
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek().kind {
                TokenKind::LeftCurly => depth += 1,
                TokenKind::RightCurly => depth -= 1,
                _ => {}
            }
            self.skip_token()?;
        }
        Ok(())
    }

    fn skip_token(&mut self) -> Parse<Token> {
        let token = self.next();
        match token.kind {
            TokenKind::Error => {
                self.diagnostics.push(Diagnostic::lex(&token.text, line_of(self.lexer.input(), token.pos)));
                Err(Stop::Halt)
            }
            TokenKind::Eof => Err(Stop::Halt),
            _ => Ok(token),
        }
    }

    // token helpers

    fn next(&mut self) -> Token {
        self.lexer.next_token()
    }

    fn peek(&mut self) -> &Token {
        self.lexer.peek_token()
    }

    fn peek_is(&mut self, kind: TokenKind) -> bool {
        self.peek().is(kind)
    }

    fn line(&self) -> usize {
        self.lexer.line_number()
    }

    /// Consumes the next token if it has `kind`. Otherwise records an error
    /// and leaves the token in place, unless it ends the stream.
    fn expect(&mut self, kind: TokenKind, expected: &str) -> Parse<Token> {
        if self.peek_is(kind) {
            return Ok(self.next());
        }
        if self.peek().is_terminal() {
            let token = self.next();
            return Err(self.unexpected(&token, expected));
        }
        let found = self.peek().to_string();
        Err(self.fail(format!("expected {}, found {}", expected, found)))
    }

    /// Like `expect`, but never consumes a matching token.
    fn expect_peek(&mut self, kind: TokenKind, expected: &str) -> Parse<()> {
        if self.peek_is(kind) {
            return Ok(());
        }
        self.expect(kind, expected).map(|_| ())
    }

    fn expect_endline(&mut self) -> Parse<()> {
        self.expect(TokenKind::Endline, "';' at end of statement").map(|_| ())
    }

    /// Records an error about a token that was already consumed.
    fn unexpected(&mut self, token: &Token, expected: &str) -> Stop {
        match token.kind {
            TokenKind::Error => {
                self.diagnostics.push(Diagnostic::lex(&token.text, line_of(self.lexer.input(), token.pos)));
                Stop::Halt
            }
            TokenKind::Eof => {
                let msg = format!("expected {}, found EOF", expected);
                self.error(msg);
                Stop::Halt
            }
            _ => self.fail(format!("expected {}, found {}", expected, token)),
        }
    }

    fn error(&mut self, msg: String) {
        let line = self.line();
        self.diagnostics.push(Diagnostic::parse(msg, line));
    }

    fn fail(&mut self, msg: String) -> Stop {
        self.error(msg);
        Stop::Recover
    }
}

fn patch(file: &mut File, site: PatchSite, id: TypeId) {
    match site {
        PatchSite::FieldType(field) => {
            if let Some(param) = file.field_mut(field).as_parameter_mut() {
                *param.data_type.element_mut() = DataType::Struct(id);
            }
        }
        PatchSite::Parent { class, slot } => file.set_parent(class, slot, id),
    }
}

/// Builds the range for a type from its written bounds.
fn make_range(data_type: &DataType, transformed: bool, min: &Literal, max: &Literal) -> Result<Range, String> {
    let range = if data_type.is_numeric() && (transformed || *data_type == DataType::Float64) {
        let (Some(min), Some(max)) = (min.as_float(), max.as_float()) else {
            return Err("range bounds must be numbers".to_owned());
        };
        if min > max {
            return Err(format!("range minimum {} is greater than maximum {}", min, max));
        }
        Range::Float { min, max }
    } else {
        let (Some(lo), Some(hi)) = (min.as_integer(), max.as_integer()) else {
            return Err(format!("range bounds of {} must be whole numbers", data_type));
        };
        if lo > hi {
            return Err(format!("range minimum {} is greater than maximum {}", lo, hi));
        }
        let bounds = data_type.int_bounds();
        match data_type {
            dt if dt.is_signed() => {
                let (tmin, tmax) = bounds.unwrap_or_default();
                if lo < tmin || hi > tmax {
                    return Err(format!("range ({} - {}) does not fit in {}", lo, hi, dt));
                }
                Range::Int { min: lo as i64, max: hi as i64 }
            }
            dt if dt.is_unsigned() || dt.is_sized() => {
                let tmax = bounds.map_or(u16::MAX as i128, |(_, tmax)| tmax);
                if lo < 0 || hi > tmax {
                    return Err(format!("range ({} - {}) does not fit in {}", lo, hi, dt));
                }
                if dt.is_sized() {
                    Range::Length { min: lo as u64, max: hi as u64 }
                } else {
                    Range::Uint { min: lo as u64, max: hi as u64 }
                }
            }
            dt => return Err(format!("a range is not allowed on {}", dt)),
        }
    };
    Ok(range)
}

/// Builds the element-count bound of an array.
fn make_count_range(data_type: &DataType, min: &Literal, max: &Literal) -> Result<Range, String> {
    let (Some(lo), Some(hi)) = (min.as_integer(), max.as_integer()) else {
        return Err("element count bounds must be whole numbers".to_owned());
    };
    if lo > hi {
        return Err(format!("element count minimum {} is greater than maximum {}", lo, hi));
    }
    let limit = match data_type {
        DataType::Array(_, len) => *len as i128,
        _ => u16::MAX as i128,
    };
    if lo < 0 || hi > limit {
        return Err(format!("element count ({} - {}) does not fit in {}", lo, hi, data_type));
    }
    Ok(Range::Length { min: lo as u64, max: hi as u64 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> (File, Vec<Diagnostic>) {
        Parser::new(source).parse()
    }

    fn param<'f>(file: &'f File, ty: &str, field: &str) -> &'f Parameter {
        let id = file.type_by_name(ty).unwrap();
        let field = file.find_field(id, field).unwrap();
        file.field(field).as_parameter().unwrap()
    }

    #[test]
    fn ranges_and_transforms() {
        let (file, diags) = parse(
            "dclass A {
                uint8(0-100) hp;
                int16(-10 - 10) x;
                string(1-32) name;
                blob(16) key;
                uint16 / 100 (0 - 2.5) speed;
                int16 % 360 heading;
            };",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(param(&file, "A", "hp").range, Some(Range::Uint { min: 0, max: 100 }));
        assert_eq!(param(&file, "A", "x").range, Some(Range::Int { min: -10, max: 10 }));
        assert_eq!(param(&file, "A", "name").range, Some(Range::Length { min: 1, max: 32 }));
        assert_eq!(param(&file, "A", "key").range, Some(Range::Length { min: 16, max: 16 }));

        let speed = param(&file, "A", "speed");
        assert_eq!(speed.range, Some(Range::Float { min: 0.0, max: 2.5 }));
        assert_eq!(speed.transform.as_ref().unwrap().ops(), &[TransformOp::Div(100.0)]);
        assert_eq!(param(&file, "A", "heading").transform.as_ref().unwrap().ops(), &[TransformOp::Mod(360.0)]);
    }

    #[test]
    fn bad_ranges_are_reported() {
        let (file, diags) = parse("struct S { uint8(10-1) a; int8(0-200) b; char(1-2) c; uint8 / 0 d; };");
        assert_eq!(diags.len(), 4, "{:?}", diags);
        assert!(diags[0].message.contains("greater than maximum"));
        assert!(diags[1].message.contains("does not fit in int8"));
        assert!(diags[2].message.contains("not allowed on char"));
        assert!(diags[3].message.contains("divides by zero"));
        // The fields themselves are kept.
        assert_eq!(file.ty(TypeId(0)).fields.len(), 4);
    }

    #[test]
    fn arrays_and_defaults() {
        let (file, diags) = parse(
            "struct P { int8 x = -3; uint8 v[] = (1, 2); char tag[2] = \"ab\"; uint16[4] grid; };",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        assert_eq!(param(&file, "P", "x").default, Some(vec![0xfd]));
        assert_eq!(param(&file, "P", "v").default, Some(vec![2, 0, 1, 2]));
        assert_eq!(param(&file, "P", "tag").default, Some(b"ab".to_vec()));
        assert_eq!(
            param(&file, "P", "grid").data_type,
            DataType::Array(Box::new(DataType::Uint16), 4)
        );
    }

    #[test]
    fn element_count_ranges() {
        let (file, diags) = parse(
            "struct P { uint8(0-9) ids[] (1-4); char tag[8] (2 - 8); uint16[] (3) triple = (1, 2, 3); };",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        let ids = param(&file, "P", "ids");
        assert_eq!(ids.range, Some(Range::Uint { min: 0, max: 9 }));
        assert_eq!(ids.count, Some(Range::Length { min: 1, max: 4 }));
        assert_eq!(param(&file, "P", "tag").count, Some(Range::Length { min: 2, max: 8 }));
        assert_eq!(param(&file, "P", "triple").count, Some(Range::Length { min: 3, max: 3 }));

        let (_, diags) = parse("struct Q { uint8 a[] (5-1); uint8 b[2] (0-3); uint8 c[] (1-2) = (1, 2, 3); };");
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 3, "{:?}", messages);
        assert!(messages[0].contains("greater than maximum"));
        assert!(messages[1].contains("does not fit in uint8[2]"));
        assert!(messages[2].starts_with("invalid default value for 'c'"));
    }

    #[test]
    fn bad_default_keeps_field() {
        let (file, diags) = parse("struct P { uint8(0-9) x = 10; uint8 y = \"no\"; };");
        assert_eq!(diags.len(), 2, "{:?}", diags);
        assert!(diags[0].message.starts_with("invalid default value for 'x'"));
        assert!(!param(&file, "P", "x").has_default());
        assert!(!param(&file, "P", "y").has_default());
    }

    #[test]
    fn default_needs_declared_struct() {
        let (_, diags) = parse("dclass A { S s = (1); }; struct S { int8 a; };");
        assert_eq!(diags.len(), 1, "{:?}", diags);
        assert_eq!(
            diags[0].message,
            "default value for 's' needs struct 'S' to be declared first"
        );
    }

    #[test]
    fn atomic_args_are_numbered_after_their_field() {
        let (file, diags) = parse("dclass A { setPos(int16, int16 y) broadcast ram; uint8 z; };");
        assert!(diags.is_empty(), "{:?}", diags);
        let set_pos = file.field(FieldId(0));
        assert!(set_pos.is_atomic());
        assert_eq!(set_pos.nested_fields(), &[FieldId(1), FieldId(2)]);
        assert_eq!(file.field(FieldId(1)).name, "");
        assert_eq!(file.field(FieldId(2)).name, "y");
        assert_eq!(file.field(FieldId(3)).name, "z");
        assert!(set_pos.is_broadcast() && set_pos.is_ram());
        assert_eq!(file.ty(TypeId(0)).fields, vec![FieldId(0), FieldId(3)]);
    }

    #[test]
    fn molecular_components() {
        let (file, diags) = parse(
            "dclass A { setX(int8 x); uint8 y; both : setX, y; bad : nope; worse : both; };",
        );
        assert_eq!(diags.len(), 2, "{:?}", diags);
        assert_eq!(diags[0].message, "unknown field 'nope' in molecular field 'bad'");
        assert_eq!(diags[1].message, "molecular field 'worse' cannot contain molecular field 'both'");
        let both = file.find_field(TypeId(0), "both").unwrap();
        assert_eq!(file.field(both).nested_fields(), &[FieldId(0), FieldId(2)]);
    }

    #[test]
    fn structs_take_only_parameters() {
        let (_, diags) = parse("struct S { f(int8); m : f; int8 ok; };");
        assert_eq!(diags.len(), 2, "{:?}", diags);
        assert_eq!(diags[0].message, "atomic field 'f' is not allowed in a struct");
    }

    #[test]
    fn duplicates() {
        let (_, diags) = parse("struct S { int8 x; int8 x; }; dclass S {}; dclass T { f(int8 a, int8 a); };");
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "field 'x' is already defined in 'S'",
                "'S' is already defined as a struct on line 1",
                "argument 'a' is already defined in 'f'",
            ]
        );
    }

    #[test]
    fn forward_references_resolve() {
        let (file, diags) = parse(
            "dclass A : B { S s; int8 x lossy; }; keyword lossy; struct S { int8 a; }; dclass B {};",
        );
        assert!(diags.is_empty(), "{:?}", diags);
        let a = file.type_by_name("A").unwrap();
        let b = file.type_by_name("B").unwrap();
        let s = file.type_by_name("S").unwrap();
        assert_eq!(file.ty(a).parents().collect::<Vec<_>>(), vec![b]);
        assert_eq!(param(&file, "A", "s").data_type, DataType::Struct(s));
        assert!(file.has_keyword("lossy"));
    }

    #[test]
    fn class_used_as_struct() {
        let (_, diags) = parse("dclass A { B b; }; dclass B {}; dclass C { A a; };");
        let messages: Vec<_> = diags.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            [
                "parse error(line: 1): dclass 'B' cannot be used as a struct type",
                "parse error(line: 1): dclass 'A' cannot be used as a struct type",
            ]
        );
    }

    #[test]
    fn undefined_names_in_first_use_order() {
        let (_, diags) = parse("dclass A : Missing {\n  Thing t nokw;\n};");
        let messages: Vec<_> = diags.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            messages,
            [
                "definition error: used dclass 'Missing', but 'Missing' was never defined (first used on line 1)",
                "definition error: used struct 'Thing', but 'Thing' was never defined (first used on line 2)",
                "definition error: used keyword 'nokw', but 'nokw' was never defined (first used on line 2)",
            ]
        );
    }

    #[test]
    fn recovery_continues_after_errors() {
        let (file, diags) = parse("keyword 5; struct { int8 a; }; struct S { int8 b }; dclass D { uint8 c; };");
        assert_eq!(diags.len(), 3, "{:?}", diags);
        assert!(file.type_by_name("S").is_some());
        assert!(file.type_by_name("D").is_some());
        assert_eq!(diags[2].message, "expected ';' at end of statement, found \"}\"");
    }

    #[test]
    fn lex_error_stops_parsing() {
        let (file, diags) = parse("dclass A { uint8 x; }; @ dclass B {};");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].to_string(), "lex error(line: 1): unexpected character: U+0040 '@'");
        assert!(file.type_by_name("B").is_none());
    }

    #[test]
    fn structs_can_be_parents() {
        let (file, diags) = parse("dclass A : S { int8 b; }; struct S { int8 a; }; dclass B : S {};");
        assert!(diags.is_empty(), "{:?}", diags);
        let s_id = file.type_by_name("S").unwrap();
        for class in ["A", "B"] {
            let id = file.type_by_name(class).unwrap();
            assert_eq!(file.ty(id).parents().collect::<Vec<_>>(), vec![s_id]);
        }
        assert_eq!(param(&file, "A", "a").data_type, DataType::Int8);
        assert_eq!(param(&file, "B", "a").data_type, DataType::Int8);
    }

    #[test]
    fn self_inheritance() {
        let (_, diags) = parse("dclass A : A {};");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "dclass 'A' cannot inherit from itself");
    }
}
