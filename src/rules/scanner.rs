//! Scanner for top-level ES module imports and re-exports
//!
//! Only import declarations and `export { ... }` / `export * from` statements
//! are parsed; any other statement is skipped as opaque content and ends the
//! current run of imports.

use crate::item::{Comment, CommentKind, SpecifierKind, TextRange};
use crate::text;
use log::debug;

/// Target of `import x = ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleReference {
    /// `require('module')`
    External(String),
    /// `A.B.C`
    Qualified(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import ... from 'module'`
    Declaration,
    /// `import 'module'`
    SideEffect,
    /// `import x = ...`
    TsEquals(ModuleReference),
}

/// One binding introduced by a declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub range: TextRange,
    pub kind: SpecifierKind,
    /// Name on the module side; equals `local` without an alias
    pub imported: String,
    pub local: String,
    /// `type` prefix inside braces
    pub is_type: bool,
}

/// Key of a `with { ... }` clause entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub range: TextRange,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// From `import` through the optional semicolon
    pub range: TextRange,
    pub kind: ImportKind,
    pub is_type: bool,
    /// Unquoted module source, empty for qualified references
    pub source: String,
    /// Quoted module source literal
    pub source_range: Option<TextRange>,
    pub bindings: Vec<Binding>,
    pub named_braces: Option<TextRange>,
    pub attributes: Vec<Attribute>,
    pub attribute_braces: Option<TextRange>,
    pub has_semicolon: bool,
    /// Comments on the lines directly above
    pub leading_comments: Vec<Comment>,
    /// Comment on the same line after the declaration
    pub trailing_comment: Option<Comment>,
}

impl ImportDeclaration {
    /// Declaration plus attached comments
    pub fn full_range(&self) -> TextRange {
        let start = self
            .leading_comments
            .first()
            .map_or(self.range.start, |c| c.range.start);
        let end = self.trailing_comment.as_ref().map_or(self.range.end, |c| c.range.end);
        TextRange::new(start, end)
    }

    pub fn keyword(&self) -> &'static str {
        if self.is_type {
            "import type"
        } else {
            "import"
        }
    }

    pub fn is_multiline(&self, source: &str) -> bool {
        self.range.slice(source).contains('\n')
    }

    pub fn local_names(&self) -> Vec<String> {
        self.bindings.iter().map(|b| b.local.clone()).collect()
    }

    /// Bindings between the braces
    pub fn named_bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter().filter(|b| b.kind == SpecifierKind::Named)
    }
}

/// One entry of an `export { ... }` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSpecifier {
    pub range: TextRange,
    /// Name inside the module
    pub local: String,
    /// Name seen by importers; equals `local` without an alias
    pub exported: String,
    pub is_type: bool,
}

/// `export { ... } [from '...']` or `export * [as x] from '...'`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDeclaration {
    /// From `export` through the optional semicolon
    pub range: TextRange,
    pub is_type: bool,
    pub source: Option<String>,
    pub specifiers: Vec<ExportSpecifier>,
    pub named_braces: Option<TextRange>,
    pub attributes: Vec<Attribute>,
    pub attribute_braces: Option<TextRange>,
}

/// Every import in a module, grouped into runs not separated by other code
#[derive(Debug, Clone, Default)]
pub struct ScannedModule {
    pub imports: Vec<ImportDeclaration>,
    pub exports: Vec<ExportDeclaration>,
    /// Indices into `imports`
    pub runs: Vec<Vec<usize>>,
    pub comments: Vec<Comment>,
    /// Ranges covered by disable directives
    pub disabled: Vec<TextRange>,
}

pub const DISABLE_NEXT_LINE: &str = "import-sort-disable-next-line";
pub const DISABLE_LINE: &str = "import-sort-disable-line";
pub const DISABLE: &str = "import-sort-disable";
pub const ENABLE: &str = "import-sort-enable";

pub fn scan(source: &str) -> ScannedModule {
    let mut scanner = Scanner::new(source);
    let mut imports: Vec<ImportDeclaration> = Vec::new();
    let mut exports: Vec<ExportDeclaration> = Vec::new();
    let mut runs: Vec<Vec<usize>> = Vec::new();
    let mut content_since_import = true;
    let mut depth = 0usize;
    let mut last_boundary = 0;
    let mut previous: Option<u8> = None;

    loop {
        scanner.skip_trivia();
        let Some(byte) = scanner.peek() else {
            break;
        };

        if depth == 0 && previous != Some(b'.') && scanner.peek_ident() == Some("import") {
            let start = scanner.pos;
            if let Some(mut declaration) = scanner.parse_import() {
                declaration.leading_comments =
                    attached_comments(source, &scanner.comments, last_boundary, declaration.range.start);
                declaration.trailing_comment = trailing_comment(source, declaration.range.end);
                if content_since_import {
                    runs.push(Vec::new());
                }
                if let Some(run) = runs.last_mut() {
                    run.push(imports.len());
                }
                last_boundary = declaration.range.end;
                imports.push(declaration);
                content_since_import = false;
                previous = Some(b';');
                continue;
            }
            scanner.pos = start;
            if scanner.skip_malformed_import() {
                content_since_import = true;
                previous = Some(b';');
                last_boundary = scanner.pos;
                continue;
            }
        }

        if depth == 0 && previous != Some(b'.') && scanner.peek_ident() == Some("export") {
            let start = scanner.pos;
            if let Some(export) = scanner.parse_export() {
                exports.push(export);
                content_since_import = true;
                previous = Some(b';');
                last_boundary = scanner.pos;
                continue;
            }
            scanner.pos = start;
        }

        content_since_import = true;
        match byte {
            b'\'' | b'"' | b'`' => scanner.skip_string(byte),
            b'{' | b'(' | b'[' => {
                depth += 1;
                scanner.pos += 1;
            }
            b'}' | b')' | b']' => {
                depth = depth.saturating_sub(1);
                scanner.pos += 1;
            }
            _ => {
                if scanner.ident().is_none() {
                    scanner.advance_char();
                }
            }
        }
        previous = Some(byte);
        last_boundary = scanner.pos;
    }

    let disabled = disabled_ranges(source, &scanner.comments);
    debug!(
        "scanned {} import(s) in {} run(s), {} export(s), {} disabled range(s)",
        imports.len(),
        runs.len(),
        exports.len(),
        disabled.len()
    );
    ScannedModule {
        imports,
        exports,
        runs,
        comments: scanner.comments,
        disabled,
    }
}

/// Comments on consecutive lines directly above `node_start`, each on its own line
pub(crate) fn attached_comments(source: &str, comments: &[Comment], from: usize, node_start: usize) -> Vec<Comment> {
    let mut attached = Vec::new();
    let mut anchor = node_start;
    for comment in comments
        .iter()
        .rev()
        .filter(|c| c.range.start >= from && c.range.end <= node_start)
    {
        let between = &source[comment.range.end..anchor];
        if !between.trim().is_empty() || text::newline_count(between) > 1 {
            break;
        }
        let line_start = text::line_start(source, comment.range.start);
        if !source[line_start..comment.range.start].trim().is_empty() {
            break;
        }
        attached.push(comment.clone());
        anchor = comment.range.start;
    }
    attached.reverse();
    attached
}

/// A comment that opens and closes on the line where a declaration ends
fn trailing_comment(source: &str, end: usize) -> Option<Comment> {
    let rest = &source[end..];
    let line = &rest[..rest.find('\n').unwrap_or(rest.len())];
    let comment = text::scan_comments(line, end).into_iter().next()?;
    let before = &source[end..comment.range.start];
    let closed = comment.kind == CommentKind::Line || comment.range.slice(source).ends_with("*/");
    (before.trim().is_empty() && closed).then_some(comment)
}

/// Ranges silenced by `import-sort-disable*` comments
pub fn disabled_ranges(source: &str, comments: &[Comment]) -> Vec<TextRange> {
    let line_end = |offset: usize| source[offset..].find('\n').map_or(source.len(), |n| offset + n);
    let mut ranges = Vec::new();
    let mut open: Option<usize> = None;
    for comment in comments {
        let directive = comment.text.trim();
        if directive.starts_with(DISABLE_NEXT_LINE) {
            let end = line_end(comment.range.end);
            if end < source.len() {
                ranges.push(TextRange::new(end + 1, line_end(end + 1)));
            }
        } else if directive.starts_with(DISABLE_LINE) {
            ranges.push(TextRange::new(
                text::line_start(source, comment.range.start),
                line_end(comment.range.end),
            ));
        } else if is_directive(directive, DISABLE) {
            open.get_or_insert(comment.range.end);
        } else if is_directive(directive, ENABLE) {
            if let Some(start) = open.take() {
                ranges.push(TextRange::new(start, comment.range.start));
            }
        }
    }
    if let Some(start) = open {
        ranges.push(TextRange::new(start, source.len()));
    }
    ranges
}

fn is_directive(text: &str, name: &str) -> bool {
    text.strip_prefix(name)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
}

struct Scanner<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    comments: Vec<Comment>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            comments: Vec::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn advance_char(&mut self) {
        let width = self.source[self.pos..].chars().next().map_or(1, char::len_utf8);
        self.pos += width;
    }

    /// Skip whitespace and comments, recording each comment once
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'/') => {
                    let end = self.source[self.pos..]
                        .find('\n')
                        .map_or(self.source.len(), |n| self.pos + n);
                    let end = self.pos + self.source[self.pos..end].trim_end_matches('\r').len();
                    self.record_comment(TextRange::new(self.pos, end));
                    self.pos = end;
                }
                Some(b'/') if self.bytes.get(self.pos + 1) == Some(&b'*') => {
                    let end = self.source[self.pos + 2..]
                        .find("*/")
                        .map_or(self.source.len(), |n| self.pos + 2 + n + 2);
                    self.record_comment(TextRange::new(self.pos, end));
                    self.pos = end;
                }
                Some(b) if !b.is_ascii() => {
                    match self.source[self.pos..].chars().next() {
                        Some(c) if c.is_whitespace() => self.pos += c.len_utf8(),
                        _ => return,
                    }
                }
                _ => return,
            }
        }
    }

    fn record_comment(&mut self, range: TextRange) {
        if self.comments.last().is_some_and(|c| c.range.start >= range.start) {
            return;
        }
        if let Some(comment) = Comment::from_source(range, range.slice(self.source)) {
            self.comments.push(comment);
        } else {
            // unterminated block comment
            self.comments.push(Comment::new(
                range,
                CommentKind::Block,
                self.source.get(range.start + 2..range.end).unwrap_or(""),
            ));
        }
    }

    fn ident_len(&self) -> usize {
        let rest = &self.source[self.pos..];
        let mut len = 0;
        for (index, c) in rest.char_indices() {
            let valid = c == '_' || c == '$' || c.is_alphabetic() || (index > 0 && c.is_numeric());
            if !valid {
                break;
            }
            len = index + c.len_utf8();
        }
        len
    }

    fn peek_ident(&self) -> Option<&'a str> {
        let len = self.ident_len();
        (len > 0).then(|| &self.source[self.pos..self.pos + len])
    }

    fn ident(&mut self) -> Option<(TextRange, &'a str)> {
        let name = self.peek_ident()?;
        let range = TextRange::new(self.pos, self.pos + name.len());
        self.pos = range.end;
        Some((range, name))
    }

    fn keyword(&mut self, word: &str) -> bool {
        if self.peek_ident() == Some(word) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Quoted literal; returns its range and unescaped-enough value
    fn string(&mut self) -> Option<(TextRange, String)> {
        let quote = self.peek().filter(|b| *b == b'\'' || *b == b'"')?;
        let start = self.pos;
        let mut index = start + 1;
        while index < self.bytes.len() && self.bytes[index] != quote {
            match self.bytes[index] {
                b'\\' => index += 2,
                b'\n' => return None,
                _ => index += 1,
            }
        }
        if index >= self.bytes.len() {
            return None;
        }
        self.pos = index + 1;
        Some((
            TextRange::new(start, self.pos),
            self.source[start + 1..index].to_string(),
        ))
    }

    fn skip_string(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(byte) = self.peek() {
            self.pos += 1;
            match byte {
                b'\\' => self.pos += 1,
                b if b == quote => return,
                b'\n' if quote != b'`' => return,
                _ => {}
            }
        }
        self.pos = self.pos.min(self.bytes.len());
    }

    /// Parse a declaration at `import`; `None` leaves the position unspecified
    fn parse_import(&mut self) -> Option<ImportDeclaration> {
        let start = self.pos;
        if !self.keyword("import") {
            return None;
        }
        self.skip_trivia();

        let mut declaration = ImportDeclaration {
            range: TextRange::new(start, start),
            kind: ImportKind::Declaration,
            is_type: false,
            source: String::new(),
            source_range: None,
            bindings: Vec::new(),
            named_braces: None,
            attributes: Vec::new(),
            attribute_braces: None,
            has_semicolon: false,
            leading_comments: Vec::new(),
            trailing_comment: None,
        };

        if self.peek_ident() == Some("type") {
            let before = self.pos;
            self.pos += "type".len();
            self.skip_trivia();
            let clause_follows = matches!(self.peek(), Some(b'{') | Some(b'*'))
                || self.peek_ident().is_some_and(|next| next != "from");
            if clause_follows {
                declaration.is_type = true;
            } else {
                self.pos = before;
            }
        }

        let mut end = match self.peek()? {
            b'\'' | b'"' => {
                let (range, value) = self.string()?;
                declaration.kind = ImportKind::SideEffect;
                declaration.source = value;
                declaration.source_range = Some(range);
                range.end
            }
            _ => self.parse_clause(&mut declaration)?,
        };

        let after_source = self.pos;
        self.skip_trivia();
        if declaration.source_range.is_some() && (self.keyword("with") || self.keyword("assert")) {
            self.skip_trivia();
            let (attributes, braces) = self.parse_attributes()?;
            declaration.attributes = attributes;
            declaration.attribute_braces = Some(braces);
            end = braces.end;
        } else {
            self.pos = after_source;
        }

        self.pos = end;
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
        if self.eat(b';') {
            declaration.has_semicolon = true;
            end = self.pos;
        }
        self.pos = end;
        declaration.range = TextRange::new(start, end);
        Some(declaration)
    }

    /// Bindings, `from`, and the source; returns the end of the last token
    fn parse_clause(&mut self, declaration: &mut ImportDeclaration) -> Option<usize> {
        if let Some(b'*') = self.peek() {
            self.parse_namespace(declaration)?;
        } else if let Some(b'{') = self.peek() {
            self.parse_named(declaration)?;
        } else {
            let (range, name) = self.ident()?;
            self.skip_trivia();
            if self.eat(b'=') {
                return self.parse_equals(declaration, range, name);
            }
            declaration.bindings.push(Binding {
                range,
                kind: SpecifierKind::Default,
                imported: name.to_string(),
                local: name.to_string(),
                is_type: false,
            });
            if self.eat(b',') {
                self.skip_trivia();
                match self.peek()? {
                    b'*' => self.parse_namespace(declaration)?,
                    b'{' => self.parse_named(declaration)?,
                    _ => return None,
                }
            }
        }

        self.skip_trivia();
        if !self.keyword("from") {
            return None;
        }
        self.skip_trivia();
        let (range, value) = self.string()?;
        declaration.source = value;
        declaration.source_range = Some(range);
        Some(range.end)
    }

    fn parse_namespace(&mut self, declaration: &mut ImportDeclaration) -> Option<()> {
        let start = self.pos;
        self.eat(b'*').then_some(())?;
        self.skip_trivia();
        self.keyword("as").then_some(())?;
        self.skip_trivia();
        let (range, name) = self.ident()?;
        declaration.bindings.push(Binding {
            range: TextRange::new(start, range.end),
            kind: SpecifierKind::Namespace,
            imported: name.to_string(),
            local: name.to_string(),
            is_type: false,
        });
        self.skip_trivia();
        Some(())
    }

    fn parse_named(&mut self, declaration: &mut ImportDeclaration) -> Option<()> {
        let open = self.pos;
        self.eat(b'{').then_some(())?;
        loop {
            self.skip_trivia();
            if self.eat(b'}') {
                break;
            }
            let start = self.pos;
            let mut is_type = false;
            let (mut end, mut imported) = self.module_export_name()?;
            if imported == "type" {
                self.skip_trivia();
                let is_alias = self.peek_ident() == Some("as");
                if !is_alias && !matches!(self.peek(), Some(b',') | Some(b'}')) {
                    is_type = true;
                    let (next_end, next) = self.module_export_name()?;
                    end = next_end;
                    imported = next;
                }
            }
            let mut local = imported.clone();
            let after_name = self.pos;
            self.skip_trivia();
            if self.keyword("as") {
                self.skip_trivia();
                let (range, alias) = self.ident()?;
                end = range.end;
                local = alias.to_string();
            } else {
                self.pos = after_name;
            }
            declaration.bindings.push(Binding {
                range: TextRange::new(start, end),
                kind: SpecifierKind::Named,
                imported,
                local,
                is_type,
            });
            self.skip_trivia();
            if self.eat(b',') {
                continue;
            }
            self.eat(b'}').then_some(())?;
            break;
        }
        declaration.named_braces = Some(TextRange::new(open, self.pos));
        Some(())
    }

    fn module_export_name(&mut self) -> Option<(usize, String)> {
        if let Some((range, value)) = self.string() {
            return Some((range.end, value));
        }
        let (range, name) = self.ident()?;
        Some((range.end, name.to_string()))
    }

    fn parse_equals(&mut self, declaration: &mut ImportDeclaration, local_range: TextRange, local: &str) -> Option<usize> {
        declaration.bindings.push(Binding {
            range: local_range,
            kind: SpecifierKind::Default,
            imported: local.to_string(),
            local: local.to_string(),
            is_type: false,
        });
        self.skip_trivia();
        if self.peek_ident() == Some("require") {
            let before = self.pos;
            self.pos += "require".len();
            self.skip_trivia();
            if self.eat(b'(') {
                self.skip_trivia();
                let (range, value) = self.string()?;
                self.skip_trivia();
                self.eat(b')').then_some(())?;
                declaration.kind = ImportKind::TsEquals(ModuleReference::External(value.clone()));
                declaration.source = value;
                declaration.source_range = Some(range);
                return Some(self.pos);
            }
            self.pos = before;
        }

        let start = self.pos;
        let (mut end, _) = self.ident()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia();
            if !self.eat(b'.') {
                self.pos = checkpoint;
                break;
            }
            self.skip_trivia();
            end = self.ident()?.0;
        }
        let reference = TextRange::new(start, end.end).slice(self.source).to_string();
        declaration.kind = ImportKind::TsEquals(ModuleReference::Qualified(reference));
        Some(end.end)
    }

    /// `{ key: 'value', ... }`; returns the keys and the braces
    fn parse_attributes(&mut self) -> Option<(Vec<Attribute>, TextRange)> {
        let open = self.pos;
        let mut attributes = Vec::new();
        self.eat(b'{').then_some(())?;
        loop {
            self.skip_trivia();
            if self.eat(b'}') {
                break;
            }
            let start = self.pos;
            let key = match self.string() {
                Some((_, value)) => value,
                None => self.ident()?.1.to_string(),
            };
            self.skip_trivia();
            self.eat(b':').then_some(())?;
            self.skip_trivia();
            let (value, _) = self.string()?;
            attributes.push(Attribute {
                range: TextRange::new(start, value.end),
                key,
            });
            self.skip_trivia();
            if self.eat(b',') {
                continue;
            }
            self.eat(b'}').then_some(())?;
            break;
        }
        Some((attributes, TextRange::new(open, self.pos)))
    }

    /// Skip an unparsable `import` statement through the end of its line.
    /// Dynamic `import(...)` and `import.meta` are not statements and are left
    /// in place.
    fn skip_malformed_import(&mut self) -> bool {
        let start = self.pos;
        if !self.keyword("import") {
            return false;
        }
        self.skip_trivia();
        if matches!(self.peek(), None | Some(b'(') | Some(b'.')) {
            self.pos = start;
            return false;
        }
        self.pos = self.source[self.pos..]
            .find('\n')
            .map_or(self.source.len(), |n| self.pos + n);
        debug!("skipped malformed import at offset {}", start);
        true
    }

    /// Parse a re-export or export list at `export`; other export forms are `None`
    fn parse_export(&mut self) -> Option<ExportDeclaration> {
        let start = self.pos;
        if !self.keyword("export") {
            return None;
        }
        self.skip_trivia();

        let mut export = ExportDeclaration {
            range: TextRange::new(start, start),
            is_type: false,
            source: None,
            specifiers: Vec::new(),
            named_braces: None,
            attributes: Vec::new(),
            attribute_braces: None,
        };
        if self.keyword("type") {
            export.is_type = true;
            self.skip_trivia();
        }

        match self.peek()? {
            b'{' => self.parse_export_specifiers(&mut export)?,
            b'*' => {
                self.pos += 1;
                let checkpoint = self.pos;
                self.skip_trivia();
                if self.keyword("as") {
                    self.skip_trivia();
                    self.module_export_name()?;
                } else {
                    self.pos = checkpoint;
                }
            }
            _ => return None,
        }

        let mut end = self.pos;
        self.skip_trivia();
        if self.keyword("from") {
            self.skip_trivia();
            let (range, value) = self.string()?;
            export.source = Some(value);
            end = range.end;
            self.skip_trivia();
            if self.keyword("with") || self.keyword("assert") {
                self.skip_trivia();
                let (attributes, braces) = self.parse_attributes()?;
                export.attributes = attributes;
                export.attribute_braces = Some(braces);
                end = braces.end;
            }
        } else if export.named_braces.is_none() {
            // `export *` needs a source
            return None;
        }

        self.pos = end;
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
        if self.eat(b';') {
            end = self.pos;
        }
        self.pos = end;
        export.range = TextRange::new(start, end);
        Some(export)
    }

    fn parse_export_specifiers(&mut self, export: &mut ExportDeclaration) -> Option<()> {
        let open = self.pos;
        self.eat(b'{').then_some(())?;
        loop {
            self.skip_trivia();
            if self.eat(b'}') {
                break;
            }
            let start = self.pos;
            let mut is_type = false;
            let keyword_type = self.peek_ident() == Some("type");
            let (mut end, mut local) = self.module_export_name()?;
            if keyword_type {
                self.skip_trivia();
                let is_alias = self.peek_ident() == Some("as");
                if !is_alias && !matches!(self.peek(), Some(b',') | Some(b'}')) {
                    is_type = true;
                    let (next_end, next) = self.module_export_name()?;
                    end = next_end;
                    local = next;
                }
            }
            let mut exported = local.clone();
            let after_name = self.pos;
            self.skip_trivia();
            if self.keyword("as") {
                self.skip_trivia();
                let (alias_end, alias) = self.module_export_name()?;
                end = alias_end;
                exported = alias;
            } else {
                self.pos = after_name;
            }
            export.specifiers.push(ExportSpecifier {
                range: TextRange::new(start, end),
                local,
                exported,
                is_type,
            });
            self.skip_trivia();
            if self.eat(b',') {
                continue;
            }
            self.eat(b'}').then_some(())?;
            break;
        }
        export.named_braces = Some(TextRange::new(open, self.pos));
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_declaration_shapes() {
        let source = "import a, { b as c, type D } from './x';\nimport * as ns from 'ns'\nimport 'side.css';\n";
        let module = scan(source);
        assert_eq!(module.imports.len(), 3);
        assert_eq!(module.runs, vec![vec![0, 1, 2]]);

        let first = &module.imports[0];
        assert_eq!(first.source, "./x");
        assert!(first.has_semicolon);
        assert_eq!(first.range.slice(source), "import a, { b as c, type D } from './x';");
        let locals: Vec<&str> = first.bindings.iter().map(|b| b.local.as_str()).collect();
        assert_eq!(locals, vec!["a", "c", "D"]);
        assert!(first.bindings[2].is_type);
        assert_eq!(first.bindings[1].range.slice(source), "b as c");
        assert_eq!(first.named_braces.map(|r| r.slice(source)), Some("{ b as c, type D }"));

        let second = &module.imports[1];
        assert!(!second.has_semicolon);
        assert_eq!(second.bindings[0].kind, SpecifierKind::Namespace);
        assert_eq!(module.imports[2].kind, ImportKind::SideEffect);
    }

    #[test]
    fn test_scan_type_import_and_default_named_type() {
        let module = scan("import type { A } from 'a'\nimport type from 'b'\n");
        assert!(module.imports[0].is_type);
        assert!(!module.imports[1].is_type);
        assert_eq!(module.imports[1].bindings[0].local, "type");
    }

    #[test]
    fn test_scan_ts_equals() {
        let module = scan("import fs = require('fs');\nimport B = A.B.C;\n");
        assert_eq!(
            module.imports[0].kind,
            ImportKind::TsEquals(ModuleReference::External("fs".to_string()))
        );
        assert_eq!(
            module.imports[1].kind,
            ImportKind::TsEquals(ModuleReference::Qualified("A.B.C".to_string()))
        );
        assert_eq!(module.imports[1].local_names(), vec!["B".to_string()]);
    }

    #[test]
    fn test_scan_attributes() {
        let source = "import data from './d.json' with { type: 'json', 'x-y': 'z' };\n";
        let module = scan(source);
        let keys: Vec<&str> = module.imports[0].attributes.iter().map(|a| a.key.as_str()).collect();
        assert_eq!(keys, vec!["type", "x-y"]);
        assert!(module.imports[0].has_semicolon);
        assert_eq!(module.imports[0].range.slice(source).len(), source.len() - 1);
    }

    #[test]
    fn test_content_splits_runs() {
        let source = "import a from 'a'\nconst x = import('y');\nimport b from 'b'\nfoo(() => { import.meta })\n";
        let module = scan(source);
        assert_eq!(module.imports.len(), 2);
        assert_eq!(module.runs, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_strings_and_nested_blocks_are_skipped() {
        let source = "const s = \"import x from 'y'\";\nfunction f() {\n  import('z')\n}\nimport a from 'a'\n";
        let module = scan(source);
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].source, "a");
    }

    #[test]
    fn test_attached_and_trailing_comments() {
        let source = "import a from 'a' // keep a\n\n// detached\n\n// about b\n/* more */\nimport b from 'b'\n";
        let module = scan(source);
        let a = &module.imports[0];
        let b = &module.imports[1];
        assert_eq!(a.trailing_comment.as_ref().map(|c| c.text.as_str()), Some(" keep a"));
        let texts: Vec<&str> = b.leading_comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec![" about b", " more "]);
        assert_eq!(b.full_range().slice(source), "// about b\n/* more */\nimport b from 'b'");
    }

    #[test]
    fn test_disable_directives() {
        let source = "// import-sort-disable-next-line\nimport b from 'b'\nimport a from 'a' // import-sort-disable-line\n/* import-sort-disable */\nimport c from 'c'\n/* import-sort-enable */\n";
        let module = scan(source);
        assert_eq!(module.disabled.len(), 3);
        for import in &module.imports {
            assert!(
                module.disabled.iter().any(|r| r.intersects(&import.range)),
                "{} should be disabled",
                import.source
            );
        }
    }

    #[test]
    fn test_scan_exports() {
        let source = "export { b as c, type D, 'x-y' } from './x' with { type: 'json' };\nexport * as ns from 'ns'\nexport { local }\nexport const z = 1\nexport type T = { a: string }\n";
        let module = scan(source);
        assert_eq!(module.exports.len(), 3);

        let first = &module.exports[0];
        assert_eq!(first.source.as_deref(), Some("./x"));
        assert_eq!(first.range.slice(source), "export { b as c, type D, 'x-y' } from './x' with { type: 'json' };");
        let names: Vec<(&str, &str)> = first
            .specifiers
            .iter()
            .map(|s| (s.local.as_str(), s.exported.as_str()))
            .collect();
        assert_eq!(names, vec![("b", "c"), ("D", "D"), ("x-y", "x-y")]);
        assert!(first.specifiers[1].is_type);
        assert_eq!(first.specifiers[0].range.slice(source), "b as c");
        assert_eq!(first.attributes.len(), 1);

        assert!(module.exports[1].specifiers.is_empty());
        assert_eq!(module.exports[1].source.as_deref(), Some("ns"));
        assert_eq!(module.exports[2].source, None);
        assert_eq!(module.exports[2].specifiers[0].exported, "local");
    }

    #[test]
    fn test_exports_split_import_runs() {
        let module = scan("import a from 'a'\nexport { a }\nimport b from 'b'\n");
        assert_eq!(module.runs, vec![vec![0], vec![1]]);
        assert_eq!(module.exports.len(), 1);
    }

    #[test]
    fn test_type_export_list() {
        let module = scan("export type { A, B } from './types'\n");
        assert!(module.exports[0].is_type);
        assert_eq!(module.exports[0].specifiers.len(), 2);
    }

    #[test]
    fn test_malformed_import_at_end_of_file() {
        let module = scan("import a from 'a'\nimport { b from\n");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.runs, vec![vec![0]]);
    }

    #[test]
    fn test_malformed_import_is_content() {
        let module = scan("import { a from 'a'\nimport b from 'b'\n");
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].source, "b");
    }
}
