use miette::SourceSpan;

/// A value position in a template: the right-hand side of a field or an
/// element of an array.
#[derive(Debug, PartialEq, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub pos_start: usize,
    pub pos_end: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub enum ExprKind {
    /// A dotted path into the caller's data, e.g. `user.address.city`.
    Identifier(String),
    Literal(Literal),
    Array(Vec<Expr>),
    /// An object literal.
    Block(Vec<FieldDeclaration>),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

/// The name half of a field. A quoted name is used as written; an
/// identifier is looked up and must resolve to a string.
#[derive(Debug, PartialEq, Clone)]
pub enum FieldName {
    String(String),
    Identifier(String),
}

/// A `name: value` pair. The positions cover the name.
#[derive(Debug, PartialEq, Clone)]
pub struct FieldDeclaration {
    pub name: FieldName,
    pub value: Expr,
    pub pos_start: usize,
    pub pos_end: usize,
}

impl Expr {
    pub fn get_source_span(&self) -> SourceSpan {
        (self.pos_start, self.pos_end - self.pos_start).into()
    }
}

impl FieldDeclaration {
    pub fn name_span(&self) -> SourceSpan {
        (self.pos_start, self.pos_end - self.pos_start).into()
    }
}

/// Whether `path` is names joined by single dots, with no empty segment.
pub fn is_valid_path(path: &str) -> bool {
    path.split('.').all(|segment| !segment.is_empty())
}
