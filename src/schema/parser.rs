//! Type annotation parser
//!
//! Turns a textual type annotation into a [`TypeDescriptor`]. Parsing is
//! best effort and never fails: anything unrecognized becomes `Any`, so a
//! declaration can only ever cause a conformance failure, not a parse error.
//!
//! Recognized forms, in order:
//! - top-level `|` alternatives, with `null` turning the rest nullable
//! - `?T` and `(T)`
//! - `T[]`
//! - `iterable`, `iterable<T>`, `iterable<K, V>`, `list<T>`
//! - `array`, `array<V>`, `array<K, V>`
//! - scalar keywords, `mixed`, `self`/`static`
//! - class-like names, resolved lazily against the registry

use super::types::{
    namespace_of, FieldDecl, FieldSpec, ScalarKind, SchemaRef, SequenceSyntax, TypeDeclaration,
    TypeDescriptor,
};

/// Keywords that are never schema names and carry no checkable meaning here.
const OPAQUE_KEYWORDS: &[&str] = &[
    "mixed", "object", "callable", "resource", "void", "never", "true", "false",
];

/// Where an annotation was declared; used for `self` and relative names.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    schema: &'a str,
}

impl<'a> ParseContext<'a> {
    /// Context for annotations declared on the schema named `schema`.
    pub fn new(schema: &'a str) -> Self {
        Self { schema }
    }

    fn namespace(&self) -> Option<&'a str> {
        namespace_of(self.schema)
    }
}

/// Parses a full annotation, alternatives included.
pub fn parse_type(annotation: &str, ctx: &ParseContext<'_>) -> TypeDescriptor {
    let annotation = annotation.trim();
    if annotation.is_empty() {
        return TypeDescriptor::Any;
    }

    let mut saw_null = false;
    let mut alternatives = Vec::new();
    for part in split_top_level(annotation, '|') {
        let part = part.trim();
        if part.eq_ignore_ascii_case("null") {
            saw_null = true;
        } else if !part.is_empty() {
            alternatives.push(parse_single(part, ctx));
        }
    }

    if !saw_null {
        return TypeDescriptor::union(alternatives);
    }
    if alternatives.is_empty() {
        // `null` alone: only null is accepted
        return TypeDescriptor::Nullable(Box::new(TypeDescriptor::Union(Vec::new())));
    }
    TypeDescriptor::nullable(TypeDescriptor::union(alternatives))
}

/// Parses one alternative.
fn parse_single(text: &str, ctx: &ParseContext<'_>) -> TypeDescriptor {
    if let Some(rest) = text.strip_prefix('?') {
        return TypeDescriptor::nullable(parse_single(rest.trim(), ctx));
    }

    if let Some(inner) = strip_group(text) {
        return parse_type(inner, ctx);
    }

    if let Some(element) = text.strip_suffix("[]") {
        return TypeDescriptor::ListOf {
            element: Box::new(parse_type(element, ctx)),
            syntax: SequenceSyntax::Brackets,
        };
    }

    if let Some((head, args)) = split_generic(text) {
        return parse_generic(head, &args, ctx);
    }

    let lower = text.to_ascii_lowercase();
    if let Some(kind) = ScalarKind::from_keyword(&lower) {
        return TypeDescriptor::Scalar(kind);
    }
    match lower.as_str() {
        "iterable" => TypeDescriptor::iterable_of(TypeDescriptor::Any),
        "array" => TypeDescriptor::map_of(TypeDescriptor::Any, TypeDescriptor::Any),
        "self" | "static" => TypeDescriptor::ClassType(SchemaRef::absolute(ctx.schema)),
        kw if OPAQUE_KEYWORDS.contains(&kw) => TypeDescriptor::Any,
        _ if is_class_name(text) => {
            TypeDescriptor::ClassType(SchemaRef::relative(text, ctx.namespace()))
        }
        _ => TypeDescriptor::Any,
    }
}

fn parse_generic(head: &str, args: &[&str], ctx: &ParseContext<'_>) -> TypeDescriptor {
    let parsed: Vec<TypeDescriptor> = args.iter().map(|a| parse_type(a, ctx)).collect();
    match (head.to_ascii_lowercase().as_str(), parsed.as_slice()) {
        ("iterable" | "list", [element]) => TypeDescriptor::iterable_of(element.clone()),
        ("iterable" | "array", [key, value]) => TypeDescriptor::map_of(key.clone(), value.clone()),
        ("array", [value]) => TypeDescriptor::map_of(TypeDescriptor::Any, value.clone()),
        // Unknown generic containers carry no checkable meaning
        _ => TypeDescriptor::Any,
    }
}

/// Splits on `separator` where it is not nested inside `<>`, `[]` or `()`.
fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth -= 1,
            c if c == separator && depth == 0 => {
                parts.push(&text[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Returns the inside of `(...)` when the parentheses wrap the whole text.
fn strip_group(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    let mut depth = 0i32;
    for c in inner.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    // `(A)|(B)` style: the outer parens do not pair up
                    return None;
                }
            }
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Splits `head<a, b>` into its head and top-level arguments.
fn split_generic(text: &str) -> Option<(&str, Vec<&str>)> {
    let open = text.find('<')?;
    let inner = text[open + 1..].strip_suffix('>')?;
    let head = text[..open].trim();
    if head.is_empty() {
        return None;
    }
    let args = split_top_level(inner, ',')
        .into_iter()
        .map(str::trim)
        .collect();
    Some((head, args))
}

/// `Name`, `Ns\Name` or `\Ns\Name` with identifier segments.
fn is_class_name(text: &str) -> bool {
    let body = text.strip_prefix('\\').unwrap_or(text);
    !body.is_empty()
        && body.split('\\').all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Compiles a field declaration of `schema` into its descriptor and rendering.
pub fn compile_field(decl: &FieldDecl, schema: &str) -> FieldSpec {
    let ctx = ParseContext::new(schema);
    let (descriptor, rendered) = match &decl.declaration {
        TypeDeclaration::Untyped => (TypeDescriptor::Any, TypeDescriptor::Any.to_string()),
        TypeDeclaration::Native { name, nullable } => {
            let parsed = parse_type(name, &ctx);
            let descriptor = if *nullable {
                TypeDescriptor::nullable(parsed)
            } else {
                parsed
            };
            let rendered = descriptor.to_string();
            (descriptor, rendered)
        }
        TypeDeclaration::Annotation(text) => (parse_type(text, &ctx), text.trim().to_string()),
        TypeDeclaration::Descriptor(descriptor) => (descriptor.clone(), descriptor.to_string()),
    };

    FieldSpec {
        name: decl.name.clone(),
        source_key: decl.source_key().to_string(),
        descriptor,
        rendered,
        default: decl.default.clone(),
    }
}
