//! Dynamic directive parsing.
//!
//! Three directives may appear anywhere a string literal is allowed:
//!
//! - `$const(name)` — substitute a named constant, recursively.
//! - `$addr(ref)` — resolve an address reference to a table index.
//! - `$pubset(signer)` — splice in a signer's serialized public-key-set.
//!
//! A directive is only a directive when it spans the *entire* string —
//! `"fee is $const(fee)"` is plain text. Nested directives inside the
//! argument are not supported; nesting is expressed through the
//! resolver's multi-pass substitution instead.

/// A recognized directive with its inner argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    Const(&'a str),
    Addr(&'a str),
    Pubset(&'a str),
}

/// Parses a full-string directive, or `None` for ordinary text.
pub fn parse_directive(text: &str) -> Option<Directive<'_>> {
    if let Some(name) = strip_call(text, "$const") {
        return Some(Directive::Const(name));
    }
    if let Some(reference) = strip_call(text, "$addr") {
        return Some(Directive::Addr(reference));
    }
    if let Some(signer) = strip_call(text, "$pubset") {
        return Some(Directive::Pubset(signer));
    }
    None
}

/// Matches `head(argument)` over the whole string with a non-empty argument.
fn strip_call<'a>(text: &'a str, head: &str) -> Option<&'a str> {
    let inner = text.strip_prefix(head)?.strip_prefix('(')?.strip_suffix(')')?;
    if inner.is_empty() {
        return None;
    }
    Some(inner)
}
