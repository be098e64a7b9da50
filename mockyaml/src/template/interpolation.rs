//! The lightweight `${ expr }` interpolation engine (`expr`).
//!
//! The source is split once, at compile time, into literal segments and
//! compiled expressions. An expression is delimited by `${ … }` with brace
//! balancing that ignores braces occurring inside single- or
//! double-quoted string literals, so expressions may contain nested calls
//! and string arguments containing `{`/`}`. `$${` escapes to a literal
//! `${` in the output.

use crate::error::{MockError, Result};
use crate::runtime::RenderContext;
use crate::template::functions;
use crate::template::value::Value;
use crate::template::Renderer;

#[derive(Debug, Clone)]
enum Segment {
    Literal(Vec<u8>),
    Expr(Ast),
}

#[derive(Debug, Clone)]
enum Ast {
    Call(String, Vec<Ast>),
    Str(String),
    Int(i64),
}

/// A compiled `expr`-engine renderer.
#[derive(Debug, Clone)]
pub struct InterpolationRenderer {
    segments: Vec<Segment>,
}

impl InterpolationRenderer {
    /// Compiles the source into literal/expression segments. A source with
    /// zero expressions compiles to a static renderer.
    pub fn compile(source: &str) -> Result<InterpolationRenderer> {
        let segments = split_segments(source)?;
        Ok(InterpolationRenderer { segments })
    }
}

impl Renderer for InterpolationRenderer {
    fn render(&self, ctx: &RenderContext) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for seg in &self.segments {
            match seg {
                Segment::Literal(bytes) => out.extend_from_slice(bytes),
                Segment::Expr(ast) => {
                    let value = eval_ast(ctx, ast)?;
                    out.extend_from_slice(value.into_string().as_bytes());
                }
            }
        }
        Ok(out)
    }
}

fn split_segments(source: &str) -> Result<Vec<Segment>> {
    let chars: Vec<char> = source.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '$' && chars.get(i + 1) == Some(&'$') && chars.get(i + 2) == Some(&'{') {
            literal.push('$');
            literal.push('{');
            i += 3;
            continue;
        }
        if chars[i] == '$' && chars.get(i + 1) == Some(&'{') {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal).into_bytes()));
            }
            let (expr_src, next) = extract_balanced(&chars, i + 2)?;
            segments.push(Segment::Expr(compile_expr(&expr_src)?));
            i = next;
            continue;
        }
        literal.push(chars[i]);
        i += 1;
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal.into_bytes()));
    }
    Ok(segments)
}

/// Scans from `start` (just past `${`) to the matching `}`, treating
/// braces inside quoted strings as ordinary characters. Returns the
/// expression source and the index just past the closing `}`.
fn extract_balanced(chars: &[char], start: usize) -> Result<(String, usize)> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut i = start;
    let mut buf = String::new();
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            buf.push(c);
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                buf.push(c);
            }
            '{' => {
                depth += 1;
                buf.push(c);
            }
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((buf, i + 1));
                }
                buf.push(c);
            }
            _ => buf.push(c),
        }
        i += 1;
    }
    Err(MockError::Render("unclosed '${' expression".into()))
}

fn compile_expr(src: &str) -> Result<Ast> {
    let src = src.trim();
    if src.is_empty() {
        return Err(MockError::Render("empty expression".into()));
    }
    if let Some(rest) = src.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(Ast::Str(rest.to_string()));
    }
    if let Some(rest) = src.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Ok(Ast::Str(rest.to_string()));
    }
    if let Ok(n) = src.parse::<i64>() {
        return Ok(Ast::Int(n));
    }
    let open = src
        .find('(')
        .ok_or_else(|| MockError::Render(format!("invalid expression '{src}'")))?;
    if !src.ends_with(')') {
        return Err(MockError::Render(format!("invalid expression '{src}'")));
    }
    let name = src[..open].trim().to_string();
    let args_src = &src[open + 1..src.len() - 1];
    let args = split_args(args_src)?
        .into_iter()
        .map(|a| compile_expr(&a))
        .collect::<Result<Vec<_>>>()?;
    Ok(Ast::Call(name, args))
}

/// Splits a function argument list on top-level commas, respecting nested
/// parens and quoted strings.
fn split_args(src: &str) -> Result<Vec<String>> {
    let src = src.trim();
    if src.is_empty() {
        return Ok(Vec::new());
    }
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut cur = String::new();
    for c in src.chars() {
        if let Some(q) = quote {
            cur.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                cur.push(c);
            }
            '(' => {
                depth += 1;
                cur.push(c);
            }
            ')' => {
                depth -= 1;
                cur.push(c);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut cur).trim().to_string());
            }
            _ => cur.push(c),
        }
    }
    if !cur.trim().is_empty() {
        parts.push(cur.trim().to_string());
    }
    Ok(parts)
}

fn eval_ast(ctx: &RenderContext, ast: &Ast) -> Result<Value> {
    match ast {
        Ast::Str(s) => Ok(Value::Str(s.clone())),
        Ast::Int(i) => Ok(Value::Int(*i)),
        Ast::Call(name, args) => eval_call(ctx, name, args),
    }
}

fn eval_call(ctx: &RenderContext, name: &str, args: &[Ast]) -> Result<Value> {
    let arg_str = |i: usize| -> Result<String> {
        let a = args
            .get(i)
            .ok_or_else(|| MockError::Render(format!("{name}: missing argument {i}")))?;
        Ok(eval_ast(ctx, a)?.into_string())
    };
    let arg_int = |i: usize| -> Result<i64> {
        let a = args
            .get(i)
            .ok_or_else(|| MockError::Render(format!("{name}: missing argument {i}")))?;
        eval_ast(ctx, a)?.into_int()
    };
    match name {
        "pathParam" => Ok(Value::Str(functions::path_param(ctx, &arg_str(0)?))),
        "queryParam" => Ok(Value::Str(functions::query_param(ctx, &arg_str(0)?))),
        "header" => Ok(Value::Str(functions::header(ctx, &arg_str(0)?))),
        "body" => Ok(Value::Str(functions::body(ctx))),
        "now" => Ok(Value::Str(functions::now(ctx))),
        "nowFormat" => Ok(Value::Str(functions::now_format(ctx, &arg_str(0)?))),
        "uuid" => Ok(Value::Str(functions::uuid())),
        "randomInt" => Ok(Value::Int(functions::random_int(arg_int(0)?, arg_int(1)?))),
        "seq" => Ok(Value::Array(functions::seq(arg_int(0)?, arg_int(1)?))),
        "toJSON" => {
            let a = args
                .first()
                .ok_or_else(|| MockError::Render("toJSON: missing argument".into()))?;
            let v = eval_ast(ctx, a)?;
            Ok(Value::Str(v.to_json().to_string()))
        }
        "jsonPath" => Ok(Value::Str(functions::json_path(ctx, &arg_str(0)?))),
        other => Err(MockError::Render(format!("unknown function '{other}'"))),
    }
}
