//! The full block-template engine (`jinja2`).
//!
//! Supports `{{ var }}` substitution, `{% if %} / {% else %} / {% endif %}`,
//! `{% for x in seq %} … {% endfor %}` and nested blocks. Exposes the same
//! function table as the interpolation engine, plus top-level variables
//! `method`, `path`, `headers`, `queryParams`, `pathParams`, `body`, `now`.
//!
//! Unlike the interpolation engine, this engine does not HTML-escape
//! output — callers rendering JSON should prefer `jsonPath()` over raw
//! `{{ body }}` substitution to avoid emitting unescaped quotes.

use indexmap::IndexMap;

use crate::error::{MockError, Result};
use crate::runtime::RenderContext;
use crate::template::functions;
use crate::template::value::Value;
use crate::template::Renderer;

#[derive(Debug, Clone)]
enum Node {
    Text(String),
    Expr(Expr),
    If(Expr, Vec<Node>, Vec<Node>),
    For(String, Expr, Vec<Node>),
}

#[derive(Debug, Clone)]
enum Expr {
    Ident(String),
    Str(String),
    Int(i64),
    Call(String, Vec<Expr>),
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
}

/// A compiled `jinja2`-engine renderer.
#[derive(Debug, Clone)]
pub struct BlockRenderer {
    nodes: Vec<Node>,
}

impl BlockRenderer {
    /// Parses the source into a node tree.
    pub fn compile(source: &str) -> Result<BlockRenderer> {
        let tokens = tokenize(source);
        let mut pos = 0;
        let nodes = parse_nodes(&tokens, &mut pos, &[])?;
        if pos != tokens.len() {
            return Err(MockError::Render(
                "unexpected block terminator without matching opener".into(),
            ));
        }
        Ok(BlockRenderer { nodes })
    }
}

impl Renderer for BlockRenderer {
    fn render(&self, ctx: &RenderContext) -> Result<Vec<u8>> {
        let mut scope = Scope::default();
        let mut out = String::new();
        render_nodes(&self.nodes, ctx, &mut scope, &mut out)?;
        Ok(out.into_bytes())
    }
}

#[derive(Default)]
struct Scope {
    vars: IndexMap<String, Value>,
}

fn render_nodes(nodes: &[Node], ctx: &RenderContext, scope: &mut Scope, out: &mut String) -> Result<()> {
    for node in nodes {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Expr(e) => out.push_str(&eval(e, ctx, scope)?.into_string()),
            Node::If(cond, then_branch, else_branch) => {
                if eval(cond, ctx, scope)?.truthy() {
                    render_nodes(then_branch, ctx, scope, out)?;
                } else {
                    render_nodes(else_branch, ctx, scope, out)?;
                }
            }
            Node::For(var, seq_expr, body) => {
                let seq = eval(seq_expr, ctx, scope)?;
                let items = match seq {
                    Value::Array(a) => a,
                    other => {
                        return Err(MockError::Render(format!(
                            "for-loop expression did not evaluate to a sequence: {other:?}"
                        )))
                    }
                };
                for item in items {
                    scope.vars.insert(var.clone(), Value::Int(item));
                    render_nodes(body, ctx, scope, out)?;
                }
                scope.vars.shift_remove(var);
            }
        }
    }
    Ok(())
}

fn eval(expr: &Expr, ctx: &RenderContext, scope: &Scope) -> Result<Value> {
    match expr {
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Int(i) => Ok(Value::Int(*i)),
        Expr::Ident(name) => resolve_ident(name, ctx, scope),
        Expr::Eq(a, b) => Ok(Value::Bool(eval(a, ctx, scope)? == eval(b, ctx, scope)?)),
        Expr::Ne(a, b) => Ok(Value::Bool(eval(a, ctx, scope)? != eval(b, ctx, scope)?)),
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, ctx, scope))
                .collect::<Result<Vec<_>>>()?;
            call(name, &values, ctx)
        }
    }
}

fn resolve_ident(name: &str, ctx: &RenderContext, scope: &Scope) -> Result<Value> {
    if let Some(v) = scope.vars.get(name) {
        return Ok(v.clone());
    }
    Ok(match name {
        "method" => Value::Str(ctx.method.clone()),
        "path" => Value::Str(ctx.path.clone()),
        "headers" => Value::Str(map_to_json(&ctx.headers)),
        "queryParams" => Value::Str(map_to_json(&ctx.query_params)),
        "pathParams" => Value::Str(map_to_json(&ctx.path_params)),
        "body" => Value::Str(ctx.body.clone()),
        "now" => Value::Str(ctx.now.clone()),
        _ => return Err(MockError::Render(format!("unknown variable '{name}'"))),
    })
}

fn map_to_json(map: &IndexMap<String, String>) -> String {
    serde_json::to_string(map).unwrap_or_default()
}

fn call(name: &str, args: &[Value], ctx: &RenderContext) -> Result<Value> {
    let s = |i: usize| -> Result<String> {
        args.get(i)
            .cloned()
            .map(Value::into_string)
            .ok_or_else(|| MockError::Render(format!("{name}: missing argument {i}")))
    };
    let n = |i: usize| -> Result<i64> {
        args.get(i)
            .cloned()
            .ok_or_else(|| MockError::Render(format!("{name}: missing argument {i}")))?
            .into_int()
    };
    match name {
        "pathParam" => Ok(Value::Str(functions::path_param(ctx, &s(0)?))),
        "queryParam" => Ok(Value::Str(functions::query_param(ctx, &s(0)?))),
        "header" => Ok(Value::Str(functions::header(ctx, &s(0)?))),
        "body" => Ok(Value::Str(functions::body(ctx))),
        "now" => Ok(Value::Str(functions::now(ctx))),
        "nowFormat" => Ok(Value::Str(functions::now_format(ctx, &s(0)?))),
        "uuid" => Ok(Value::Str(functions::uuid())),
        "randomInt" => Ok(Value::Int(functions::random_int(n(0)?, n(1)?))),
        "seq" => Ok(Value::Array(functions::seq(n(0)?, n(1)?))),
        "toJSON" => {
            let v = args
                .first()
                .ok_or_else(|| MockError::Render("toJSON: missing argument".into()))?;
            Ok(Value::Str(v.to_json().to_string()))
        }
        "jsonPath" => Ok(Value::Str(functions::json_path(ctx, &s(0)?))),
        other => Err(MockError::Render(format!("unknown function '{other}'"))),
    }
}

// --- Tokenizer ---

#[derive(Debug, Clone)]
enum Token {
    Text(String),
    Expr(String),
    Tag(String),
}

fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = source;
    loop {
        let next_expr = rest.find("{{");
        let next_tag = rest.find("{%");
        let next = match (next_expr, next_tag) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        match next {
            None => {
                if !rest.is_empty() {
                    tokens.push(Token::Text(rest.to_string()));
                }
                break;
            }
            Some(idx) => {
                if idx > 0 {
                    tokens.push(Token::Text(rest[..idx].to_string()));
                }
                let is_expr = rest[idx..].starts_with("{{");
                let (close, skip) = if is_expr { ("}}", 2) } else { ("%}", 2) };
                let search_start = idx + skip;
                match rest[search_start..].find(close) {
                    Some(end_rel) => {
                        let end = search_start + end_rel;
                        let inner = rest[search_start..end].trim().to_string();
                        tokens.push(if is_expr {
                            Token::Expr(inner)
                        } else {
                            Token::Tag(inner)
                        });
                        rest = &rest[end + skip..];
                    }
                    None => {
                        tokens.push(Token::Text(rest[idx..].to_string()));
                        break;
                    }
                }
            }
        }
    }
    tokens
}

fn parse_nodes(tokens: &[Token], pos: &mut usize, stop: &[&str]) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    while *pos < tokens.len() {
        match &tokens[*pos] {
            Token::Text(s) => {
                nodes.push(Node::Text(s.clone()));
                *pos += 1;
            }
            Token::Expr(src) => {
                nodes.push(Node::Expr(parse_expr(src)?));
                *pos += 1;
            }
            Token::Tag(tag) => {
                let word = tag.split_whitespace().next().unwrap_or("");
                if stop.contains(&word) {
                    return Ok(nodes);
                }
                match word {
                    "if" => {
                        let cond_src = tag.trim_start_matches("if").trim();
                        let cond = parse_expr(cond_src)?;
                        *pos += 1;
                        let then_branch = parse_nodes(tokens, pos, &["else", "endif"])?;
                        let else_branch = if matches!(tokens.get(*pos), Some(Token::Tag(t)) if t == "else")
                        {
                            *pos += 1;
                            parse_nodes(tokens, pos, &["endif"])?
                        } else {
                            Vec::new()
                        };
                        expect_tag(tokens, pos, "endif")?;
                        nodes.push(Node::If(cond, then_branch, else_branch));
                    }
                    "for" => {
                        let rest = tag.trim_start_matches("for").trim();
                        let (var, seq_src) = rest
                            .split_once(" in ")
                            .ok_or_else(|| MockError::Render(format!("malformed for-tag '{tag}'")))?;
                        let var = var.trim().to_string();
                        let seq = parse_expr(seq_src.trim())?;
                        *pos += 1;
                        let body = parse_nodes(tokens, pos, &["endfor"])?;
                        expect_tag(tokens, pos, "endfor")?;
                        nodes.push(Node::For(var, seq, body));
                    }
                    other => return Err(MockError::Render(format!("unknown block tag '{other}'"))),
                }
            }
        }
    }
    Ok(nodes)
}

fn expect_tag(tokens: &[Token], pos: &mut usize, word: &str) -> Result<()> {
    match tokens.get(*pos) {
        Some(Token::Tag(t)) if t == word => {
            *pos += 1;
            Ok(())
        }
        _ => Err(MockError::Render(format!("expected '{{% {word} %}}'"))),
    }
}

fn parse_expr(src: &str) -> Result<Expr> {
    let src = src.trim();
    if let Some((lhs, rhs)) = split_operator(src, "==") {
        return Ok(Expr::Eq(
            Box::new(parse_atom(lhs.trim())?),
            Box::new(parse_atom(rhs.trim())?),
        ));
    }
    if let Some((lhs, rhs)) = split_operator(src, "!=") {
        return Ok(Expr::Ne(
            Box::new(parse_atom(lhs.trim())?),
            Box::new(parse_atom(rhs.trim())?),
        ));
    }
    parse_atom(src)
}

fn split_operator<'a>(src: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < src.len() {
        let c = src[i..].chars().next().unwrap();
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            i += c.len_utf8();
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && src[i..].starts_with(op) => {
                return Some((&src[..i], &src[i + op.len()..]));
            }
            _ => {}
        }
        i += c.len_utf8();
    }
    None
}

fn parse_atom(src: &str) -> Result<Expr> {
    let src = src.trim();
    if src.is_empty() {
        return Err(MockError::Render("empty expression".into()));
    }
    if let Some(rest) = src.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        return Ok(Expr::Str(rest.to_string()));
    }
    if let Some(rest) = src.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Ok(Expr::Str(rest.to_string()));
    }
    if let Ok(n) = src.parse::<i64>() {
        return Ok(Expr::Int(n));
    }
    if let Some(open) = src.find('(') {
        if src.ends_with(')') {
            let name = src[..open].trim().to_string();
            let args_src = &src[open + 1..src.len() - 1];
            let args = split_args(args_src)?
                .into_iter()
                .map(|a| parse_atom(&a))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Expr::Call(name, args));
        }
    }
    Ok(Expr::Ident(src.to_string()))
}

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
            ',' if depth == 0 => parts.push(std::mem::take(&mut cur).trim().to_string()),
            _ => cur.push(c),
        }
    }
    if !cur.trim().is_empty() {
        parts.push(cur.trim().to_string());
    }
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext {
        RenderContext {
            method: "GET".to_string(),
            path: "/x".to_string(),
            headers: IndexMap::new(),
            query_params: IndexMap::new(),
            path_params: IndexMap::new(),
            body: r#"{"method":"credit_card"}"#.to_string(),
            now: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn plain_text_roundtrip() {
        let r = BlockRenderer::compile("hello world").unwrap();
        assert_eq!(r.render(&ctx()).unwrap(), b"hello world");
    }

    #[test]
    fn var_substitution() {
        let r = BlockRenderer::compile("method={{ method }}").unwrap();
        assert_eq!(
            String::from_utf8(r.render(&ctx()).unwrap()).unwrap(),
            "method=GET"
        );
    }

    #[test]
    fn if_else() {
        let src = r#"{% if jsonPath("$.method") == "credit_card" %}yes{% else %}no{% endif %}"#;
        let r = BlockRenderer::compile(src).unwrap();
        assert_eq!(
            String::from_utf8(r.render(&ctx()).unwrap()).unwrap(),
            "yes"
        );
    }

    #[test]
    fn for_loop_over_seq() {
        let src = "{% for n in seq(1,3) %}[{{ n }}]{% endfor %}";
        let r = BlockRenderer::compile(src).unwrap();
        assert_eq!(
            String::from_utf8(r.render(&ctx()).unwrap()).unwrap(),
            "[1][2][3]"
        );
    }

    #[test]
    fn nested_if_inside_for() {
        let src = "{% for n in seq(1,4) %}{% if n == 2 %}X{% else %}.{% endif %}{% endfor %}";
        let r = BlockRenderer::compile(src).unwrap();
        assert_eq!(String::from_utf8(r.render(&ctx()).unwrap()).unwrap(), ".X..");
    }

    #[test]
    fn unclosed_if_is_compile_error() {
        assert!(BlockRenderer::compile("{% if method == \"GET\" %}x").is_err());
    }

    #[test]
    fn request_maps_render_as_json() {
        let mut c = ctx();
        c.headers.insert("X-Trace-Id".to_string(), "t-1".to_string());
        c.query_params.insert("q".to_string(), "rust".to_string());
        c.path_params.insert("id".to_string(), "42".to_string());

        let r = BlockRenderer::compile("{{ headers }}|{{ queryParams }}|{{ pathParams }}").unwrap();
        assert_eq!(
            String::from_utf8(r.render(&c).unwrap()).unwrap(),
            r#"{"X-Trace-Id":"t-1"}|{"q":"rust"}|{"id":"42"}"#
        );
    }
}
