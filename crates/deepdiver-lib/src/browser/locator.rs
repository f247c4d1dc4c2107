//! Locator strings: CSS extended with a `:has-text("…")` filter.
//!
//! `A:has-text("t") B` selects elements matching `A` whose text contains `t`
//! (case-insensitive, whitespace-collapsed), then looks for `B` inside them.
//! Everything else, including native `:has(...)`, is left to the browser's
//! CSS engine.

use serde::Serialize;

const HAS_TEXT: &str = ":has-text(";

/// Whether an element must be rendered or merely present in the DOM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    Visible,
    Attached,
}

/// One CSS hop with an optional text filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatorStep {
    pub css: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    Unterminated(String),
    Empty,
}

impl std::fmt::Display for LocatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocatorError::Unterminated(l) => write!(f, "unterminated :has-text in '{l}'"),
            LocatorError::Empty => write!(f, "empty locator"),
        }
    }
}

/// Split a locator into steps.
pub fn parse(locator: &str) -> Result<Vec<LocatorStep>, LocatorError> {
    let mut steps = Vec::new();
    let mut rest = locator;

    while let Some(pos) = rest.find(HAS_TEXT) {
        let css = normalize_css(&rest[..pos]);
        let after = &rest[pos + HAS_TEXT.len()..];
        let (text, remainder) = read_quoted(after)
            .ok_or_else(|| LocatorError::Unterminated(locator.to_string()))?;
        steps.push(LocatorStep {
            css,
            text: Some(text),
        });
        rest = remainder;
    }

    let tail = rest.trim();
    if !tail.is_empty() {
        steps.push(LocatorStep {
            css: tail.to_string(),
            text: None,
        });
    }

    if steps.is_empty() {
        return Err(LocatorError::Empty);
    }
    Ok(steps)
}

fn normalize_css(css: &str) -> String {
    let css = css.trim();
    if css.is_empty() {
        "*".to_string()
    } else {
        css.to_string()
    }
}

/// Reads `"text")` or `'text')`; returns the text and what follows `)`.
/// A backslash escapes the next character.
fn read_quoted(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    let quote = input.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let body = &input[1..];
    let mut text = String::new();
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            text.push(chars.next()?.1);
        } else if c == quote {
            let after = body[i + 1..].trim_start().strip_prefix(')')?;
            return Some((text, after));
        } else {
            text.push(c);
        }
    }
    None
}

/// `:has-text("…")` argument for arbitrary text, escaping quotes and backslashes.
pub fn quote_text(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// JavaScript expression that evaluates to the first matching element or `null`.
pub fn query_script(steps: &[LocatorStep], state: ElementState) -> String {
    matcher_script(steps, state, "scopes.find(el => !requireVisible || visible(el)) || null")
}

/// JavaScript expression that evaluates to an array of every matching
/// element, in document order.
pub fn query_all_script(steps: &[LocatorStep], state: ElementState) -> String {
    matcher_script(steps, state, "scopes.filter(el => !requireVisible || visible(el))")
}

fn matcher_script(steps: &[LocatorStep], state: ElementState, pick: &str) -> String {
    let steps_json = serde_json::to_string(steps).unwrap_or_else(|_| "[]".to_string());
    let require_visible = state == ElementState::Visible;
    format!(
        r#"(() => {{
  const steps = {steps_json};
  const requireVisible = {require_visible};
  const norm = s => (s || '').replace(/\s+/g, ' ').trim().toLowerCase();
  const visible = el => {{
    const r = el.getBoundingClientRect();
    const st = window.getComputedStyle(el);
    return r.width > 0 && r.height > 0 && st.visibility !== 'hidden' && st.display !== 'none';
  }};
  let scopes = [document];
  for (const step of steps) {{
    const next = [];
    for (const scope of scopes) {{
      const css = scope === document ? step.css : ':scope ' + step.css;
      for (const el of scope.querySelectorAll(css)) {{
        if (step.text !== null && !norm(el.innerText || el.textContent).includes(norm(step.text))) continue;
        if (!next.includes(el)) next.push(el);
      }}
    }}
    scopes = next;
    if (scopes.length === 0) break;
  }}
  return {pick};
}})()"#
    )
}
