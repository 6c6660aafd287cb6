//! Environment variable expansion for config files.
//!
//! Recognized forms:
//! - `$NAME` and `${NAME}` expand to the variable, which must be set
//! - `${NAME:-fallback}` uses the fallback when NAME is unset or empty
//! - `${NAME-fallback}` uses the fallback only when NAME is unset
//! - `$$` is a literal `$`

use regex::{Captures, Regex};
use std::env;
use std::sync::LazyLock;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\$\$|\$\{(?P<braced>[A-Za-z_][A-Za-z0-9_]*)(?:(?P<op>:?-)(?P<fallback>[^}]*))?\}|\$(?P<bare>[A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("variable pattern is valid")
});

/// Expand environment variables in `input`.
///
/// Every problem is collected so a config with several missing variables
/// reports them all at once.
pub fn expand(input: &str) -> Result<String, Vec<String>> {
    let mut problems = Vec::new();

    let expanded = VARIABLE.replace_all(input, |caps: &Captures| {
        let whole = &caps[0];
        if whole == "$$" {
            return "$".to_string();
        }

        let Some(name) = caps.name("braced").or_else(|| caps.name("bare")) else {
            return whole.to_string();
        };
        let name = name.as_str();
        let fallback = caps.name("fallback").map(|m| m.as_str());
        let empty_uses_fallback = caps.name("op").is_some_and(|m| m.as_str() == ":-");

        match env::var(name) {
            Ok(value) if value.contains(['\n', '\r']) => {
                problems.push(format!("variable '{name}' must not contain line breaks"));
                whole.to_string()
            }
            Ok(value) if value.is_empty() && empty_uses_fallback => {
                fallback.unwrap_or_default().to_string()
            }
            Ok(value) => value,
            Err(_) => match fallback {
                Some(fallback) => fallback.to_string(),
                None => {
                    problems.push(format!("variable '{name}' is not set"));
                    whole.to_string()
                }
            },
        }
    });

    if problems.is_empty() {
        Ok(expanded.into_owned())
    } else {
        Err(problems)
    }
}
