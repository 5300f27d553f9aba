//! `${VAR}` / `${VAR:default}` interpolation over a YAML tree, plus the
//! duration syntax used by the settings (`500ms`, `5s`, `10m`, `1h`).

use std::time::Duration;

use serde_yaml::{Mapping, Value};

use super::error::{ConfigError, ConfigResult};

/// Replace every placeholder in every string scalar of `value`.
///
/// A scalar that is exactly one placeholder is re-read as YAML after
/// substitution, so `${BEERS_RETRY_ATTEMPTS:10}` becomes the number `10`.
/// A null value is an error: a key that is written down must say something.
pub fn resolve_tree<F>(value: &mut Value, path: &str, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::Null => Err(ConfigError::MissingValue {
            key: path.to_string(),
            var: None,
        }),
        Value::String(text) => {
            let whole = is_single_placeholder(text);
            let resolved = resolve_str(text, path, lookup)?;
            *value = if whole && !resolved.trim().is_empty() {
                serde_yaml::from_str::<Value>(&resolved).unwrap_or(Value::String(resolved))
            } else {
                Value::String(resolved)
            };
            Ok(())
        }
        Value::Mapping(mapping) => resolve_mapping(mapping, path, lookup),
        Value::Sequence(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                resolve_tree(item, &format!("{path}[{i}]"), lookup)?;
            }
            Ok(())
        }
        Value::Tagged(tagged) => resolve_tree(&mut tagged.value, path, lookup),
        Value::Bool(_) | Value::Number(_) => Ok(()),
    }
}

fn resolve_mapping<F>(mapping: &mut Mapping, path: &str, lookup: &F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    for (key, child) in mapping.iter_mut() {
        let name = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{key:?}"));
        let child_path = if path.is_empty() { name } else { format!("{path}.{name}") };
        resolve_tree(child, &child_path, lookup)?;
    }
    Ok(())
}

fn is_single_placeholder(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("${") && trimmed.find('}') == Some(trimmed.len() - 1)
}

/// Substitute placeholders inside one string.
pub fn resolve_str<F>(text: &str, key: &str, lookup: &F) -> ConfigResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let body_start = start + 2;
        let end = rest[body_start..]
            .find('}')
            .map(|i| body_start + i)
            .ok_or_else(|| ConfigError::UnterminatedPlaceholder { key: key.to_string() })?;

        let body = &rest[body_start..end];
        let (var, default) = match body.split_once(':') {
            Some((var, default)) => (var.trim(), Some(default)),
            None => (body.trim(), None),
        };

        match lookup(var).or_else(|| default.map(str::to_string)) {
            Some(value) => out.push_str(&value),
            None => {
                return Err(ConfigError::MissingValue {
                    key: key.to_string(),
                    var: Some(var.to_string()),
                })
            }
        }
        rest = &rest[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Parse `250ms`, `5s`, `10m`, `1h`, or a bare number of seconds.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let split = text.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let number: f64 = number.parse().ok()?;
    if !number.is_finite() || number < 0.0 {
        return None;
    }

    let secs = match unit.trim() {
        "ms" => number / 1000.0,
        "" | "s" => number,
        "m" => number * 60.0,
        "h" => number * 3600.0,
        _ => return None,
    };
    Duration::try_from_secs_f64(secs).ok()
}

/// `serde(with = ...)` adapter for [`Duration`] fields.
pub mod duration {
    use std::time::Duration;

    use serde::de::{self, Deserializer, Visitor};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a duration such as 500ms, 5s, 10m or 1h")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Duration, E> {
                super::parse_duration(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Duration, E> {
                Ok(Duration::from_secs(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Duration, E> {
                u64::try_from(v)
                    .map(Duration::from_secs)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Duration, E> {
                Duration::try_from_secs_f64(v).map_err(|_| E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
