// Copyright 2024 Entanglement Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Typed access to the string-keyed profile of an erasure coded pool.
//!
//! Every reader writes its default back into the profile when the key is missing or empty, so
//! the profile always ends up describing the configuration actually in use. A value that does not
//! parse is replaced by the default and reported in `messages`.

use std::collections::BTreeMap;

use log::warn;

pub type Profile = BTreeMap<String, String>;

pub const DEFAULT_RULESET_ROOT: &str = "default";
pub const DEFAULT_RULESET_FAILURE_DOMAIN: &str = "host";

/// Logs `message` and appends it to `messages`.
pub(crate) fn report(messages: &mut Vec<String>, message: String) {
    warn!("{message}");
    messages.push(message);
}

fn value_or_default<'a>(profile: &'a mut Profile, name: &str, default: &str) -> &'a str {
    let value = profile.entry(name.to_string()).or_default();
    if value.is_empty() {
        *value = default.to_string();
    }
    value
}

/// Reads an integer. Negative values parse; range checks belong to the caller.
pub fn to_int(profile: &mut Profile, name: &str, default: i64, messages: &mut Vec<String>) -> i64 {
    let default_str = default.to_string();
    let value = value_or_default(profile, name, &default_str);
    match value.trim().parse() {
        Ok(v) => v,
        Err(e) => {
            let message = format!(
                "could not convert {name}={value} to int because {e}, set to default {default}"
            );
            profile.insert(name.to_string(), default_str);
            report(messages, message);
            default
        }
    }
}

/// Reads a flag spelled `true`/`false`, `yes`/`no` or `1`/`0`.
pub fn to_bool(
    profile: &mut Profile,
    name: &str,
    default: bool,
    messages: &mut Vec<String>,
) -> bool {
    let value = value_or_default(profile, name, if default { "true" } else { "false" });
    match value {
        "true" | "yes" | "1" => true,
        "false" | "no" | "0" => false,
        other => {
            let message =
                format!("could not convert {name}={other} to bool, set to default {default}");
            profile.insert(name.to_string(), default.to_string());
            report(messages, message);
            default
        }
    }
}

pub fn to_string(profile: &mut Profile, name: &str, default: &str) -> String {
    value_or_default(profile, name, default).to_string()
}

/// Reads the `mapping` key, for instance `"DD_D_"`.
///
/// Positions holding `D` are data chunks. They come first in the returned
/// sequence, in order, followed by every other position.
pub fn to_mapping(profile: &Profile) -> Option<Vec<usize>> {
    let mapping = profile.get("mapping")?;
    let mut data = Vec::new();
    let mut coding = Vec::new();
    for (position, c) in mapping.chars().enumerate() {
        if c == 'D' {
            data.push(position);
        } else {
            coding.push(position);
        }
    }
    data.extend(coding);
    Some(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(pairs: &[(&str, &str)]) -> Profile {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_to_int_writes_default_back() {
        let mut p = profile(&[("m", "")]);
        let mut messages = Vec::new();
        assert_eq!(to_int(&mut p, "k", 7, &mut messages), 7);
        assert_eq!(to_int(&mut p, "m", 3, &mut messages), 3);
        assert_eq!(p["k"], "7");
        assert_eq!(p["m"], "3");
        assert!(messages.is_empty());
    }

    #[test]
    fn test_to_int_reports_garbage() {
        let mut p = profile(&[("k", "four"), ("m", "-1")]);
        let mut messages = Vec::new();
        assert_eq!(to_int(&mut p, "k", 7, &mut messages), 7);
        assert_eq!(to_int(&mut p, "m", 3, &mut messages), -1);
        assert_eq!(p["k"], "7");
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("k=four"), "{}", messages[0]);
    }

    #[test]
    fn test_to_bool() {
        let mut p = profile(&[("a", "yes"), ("b", "0"), ("c", "maybe")]);
        let mut messages = Vec::new();
        assert!(to_bool(&mut p, "a", false, &mut messages));
        assert!(!to_bool(&mut p, "b", true, &mut messages));
        assert!(!to_bool(&mut p, "c", false, &mut messages));
        assert!(!to_bool(&mut p, "d", false, &mut messages));
        assert_eq!(p["c"], "false");
        assert_eq!(p["d"], "false");
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_to_string() {
        let mut p = profile(&[("ruleset-root", "rack1")]);
        assert_eq!(to_string(&mut p, "ruleset-root", DEFAULT_RULESET_ROOT), "rack1");
        assert_eq!(
            to_string(&mut p, "ruleset-failure-domain", DEFAULT_RULESET_FAILURE_DOMAIN),
            "host"
        );
        assert_eq!(p["ruleset-failure-domain"], "host");
    }

    #[test]
    fn test_to_mapping() {
        assert_eq!(to_mapping(&Profile::new()), None);
        let p = profile(&[("mapping", "_DD_D")]);
        assert_eq!(to_mapping(&p), Some(vec![1, 2, 4, 0, 3]));
    }
}
