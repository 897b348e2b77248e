//! Target list loading from YAML or JSON config files

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use stackscan_exec::TargetSpec;

use crate::error::ConfigError;

/// Load the ordered target list from `path`
///
/// Accepts a bare list of targets, a document with a `targets` key, or a
/// single target mapping. `.yaml`/`.yml` files are parsed as YAML,
/// everything else as JSON. Defaults (port 22, user root, key auth with the
/// conventional key path, name = host) are applied here so the engine can
/// rely on them.
///
/// # Errors
/// Returns `ConfigError::Read` when the file cannot be read, `Parse` when
/// the document is malformed, or `Target` naming the zero-based index of an
/// invalid entry.
pub fn load_targets(path: &Path) -> Result<Vec<TargetSpec>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml" | "yml")
    );
    let targets = parse_targets(&text, is_yaml)?;

    debug!(count = targets.len(), config = %path.display(), "loaded targets");

    Ok(targets)
}

fn parse_targets(text: &str, yaml: bool) -> Result<Vec<TargetSpec>, ConfigError> {
    let document: Value = if yaml {
        serde_yaml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?
    } else {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?
    };

    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("targets") {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(ConfigError::Parse(format!(
                    "`targets` must be a list, got {}",
                    value_kind(&other)
                )));
            }
            None => vec![Value::Object(map)],
        },
        other => {
            return Err(ConfigError::Parse(format!(
                "expected a target list or mapping, got {}",
                value_kind(&other)
            )));
        }
    };

    let mut targets = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let mut spec: TargetSpec =
            serde_json::from_value(entry).map_err(|e| ConfigError::Target {
                index,
                reason: e.to_string(),
            })?;
        spec.apply_defaults();
        targets.push(spec);
    }

    Ok(targets)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use stackscan_exec::AuthMode;

    use super::*;

    #[test]
    fn yaml_list_gets_defaults_applied() {
        let text = "- host: 10.0.0.1\n- host: 10.0.0.2\n  port: 2222\n  user: deploy\n";
        let targets = parse_targets(text, true).unwrap();

        assert_eq!(targets.len(), 2);

        assert_eq!(targets[0].name, "10.0.0.1");
        assert_eq!(targets[0].port, 22);
        assert_eq!(targets[0].user, "root");
        assert_eq!(targets[0].auth, AuthMode::Key);
        assert!(targets[0].key_path.is_some());

        assert_eq!(targets[1].port, 2222);
        assert_eq!(targets[1].user, "deploy");
    }

    #[test]
    fn list_order_is_preserved() {
        let text = "- host: charlie\n- host: alpha\n- host: bravo\n";
        let targets = parse_targets(text, true).unwrap();
        let hosts: Vec<_> = targets.iter().map(|t| t.host.as_str()).collect();
        assert_eq!(hosts, ["charlie", "alpha", "bravo"]);
    }

    #[test]
    fn json_document_with_targets_key() {
        let text = r#"{
            "targets": [
                { "name": "db primary", "host": "db1.internal", "auth": "password", "password": "hunter2" }
            ]
        }"#;
        let targets = parse_targets(text, false).unwrap();

        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "db primary");
        assert_eq!(targets[0].auth, AuthMode::Password);
        assert_eq!(targets[0].password.as_ref().unwrap().expose(), "hunter2");
        // Password auth must not pick up a default key path
        assert!(targets[0].key_path.is_none());
    }

    #[test]
    fn single_mapping_is_one_target() {
        let targets = parse_targets("host: one.example\n", true).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].host, "one.example");
    }

    #[test]
    fn entry_without_host_is_rejected_with_its_index() {
        let text = "- host: ok.example\n- user: nope\n";
        let err = parse_targets(text, true).unwrap_err();

        match err {
            ConfigError::Target { index, ref reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("host"));
            }
            other => panic!("expected target error, got {other}"),
        }
        assert!(err.to_string().starts_with("target #1:"));
    }

    #[test]
    fn scalar_document_is_rejected() {
        let err = parse_targets("42", false).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn non_list_targets_key_is_rejected() {
        let err = parse_targets(r#"{ "targets": "db1" }"#, false).unwrap_err();
        assert!(err.to_string().contains("`targets` must be a list"));
    }

    #[test]
    fn empty_list_is_a_valid_run() {
        let targets = parse_targets("[]", false).unwrap();
        assert!(targets.is_empty());
    }
}
