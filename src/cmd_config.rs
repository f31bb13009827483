use std::path::Path;

use anyhow::{bail, Result};
use serde_json::{Map, Value};

use crate::config::AppConfig;
use crate::ConfigAction;

pub fn run(action: &ConfigAction, config_path: &Path) -> Result<()> {
    match action {
        ConfigAction::Init => cmd_init(config_path),
        ConfigAction::Show => cmd_show(config_path),
        ConfigAction::Set { key, value } => cmd_set(config_path, key, value),
        ConfigAction::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

fn cmd_init(config_path: &Path) -> Result<()> {
    if config_path.exists() {
        bail!(
            "Config already exists at {}\nUse 'blogcrew config set' to modify",
            config_path.display()
        );
    }
    let default = serde_json::to_value(AppConfig::default())?;
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, serde_json::to_string_pretty(&default)?)?;
    println!("Created {}", config_path.display());
    println!("Edit the file or use 'blogcrew config set' to change the backend.");
    Ok(())
}

fn cmd_show(config_path: &Path) -> Result<()> {
    if !config_path.exists() {
        bail!(
            "No config at {}\nRun 'blogcrew config init' to create one",
            config_path.display()
        );
    }
    let content = std::fs::read_to_string(config_path)?;
    let json: Value = serde_json::from_str(&content)?;
    println!("{}", serde_json::to_string_pretty(&mask_secrets(&json))?);
    Ok(())
}

fn cmd_set(config_path: &Path, key: &str, value: &str) -> Result<()> {
    let mut json: Value = if config_path.exists() {
        serde_json::from_str(&std::fs::read_to_string(config_path)?)?
    } else {
        if let Some(p) = config_path.parent() {
            std::fs::create_dir_all(p)?;
        }
        serde_json::json!({ "version": 1 })
    };
    set_nested(&mut json, key, value)?;
    // Refuse to write something the loader would reject.
    serde_json::from_value::<AppConfig>(json.clone())
        .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))?;
    std::fs::write(config_path, serde_json::to_string_pretty(&json)?)?;
    println!("Set {} = {}", key, mask_value(key, value));
    Ok(())
}

fn set_nested(json: &mut Value, key: &str, val: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((last, parents)) = parts.split_last() else {
        bail!("Empty key");
    };
    let mut cur = json;
    for p in parents {
        cur = object_mut(cur)
            .entry(p.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    object_mut(cur).insert(last.to_string(), typed_value(val));
    Ok(())
}

/// View `value` as an object, replacing any scalar in the way.
fn object_mut(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just made an object"),
    }
}

fn typed_value(val: &str) -> Value {
    if val == "true" {
        Value::Bool(true)
    } else if val == "false" {
        Value::Bool(false)
    } else if let Ok(n) = val.parse::<u64>() {
        Value::Number(n.into())
    } else {
        Value::String(val.to_string())
    }
}

fn mask_secrets(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let masked = match v {
                        Value::String(s) if is_secret_key(k) => Value::String(mask_str(s)),
                        _ => mask_secrets(v),
                    };
                    (k.clone(), masked)
                })
                .collect(),
        ),
        Value::Array(a) => Value::Array(a.iter().map(mask_secrets).collect()),
        other => other.clone(),
    }
}

fn is_secret_key(key: &str) -> bool {
    let u = key.to_uppercase();
    u.contains("KEY") || u.contains("SECRET") || u.contains("TOKEN")
}

fn mask_str(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 8 {
        "***".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    }
}

fn mask_value(key: &str, value: &str) -> String {
    if is_secret_key(key) {
        mask_str(value)
    } else {
        value.to_string()
    }
}
