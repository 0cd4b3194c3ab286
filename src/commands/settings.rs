use crate::analysis::{MEDIA_MODEL, QUERY_MODEL, TEXT_MODEL};
use crate::db::{Database, SETTING_KEYS};
use crate::llm::ModelInfo;

pub fn get(db: &Database, key: &str) -> anyhow::Result<()> {
    ensure_known(key)?;
    match db.get_setting(key)? {
        Some(value) => println!("{}", display_value(key, &value)),
        None => println!("(unset)"),
    }
    Ok(())
}

pub fn set(db: &Database, key: &str, value: &str) -> anyhow::Result<()> {
    ensure_known(key)?;
    db.set_setting(key, value)?;
    Ok(())
}

pub fn unset(db: &Database, key: &str) -> anyhow::Result<()> {
    ensure_known(key)?;
    db.delete_setting(key)?;
    Ok(())
}

pub fn list(db: &Database) -> anyhow::Result<()> {
    for key in SETTING_KEYS {
        match db.get_setting(key)? {
            Some(value) => println!("{} = {}", key, display_value(key, &value)),
            None => println!("{} = (unset)", key),
        }
    }
    Ok(())
}

fn ensure_known(key: &str) -> anyhow::Result<()> {
    if !SETTING_KEYS.contains(&key) {
        anyhow::bail!("Unknown setting key: {}", key);
    }
    Ok(())
}

/// Mask API keys for display.
fn display_value(key: &str, value: &str) -> String {
    if key.ends_with("_api_key") && value.len() > 8 {
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    } else {
        value.to_string()
    }
}

pub fn available_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: TEXT_MODEL.to_string(),
            name: "Gemini 3 Pro".to_string(),
            role: "documents and text (deep reasoning)".to_string(),
        },
        ModelInfo {
            id: MEDIA_MODEL.to_string(),
            name: "Gemini 2.5 Flash Native Audio".to_string(),
            role: "audio and video payloads".to_string(),
        },
        ModelInfo {
            id: QUERY_MODEL.to_string(),
            name: "Gemini 3 Flash".to_string(),
            role: "contextual queries".to_string(),
        },
    ]
}

pub fn print_models() {
    for model in available_models() {
        println!("{:<48} {:<32} {}", model.id, model.name, model.role);
    }
}
