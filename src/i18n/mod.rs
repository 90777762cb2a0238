//! Embedded language packs.
//!
//! Packs live in `langs/*.json` and are compiled in; `en-US` is the fallback
//! for any key a pack doesn't carry.

use std::collections::HashMap;
use std::sync::OnceLock;

static EN_US: &str = include_str!("../../langs/en-US.json");
static ZH_CN: &str = include_str!("../../langs/zh-CN.json");

static ACTIVE: OnceLock<Lang> = OnceLock::new();

struct Lang {
    table: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

fn load_pack(src: &str) -> HashMap<String, String> {
    serde_json::from_str(src).expect("embedded language pack is valid JSON")
}

/// Pick a language from the `LANG` environment, the way the terminal does.
pub fn detect() -> &'static str {
    let lang = std::env::var("LANG").unwrap_or_default();
    if lang.to_lowercase().starts_with("zh") {
        "zh-CN"
    } else {
        "en-US"
    }
}

/// Install the language pack for this process. `auto` (or anything unknown)
/// resolves via [`detect`]. Only the first call wins.
pub fn init(code: &str) {
    let code = match code.trim() {
        "" | "auto" => detect(),
        other => other,
    };
    let table = match code {
        "zh-CN" => load_pack(ZH_CN),
        _ => load_pack(EN_US),
    };
    let _ = ACTIVE.set(Lang {
        table,
        fallback: load_pack(EN_US),
    });
}

fn active() -> &'static Lang {
    ACTIVE.get_or_init(|| Lang {
        table: load_pack(EN_US),
        fallback: load_pack(EN_US),
    })
}

/// Look up a message; unknown keys come back verbatim so a missing entry is
/// visible instead of silent.
pub fn t(key: &str) -> String {
    let lang = active();
    lang.table
        .get(key)
        .or_else(|| lang.fallback.get(key))
        .cloned()
        .unwrap_or_else(|| key.to_string())
}

/// [`t`] plus `{name}` placeholder substitution.
pub fn tf(key: &str, args: &[(&str, String)]) -> String {
    let mut text = t(key);
    for (name, value) in args {
        text = text.replace(&format!("{{{name}}}"), value);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_key_resolves() {
        assert_ne!(t("no_data"), "no_data");
    }

    #[test]
    fn test_unknown_key_is_verbatim() {
        assert_eq!(t("definitely_missing_key"), "definitely_missing_key");
    }

    #[test]
    fn test_placeholder_substitution() {
        let out = tf("creators_header", &[("count", "18".into())]);
        assert!(out.contains("18"));
        assert!(!out.contains("{count}"));
    }

    #[test]
    fn test_packs_have_matching_keys() {
        let en = load_pack(EN_US);
        let zh = load_pack(ZH_CN);
        for key in en.keys() {
            assert!(zh.contains_key(key), "zh-CN missing key {key}");
        }
    }
}
