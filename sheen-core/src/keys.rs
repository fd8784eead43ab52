use serde::{Deserialize, Serialize};
use std::fmt;

/// A keyboard key name, compared case-insensitively.
///
/// Names follow the browser `KeyboardEvent.key` convention lowercased:
/// `"a"`, `" "` for space, `"arrowleft"`, `"enter"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Key(String);

impl Key {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::new(name)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::new(name)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of keys a trial listens for.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "ChoicesRepr", into = "ChoicesRepr")]
pub enum Choices {
    #[default]
    AllKeys,
    NoKeys,
    Keys(Vec<Key>),
}

impl Choices {
    pub fn keys<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        let keys: Vec<Key> = keys.into_iter().map(Into::into).collect();
        if keys.is_empty() {
            Choices::NoKeys
        } else {
            Choices::Keys(keys)
        }
    }

    pub fn is_no_keys(&self) -> bool {
        match self {
            Choices::NoKeys => true,
            Choices::Keys(keys) => keys.is_empty(),
            Choices::AllKeys => false,
        }
    }

    pub fn accepts(&self, key: &Key) -> bool {
        match self {
            Choices::AllKeys => true,
            Choices::NoKeys => false,
            Choices::Keys(keys) => keys.contains(key),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ChoicesRepr {
    Sentinel(Sentinel),
    Keys(Vec<Key>),
}

#[derive(Serialize, Deserialize)]
enum Sentinel {
    #[serde(rename = "ALL_KEYS")]
    AllKeys,
    #[serde(rename = "NO_KEYS")]
    NoKeys,
}

impl From<ChoicesRepr> for Choices {
    fn from(repr: ChoicesRepr) -> Self {
        match repr {
            ChoicesRepr::Sentinel(Sentinel::AllKeys) => Choices::AllKeys,
            ChoicesRepr::Sentinel(Sentinel::NoKeys) => Choices::NoKeys,
            ChoicesRepr::Keys(keys) => Choices::keys(keys),
        }
    }
}

impl From<Choices> for ChoicesRepr {
    fn from(choices: Choices) -> Self {
        match choices {
            Choices::AllKeys => ChoicesRepr::Sentinel(Sentinel::AllKeys),
            Choices::NoKeys => ChoicesRepr::Sentinel(Sentinel::NoKeys),
            Choices::Keys(keys) => ChoicesRepr::Keys(keys),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_compare_case_insensitively() {
        assert_eq!(Key::new("A"), Key::new("a"));
        assert_eq!(Key::from("ArrowLeft").as_str(), "arrowleft");
    }

    #[test]
    fn choices_parse_sentinels_and_lists() {
        let all: Choices = serde_json::from_str(r#""ALL_KEYS""#).unwrap();
        let none: Choices = serde_json::from_str(r#""NO_KEYS""#).unwrap();
        let some: Choices = serde_json::from_str(r#"["F", "j"]"#).unwrap();
        assert_eq!(all, Choices::AllKeys);
        assert_eq!(none, Choices::NoKeys);
        assert_eq!(some, Choices::Keys(vec![Key::new("f"), Key::new("j")]));
    }

    #[test]
    fn empty_list_means_no_keys() {
        let empty: Choices = serde_json::from_str("[]").unwrap();
        assert!(empty.is_no_keys());
        assert!(!empty.accepts(&Key::new("a")));
    }

    #[test]
    fn accepts_only_listed_keys() {
        let choices = Choices::keys(["a", "l"]);
        assert!(choices.accepts(&Key::new("L")));
        assert!(!choices.accepts(&Key::new("b")));
        assert!(Choices::AllKeys.accepts(&Key::new("b")));
    }
}
