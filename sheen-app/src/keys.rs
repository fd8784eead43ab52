use winit::keyboard::{Key, NamedKey};

/// Lowercased key name in the `KeyboardEvent.key` convention: `"a"`, `" "`,
/// `"arrowleft"`. `None` for keys that carry no name.
pub fn key_name(key: &Key) -> Option<String> {
    match key {
        Key::Character(text) => Some(text.to_lowercase()),
        Key::Named(NamedKey::Space) => Some(" ".to_owned()),
        Key::Named(named) => Some(format!("{named:?}").to_lowercase()),
        Key::Unidentified(_) | Key::Dead(_) => None,
    }
}
