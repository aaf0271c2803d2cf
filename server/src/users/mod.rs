//! User accounts: storage helpers, profile edits and username rules.

pub mod profile;
pub mod store;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 30;
pub const MAX_FULL_NAME_LEN: usize = 50;

/// Usernames are 3-30 ASCII letters, digits or underscores, starting with a letter.
pub fn is_valid_username(username: &str) -> bool {
    if username.len() < MIN_USERNAME_LEN || username.len() > MAX_USERNAME_LEN {
        return false;
    }

    let mut chars = username.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(is_valid_username("bob"));
        assert!(is_valid_username("alice_99"));
        assert!(is_valid_username(&format!("a{}", "b".repeat(29))));
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("9lives"));
        assert!(!is_valid_username("_under"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("dash-name"));
        assert!(!is_valid_username("émile"));
        assert!(!is_valid_username(&"a".repeat(31)));
    }
}
