//! Local persisted identity token, read-only for the flow.
//!
//! Resolution order: explicit override, stored token file, anonymous
//! sentinel. The flow never writes the token; provisioning happens elsewhere.

use std::fs;
use std::path::{Path, PathBuf};

/// Placeholder meaning "anonymous/unauthenticated".
pub const ANONYMOUS_USER_ID: &str = "0";

fn token_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sosbeacon").join("user_id"))
}

/// Resolves the identity token attached to submissions.
pub fn resolve_user_id(override_value: Option<&str>) -> String {
    resolve_user_id_at(override_value, token_path().as_deref())
}

fn resolve_user_id_at(override_value: Option<&str>, token_file: Option<&Path>) -> String {
    if let Some(value) = override_value {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(path) = token_file {
        if let Ok(contents) = fs::read_to_string(path) {
            let trimmed = contents.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }
    ANONYMOUS_USER_ID.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_token_path() -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after epoch")
            .as_nanos();
        env::temp_dir().join(format!("sosbeacon-user-id-{nanos}"))
    }

    #[test]
    fn override_wins_over_the_stored_token() {
        let path = unique_token_path();
        fs::write(&path, "stored-user\n").expect("write token");
        assert_eq!(
            resolve_user_id_at(Some("  user-42\n"), Some(&path)),
            "user-42"
        );
        let _ = fs::remove_file(path);
    }

    #[test]
    fn stored_token_is_trimmed() {
        let path = unique_token_path();
        fs::write(&path, "  stored-user \n").expect("write token");
        assert_eq!(resolve_user_id_at(None, Some(&path)), "stored-user");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn blank_sources_fall_through_to_the_sentinel() {
        let path = unique_token_path();
        fs::write(&path, "   \n").expect("write token");
        assert_eq!(
            resolve_user_id_at(Some("   "), Some(&path)),
            ANONYMOUS_USER_ID
        );
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_everything_resolves_anonymous() {
        assert_eq!(resolve_user_id_at(None, None), ANONYMOUS_USER_ID);
        let path = unique_token_path();
        assert_eq!(resolve_user_id_at(None, Some(&path)), ANONYMOUS_USER_ID);
    }
}
