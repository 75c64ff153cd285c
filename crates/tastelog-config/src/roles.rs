use std::env;

/// Static role assignments (`ADMIN_USER_IDS`, comma separated).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoleConfig {
    pub admin_user_ids: Vec<String>,
}

impl RoleConfig {
    pub fn from_env() -> Self {
        let admin_user_ids = env::var("ADMIN_USER_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self { admin_user_ids }
    }
}
