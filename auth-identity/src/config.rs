use serde::{Deserialize, Serialize};

/// Password policy applied at registration and password change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub password_min_length: usize,
    pub password_require_uppercase: bool,
    pub password_require_numbers: bool,
    pub password_require_special_chars: bool,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            password_min_length: 8,
            password_require_uppercase: true,
            password_require_numbers: true,
            password_require_special_chars: true,
        }
    }
}
