use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    pub name: Option<String>,
}

impl UserProfile {
    pub fn new(username: impl Into<String>, name: Option<String>) -> Self {
        Self {
            username: username.into(),
            name,
        }
    }

    pub fn progress_title(&self) -> Option<String> {
        self.name.as_ref().map(|name| format!("{name}'s Sikap Progress"))
    }
}
