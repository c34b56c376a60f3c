use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AvatarImage;

/// The record the signup form fills in.
///
/// Identity is the `id`: two records are equal only when both carry the same
/// id, so a record that was never stored is not even equal to itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub firstname: String,
    pub lastname: String,
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<AvatarImage>,
    #[serde(default)]
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub allows_marketing: bool,
}

impl PartialEq for UserDetails {
    fn eq(&self, other: &Self) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}
