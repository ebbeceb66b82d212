use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::patch::Patch;
use super::task::error_with_message;

pub const NAME_MAX_LEN: usize = 50;
pub const BIO_MAX_LEN: usize = 500;
pub const PASSWORD_MIN_LEN: usize = 6;

/// Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// A stored account. Holds the password hash, so it is never serialized; responses
/// use [`UserProfile`].
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Always normalized with [`normalize_email`].
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: &str, password_hash: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: normalize_email(email),
            password_hash,
            role: UserRole::default(),
            avatar: None,
            bio: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self)
    }
}

/// The public view of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub role: UserRole,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            avatar: user.avatar.clone(),
            bio: user.bio.clone(),
            role: user.role,
        }
    }
}

/// Emails are compared and stored trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Body of `PUT /api/users/profile`.
///
/// `name`, `email` and `password` are left unchanged when absent. `bio` and `avatar`
/// are cleared by `null` or an empty string.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub bio: Patch<Option<String>>,
    #[serde(default)]
    pub avatar: Patch<Option<String>>,
}

impl UpdateProfileRequest {
    /// Trims text, lowercases the email and turns blank `bio`/`avatar` into `None`.
    /// Call before `validate`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.map(|n| n.trim().to_string());
        self.email = self.email.map(|e| normalize_email(&e));
        self.bio = self.bio.map(blank_to_none);
        self.avatar = self.avatar.map(blank_to_none);
        self
    }

    /// Splits the request into the stored-field patch and the plaintext password that
    /// still needs hashing.
    pub fn into_patch(self) -> (UserPatch, Option<String>) {
        let patch = UserPatch {
            name: self.name.map_or(Patch::Unset, Patch::Set),
            email: self.email.map_or(Patch::Unset, Patch::Set),
            password_hash: Patch::Unset,
            bio: self.bio,
            avatar: self.avatar,
        };
        (patch, self.password)
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Validate for UpdateProfileRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            if name.is_empty() {
                errors.add("name", error_with_message("required", "Name cannot be empty"));
            } else if name.chars().count() > NAME_MAX_LEN {
                errors.add(
                    "name",
                    error_with_message("length", "Name cannot be more than 50 characters"),
                );
            }
        }
        if let Some(email) = &self.email {
            if !validator::validate_email(email) {
                errors.add(
                    "email",
                    error_with_message("email", "Please provide a valid email"),
                );
            }
        }
        if let Some(password) = &self.password {
            if password.chars().count() < PASSWORD_MIN_LEN {
                errors.add(
                    "password",
                    error_with_message("length", "Password must be at least 6 characters"),
                );
            }
        }
        if let Some(Some(bio)) = self.bio.as_set() {
            if bio.chars().count() > BIO_MAX_LEN {
                errors.add(
                    "bio",
                    error_with_message("length", "Bio cannot be more than 500 characters"),
                );
            }
        }
        if let Some(Some(avatar)) = self.avatar.as_set() {
            if !validator::validate_url(avatar) {
                errors.add(
                    "avatar",
                    error_with_message("url", "Avatar must be a valid URL"),
                );
            }
        }
        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Stored-field changes to a user; the password is already hashed.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub name: Patch<String>,
    pub email: Patch<String>,
    pub password_hash: Patch<String>,
    pub bio: Patch<Option<String>>,
    pub avatar: Patch<Option<String>>,
}

impl UserPatch {
    pub fn apply(self, existing: &User, now: DateTime<Utc>) -> User {
        let mut user = existing.clone();
        self.name.apply_to(&mut user.name);
        self.email.apply_to(&mut user.email);
        self.password_hash.apply_to(&mut user.password_hash);
        self.bio.apply_to(&mut user.bio);
        self.avatar.apply_to(&mut user.avatar);
        user.updated_at = now;
        user
    }
}
