// src/models/user.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::family::Dimension;

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    /// Dominant label of the latest pattern result. Written only by submissions.
    pub learning_pattern: Option<Dimension>,

    /// Dominant label of the latest style result. Written only by submissions.
    pub learning_style: Option<Dimension>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Insert payload for a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: String,
}

/// Latest result of one family, reconstituted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyProfile {
    pub result_id: i64,
    pub test_id: i64,
    pub label: Dimension,
    pub taken_at: chrono::DateTime<chrono::Utc>,
    pub dimension_totals: BTreeMap<Dimension, i64>,
    pub percentages: BTreeMap<Dimension, u32>,
}

/// Latest-result projection for both families. `None` means not yet tested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearningProfile {
    pub learning_pattern: Option<FamilyProfile>,
    pub learning_style: Option<FamilyProfile>,
}

/// Aggregated profile data for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub role: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub learning_pattern: Option<Dimension>,
    pub learning_style: Option<Dimension>,
    pub profile: LearningProfile,
    pub pattern_results_count: i64,
    pub style_results_count: i64,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
