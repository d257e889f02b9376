use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a user is allowed to do in a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, JsonSchema, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
	Student,
	Instructor,
}

/// A single user.
///
/// Users are provisioned outside of this service; it only resolves them
/// from API keys and checks that referenced authors exist.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: Uuid,
	pub username: String,
	pub role: Role,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A course that forums are attached to.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
	pub id: Uuid,
	pub title: String,
	pub instructor_id: Option<Uuid>,
	pub created_at: chrono::DateTime<chrono::Utc>,
}
