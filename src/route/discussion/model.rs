pub use crate::route::model::{Envelope, Paginate};

use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::Error;

pub const COMMENT_MIN_LENGTH: usize = 2;
pub const CONTENT_MAX_LENGTH: usize = 1000;

/// Checks the length of `content` in characters, ignoring surrounding whitespace.
fn trimmed_length(
	content: &str,
	min: usize,
	max: usize,
	message: &'static str,
) -> Result<(), ValidationError> {
	let length = content.trim().chars().count();

	if length < min || length > max {
		let mut error = ValidationError::new("length");
		error.message = Some(message.into());
		error.add_param("min".into(), &min);
		error.add_param("max".into(), &max);
		error.add_param("value".into(), &length);

		return Err(error);
	}

	Ok(())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
	trimmed_length(title, 10, 200, "title must be between 10 and 200 characters")
}

fn validate_topic(topic: &str) -> Result<(), ValidationError> {
	trimmed_length(topic, 5, 100, "topic must be between 5 and 100 characters")
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
	trimmed_length(
		description,
		50,
		5000,
		"description must be between 50 and 5000 characters",
	)
}

fn validate_comment(content: &str) -> Result<(), ValidationError> {
	trimmed_length(
		content,
		COMMENT_MIN_LENGTH,
		CONTENT_MAX_LENGTH,
		"content must be between 2 and 1000 characters",
	)
}

fn validate_reply(content: &str) -> Result<(), ValidationError> {
	trimmed_length(
		content,
		1,
		CONTENT_MAX_LENGTH,
		"content must be between 1 and 1000 characters",
	)
}

/// A discussion forum attached to a course, owned by the instructor who created it.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Forum {
	/// The unique identifier of the forum.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The instructor that created the forum.
	#[serde(skip_deserializing)]
	pub instructor_id: Uuid,
	/// The course the forum belongs to.
	pub course_id: Uuid,
	/// The title of the forum.
	#[validate(custom(function = "validate_title"))]
	pub title: String,
	/// A short topic line.
	#[validate(custom(function = "validate_topic"))]
	pub topic: String,
	/// The opening post of the forum.
	#[validate(custom(function = "validate_description"))]
	pub description: String,
	/// Top-level comments, oldest first.
	#[serde(skip_deserializing)]
	pub comments: Vec<Comment>,
	/// Incremented on every write; send it back in `If-Match` to guard edits.
	#[serde(skip_deserializing)]
	pub version: i64,
	/// The creation time of the forum.
	#[serde(skip_deserializing)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	/// The time of the last write to the forum, including comments and replies.
	#[serde(skip_deserializing)]
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// A top-level post within a forum.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
	pub id: Uuid,
	/// The user that wrote the comment.
	pub student_id: Uuid,
	pub content: String,
	/// Replies to this comment, oldest first.
	#[serde(default)]
	pub replies: Vec<Reply>,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Comment {
	pub fn new(student_id: Uuid, content: &str) -> Self {
		Self {
			id: Uuid::new_v4(),
			student_id,
			content: content.trim().to_owned(),
			replies: Vec::new(),
			created_at: chrono::Utc::now(),
		}
	}
}

/// A response to a specific comment.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
	pub id: Uuid,
	/// The user that wrote the reply, student or instructor.
	pub author_id: Uuid,
	pub content: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Reply {
	pub fn new(author_id: Uuid, content: &str) -> Self {
		Self {
			id: Uuid::new_v4(),
			author_id,
			content: content.trim().to_owned(),
			created_at: chrono::Utc::now(),
		}
	}
}

/// One page of forums, newest first.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ForumPage {
	pub forums: Vec<Forum>,
	pub current_page: i64,
	pub total_pages: i64,
}

impl ForumPage {
	pub fn new(forums: Vec<Forum>, total: i64, paginate: &Paginate) -> Self {
		Self {
			forums,
			current_page: paginate.page,
			total_pages: (total + paginate.limit - 1) / paginate.limit,
		}
	}
}

/// Which forums to list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForumFilter {
	pub course_id: Option<Uuid>,
	pub instructor_id: Option<Uuid>,
}

impl ForumFilter {
	pub fn matches(&self, forum: &Forum) -> bool {
		self.course_id.map_or(true, |id| forum.course_id == id)
			&& self.instructor_id.map_or(true, |id| forum.instructor_id == id)
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CommentInput {
	/// The comment text, 2 to 1000 characters once surrounding whitespace is removed.
	#[validate(custom(function = "validate_comment"))]
	pub content: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct ReplyInput {
	/// The reply text, 1 to 1000 characters once surrounding whitespace is removed.
	#[validate(custom(function = "validate_reply"))]
	pub content: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListForumsInput {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 1_000_000))]
	#[serde(default = "crate::route::model::one")]
	pub page: i64,
	/// The number of forums per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "crate::route::model::ten")]
	pub limit: i64,
	/// Only list forums of this course.
	pub course_id: Option<Uuid>,
}

impl ListForumsInput {
	pub fn paginate(&self) -> Paginate {
		Paginate {
			page: self.page,
			limit: self.limit,
		}
	}
}

/// Ids are taken as text so that one that is not a UUID is reported as
/// not found, the same as a well-formed id that matches nothing.
fn parse_id(raw: &str) -> Option<Uuid> {
	Uuid::parse_str(raw.trim()).ok()
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct ForumPath {
	/// The id of the forum.
	pub forum_id: String,
}

impl ForumPath {
	pub fn forum_id(&self) -> Result<Uuid, Error> {
		parse_id(&self.forum_id).ok_or_else(|| Error::MalformedForumId(self.forum_id.clone()))
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CommentPath {
	/// The id of the forum the comment belongs to.
	pub forum_id: String,
	/// The id of the comment.
	pub comment_id: String,
}

impl CommentPath {
	pub fn forum_id(&self) -> Result<Uuid, Error> {
		parse_id(&self.forum_id).ok_or_else(|| Error::MalformedForumId(self.forum_id.clone()))
	}

	pub fn comment_id(&self) -> Result<Uuid, Error> {
		parse_id(&self.comment_id)
			.ok_or_else(|| Error::MalformedCommentId(self.comment_id.clone()))
	}
}
