use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;

use crate::{
	error::{self, ErrorShape},
	store, AppState,
};

pub mod model;
pub mod route;

/// Errors of the discussion routes: ids in the path that are not UUIDs, and
/// everything the store reports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("malformed forum id {0:?}")]
	MalformedForumId(String),
	#[error("malformed comment id {0:?}")]
	MalformedCommentId(String),
	#[error(transparent)]
	Store(#[from] store::Error),
}

pub type RouteError = error::RouteError<Error>;

impl From<store::Error> for RouteError {
	fn from(error: store::Error) -> Self {
		Self::Route(Error::Store(error))
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/create", post_with(create_forum, create_forum_docs))
		.api_route("/student", get_with(list_forums, list_forums_docs))
		.api_route(
			"/instructor",
			get_with(list_instructor_forums, list_instructor_forums_docs),
		)
		.api_route(
			"/student/:forum_id/comments",
			post_with(add_comment, add_comment_docs),
		)
		.api_route(
			"/:forum_id",
			get_with(get_forum, get_forum_docs)
				.put_with(edit_forum, edit_forum_docs)
				.delete_with(delete_forum, delete_forum_docs),
		)
		.api_route(
			"/:forum_id/comments/:comment_id/reply",
			post_with(add_reply, add_reply_docs),
		)
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::MalformedForumId(..) | Self::MalformedCommentId(..) => StatusCode::NOT_FOUND,
			Self::Store(error) => error.status(),
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::MalformedForumId(raw) => error::Message::new("unknown_forum")
				.detail("forum", raw.as_str())
				.into_vec(),
			Self::MalformedCommentId(raw) => error::Message::new("unknown_comment")
				.detail("comment", raw.as_str())
				.into_vec(),
			Self::Store(error) => error.errors(),
		}
	}

	fn message(&self) -> String {
		match self {
			Self::MalformedForumId(..) => "forum not found".into(),
			Self::MalformedCommentId(..) => "comment not found in this forum".into(),
			Self::Store(error) => error.message(),
		}
	}
}

impl ErrorShape for store::Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownForum(..)
			| Self::UnknownComment { .. }
			| Self::UnknownCourse(..)
			| Self::UnknownUser(..) => StatusCode::NOT_FOUND,
			Self::NotInstructor(..) | Self::NotForumOwner { .. } => StatusCode::FORBIDDEN,
			Self::VersionMismatch { .. } => StatusCode::CONFLICT,
			Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::UnknownForum(forum) => error::Message::new("unknown_forum")
				.detail("forum", forum.to_string())
				.into_vec(),
			Self::UnknownComment { forum, comment } => error::Message::new("unknown_comment")
				.detail("forum", forum.to_string())
				.detail("comment", comment.to_string())
				.into_vec(),
			Self::UnknownCourse(course) => error::Message::new("unknown_course")
				.field("courseId")
				.detail("course", course.to_string())
				.into_vec(),
			Self::UnknownUser(user) => error::Message::new("unknown_user")
				.detail("user", user.to_string())
				.into_vec(),
			Self::NotInstructor(..) => error::Message::new("not_instructor").into_vec(),
			Self::NotForumOwner { forum, .. } => error::Message::new("not_forum_owner")
				.detail("forum", forum.to_string())
				.into_vec(),
			Self::VersionMismatch {
				expected, actual, ..
			} => error::Message::new("version_mismatch")
				.detail("expected", *expected)
				.detail("actual", *actual)
				.into_vec(),
			Self::Database(..) => error::Message::new("internal_server_error").into_vec(),
		}
	}

	fn message(&self) -> String {
		match self {
			Self::UnknownForum(..) => "forum not found".into(),
			Self::UnknownComment { .. } => "comment not found in this forum".into(),
			Self::UnknownCourse(..) => "course not found".into(),
			Self::UnknownUser(..) => "user not found".into(),
			Self::NotInstructor(..) => "only instructors can create forums".into(),
			Self::NotForumOwner { .. } => "only the instructor who created this forum can change it".into(),
			Self::VersionMismatch { .. } => "the forum was changed by someone else, reload it and try again".into(),
			Self::Database(..) => "internal server error".into(),
		}
	}
}
