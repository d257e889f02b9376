//! Persistence for forums and their embedded comment/reply threads.
//!
//! Comments and replies live inside their forum record, so every mutation is a
//! write to a single record. Backends must make appends atomic: two concurrent
//! `add_comment` calls on the same forum both end up in `comments`.

mod memory;
mod postgres;

pub use memory::{MemoryStore, Seed};
pub use postgres::PgStore;

use uuid::Uuid;

use crate::{
	model::User,
	route::discussion::model::{
		Comment, CreateForumInput, Forum, ForumFilter, ForumPage, Paginate, Reply, UpdateForumInput,
	},
};

/// Outcomes of store operations that the caller has to handle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown forum {0}")]
	UnknownForum(Uuid),
	#[error("unknown comment {comment} in forum {forum}")]
	UnknownComment { forum: Uuid, comment: Uuid },
	#[error("unknown course {0}")]
	UnknownCourse(Uuid),
	#[error("unknown user {0}")]
	UnknownUser(Uuid),
	#[error("user {0} is not an instructor")]
	NotInstructor(Uuid),
	#[error("user {user} does not own forum {forum}")]
	NotForumOwner { forum: Uuid, user: Uuid },
	#[error("forum {forum} is at version {actual}, expected {expected}")]
	VersionMismatch {
		forum: Uuid,
		expected: i64,
		actual: i64,
	},
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

#[axum::async_trait]
pub trait ForumStore: Send + Sync {
	/// Resolves the user an API key belongs to.
	async fn user_by_api_key(&self, key: Uuid) -> Result<Option<User>, Error>;

	/// Creates a forum with no comments. The instructor must exist and have the
	/// instructor role, and the course must exist.
	async fn create_forum(&self, instructor_id: Uuid, input: CreateForumInput)
		-> Result<Forum, Error>;

	/// Lists forums newest first. Forums created at the same instant are
	/// ordered by id so that pages never overlap.
	async fn list_forums(&self, filter: ForumFilter, paginate: Paginate)
		-> Result<ForumPage, Error>;

	/// Fetches a forum with its full comment tree.
	async fn forum(&self, forum_id: Uuid) -> Result<Forum, Error>;

	/// Appends a comment to the end of the forum's comments.
	async fn add_comment(&self, forum_id: Uuid, comment: Comment) -> Result<Forum, Error>;

	/// Appends a reply to the end of a comment's replies. The comment must
	/// belong to this forum.
	async fn add_reply(&self, forum_id: Uuid, comment_id: Uuid, reply: Reply)
		-> Result<Forum, Error>;

	/// Changes the forum's own fields. Only the owning instructor may do this,
	/// and if `expected_version` is given it must match the stored version.
	async fn update_forum(
		&self,
		forum_id: Uuid,
		requester_id: Uuid,
		changes: UpdateForumInput,
		expected_version: Option<i64>,
	) -> Result<Forum, Error>;

	/// Deletes the forum together with every comment and reply in it.
	async fn delete_forum(&self, forum_id: Uuid, requester_id: Uuid) -> Result<(), Error>;
}
