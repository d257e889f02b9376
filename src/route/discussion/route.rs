use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{IfMatch, Json, Path, Query, Session},
	openapi::tag,
	Store,
};

use super::{
	model::{self, Envelope},
	RouteError,
};

/// Create forum
/// Creates an empty forum in a course. Only instructors can create forums.
#[route(
	tag = tag::DISCUSSION,
	response(status = 201, description = "The forum was created.", shape = "Json<Envelope<model::Forum>>")
)]
pub async fn create_forum(
	State(store): State<Store>,
	session: Session,
	Json(input): Json<model::CreateForumInput>,
) -> Result<(StatusCode, Json<Envelope<model::Forum>>), RouteError> {
	let forum = store.create_forum(session.user.id, input).await?;

	tracing::info!(forum = %forum.id, course = %forum.course_id, "forum created");

	Ok((StatusCode::CREATED, Json(Envelope::data(forum))))
}

/// List forums
/// Returns a page of forums, newest first, optionally limited to one course.
#[route(tag = tag::DISCUSSION)]
pub async fn list_forums(
	State(store): State<Store>,
	_session: Session,
	Query(input): Query<model::ListForumsInput>,
) -> Result<Json<Envelope<model::ForumPage>>, RouteError> {
	let filter = model::ForumFilter {
		course_id: input.course_id,
		..Default::default()
	};
	let page = store.list_forums(filter, input.paginate()).await?;

	Ok(Json(Envelope::data(page)))
}

/// List own forums
/// Returns a page of the forums created by the calling instructor, newest first.
#[route(tag = tag::DISCUSSION)]
pub async fn list_instructor_forums(
	State(store): State<Store>,
	session: Session,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<Envelope<model::ForumPage>>, RouteError> {
	let filter = model::ForumFilter {
		instructor_id: Some(session.user.id),
		..Default::default()
	};
	let page = store.list_forums(filter, paginate).await?;

	Ok(Json(Envelope::data(page)))
}

/// Get forum
/// Returns a single forum with all of its comments and replies.
#[route(tag = tag::DISCUSSION)]
pub async fn get_forum(
	State(store): State<Store>,
	_session: Session,
	Path(path): Path<model::ForumPath>,
) -> Result<Json<Envelope<model::Forum>>, RouteError> {
	let forum = store.forum(path.forum_id()?).await?;

	Ok(Json(Envelope::data(forum)))
}

/// Add comment
/// Appends a comment to the end of a forum's comments and returns the updated forum.
#[route(tag = tag::DISCUSSION)]
pub async fn add_comment(
	State(store): State<Store>,
	session: Session,
	Path(path): Path<model::ForumPath>,
	Json(input): Json<model::CommentInput>,
) -> Result<Json<Envelope<model::Forum>>, RouteError> {
	let forum_id = path.forum_id()?;
	let comment = model::Comment::new(session.user.id, &input.content);
	let comment_id = comment.id;
	let forum = store.add_comment(forum_id, comment).await?;

	tracing::info!(forum = %forum.id, comment = %comment_id, "comment added");

	Ok(Json(Envelope::data(forum)))
}

/// Reply to comment
/// Appends a reply to a comment of the given forum and returns the updated forum.
#[route(tag = tag::DISCUSSION)]
pub async fn add_reply(
	State(store): State<Store>,
	session: Session,
	Path(path): Path<model::CommentPath>,
	Json(input): Json<model::ReplyInput>,
) -> Result<Json<Envelope<model::Forum>>, RouteError> {
	let forum_id = path.forum_id()?;
	let comment_id = path.comment_id()?;
	let reply = model::Reply::new(session.user.id, &input.content);
	let reply_id = reply.id;
	let forum = store.add_reply(forum_id, comment_id, reply).await?;

	tracing::info!(
		forum = %forum.id,
		comment = %comment_id,
		reply = %reply_id,
		"reply added"
	);

	Ok(Json(Envelope::data(forum)))
}

/// Edit forum
/// Changes the title, topic, description or course of a forum. Send the last seen
/// version in `If-Match` to reject the edit if someone else changed the forum since.
#[route(tag = tag::DISCUSSION)]
pub async fn edit_forum(
	State(store): State<Store>,
	session: Session,
	Path(path): Path<model::ForumPath>,
	IfMatch(version): IfMatch,
	Json(input): Json<model::UpdateForumInput>,
) -> Result<Json<Envelope<model::Forum>>, RouteError> {
	let forum = store
		.update_forum(path.forum_id()?, session.user.id, input, version)
		.await?;

	tracing::info!(forum = %forum.id, version = forum.version, "forum edited");

	Ok(Json(Envelope::data(forum)))
}

/// Delete forum
/// Deletes a forum together with all of its comments and replies.
#[route(tag = tag::DISCUSSION)]
pub async fn delete_forum(
	State(store): State<Store>,
	session: Session,
	Path(path): Path<model::ForumPath>,
) -> Result<Json<Envelope<()>>, RouteError> {
	let forum_id = path.forum_id()?;

	store.delete_forum(forum_id, session.user.id).await?;

	tracing::info!(forum = %forum_id, "forum deleted");

	Ok(Json(Envelope::message("forum deleted")))
}
