use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use uuid::Uuid;

use super::{Error, ForumStore};
use crate::{
	model::{Role, User},
	route::discussion::model::{
		Comment, CreateForumInput, Forum, ForumFilter, ForumPage, Paginate, Reply, UpdateForumInput,
	},
};

const COURSE_FOREIGN_KEY: &str = "forum_course_id_fkey";

/// A store backed by Postgres.
///
/// A forum is one row; its comments (with their replies) are a single `JSONB`
/// array. Appends are single `UPDATE` statements, so the row lock taken by
/// Postgres serializes concurrent writers and none of them are lost.
#[derive(Clone)]
pub struct PgStore {
	pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct ForumRow {
	id: Uuid,
	instructor_id: Uuid,
	course_id: Uuid,
	title: String,
	topic: String,
	description: String,
	comments: Json<Vec<Comment>>,
	version: i64,
	created_at: chrono::DateTime<chrono::Utc>,
	updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ForumRow> for Forum {
	fn from(row: ForumRow) -> Self {
		Self {
			id: row.id,
			instructor_id: row.instructor_id,
			course_id: row.course_id,
			title: row.title,
			topic: row.topic,
			description: row.description,
			comments: row.comments.0,
			version: row.version,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

/// Maps a violated course foreign key to [`Error::UnknownCourse`].
fn course_error(course_id: Uuid) -> impl FnOnce(sqlx::Error) -> Error {
	move |error| match error {
		sqlx::Error::Database(ref d) if d.constraint() == Some(COURSE_FOREIGN_KEY) => {
			Error::UnknownCourse(course_id)
		}
		error => Error::Database(error),
	}
}

impl PgStore {
	/// Connects to the database and applies pending migrations.
	pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
		let pool = PgPoolOptions::new().max_connections(16).connect(url).await?;

		sqlx::migrate!()
			.run(&pool)
			.await
			.map_err(|error| sqlx::Error::Migrate(Box::new(error)))?;

		Ok(Self::new(pool))
	}

	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	async fn user_role(&self, user_id: Uuid) -> Result<Role, Error> {
		sqlx::query_scalar::<_, Role>(r#"SELECT role FROM "user" WHERE id = $1"#)
			.bind(user_id)
			.fetch_optional(&self.pool)
			.await?
			.ok_or(Error::UnknownUser(user_id))
	}

	/// Works out why a guarded write touched no row.
	async fn explain_missing(
		&self,
		forum_id: Uuid,
		requester_id: Uuid,
		expected_version: Option<i64>,
	) -> Error {
		let row = sqlx::query_as::<_, (Uuid, i64)>(
			"SELECT instructor_id, version FROM forum WHERE id = $1",
		)
		.bind(forum_id)
		.fetch_optional(&self.pool)
		.await;

		match row {
			Err(error) => Error::Database(error),
			Ok(None) => Error::UnknownForum(forum_id),
			Ok(Some((owner, _))) if owner != requester_id => Error::NotForumOwner {
				forum: forum_id,
				user: requester_id,
			},
			Ok(Some((_, actual))) => Error::VersionMismatch {
				forum: forum_id,
				expected: expected_version.unwrap_or(actual),
				actual,
			},
		}
	}
}

#[axum::async_trait]
impl ForumStore for PgStore {
	async fn user_by_api_key(&self, key: Uuid) -> Result<Option<User>, Error> {
		let user = sqlx::query_as::<_, User>(
			r#"
				SELECT * FROM "user" WHERE id = (
					SELECT user_id FROM api_key WHERE id = $1
				)
			"#,
		)
		.bind(key)
		.fetch_optional(&self.pool)
		.await?;

		Ok(user)
	}

	#[tracing::instrument(skip(self, input))]
	async fn create_forum(
		&self,
		instructor_id: Uuid,
		input: CreateForumInput,
	) -> Result<Forum, Error> {
		if self.user_role(instructor_id).await? != Role::Instructor {
			return Err(Error::NotInstructor(instructor_id));
		}

		let row = sqlx::query_as::<_, ForumRow>(
			r#"
				INSERT INTO forum (id, instructor_id, course_id, title, topic, description)
				VALUES ($1, $2, $3, $4, $5, $6)
				RETURNING *
			"#,
		)
		.bind(Uuid::new_v4())
		.bind(instructor_id)
		.bind(input.course_id)
		.bind(&input.title)
		.bind(&input.topic)
		.bind(&input.description)
		.fetch_one(&self.pool)
		.await
		.map_err(course_error(input.course_id))?;

		Ok(row.into())
	}

	async fn list_forums(
		&self,
		filter: ForumFilter,
		paginate: Paginate,
	) -> Result<ForumPage, Error> {
		let forums = sqlx::query_as::<_, ForumRow>(
			r#"
				SELECT * FROM forum
				WHERE ($1::UUID IS NULL OR course_id = $1)
					AND ($2::UUID IS NULL OR instructor_id = $2)
				ORDER BY created_at DESC, id DESC
				LIMIT $3 OFFSET $4
			"#,
		)
		.bind(filter.course_id)
		.bind(filter.instructor_id)
		.bind(paginate.limit())
		.bind(paginate.offset())
		.fetch_all(&self.pool)
		.await?;

		let total = sqlx::query_scalar::<_, i64>(
			r#"
				SELECT COUNT(*) FROM forum
				WHERE ($1::UUID IS NULL OR course_id = $1)
					AND ($2::UUID IS NULL OR instructor_id = $2)
			"#,
		)
		.bind(filter.course_id)
		.bind(filter.instructor_id)
		.fetch_one(&self.pool)
		.await?;

		Ok(ForumPage::new(
			forums.into_iter().map(Forum::from).collect(),
			total,
			&paginate,
		))
	}

	async fn forum(&self, forum_id: Uuid) -> Result<Forum, Error> {
		sqlx::query_as::<_, ForumRow>("SELECT * FROM forum WHERE id = $1")
			.bind(forum_id)
			.fetch_optional(&self.pool)
			.await?
			.map(Forum::from)
			.ok_or(Error::UnknownForum(forum_id))
	}

	#[tracing::instrument(skip(self, comment), fields(comment = %comment.id))]
	async fn add_comment(&self, forum_id: Uuid, comment: Comment) -> Result<Forum, Error> {
		self.user_role(comment.student_id).await?;

		let row = sqlx::query_as::<_, ForumRow>(
			r#"
				UPDATE forum
				SET comments = comments || jsonb_build_array($2::JSONB),
					version = version + 1,
					updated_at = NOW()
				WHERE id = $1
				RETURNING *
			"#,
		)
		.bind(forum_id)
		.bind(Json(&comment))
		.fetch_optional(&self.pool)
		.await?;

		row.map(Forum::from).ok_or(Error::UnknownForum(forum_id))
	}

	#[tracing::instrument(skip(self, reply), fields(reply = %reply.id))]
	async fn add_reply(
		&self,
		forum_id: Uuid,
		comment_id: Uuid,
		reply: Reply,
	) -> Result<Forum, Error> {
		self.user_role(reply.author_id).await?;

		// Comments are never removed or reordered, so the index found in
		// the subquery still points at the same comment once the row lock is held.
		let row = sqlx::query_as::<_, ForumRow>(
			r#"
				UPDATE forum
				SET comments = jsonb_set(
						forum.comments,
						ARRAY[target.idx::TEXT, 'replies'],
						COALESCE(forum.comments -> target.idx::INT -> 'replies', '[]'::JSONB)
							|| jsonb_build_array($3::JSONB)
					),
					version = forum.version + 1,
					updated_at = NOW()
				FROM (
					SELECT element.n - 1 AS idx
					FROM forum, jsonb_array_elements(forum.comments) WITH ORDINALITY AS element(value, n)
					WHERE forum.id = $1 AND element.value ->> 'id' = $2
				) AS target
				WHERE forum.id = $1
				RETURNING forum.*
			"#,
		)
		.bind(forum_id)
		.bind(comment_id.to_string())
		.bind(Json(&reply))
		.fetch_optional(&self.pool)
		.await?;

		if let Some(row) = row {
			return Ok(row.into());
		}

		let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM forum WHERE id = $1)")
			.bind(forum_id)
			.fetch_one(&self.pool)
			.await?;

		Err(if exists {
			Error::UnknownComment {
				forum: forum_id,
				comment: comment_id,
			}
		} else {
			Error::UnknownForum(forum_id)
		})
	}

	#[tracing::instrument(skip(self, changes))]
	async fn update_forum(
		&self,
		forum_id: Uuid,
		requester_id: Uuid,
		changes: UpdateForumInput,
		expected_version: Option<i64>,
	) -> Result<Forum, Error> {
		let row = sqlx::query_as::<_, ForumRow>(
			r#"
				UPDATE forum
				SET title = COALESCE($3, title),
					topic = COALESCE($4, topic),
					description = COALESCE($5, description),
					course_id = COALESCE($6, course_id),
					version = version + 1,
					updated_at = NOW()
				WHERE id = $1
					AND instructor_id = $2
					AND ($7::BIGINT IS NULL OR version = $7)
				RETURNING *
			"#,
		)
		.bind(forum_id)
		.bind(requester_id)
		.bind(&changes.title)
		.bind(&changes.topic)
		.bind(&changes.description)
		.bind(changes.course_id)
		.bind(expected_version)
		.fetch_optional(&self.pool)
		.await
		.map_err(|error| match changes.course_id {
			Some(course_id) => course_error(course_id)(error),
			None => Error::Database(error),
		})?;

		match row {
			Some(row) => Ok(row.into()),
			None => Err(self
				.explain_missing(forum_id, requester_id, expected_version)
				.await),
		}
	}

	#[tracing::instrument(skip(self))]
	async fn delete_forum(&self, forum_id: Uuid, requester_id: Uuid) -> Result<(), Error> {
		let result = sqlx::query("DELETE FROM forum WHERE id = $1 AND instructor_id = $2")
			.bind(forum_id)
			.bind(requester_id)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(self.explain_missing(forum_id, requester_id, None).await);
		}

		Ok(())
	}
}
