use dashmap::DashMap;
use serde::Deserialize;
use uuid::Uuid;

use super::{Error, ForumStore};
use crate::{
	model::{Course, Role, User},
	route::discussion::model::{
		Comment, CreateForumInput, Forum, ForumFilter, ForumPage, Paginate, Reply, UpdateForumInput,
	},
};

/// Users and courses to preload into a [`MemoryStore`], read from a JSON file.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
	#[serde(default)]
	pub users: Vec<SeedUser>,
	#[serde(default)]
	pub courses: Vec<SeedCourse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
	pub id: Uuid,
	pub username: String,
	pub role: Role,
	pub api_key: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedCourse {
	pub id: Uuid,
	pub title: String,
	pub instructor_id: Option<Uuid>,
}

/// A store that keeps everything in process memory.
///
/// Each forum is a single map entry; mutations hold that entry's lock for the
/// whole read-modify-write, which makes appends atomic.
#[derive(Default)]
pub struct MemoryStore {
	users: DashMap<Uuid, User>,
	/// api key -> user id
	api_keys: DashMap<Uuid, Uuid>,
	courses: DashMap<Uuid, Course>,
	forums: DashMap<Uuid, Forum>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_seed(seed: Seed) -> Self {
		let store = Self::new();
		let now = chrono::Utc::now();

		for user in seed.users {
			store.insert_user(
				User {
					id: user.id,
					username: user.username,
					role: user.role,
					created_at: now,
				},
				user.api_key,
			);
		}

		for course in seed.courses {
			store.insert_course(Course {
				id: course.id,
				title: course.title,
				instructor_id: course.instructor_id,
				created_at: now,
			});
		}

		store
	}

	pub fn insert_user(&self, user: User, api_key: Uuid) {
		self.api_keys.insert(api_key, user.id);
		self.users.insert(user.id, user);
	}

	pub fn insert_course(&self, course: Course) {
		self.courses.insert(course.id, course);
	}

	fn ensure_user(&self, user_id: Uuid) -> Result<(), Error> {
		if self.users.contains_key(&user_id) {
			Ok(())
		} else {
			Err(Error::UnknownUser(user_id))
		}
	}

	fn ensure_course(&self, course_id: Uuid) -> Result<(), Error> {
		if self.courses.contains_key(&course_id) {
			Ok(())
		} else {
			Err(Error::UnknownCourse(course_id))
		}
	}
}

#[axum::async_trait]
impl ForumStore for MemoryStore {
	async fn user_by_api_key(&self, key: Uuid) -> Result<Option<User>, Error> {
		let Some(user_id) = self.api_keys.get(&key).map(|entry| *entry.value()) else {
			return Ok(None);
		};

		Ok(self.users.get(&user_id).map(|entry| entry.value().clone()))
	}

	async fn create_forum(
		&self,
		instructor_id: Uuid,
		input: CreateForumInput,
	) -> Result<Forum, Error> {
		let role = self
			.users
			.get(&instructor_id)
			.map(|user| user.role)
			.ok_or(Error::UnknownUser(instructor_id))?;

		if role != Role::Instructor {
			return Err(Error::NotInstructor(instructor_id));
		}

		self.ensure_course(input.course_id)?;

		let now = chrono::Utc::now();
		let forum = Forum {
			id: Uuid::new_v4(),
			instructor_id,
			course_id: input.course_id,
			title: input.title,
			topic: input.topic,
			description: input.description,
			comments: Vec::new(),
			version: 0,
			created_at: now,
			updated_at: now,
		};

		self.forums.insert(forum.id, forum.clone());

		Ok(forum)
	}

	async fn list_forums(
		&self,
		filter: ForumFilter,
		paginate: Paginate,
	) -> Result<ForumPage, Error> {
		let mut forums = self
			.forums
			.iter()
			.filter(|entry| filter.matches(entry.value()))
			.map(|entry| entry.value().clone())
			.collect::<Vec<_>>();

		forums.sort_by(|a, b| {
			b.created_at
				.cmp(&a.created_at)
				.then_with(|| b.id.cmp(&a.id))
		});

		let total = i64::try_from(forums.len()).unwrap_or(i64::MAX);
		let offset = usize::try_from(paginate.offset()).unwrap_or(usize::MAX);
		let limit = usize::try_from(paginate.limit()).unwrap_or(0);

		let forums = forums.into_iter().skip(offset).take(limit).collect();

		Ok(ForumPage::new(forums, total, &paginate))
	}

	async fn forum(&self, forum_id: Uuid) -> Result<Forum, Error> {
		self.forums
			.get(&forum_id)
			.map(|entry| entry.value().clone())
			.ok_or(Error::UnknownForum(forum_id))
	}

	async fn add_comment(&self, forum_id: Uuid, comment: Comment) -> Result<Forum, Error> {
		self.ensure_user(comment.student_id)?;

		let mut forum = self
			.forums
			.get_mut(&forum_id)
			.ok_or(Error::UnknownForum(forum_id))?;

		forum.comments.push(comment);
		forum.version += 1;
		forum.updated_at = chrono::Utc::now();

		Ok(forum.clone())
	}

	async fn add_reply(
		&self,
		forum_id: Uuid,
		comment_id: Uuid,
		reply: Reply,
	) -> Result<Forum, Error> {
		self.ensure_user(reply.author_id)?;

		let mut forum = self
			.forums
			.get_mut(&forum_id)
			.ok_or(Error::UnknownForum(forum_id))?;

		forum
			.comments
			.iter_mut()
			.find(|comment| comment.id == comment_id)
			.ok_or(Error::UnknownComment {
				forum: forum_id,
				comment: comment_id,
			})?
			.replies
			.push(reply);

		forum.version += 1;
		forum.updated_at = chrono::Utc::now();

		Ok(forum.clone())
	}

	async fn update_forum(
		&self,
		forum_id: Uuid,
		requester_id: Uuid,
		changes: UpdateForumInput,
		expected_version: Option<i64>,
	) -> Result<Forum, Error> {
		let mut forum = self
			.forums
			.get_mut(&forum_id)
			.ok_or(Error::UnknownForum(forum_id))?;

		if forum.instructor_id != requester_id {
			return Err(Error::NotForumOwner {
				forum: forum_id,
				user: requester_id,
			});
		}

		if let Some(expected) = expected_version.filter(|expected| *expected != forum.version) {
			return Err(Error::VersionMismatch {
				forum: forum_id,
				expected,
				actual: forum.version,
			});
		}

		if let Some(course_id) = changes.course_id {
			self.ensure_course(course_id)?;
			forum.course_id = course_id;
		}

		if let Some(title) = changes.title {
			forum.title = title;
		}

		if let Some(topic) = changes.topic {
			forum.topic = topic;
		}

		if let Some(description) = changes.description {
			forum.description = description;
		}

		forum.version += 1;
		forum.updated_at = chrono::Utc::now();

		Ok(forum.clone())
	}

	async fn delete_forum(&self, forum_id: Uuid, requester_id: Uuid) -> Result<(), Error> {
		if self
			.forums
			.remove_if(&forum_id, |_, forum| forum.instructor_id == requester_id)
			.is_some()
		{
			return Ok(());
		}

		if self.forums.contains_key(&forum_id) {
			Err(Error::NotForumOwner {
				forum: forum_id,
				user: requester_id,
			})
		} else {
			Err(Error::UnknownForum(forum_id))
		}
	}
}

#[cfg(test)]
mod test {
	use std::sync::Arc;

	use super::*;

	struct Fixture {
		store: Arc<MemoryStore>,
		instructor: Uuid,
		student: Uuid,
		course: Uuid,
	}

	fn user(role: Role) -> User {
		User {
			id: Uuid::new_v4(),
			username: format!("{role:?}").to_lowercase(),
			role,
			created_at: chrono::Utc::now(),
		}
	}

	fn fixture() -> Fixture {
		let instructor = user(Role::Instructor);
		let student = user(Role::Student);
		let course = Course {
			id: Uuid::new_v4(),
			title: "Rust 101".into(),
			instructor_id: Some(instructor.id),
			created_at: chrono::Utc::now(),
		};

		let fixture = Fixture {
			store: Arc::new(MemoryStore::new()),
			instructor: instructor.id,
			student: student.id,
			course: course.id,
		};

		fixture.store.insert_user(instructor, Uuid::new_v4());
		fixture.store.insert_user(student, Uuid::new_v4());
		fixture.store.insert_course(course);

		fixture
	}

	fn input(course_id: Uuid) -> CreateForumInput {
		CreateForumInput {
			course_id,
			title: "Borrowing rules".into(),
			topic: "Ownership".into(),
			description: "Post your questions about the borrow checker in this forum.".into(),
		}
	}

	impl Fixture {
		async fn forum(&self) -> Forum {
			self.store
				.create_forum(self.instructor, input(self.course))
				.await
				.unwrap()
		}
	}

	#[tokio::test]
	async fn test_created_forum_has_no_comments() {
		let fixture = fixture();
		let forum = fixture.forum().await;
		let fetched = fixture.store.forum(forum.id).await.unwrap();

		assert!(fetched.comments.is_empty());
		assert_eq!(fetched.version, 0);
		assert_eq!(fetched.instructor_id, fixture.instructor);
	}

	#[tokio::test]
	async fn test_students_cannot_create_forums() {
		let fixture = fixture();
		let result = fixture
			.store
			.create_forum(fixture.student, input(fixture.course))
			.await;

		assert!(matches!(result, Err(Error::NotInstructor(id)) if id == fixture.student));
	}

	#[tokio::test]
	async fn test_forum_needs_existing_course() {
		let fixture = fixture();
		let course = Uuid::new_v4();
		let result = fixture
			.store
			.create_forum(fixture.instructor, input(course))
			.await;

		assert!(matches!(result, Err(Error::UnknownCourse(id)) if id == course));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_comments_are_not_lost() {
		const COMMENTS: usize = 64;

		let fixture = fixture();
		let forum_id = fixture.forum().await.id;

		let tasks = (0..COMMENTS)
			.map(|i| {
				let store = Arc::clone(&fixture.store);
				let student = fixture.student;

				tokio::spawn(async move {
					store
						.add_comment(forum_id, Comment::new(student, &format!("comment {i}")))
						.await
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			task.await.unwrap().unwrap();
		}

		let forum = fixture.store.forum(forum_id).await.unwrap();

		assert_eq!(forum.comments.len(), COMMENTS);
		assert_eq!(forum.version, i64::try_from(COMMENTS).unwrap());
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_concurrent_replies_are_not_lost() {
		const REPLIES: usize = 32;

		let fixture = fixture();
		let forum_id = fixture.forum().await.id;
		let comment = Comment::new(fixture.student, "first");
		let comment_id = comment.id;

		fixture.store.add_comment(forum_id, comment).await.unwrap();

		let tasks = (0..REPLIES)
			.map(|i| {
				let store = Arc::clone(&fixture.store);
				let author = if i % 2 == 0 {
					fixture.student
				} else {
					fixture.instructor
				};

				tokio::spawn(async move {
					store
						.add_reply(forum_id, comment_id, Reply::new(author, &format!("reply {i}")))
						.await
				})
			})
			.collect::<Vec<_>>();

		for task in tasks {
			task.await.unwrap().unwrap();
		}

		let forum = fixture.store.forum(forum_id).await.unwrap();

		assert_eq!(forum.comments[0].replies.len(), REPLIES);
	}

	#[tokio::test]
	async fn test_insertion_order_is_kept() {
		let fixture = fixture();
		let forum = fixture.forum().await;

		// Same timestamp for both, so only insertion order can decide.
		let now = chrono::Utc::now();
		let mut first = Comment::new(fixture.student, "C1");
		let mut second = Comment::new(fixture.student, "C2");
		first.created_at = now;
		second.created_at = now;

		fixture.store.add_comment(forum.id, first).await.unwrap();
		fixture.store.add_comment(forum.id, second).await.unwrap();

		let forum = fixture.store.forum(forum.id).await.unwrap();
		let contents = forum
			.comments
			.iter()
			.map(|comment| comment.content.as_str())
			.collect::<Vec<_>>();

		assert_eq!(contents, ["C1", "C2"]);
	}

	#[tokio::test]
	async fn test_reply_to_comment_of_other_forum() {
		let fixture = fixture();
		let first = fixture.forum().await;
		let second = fixture.forum().await;
		let comment = Comment::new(fixture.student, "in the first forum");
		let comment_id = comment.id;

		fixture.store.add_comment(first.id, comment).await.unwrap();

		let result = fixture
			.store
			.add_reply(second.id, comment_id, Reply::new(fixture.student, "wrong forum"))
			.await;

		assert!(matches!(
			result,
			Err(Error::UnknownComment { forum, comment }) if forum == second.id && comment == comment_id
		));

		let first = fixture.store.forum(first.id).await.unwrap();

		assert!(first.comments[0].replies.is_empty());
	}

	#[tokio::test]
	async fn test_unknown_author_is_rejected() {
		let fixture = fixture();
		let forum = fixture.forum().await;
		let stranger = Uuid::new_v4();
		let result = fixture
			.store
			.add_comment(forum.id, Comment::new(stranger, "hello"))
			.await;

		assert!(matches!(result, Err(Error::UnknownUser(id)) if id == stranger));
	}

	#[tokio::test]
	async fn test_only_owner_may_edit_or_delete() {
		let fixture = fixture();
		let forum = fixture.forum().await;
		let other = user(Role::Instructor);
		let other_id = other.id;

		fixture.store.insert_user(other, Uuid::new_v4());

		let changes = UpdateForumInput {
			course_id: None,
			title: Some("A brand new title".into()),
			topic: None,
			description: None,
		};

		let result = fixture
			.store
			.update_forum(forum.id, other_id, changes, None)
			.await;

		assert!(matches!(result, Err(Error::NotForumOwner { .. })));

		let result = fixture.store.delete_forum(forum.id, other_id).await;

		assert!(matches!(result, Err(Error::NotForumOwner { .. })));
		assert!(fixture.store.forum(forum.id).await.is_ok());
	}

	#[tokio::test]
	async fn test_edit_keeps_comments_and_checks_version() {
		let fixture = fixture();
		let forum = fixture.forum().await;

		fixture
			.store
			.add_comment(forum.id, Comment::new(fixture.student, "hello"))
			.await
			.unwrap();

		let changes = || UpdateForumInput {
			course_id: None,
			title: Some("A brand new title".into()),
			topic: None,
			description: None,
		};

		let result = fixture
			.store
			.update_forum(forum.id, fixture.instructor, changes(), Some(0))
			.await;

		assert!(matches!(
			result,
			Err(Error::VersionMismatch {
				expected: 0,
				actual: 1,
				..
			})
		));

		let updated = fixture
			.store
			.update_forum(forum.id, fixture.instructor, changes(), Some(1))
			.await
			.unwrap();

		assert_eq!(updated.title, "A brand new title");
		assert_eq!(updated.topic, forum.topic);
		assert_eq!(updated.comments.len(), 1);
		assert_eq!(updated.version, 2);
	}

	#[tokio::test]
	async fn test_delete_removes_whole_thread() {
		let fixture = fixture();
		let forum = fixture.forum().await;

		for i in 0..3 {
			let comment = Comment::new(fixture.student, &format!("comment {i}"));
			let comment_id = comment.id;

			fixture.store.add_comment(forum.id, comment).await.unwrap();

			for j in 0..2 {
				fixture
					.store
					.add_reply(
						forum.id,
						comment_id,
						Reply::new(fixture.instructor, &format!("reply {j}")),
					)
					.await
					.unwrap();
			}
		}

		let before = fixture.store.forum(forum.id).await.unwrap();
		let replies = before
			.comments
			.iter()
			.map(|comment| comment.replies.len())
			.sum::<usize>();

		assert_eq!((before.comments.len(), replies), (3, 6));

		fixture
			.store
			.delete_forum(forum.id, fixture.instructor)
			.await
			.unwrap();

		assert!(matches!(
			fixture.store.forum(forum.id).await,
			Err(Error::UnknownForum(id)) if id == forum.id
		));
		assert!(matches!(
			fixture.store.delete_forum(forum.id, fixture.instructor).await,
			Err(Error::UnknownForum(..))
		));
	}

	#[tokio::test]
	async fn test_listing_is_filtered_and_deterministic() {
		let fixture = fixture();
		let other_course = Course {
			id: Uuid::new_v4(),
			title: "Rust 201".into(),
			instructor_id: None,
			created_at: chrono::Utc::now(),
		};
		let other_course_id = other_course.id;

		fixture.store.insert_course(other_course);

		for _ in 0..5 {
			fixture.forum().await;
		}

		let other = fixture
			.store
			.create_forum(fixture.instructor, input(other_course_id))
			.await
			.unwrap();

		let paginate = Paginate { page: 1, limit: 2 };
		let filter = ForumFilter {
			course_id: Some(fixture.course),
			instructor_id: None,
		};

		let page = fixture.store.list_forums(filter, paginate).await.unwrap();

		assert_eq!(page.total_pages, 3);
		assert_eq!(page.current_page, 1);
		assert_eq!(page.forums.len(), 2);
		assert!(page.forums.iter().all(|forum| forum.id != other.id));

		let again = fixture.store.list_forums(filter, paginate).await.unwrap();
		let ids = |page: &ForumPage| page.forums.iter().map(|forum| forum.id).collect::<Vec<_>>();

		assert_eq!(ids(&page), ids(&again));

		let mut seen = Vec::new();

		for page in 1..=3 {
			let page = fixture
				.store
				.list_forums(filter, Paginate { page, limit: 2 })
				.await
				.unwrap();

			seen.extend(ids(&page));
		}

		seen.sort();
		seen.dedup();

		assert_eq!(seen.len(), 5);
	}

	#[tokio::test]
	async fn test_forums_do_not_share_comments() {
		let fixture = fixture();
		let first = fixture.forum().await;
		let second = fixture.forum().await;

		fixture
			.store
			.add_comment(first.id, Comment::new(fixture.student, "only in first"))
			.await
			.unwrap();

		let page = fixture
			.store
			.list_forums(ForumFilter::default(), Paginate { page: 1, limit: 10 })
			.await
			.unwrap();

		for forum in page.forums {
			let expected = usize::from(forum.id == first.id);

			assert_eq!(forum.comments.len(), expected);
			assert!(forum.id == first.id || forum.id == second.id);
		}
	}

	#[tokio::test]
	async fn test_seed_provisions_keys() {
		let key = Uuid::new_v4();
		let seed: Seed = serde_json::from_value(serde_json::json!({
			"users": [{
				"id": Uuid::new_v4(),
				"username": "ada",
				"role": "instructor",
				"apiKey": key,
			}],
			"courses": [{ "id": Uuid::new_v4(), "title": "Rust 101" }],
		}))
		.unwrap();

		let store = MemoryStore::from_seed(seed);
		let user = store.user_by_api_key(key).await.unwrap().unwrap();

		assert_eq!(user.username, "ada");
		assert_eq!(user.role, Role::Instructor);
		assert!(store.user_by_api_key(Uuid::new_v4()).await.unwrap().is_none());
	}
}
