use std::sync::Arc;

pub use axum::http::{
	header::{AUTHORIZATION, IF_MATCH},
	HeaderValue,
};
pub use axum_test::TestServer;
pub use serde_json::json;
use uuid::Uuid;

use crate::{
	app,
	model::{Course, Role, User},
	store::MemoryStore,
	State,
};

/// A server backed by a fresh [`MemoryStore`] with two instructors,
/// a student and a course owned by the first instructor.
pub struct Fixture {
	pub server: TestServer,
	pub instructor: Uuid,
	pub instructor_key: Uuid,
	pub other_instructor_key: Uuid,
	pub student: Uuid,
	pub student_key: Uuid,
	pub course: Uuid,
}

fn user(store: &MemoryStore, username: &str, role: Role) -> (Uuid, Uuid) {
	let id = Uuid::new_v4();
	let key = Uuid::new_v4();

	store.insert_user(
		User {
			id,
			username: username.into(),
			role,
			created_at: chrono::Utc::now(),
		},
		key,
	);

	(id, key)
}

pub fn fixture() -> Fixture {
	let store = MemoryStore::new();
	let (instructor, instructor_key) = user(&store, "ferris", Role::Instructor);
	let (_, other_instructor_key) = user(&store, "corro", Role::Instructor);
	let (student, student_key) = user(&store, "student", Role::Student);
	let course = Uuid::new_v4();

	store.insert_course(Course {
		id: course,
		title: "Rust 101".into(),
		instructor_id: Some(instructor),
		created_at: chrono::Utc::now(),
	});

	let server = TestServer::new(app(State {
		store: Arc::new(store),
	}))
	.unwrap();

	Fixture {
		server,
		instructor,
		instructor_key,
		other_instructor_key,
		student,
		student_key,
		course,
	}
}

pub fn bearer(key: Uuid) -> HeaderValue {
	HeaderValue::from_str(&format!("Bearer {key}")).unwrap()
}
