use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request, StatusCode},
};
use uuid::Uuid;

use crate::{
	error::{self, ErrorShape, RouteError},
	model, openapi::SECURITY_SCHEME_API_KEY,
	store, Store,
};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// An error that can occur while resolving the caller.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("missing api key")]
	MissingApiKey,
	#[error("invalid api key")]
	InvalidApiKey,
	#[error(transparent)]
	Store(#[from] store::Error),
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::MissingApiKey | Self::InvalidApiKey => StatusCode::UNAUTHORIZED,
			Self::Store(error) => error.status(),
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::MissingApiKey => error::Message::new("missing_api_key").into_vec(),
			Self::InvalidApiKey => error::Message::new("invalid_api_key").into_vec(),
			Self::Store(error) => error.errors(),
		}
	}

	fn message(&self) -> String {
		match self {
			Self::Store(error) => error.message(),
			_ => self.to_string(),
		}
	}
}

/// The authenticated caller, resolved from an `Authorization: Bearer <key>` header.
///
/// If the header is missing, a [`Error::MissingApiKey`] is returned.
/// If the key is malformed or unknown, a [`Error::InvalidApiKey`] is returned.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub user: model::User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Store: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let header = parts
			.headers
			.get(header::AUTHORIZATION)
			.ok_or(Error::MissingApiKey)?;

		let key = header
			.to_str()
			.ok()
			.and_then(|value| value.strip_prefix(AUTHORIZATION_PREFIX))
			.and_then(|value| Uuid::parse_str(value.trim()).ok())
			.ok_or(Error::InvalidApiKey)?;

		let store = Store::from_ref(state);
		let user = store
			.user_by_api_key(key)
			.await
			.map_err(Error::Store)?
			.ok_or(Error::InvalidApiKey)?;

		Ok(Self { user })
	}
}

impl OperationInput for Session {
	/// Adds the API key requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_API_KEY.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}
