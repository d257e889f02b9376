mod session;

pub use session::Session;

use aide::{OperationInput, OperationIo};
use axum::{
	body::Body,
	extract::{FromRequest, FromRequestParts, Request},
	http::{header, request, Response},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::de;

use crate::error::AppError;

/// Extractor that deserializes a JSON body and validates it.
///
/// T must implement [`serde::de::DeserializeOwned`] and [`validator::Validate`]
/// in order to be used in an extractor.
///
/// ```rust
/// async fn route(Json(input): Json<CommentInput>) {
///   // ...
/// }
/// ```
#[derive(OperationIo)]
#[aide(input_with = "axum::Json<T>", output_with = "axum::Json<T>", json_schema)]
pub struct Json<T>(pub T);

impl<T> IntoResponse for Json<T>
where
	T: serde::Serialize,
{
	fn into_response(self) -> Response<Body> {
		axum::extract::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: de::DeserializeOwned + validator::Validate + JsonSchema + 'static,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Json::<T>::from_request(req, state).await?.0;

		result.validate()?;
		Ok(Self(result))
	}
}

/// Extractor that deserializes a query string and validates it.
///
/// This is similar to [`Json<T>`], but does not consume the body.
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Query<T>",
	output_with = "axum::Json<T>",
	json_schema
)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: de::DeserializeOwned + validator::Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Query::<T>::from_request_parts(parts, state)
			.await?
			.0;

		result.validate()?;
		Ok(Self(result))
	}
}

/// Extractor that deserializes path parameters and validates them.
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Path<T>",
	output_with = "axum::Json<T>",
	json_schema
)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: de::DeserializeOwned + validator::Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let result = axum::extract::Path::<T>::from_request_parts(parts, state)
			.await?
			.0;

		result.validate()?;
		Ok(Self(result))
	}
}

/// The version a client expects a resource to be at, read from `If-Match`.
///
/// Both `If-Match: 3` and `If-Match: "3"` are accepted. A missing header
/// (or `*`) means the client does not care.
#[derive(Debug, Clone, Copy)]
pub struct IfMatch(pub Option<i64>);

#[axum::async_trait]
impl<S> FromRequestParts<S> for IfMatch
where
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		_state: &S,
	) -> Result<Self, Self::Rejection> {
		let Some(value) = parts.headers.get(header::IF_MATCH) else {
			return Ok(Self(None));
		};

		let value = value
			.to_str()
			.map_err(|_| AppError::Header("If-Match"))?
			.trim();

		if value == "*" {
			return Ok(Self(None));
		}

		value
			.trim_start_matches("W/")
			.trim_matches('"')
			.parse()
			.map(|version| Self(Some(version)))
			.map_err(|_| AppError::Header("If-Match"))
	}
}

impl OperationInput for IfMatch {}

#[cfg(test)]
mod test {
	use axum::http::{header, Request};

	use super::*;

	async fn if_match(value: Option<&str>) -> Result<IfMatch, AppError> {
		let mut request = Request::builder();

		if let Some(value) = value {
			request = request.header(header::IF_MATCH, value);
		}

		let (mut parts, ()) = request.body(()).unwrap().into_parts();

		IfMatch::from_request_parts(&mut parts, &()).await
	}

	#[tokio::test]
	async fn test_if_match_parsing() {
		assert_eq!(if_match(None).await.unwrap().0, None);
		assert_eq!(if_match(Some("*")).await.unwrap().0, None);
		assert_eq!(if_match(Some("3")).await.unwrap().0, Some(3));
		assert_eq!(if_match(Some("\"7\"")).await.unwrap().0, Some(7));
		assert_eq!(if_match(Some("W/\"2\"")).await.unwrap().0, Some(2));
		assert!(matches!(
			if_match(Some("abc")).await,
			Err(AppError::Header("If-Match"))
		));
	}
}
