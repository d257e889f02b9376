use std::borrow::Cow;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::extract::Json;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message sent to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A short, machine-readable description of the error.
	pub content: Cow<'static, str>,
	/// The input field the error relates to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'static, str>>,
	/// Additional context, such as the id that could not be resolved.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<Cow<'static, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	pub fn field(mut self, field: impl Into<Cow<'static, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every failed response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorBody {
	pub success: bool,
	/// A human-readable summary of the first error.
	pub message: String,
	pub errors: Vec<Message>,
}

/// Describes how a route-specific error is presented to the client.
///
/// The [`std::fmt::Display`] output of the error is only used for logging,
/// so it may contain details that [`ErrorShape::errors`] leaves out.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message> {
		Message::new(self.to_string()).into_vec()
	}

	/// The human-readable summary placed in the `message` field.
	fn message(&self) -> String {
		self.to_string()
	}
}

/// Errors shared by every route, mostly rejected request shapes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("invalid {0} header")]
	Header(&'static str),
	#[error("rate limited: {0:?}")]
	RateLimit(GovernorError),
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimit(error)
	}
}

impl AppError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) | Self::Path(..) | Self::Header(..) => {
				StatusCode::BAD_REQUEST
			}
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<Message> {
		match self {
			Self::Validation(errors) => validation_messages(errors),
			Self::Json(error) => Message::new(error.body_text()).into_vec(),
			Self::Query(error) => Message::new(error.body_text()).into_vec(),
			Self::Path(error) => Message::new(error.body_text()).into_vec(),
			Self::Header(name) => Message::new("invalid_header").field(*name).into_vec(),
			Self::RateLimit(GovernorError::TooManyRequests { wait_time, .. }) => {
				Message::new("too_many_requests")
					.detail("retry_after_secs", *wait_time)
					.into_vec()
			}
			Self::RateLimit(..) => Message::new("internal_server_error").into_vec(),
		}
	}

	fn message(&self) -> String {
		match self {
			Self::Validation(errors) => validation_messages(errors)
				.into_iter()
				.next()
				.map_or_else(|| "validation failed".into(), |m| m.content.into_owned()),
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => "too many requests".into(),
			Self::RateLimit(..) => "internal server error".into(),
			_ => self.to_string(),
		}
	}
}

/// Flattens validator errors into one message per failed rule, sorted by field.
fn validation_messages(errors: &validator::ValidationErrors) -> Vec<Message> {
	let mut messages = errors
		.field_errors()
		.into_iter()
		.flat_map(|(field, errors)| {
			let field = field.to_string();

			errors.iter().map(move |error| {
				let content = error
					.message
					.as_ref()
					.map_or_else(|| format!("{field}: {}", error.code), ToString::to_string);

				Message::new(content).field(field.clone())
			})
		})
		.collect::<Vec<_>>();

	messages.sort_by(|a, b| a.field.cmp(&b.field));
	messages
}

/// An error returned from a route: either a shared [`AppError`] or
/// the route's own error type.
#[derive(Debug)]
pub enum RouteError<E> {
	App(AppError),
	Route(E),
}

impl<E: ErrorShape> From<E> for RouteError<E> {
	fn from(error: E) -> Self {
		Self::Route(error)
	}
}

impl<E> From<AppError> for RouteError<E> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<E> OperationOutput for RouteError<E> {
	type Inner = ErrorBody;
}

impl OperationOutput for AppError {
	type Inner = ErrorBody;
}

fn render(status: StatusCode, message: String, errors: Vec<Message>) -> Response<Body> {
	(
		status,
		Json(ErrorBody {
			success: false,
			message,
			errors,
		}),
	)
		.into_response()
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let status = self.status();

		if status.is_server_error() {
			tracing::error!(error = %self, "request failed");
		} else {
			tracing::debug!(error = %self, %status, "request rejected");
		}

		render(status, self.message(), self.errors())
	}
}

impl<E: ErrorShape> IntoResponse for RouteError<E> {
	fn into_response(self) -> Response<Body> {
		let error = match self {
			Self::App(error) => return error.into_response(),
			Self::Route(error) => error,
		};

		let status = error.status();

		if status.is_server_error() {
			tracing::error!(%error, "request failed");
		} else {
			tracing::debug!(%error, %status, "request rejected");
		}

		render(status, error.message(), error.errors())
	}
}
