use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
pub(crate) fn one() -> i64 {
	1
}

#[inline]
pub(crate) fn ten() -> i64 {
	10
}

#[derive(Debug, Clone, Copy, Deserialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[validate(range(min = 1, max = 1_000_000))]
	#[serde(default = "one")]
	pub page: i64,
	/// The number of items to return per page.
	#[validate(range(min = 1, max = 100))]
	#[serde(default = "ten")]
	pub limit: i64,
}

impl Paginate {
	pub fn offset(&self) -> i64 {
		self.page.saturating_sub(1).saturating_mul(self.limit)
	}

	pub fn limit(&self) -> i64 {
		self.limit
	}
}

/// The envelope every successful response is wrapped in.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Envelope<T> {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
}

impl<T> Envelope<T> {
	pub fn data(data: T) -> Self {
		Self {
			success: true,
			data: Some(data),
			message: None,
		}
	}
}

impl Envelope<()> {
	pub fn message(message: impl Into<String>) -> Self {
		Self {
			success: true,
			data: None,
			message: Some(message.into()),
		}
	}
}

#[cfg(test)]
mod test {
	#[test]
	fn test_paginate_offset() {
		let mut paginate = super::Paginate { page: 1, limit: 10 };

		assert_eq!(paginate.offset(), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(), 10);

		paginate.limit = 5;

		assert_eq!(paginate.offset(), 5);

		paginate.page = 3;

		assert_eq!(paginate.offset(), 10);

		paginate.page = i64::MAX;

		assert_eq!(paginate.offset(), i64::MAX);
	}

	#[test]
	fn test_envelope_shape() {
		let value = serde_json::to_value(super::Envelope::data(5)).unwrap();

		assert_eq!(value, serde_json::json!({ "success": true, "data": 5 }));

		let value = serde_json::to_value(super::Envelope::message("forum deleted")).unwrap();

		assert_eq!(
			value,
			serde_json::json!({ "success": true, "message": "forum deleted" })
		);
	}
}
