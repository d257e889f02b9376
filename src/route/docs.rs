use std::sync::Arc;

use aide::{
	axum::{
		routing::{get, get_with},
		ApiRouter, IntoApiResponse,
	},
	openapi::OpenApi,
	scalar::Scalar,
};
use axum::{response::IntoResponse, Extension};

use crate::extract::Json;

pub const SPEC_PATH: &str = "/docs/private/api.json";

pub fn routes() -> ApiRouter {
	ApiRouter::new()
		.api_route(
			"/",
			get_with(
				Scalar::new(SPEC_PATH)
					.with_title("Academy Discussion")
					.axum_handler(),
				|op| op.description("This documentation page."),
			),
		)
		.route("/private/api.json", get(serve_docs))
}

async fn serve_docs(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoApiResponse {
	Json(api.as_ref()).into_response()
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_openapi_document_lists_routes() {
		let fixture = fixture();
		let response = fixture.server.get(super::SPEC_PATH).await;

		assert_eq!(response.status_code(), 200);

		let document = response.json::<serde_json::Value>();
		let paths = document["paths"].as_object().unwrap();

		assert!(paths.contains_key("/discussion/create"));
		assert!(paths.contains_key("/discussion/student"));
		assert!(document["components"]["securitySchemes"]
			.as_object()
			.unwrap()
			.contains_key("API Key"));
	}
}
