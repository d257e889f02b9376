use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json};

pub const SECURITY_SCHEME_API_KEY: &str = "API Key";

pub mod tag {
	pub const DISCUSSION: &str = "Discussion";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Academy Discussion API")
		.summary("Course discussion forums with nested comments and replies")
		.description(include_str!("../README.md"))
		.tag(Tag {
			name: tag::DISCUSSION.into(),
			description: Some("Forums, comments and replies".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_API_KEY,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Header,
				name: "Authorization".into(),
				description: Some("`Bearer <api key>`".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorBody>, _>(|res| {
			res.example(error::ErrorBody {
				success: false,
				message: "unknown forum".into(),
				errors: error::Message::new("unknown_forum")
					.detail("forum", "00000000-0000-0000-0000-000000000000")
					.into_vec(),
			})
		})
}
