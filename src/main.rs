#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod model;
mod openapi;
mod ratelimit;
mod route;
mod store;
mod trace;

#[cfg(test)]
mod test;

use std::{net::SocketAddr, sync::Arc};

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{Extension, Router};
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::store::{ForumStore, MemoryStore, PgStore, Seed};

pub type Store = Arc<dyn ForumStore>;
pub type AppState = State;

/// The shared application state.
///
/// Handlers only ever talk to the forum store, so that is all it holds.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub store: Store,
}

/// Builds the full application, including the generated API documentation.
///
/// Rate limiting is added by [`main`] since it needs the peer address.
pub fn app(state: State) -> Router {
	let mut api = OpenApi::default();
	let discussion: ApiRouter = route::discussion::routes().with_state(state);

	ApiRouter::new()
		.nest_api_service("/discussion", discussion)
		.nest_api_service("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(CompressionLayer::new())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(TraceLayer::new_for_http())
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

async fn connect_store(config: &config::Config) -> Result<Store, Box<dyn std::error::Error>> {
	if let Some(url) = &config.database_url {
		let store = PgStore::connect(url).await?;

		tracing::info!("connected to postgres");

		return Ok(Arc::new(store));
	}

	tracing::warn!("DATABASE_URL is not set, forums are kept in memory and lost on restart");

	let seed = match &config.seed_file {
		Some(path) => {
			let seed: Seed = serde_json::from_str(&std::fs::read_to_string(path)?)?;

			tracing::info!(
				path = %path.display(),
				users = seed.users.len(),
				courses = seed.courses.len(),
				"loaded seed file"
			);

			seed
		}
		None => Seed::default(),
	};

	Ok(Arc::new(MemoryStore::from_seed(seed)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = config::Config::from_env()?;
	let _guard =
		trace::init_tracing_subscriber(config.log_level, config.otlp_endpoint.as_deref())?;

	let state = State {
		store: connect_store(&config).await?,
	};

	let governor = ratelimit::per_peer(config.rate_limit_per_second, config.rate_limit_burst)
		.ok_or("RATE_LIMIT_PER_SECOND and RATE_LIMIT_BURST must be greater than zero")?;

	ratelimit::cleanup_old_limits(&[&governor]);

	let app = app(state).layer(GovernorLayer {
		config: Arc::clone(&governor),
	});

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!("listening on {}", listener.local_addr()?);

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.await?;

	Ok(())
}
