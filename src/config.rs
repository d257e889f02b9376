use std::{env, fmt::Display, net::IpAddr, path::PathBuf, str::FromStr};

use tracing::Level;

#[derive(Debug, thiserror::Error)]
#[error("invalid {key} value {value:?}: {reason}")]
pub struct Error {
	key: &'static str,
	value: String,
	reason: String,
}

/// Settings read from the environment, after `.env` has been loaded.
#[derive(Debug, Clone)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	/// Postgres connection string. Without one, forums live in memory.
	pub database_url: Option<String>,
	/// JSON file with users and courses to preload into the memory store.
	pub seed_file: Option<PathBuf>,
	pub log_level: Level,
	pub rate_limit_per_second: u64,
	pub rate_limit_burst: u32,
	/// Where to export traces with OTLP, if anywhere.
	pub otlp_endpoint: Option<String>,
}

impl Config {
	pub fn from_env() -> Result<Self, Error> {
		Ok(Self {
			host: try_load("HOST", "127.0.0.1")?,
			port: try_load("PORT", "3000")?,
			database_url: optional("DATABASE_URL"),
			seed_file: optional("SEED_FILE").map(PathBuf::from),
			log_level: try_load("LOG_LEVEL", "info")?,
			rate_limit_per_second: try_load("RATE_LIMIT_PER_SECOND", "10")?,
			rate_limit_burst: try_load("RATE_LIMIT_BURST", "50")?,
			otlp_endpoint: optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}
}

fn optional(key: &str) -> Option<String> {
	env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, Error>
where
	T::Err: Display,
{
	let value = optional(key).unwrap_or_else(|| default.to_string());

	value.trim().parse().map_err(|e: T::Err| Error {
		key,
		reason: e.to_string(),
		value,
	})
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_try_load() {
		assert_eq!(try_load::<u16>("ACADEMY_TEST_UNSET_PORT", "3000").unwrap(), 3000);

		env::set_var("ACADEMY_TEST_BAD_PORT", "eighty");

		let error = try_load::<u16>("ACADEMY_TEST_BAD_PORT", "3000").unwrap_err();

		assert!(error.to_string().contains("ACADEMY_TEST_BAD_PORT"));
	}
}
