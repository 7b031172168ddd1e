pub mod connection;
pub mod dialect;
pub mod history;
pub mod provider;

pub use dialect::{Dialect, Postgres};
pub use provider::{DatabaseProvider, PostgresProvider, ProviderOptions, SqlProvider};
