pub mod config;
pub mod http_client;
pub mod logging;
pub mod song_repository;

pub use config::AppConfig;
pub use http_client::{FetchError, HttpClient, HttpClientConfig};
pub use song_repository::SongRepository;
