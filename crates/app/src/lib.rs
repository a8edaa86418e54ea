pub mod config;
pub mod http_server;
pub mod process;
pub mod state;
pub mod version;

pub use config::Config;
pub use process::spawn_service;
pub use state::State as ServiceState;
pub use version::build_info;
