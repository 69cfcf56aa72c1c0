use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::login::AccessRole;

/// Runtime configuration for the dashboard server
///
/// Every option can also be supplied through the environment variable named
/// next to it.
#[derive(Parser, Debug, Clone)]
#[command(name = "fleet-dashboard", version, about = "Fleet repair status dashboard")]
pub struct Config {
    /// SQLite database holding the fleet table
    #[arg(long, env = "FLEET_DB_PATH", default_value = "fleet_data.db")]
    pub db_path: PathBuf,

    /// Address the HTTP server listens on
    #[arg(long, env = "FLEET_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    #[arg(long, env = "FLEET_ADMIN_USER", default_value = "admin")]
    pub admin_user: String,

    #[arg(long, env = "FLEET_ADMIN_PASSWORD", default_value = "adminpass", hide_env_values = true)]
    pub admin_password: String,

    #[arg(long, env = "FLEET_VIEWER_USER", default_value = "viewer")]
    pub viewer_user: String,

    #[arg(long, env = "FLEET_VIEWER_PASSWORD", default_value = "viewonly", hide_env_values = true)]
    pub viewer_password: String,

    /// Lifetime of a login session in seconds
    #[arg(long, env = "FLEET_SESSION_TTL_SECS", default_value_t = 24 * 60 * 60)]
    pub session_ttl_secs: u64,

    /// Largest accepted upload, in bytes
    #[arg(long, env = "FLEET_MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

impl Config {
    /// Configured accounts as (username, password, role)
    pub fn accounts(&self) -> Vec<(&str, &str, AccessRole)> {
        vec![
            (
                self.admin_user.as_str(),
                self.admin_password.as_str(),
                AccessRole::Admin,
            ),
            (
                self.viewer_user.as_str(),
                self.viewer_password.as_str(),
                AccessRole::Viewer,
            ),
        ]
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from("fleet_data.db"),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            admin_user: "admin".to_string(),
            admin_password: "adminpass".to_string(),
            viewer_user: "viewer".to_string(),
            viewer_password: "viewonly".to_string(),
            session_ttl_secs: 24 * 60 * 60,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}
