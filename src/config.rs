use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;

use crate::views::Site;
use crate::DbOptions;

/// Server settings. Every flag can also come from the environment.
#[derive(Parser, Clone, Debug)]
#[clap(name = "symptoms", author, version, about = "Symptom tracker web server", long_about = None)]
pub struct Config {
    #[clap(long, env = "SYMPTOMS_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Path of the single-file store
    #[clap(long, env = "SYMPTOMS_DB", default_value = "data.db")]
    pub db_path: PathBuf,

    /// Directory served under /static/
    #[clap(long, env = "SYMPTOMS_STATIC", default_value = "static")]
    pub static_dir: PathBuf,

    /// "development" turns on the environment banner
    #[clap(long, env = "ENVIRONMENT", default_value = "production")]
    pub environment: String,

    #[clap(long, env = "SITE_NAME", default_value = "Symptoms")]
    pub site_name: String,

    /// Defaults to one per core
    #[clap(long, env = "SYMPTOMS_WORKER_THREADS")]
    pub worker_threads: Option<NonZeroUsize>,

    #[clap(long, env = "SYMPTOMS_MAP_SIZE_MB", default_value_t = 1024)]
    pub map_size_mb: usize,
}

impl Config {
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            map_size: self.map_size_mb * 1024 * 1024,
            ..DbOptions::default()
        }
    }

    pub fn site(&self) -> Site {
        Site {
            name: self.site_name.clone(),
            environment: self.environment.clone(),
        }
    }
}
