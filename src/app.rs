use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{Config, CONFIG_FILE_NAME};
use crate::connections::ConnectionRegistry;
use crate::error::Result;
use crate::routing::RouterChain;

pub struct AppContext {
    pub root: PathBuf,
    pub config: Config,
    pub registry: Arc<ConnectionRegistry>,
    pub routers: RouterChain,
    pub robot: bool,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &crate::cli::Cli) -> Result<Self> {
        let root = Self::find_root()?;
        let config = Config::load(cli.config.as_deref(), &root)?;
        let registry = Arc::new(ConnectionRegistry::from_config(&config, &root)?);
        let routers = RouterChain::from_rules(&config.routers);

        Ok(Self {
            root,
            config,
            registry,
            routers,
            robot: cli.robot,
            verbosity: if cli.quiet { 0 } else { cli.verbose + 1 },
        })
    }

    fn find_root() -> Result<PathBuf> {
        if let Ok(root) = std::env::var("SEARCHSTACK_ROOT") {
            return Ok(PathBuf::from(root));
        }
        let cwd = std::env::current_dir()?;
        if let Some(found) = find_upwards(&cwd, CONFIG_FILE_NAME) {
            return Ok(found);
        }
        Ok(cwd)
    }
}

fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(name).is_file() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}
