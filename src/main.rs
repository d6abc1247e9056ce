mod app;
pub use app::App;

use std::path::{Path, PathBuf};

const DEFAULT_HISTORY_FILE: &str = "dual_nback_history.json";

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from);
    let history_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE));

    let config = app::load_config(config_path.as_deref())?;
    let app = App::new(config, Path::new(&history_path))?;
    app.run()?;

    Ok(())
}
