use anyhow::Result;
use kcview_core::config::Config;

pub async fn run(config: &Config, bind: Option<&str>) -> Result<()> {
    kcview_server::serve(config, bind).await
}
