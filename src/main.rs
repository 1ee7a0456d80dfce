use anyhow::Context;
use env_logger::Env;
use harvest::{configuration::get_configuration, startup::Application};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let configuration = get_configuration().context("Failed to read configuration.")?;

    let application = Application::build(configuration)
        .await
        .context("Failed to prepare the database.")?;

    application.run_until_stopped().await?;

    Ok(())
}
