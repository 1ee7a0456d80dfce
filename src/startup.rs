use std::{sync::Arc, time::Duration};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::task::JoinError;

use crate::{
    configuration::{DatabaseSettings, SchedulerSettings, Settings},
    dal::PgStore,
    services::{cleanup_handler, scrape_fleet_handler, JobController, SiteFetcher},
};

pub type Controller = JobController<PgStore, SiteFetcher>;

pub struct Application {
    controller: Arc<Controller>,
    scheduler: SchedulerSettings,
}

pub fn get_connection_pool(configuration: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(15 * 60)) // 15 minutes
        .max_lifetime(None)
        .connect_lazy_with(configuration.with_db())
}

impl Application {
    pub async fn build(configuration: Settings) -> Result<Self, sqlx::migrate::MigrateError> {
        let connection_pool = get_connection_pool(&configuration.database);
        sqlx::migrate!("./migrations").run(&connection_pool).await?;
        log::info!("Database migrations applied");

        let store = Arc::new(PgStore::new(connection_pool));
        let fetcher = SiteFetcher::new(&configuration.scraper);
        let controller = JobController::new(store, fetcher, configuration.scraper);

        Ok(Application {
            controller: Arc::new(controller),
            scheduler: configuration.scheduler,
        })
    }

    pub fn controller(&self) -> Arc<Controller> {
        self.controller.clone()
    }

    /// Runs the fleet scrape and cleanup loops. Only returns if one of them panics.
    pub async fn run_until_stopped(self) -> Result<(), JoinError> {
        let controller = self.controller.clone();
        let settings = self.scheduler.clone();
        let fleet = tokio::spawn(async move { scrape_fleet_handler(controller, settings).await });

        let controller = self.controller.clone();
        let settings = self.scheduler.clone();
        let cleanup = tokio::spawn(async move { cleanup_handler(controller, settings).await });

        tokio::try_join!(fleet, cleanup)?;
        Ok(())
    }
}
