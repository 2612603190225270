use config::Config;
use hoymiles_cloud_rs::api::{self, Client};
use hoymiles_cloud_rs::coordinator::Coordinator;
use std::time::Duration;

const API_URL: &str = "https://neapi.hoymiles.com";
const DEFAULT_INTERVAL_SECS: i64 = 60;

#[derive(Clone, serde::Deserialize)]
pub struct HoymilesConfig {
    api_url: String,
    username: String,
    password: String,
    interval: u64,
}

pub fn read_settings() -> HoymilesConfig {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("HM"))
        .unwrap()
        .set_default("api_url", API_URL)
        .unwrap()
        .set_default("interval", DEFAULT_INTERVAL_SECS)
        .unwrap();

    settings.try_into().expect("Configuration error")
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = read_settings();
    let api = api::api(settings.api_url, settings.username, settings.password);

    let client = match Client::new(api) {
        Ok(client) => client,
        Err(e) => {
            log::error!("unable to set up API client: {}", e);
            std::process::exit(1);
        }
    };

    let mut coordinator = match Coordinator::bootstrap(client).await {
        Ok(coordinator) => coordinator,
        Err(e) => {
            log::error!("setup failed: {}", e);
            std::process::exit(1);
        }
    };
    log::info!(
        "polling {} entities every {}s",
        coordinator.topology().entity_count(),
        settings.interval
    );

    /* the first tick fires immediately and doubles as the first-load refresh */
    let mut ticker = tokio::time::interval(Duration::from_secs(settings.interval));
    loop {
        ticker.tick().await;
        match coordinator.refresh().await {
            Ok(()) => {
                let snapshot = coordinator.snapshot().read();
                log::info!("refreshed {} entities", snapshot.len());
            }
            Err(e) => log::error!("refresh cycle failed: {}; keeping previous snapshot", e),
        }
    }
}
