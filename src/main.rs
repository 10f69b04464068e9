use actix_web::{web, App, HttpServer};
use log::info;
use log4rs;

use quota_gate::api;
use quota_gate::app_state::AppState;
use quota_gate::config::AccountingStrategy;
use quota_gate::reconcile::ReconcileWorker;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    log4rs::init_file("server_log.yaml", Default::default()).unwrap();

    let state = AppState::new();
    let config = state.config.clone();
    info!(
        "Starting server on {}:{}",
        config.server.host, config.server.port
    );

    // Counters drift without reconciliation; the derived strategy needs none
    if config.quota.strategy == AccountingStrategy::Counter && config.reconcile.enabled {
        let worker = ReconcileWorker::new(
            &config.quota,
            config.reconcile.interval,
            state.records.clone(),
            state.profiles.clone(),
        );
        let _ = worker.start_background();
    }

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(data.clone())
            .configure(api::configure)
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
