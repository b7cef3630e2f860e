use std::{collections::HashMap, sync::Arc, time::Duration};

use actix_web::{web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use blockscout_service_launcher::database;
use currency_sync_logic::{
    bus::{topics, Bus, RdKafkaBus},
    cache::{FetchSideHandler, RequestSideHandler},
    correlator::Correlator,
    dedup::{build_sweep_jobs, DedupLedger},
    pool::WorkerPool,
    upstream::UpstreamClient,
};
use currency_sync_migration::Migrator;
use tokio_cron_scheduler::JobScheduler;
use uuid::Uuid;

use crate::{edge, settings::Settings};

const SERVICE_NAME: &str = "currency_sync";

pub async fn run(settings: Settings) -> Result<(), anyhow::Error> {
    blockscout_service_launcher::tracing::init_logs(
        SERVICE_NAME,
        &settings.tracing,
        &settings.jaeger,
    )?;

    let db = database::initialize_postgres::<Migrator>(&settings.database).await?;

    let bus: Arc<dyn Bus> = Arc::new(
        RdKafkaBus::connect(
            &settings.bus.brokers,
            &settings.bus.transactional_id_prefix,
            settings.bus.enable_idempotence,
        )
        .await?,
    );

    let pool = WorkerPool::start(settings.pool.into());

    // Each edge process gets its own response-listener group so every replica
    // consumes all `response` partitions, rather than sharing one fixed group under
    // which Kafka would load-balance partitions across replicas and strand a pending
    // slot on a process that never sees its reply.
    let correlator = Correlator::new(
        bus.clone(),
        pool.clone(),
        Duration::from_secs(settings.edge.request_timeout_sec),
        format!("{}-edge-{}", settings.bus.group_id, Uuid::new_v4()),
    );

    let dedup = DedupLedger::new(
        db.clone(),
        settings.dedup.ttl_days,
        settings.dedup.hard_purge_days,
    );

    let scheduler = JobScheduler::new().await?;
    for job in build_sweep_jobs(dedup.clone())? {
        scheduler.add(job).await?;
    }
    scheduler.start().await?;

    let request_handler = RequestSideHandler::new(
        db.clone(),
        bus.clone(),
        dedup,
        Duration::from_secs(settings.cache.freshness_sec),
    );

    let upstream = UpstreamClient::new(settings.upstream.base_url.clone(), Duration::from_secs(10))?;
    let fetch_handler = FetchSideHandler::new(
        db,
        bus.clone(),
        upstream,
        settings.upstream.api_key.clone(),
        settings.retry.into(),
    );

    let request_side_group = format!("{}-request", settings.bus.group_id);
    let request_pool = pool.clone();
    let request_handler_for_consumer = request_handler.clone();
    bus.subscribe(
        topics::REQUEST,
        &request_side_group,
        Arc::new(move |record| {
            let handler = request_handler_for_consumer.clone();
            if let Err(err) = request_pool.submit(async move { handler.handle(record).await }) {
                tracing::error!(err = ?err, "failed to enqueue request-side work");
            }
        }),
    );

    let fetch_side_group = format!("{}-fetch", settings.bus.group_id);
    let fetch_pool = pool.clone();
    let fetch_handler_for_consumer = fetch_handler.clone();
    bus.subscribe(
        topics::FETCH,
        &fetch_side_group,
        Arc::new(move |record| {
            let handler = fetch_handler_for_consumer.clone();
            if let Err(err) = fetch_pool.submit(async move { handler.handle(record).await }) {
                tracing::error!(err = ?err, "failed to enqueue fetch-side work");
            }
        }),
    );

    if settings.metrics.enabled {
        spawn_metrics_server(settings.metrics.addr, &settings.metrics.route);
    }

    let http_addr = settings.server.http.addr;
    tracing::info!(addr = %http_addr, "starting http server");

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(correlator.clone()))
            .configure(edge::configure)
    })
    .bind(http_addr)?
    .run()
    .await?;

    pool.shutdown(Duration::from_secs(60)).await;

    Ok(())
}

fn spawn_metrics_server(addr: std::net::SocketAddr, route: &str) {
    tracing::info!(%addr, "starting metrics server");
    let const_labels = HashMap::from([("service_name".to_string(), SERVICE_NAME.to_string())]);
    let middleware = PrometheusMetricsBuilder::new(SERVICE_NAME)
        .registry(prometheus::default_registry().clone())
        .endpoint(route)
        .const_labels(const_labels)
        .build()
        .expect("prometheus middleware should build");

    tokio::spawn(async move {
        if let Err(err) = HttpServer::new(move || App::new().wrap(middleware.clone()))
            .bind(addr)
            .expect("failed to bind metrics server")
            .run()
            .await
        {
            tracing::error!(err = ?err, "metrics server exited");
        }
    });
}
