//! Server construction and middleware wiring.

mod config;

pub use config::AppSettings;

use std::sync::Arc;

use actix_session::config::{CookieContentSecurity, PersistentSession};
use actix_session::storage::CookieSessionStore;
use actix_session::SessionMiddleware;
use actix_web::cookie::{Key, SameSite};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{web, App, HttpServer};
use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use mockable::{Clock, DefaultClock};
use reqwest::Url;
use tracing::info;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::domain::ports::{
    AppointmentRepository, ListingDirectory, Mailer, UserDirectory,
};
use crate::domain::{AppointmentsService, PaymentDefaults, PaymentsService, SchedulingService};
use crate::inbound::http::appointments::{
    cancel, create, delete_appointment, get_appointment, list_all, list_for_agent,
    list_for_client, receipt, update_status,
};
use crate::inbound::http::health::{live, ready, HealthState};
use crate::inbound::http::payments::{details, pending, stats, update_amount, verify};
use crate::inbound::http::state::HttpState;
use crate::outbound::mail::{NoopMailer, RelayMailer};
use crate::outbound::persistence::{
    DbPool, DieselAppointmentRepository, DieselListingDirectory, DieselUserDirectory, PoolConfig,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Bring the schema up to date before the pool starts handing out
/// connections. Runs on a blocking thread; Diesel's migration harness is
/// synchronous.
async fn run_migrations(database_url: &str) -> std::io::Result<()> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || {
        let mut connection = PgConnection::establish(&url)
            .map_err(|error| format!("database connection failed: {error}"))?;
        connection
            .run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|error| format!("migrations failed: {error}"))
    })
    .await
    .map_err(|error| std::io::Error::other(format!("migration task failed: {error}")))?
    .map_err(std::io::Error::other)?;
    info!(applied, "database migrations up to date");
    Ok(())
}

/// Wire the domain services over Diesel adapters and the given mailer.
#[must_use]
pub fn build_http_state(
    pool: DbPool,
    mailer: Arc<dyn Mailer>,
    payment_defaults: PaymentDefaults,
) -> HttpState {
    let repository: Arc<dyn AppointmentRepository> =
        Arc::new(DieselAppointmentRepository::new(pool.clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(DieselUserDirectory::new(pool.clone()));
    let listings: Arc<dyn ListingDirectory> = Arc::new(DieselListingDirectory::new(pool));
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);

    HttpState {
        scheduling: Arc::new(SchedulingService::new(
            Arc::clone(&repository),
            Arc::clone(&users),
            listings,
            Arc::clone(&clock),
            payment_defaults,
        )),
        appointments: Arc::new(AppointmentsService::new(
            Arc::clone(&repository),
            Arc::clone(&clock),
        )),
        payments: Arc::new(PaymentsService::new(repository, mailer, clock)),
        users,
    }
}

/// Pick the mailer for the configured relay endpoint.
///
/// # Errors
///
/// Returns [`std::io::Error`] for a malformed relay URL or a reqwest client
/// that cannot be constructed.
pub fn build_mailer(settings: &AppSettings) -> std::io::Result<Arc<dyn Mailer>> {
    match settings.mail_relay_url.as_deref() {
        None => {
            info!("no mail relay configured; outbound mail will be dropped");
            Ok(Arc::new(NoopMailer))
        }
        Some(raw) => {
            let endpoint = Url::parse(raw)
                .map_err(|error| std::io::Error::other(format!("bad mail relay URL: {error}")))?;
            let mailer = RelayMailer::new(endpoint, settings.mail_sender()).map_err(|error| {
                std::io::Error::other(format!("mail relay client failed to build: {error}"))
            })?;
            Ok(Arc::new(mailer))
        }
    }
}

#[derive(Clone)]
struct AppDependencies {
    health_state: web::Data<HealthState>,
    http_state: web::Data<HttpState>,
    key: Key,
    cookie_secure: bool,
}

fn build_app(
    deps: AppDependencies,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let AppDependencies {
        health_state,
        http_state,
        key,
        cookie_secure,
    } = deps;

    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_content_security(CookieContentSecurity::Private)
        .cookie_same_site(SameSite::Lax)
        .session_lifecycle(
            PersistentSession::default().session_ttl(actix_web::cookie::time::Duration::hours(2)),
        )
        .build();

    // Literal segments are registered ahead of the `{id}` matcher.
    let api = web::scope("/api/v1")
        .wrap(session)
        .service(create)
        .service(list_for_agent)
        .service(list_for_client)
        .service(list_all)
        .service(receipt)
        .service(get_appointment)
        .service(update_status)
        .service(cancel)
        .service(delete_appointment)
        .service(verify)
        .service(details)
        .service(pending)
        .service(stats)
        .service(update_amount);

    let app = App::new()
        .app_data(health_state)
        .app_data(http_state)
        .service(api)
        .service(ready)
        .service(live);

    #[cfg(debug_assertions)]
    let app = app.service(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    #[cfg(not(debug_assertions))]
    let app = app;

    app
}

/// Build the pool, wire the adapters, and drive the HTTP server.
///
/// # Errors
///
/// Returns [`std::io::Error`] when configuration is incomplete, migrations
/// or the pool fail, or the listener fails to bind.
pub async fn run(settings: AppSettings) -> std::io::Result<()> {
    let bind_addr = settings
        .bind_address()
        .map_err(|error| std::io::Error::other(format!("bad bind address: {error}")))?;
    let database_url = settings
        .database_url()
        .ok_or_else(|| std::io::Error::other("DOORSTEP_DATABASE_URL must be set"))?;
    let key = settings.session_key()?;
    let cookie_secure = settings.cookie_secure;

    run_migrations(database_url).await?;

    let pool = DbPool::new(PoolConfig::new(database_url))
        .await
        .map_err(|error| std::io::Error::other(format!("database pool failed: {error}")))?;
    let mailer = build_mailer(&settings)?;
    let http_state = web::Data::new(build_http_state(
        pool,
        mailer,
        settings.payment_defaults(),
    ));

    let health_state = web::Data::new(HealthState::new());
    let server_health_state = health_state.clone();
    let server = HttpServer::new(move || {
        build_app(AppDependencies {
            health_state: server_health_state.clone(),
            http_state: http_state.clone(),
            key: key.clone(),
            cookie_secure,
        })
    })
    .bind(bind_addr)?;

    info!(address = %bind_addr, "backend listening");
    health_state.mark_ready();
    server.run().await
}
