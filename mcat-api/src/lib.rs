//! mcat-api library - media catalog HTTP service
//!
//! Albums, songs and artists with optional audio attachments, plus account
//! signup and bearer-token login.

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, post},
    Router,
};
use mcat_common::attachments::AttachmentStore;
use mcat_common::auth::{load_token_secret, CredentialService, TokenKeys};
use mcat_common::catalog::{CatalogService, ENTITIES};
use mcat_common::config::{database_path, ServiceConfig};
use mcat_common::db::{init_database, users};
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod api;
pub mod error;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Catalog tables and attachment store
    pub catalog: CatalogService,
    /// Signup, login and token validation
    pub credentials: CredentialService,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        store: AttachmentStore,
        keys: TokenKeys,
        config: ServiceConfig,
    ) -> Self {
        Self {
            catalog: CatalogService::new(db.clone(), store),
            credentials: CredentialService::new(db.clone(), keys),
            db,
            config: Arc::new(config),
        }
    }

    /// Prepare everything the service persists under the root folder
    ///
    /// Creates the root and upload directories, opens (and if needed
    /// creates) the database, and loads the token signing secret.
    pub async fn initialize(
        root_folder: &Path,
        config: ServiceConfig,
    ) -> mcat_common::Result<Self> {
        tokio::fs::create_dir_all(root_folder).await?;

        let db_path = database_path(root_folder);
        info!("Database path: {}", db_path.display());
        let db = init_database(&db_path).await?;

        let store = AttachmentStore::new(config.upload_dir_path(root_folder), config.static_prefix());
        store.ensure_dir().await?;
        info!("Upload directory: {}", store.root().display());

        let secret = match &config.token_secret {
            Some(secret) => {
                info!("Using token signing secret from configuration");
                secret.clone()
            }
            None => load_token_secret(&db).await?,
        };
        let keys = TokenKeys::from_secret(secret.as_bytes(), config.token_expiry_minutes);

        let state = Self::new(db, store, keys, config);
        state.log_contents().await?;
        Ok(state)
    }

    async fn log_contents(&self) -> mcat_common::Result<()> {
        info!("{} registered users", users::count_users(&self.db).await?);
        for descriptor in ENTITIES {
            let count = self.catalog.entity(descriptor).count().await?;
            info!("{} table: {} rows", descriptor.display_name, count);
        }
        Ok(())
    }
}

/// Build application router
///
/// Account routes and `/health` are public. `/protected` and `/users/me`
/// require a bearer token, as do the catalog routes when `protect_catalog`
/// is set.
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let mut catalog = Router::new()
        .route("/api/:entity/all", get(api::catalog::list_all))
        .route("/api/:entity/create", post(api::catalog::create))
        .route("/api/:entity/search", get(api::catalog::search))
        .route(
            "/api/:entity/:id",
            get(api::catalog::get_one)
                .put(api::catalog::update)
                .delete(api::catalog::delete),
        )
        .layer(DefaultBodyLimit::max(config.max_upload_bytes));

    if config.protect_catalog {
        catalog = catalog.layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_user,
        ));
    }

    // Protected routes (require a bearer token)
    let protected = Router::new()
        .route("/protected", get(api::auth::protected))
        .route("/users/me", get(api::auth::current_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_user,
        ));

    // Public routes (no authentication)
    let public = Router::new()
        .route("/signup", post(api::auth::signup))
        .route("/auth/signup", post(api::auth::signup))
        .route("/token", post(api::auth::issue_token))
        .route("/auth/signin", post(api::auth::issue_token))
        .merge(api::health_routes());

    Router::new()
        .merge(catalog)
        .merge(protected)
        .merge(public)
        .nest_service(
            config.static_prefix(),
            ServeDir::new(state.catalog.store().root()),
        )
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}
