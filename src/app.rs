use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use loco_rs::{
    app::{AppContext, Hooks},
    boot::{create_app, BootResult, StartMode},
    controller::AppRoutes,
    environment::Environment,
    task::Tasks,
    worker::Processor,
    Result,
};
use migration::Migrator;
use sea_orm::DatabaseConnection;

use crate::config::{EventProcessorConfig, LockConfig, RetryPolicyConfig};
use crate::controllers;
use crate::services::event_emitter::EventEmitter;
use crate::services::payment_provider::{MockPaymentProvider, PaymentProviderPort};
use crate::services::recovery_manager::{ManualReviewStrategy, RecoveryManager, RecoveryStrategy};
use crate::services::retry_manager::RetryManager;
use crate::services::retry_queue::RetryQueue;
use crate::services::transaction_manager::TransactionManager;
use crate::workers::event_processor::EventProcessor;

/// The engine's composition root: every collaborator named in the component
/// table, wired once at boot and shared by every controller through
/// [`engine`]. `loco_rs::AppContext` has no slot for application-specific
/// services, so this lives alongside it as a process-wide singleton.
pub struct Engine {
    pub transaction_manager: Arc<TransactionManager>,
    pub retry_manager: Arc<RetryManager>,
    pub recovery_manager: Arc<RecoveryManager>,
    pub event_emitter: Arc<EventEmitter>,
    pub event_processor: Arc<EventProcessor>,
    pub retry_queue: Arc<RetryQueue>,
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

pub fn engine() -> &'static Engine {
    ENGINE.get().expect("Engine::wire was not called during boot")
}

fn build_recovery_strategies() -> Vec<Arc<dyn RecoveryStrategy>> {
    vec![Arc::new(ManualReviewStrategy)]
}

/// Builds and wires every service. Split out of `boot` so tests can call it
/// against a throwaway database without going through the full CLI.
pub async fn wire_engine(db: DatabaseConnection) {
    let lock_ttl = chrono::Duration::milliseconds(LockConfig::default().default_ttl_ms as i64);
    let retry_policy = RetryPolicyConfig::from_env();
    let event_processor_config = EventProcessorConfig::from_env();

    let provider: Arc<dyn PaymentProviderPort> = Arc::new(MockPaymentProvider);
    let emitter = Arc::new(EventEmitter::new());
    let retry_queue = Arc::new(RetryQueue::new());

    let transaction_manager = TransactionManager::new(db.clone(), provider, Arc::clone(&emitter), lock_ttl);

    let retry_manager = RetryManager::new(Arc::clone(&retry_queue), Arc::clone(&emitter), retry_policy, Arc::clone(&transaction_manager) as _);

    let recovery_manager = Arc::new(RecoveryManager::new(
        db.clone(),
        lock_ttl,
        Arc::clone(&emitter),
        Arc::clone(&retry_manager),
        build_recovery_strategies(),
    ));

    transaction_manager.wire(Arc::clone(&retry_manager), Arc::clone(&recovery_manager));

    retry_queue.rebuild_from_store(&db, Arc::clone(&retry_manager) as _).await.ok();

    let event_processor = EventProcessor::new(db, event_processor_config);

    let _ = ENGINE.set(Engine {
        transaction_manager,
        retry_manager,
        recovery_manager,
        event_emitter: emitter,
        event_processor,
        retry_queue,
    });
}

pub struct App;

#[async_trait]
impl Hooks for App {
    fn app_name() -> &'static str {
        env!("CARGO_CRATE_NAME")
    }

    fn app_version() -> String {
        format!(
            "{} ({})",
            env!("CARGO_PKG_VERSION"),
            option_env!("BUILD_SHA").or(option_env!("GITHUB_SHA")).unwrap_or("dev")
        )
    }

    async fn boot(mode: StartMode, environment: &Environment) -> Result<BootResult> {
        let boot_result = create_app::<Self, Migrator>(mode, environment).await?;
        wire_engine(boot_result.app_context.db.clone()).await;
        engine().event_processor.start();
        Ok(boot_result)
    }

    async fn truncate(db: &DatabaseConnection) -> Result<()> {
        use crate::seeders::DatabaseSeeder;

        DatabaseSeeder::clear_all(db).await?;
        Ok(())
    }

    async fn seed(db: &DatabaseConnection, _base: &std::path::Path) -> Result<()> {
        use crate::seeders::DatabaseSeeder;

        if std::env::var("LOCO_ENV").unwrap_or_else(|_| "development".to_string()) == "development" {
            if !DatabaseSeeder::is_seeded(db).await? {
                tracing::info!("Seeding development database...");
                DatabaseSeeder::seed_development(db).await?;
                tracing::info!("Database seeding completed");
            } else {
                tracing::info!("Database already seeded, skipping");
            }
        }

        Ok(())
    }

    fn routes(_ctx: &AppContext) -> AppRoutes {
        AppRoutes::with_default_routes()
            .prefix("/api")
            .add_route(controllers::auth::routes())
            .add_route(controllers::system::routes())
            .add_route(controllers::transactions::routes())
            .add_route(controllers::dead_letter::routes())
            .add_route(controllers::webhooks::routes())
    }

    fn connect_workers<'a>(_p: &'a mut Processor, _ctx: &'a AppContext) {
        // The event processor and retry queue are self-driving background
        // loops started during `boot`, not loco queue-backed jobs.
    }

    fn register_tasks(_tasks: &mut Tasks) {
        // Database management commands are handled through CLI.
        // Use: cargo loco task database --help
    }
}
