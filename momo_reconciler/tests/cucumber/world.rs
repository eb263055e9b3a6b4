use std::collections::HashMap;

use cucumber::World;
use log::*;
use momo_reconciler::{
    events::EventProducers,
    test_utils::prepare_env::fresh_database,
    AdminApi,
    ProcessingOutcome,
    ReconciliationApi,
    ReconciliationConfig,
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct ReconciliationWorld {
    pub system: Option<ReconciliationSystem>,
    /// Buffer ids, by the names the scenario gave them
    pub buffers: HashMap<String, i64>,
    pub last_outcome: Option<ProcessingOutcome>,
}

#[derive(Debug)]
pub struct ReconciliationSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub api: ReconciliationApi<SqliteDatabase>,
    pub admin: AdminApi<SqliteDatabase>,
}

impl ReconciliationWorld {
    pub fn system(&self) -> &ReconciliationSystem {
        self.system.as_ref().expect("Reconciliation system not initialised")
    }

    pub fn api(&self) -> &ReconciliationApi<SqliteDatabase> {
        &self.system().api
    }

    pub fn admin(&self) -> &AdminApi<SqliteDatabase> {
        &self.system().admin
    }

    pub fn buffer_id(&self, name: &str) -> i64 {
        *self.buffers.get(name).unwrap_or_else(|| panic!("No buffer named {name}"))
    }

    pub fn outcome(&self) -> &ProcessingOutcome {
        self.last_outcome.as_ref().expect("No notification has been processed yet")
    }
}

impl ReconciliationSystem {
    pub async fn new(config: ReconciliationConfig) -> Self {
        let (url, db) = fresh_database(5).await;
        debug!("Created database: {url}");
        let api = ReconciliationApi::new(db.clone(), &config, EventProducers::default()).expect("Error creating API");
        let admin = AdminApi::new(db.clone(), EventProducers::default());
        Self { db_path: url, db, api, admin }
    }
}
