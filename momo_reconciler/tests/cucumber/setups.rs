use cucumber::given;
use momo_reconciler::ReconciliationConfig;

use crate::cucumber::{ReconciliationSystem, ReconciliationWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut ReconciliationWorld) {
    let system = ReconciliationSystem::new(ReconciliationConfig::default()).await;
    world.system = Some(system);
}

#[given("a fresh install without duplicate detection")]
async fn fresh_database_without_dedup(world: &mut ReconciliationWorld) {
    let config = ReconciliationConfig { dedup_enabled: false, ..Default::default() };
    world.system = Some(ReconciliationSystem::new(config).await);
}
