//! Veteran Pool Benchmark
//!
//! Standalone driver: floods the queue with departing raiders, runs years
//! of ticks with a daily stream of generation requests, then prints totals.

use rand::Rng;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use veteran_pool::actor::{AgeTracker, FactionInfo, TICKS_PER_DAY};
use veteran_pool::hooks::{on_actor_despawn, on_generation_request};
use veteran_pool::systems::GenerationRequest;
use veteran_pool::{
    ActorId, Catalog, FactionDirectory, FactionId, IntakeQueue, NoopBridge, PoolSettings, Record,
    SeenTracker, TechLevel, VeteranPool,
};

/// Days per in-game year.
const DAYS_PER_YEAR: u64 = 60;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Veteran pool benchmark starting...");

    let mut factions = FactionDirectory::new();
    factions.insert(FactionId(1), FactionInfo::new("Outlander Union", TechLevel::Industrial));
    factions.insert(FactionId(2), FactionInfo::new("Hill Tribes", TechLevel::Neolithic));

    let settings = PoolSettings::default();
    let catalog = Catalog::builtin();
    let mut pool = VeteranPool::new();
    let queue = IntakeQueue::new();
    let mut seen = SeenTracker::new();
    let mut bridge = NoopBridge;
    let mut rng = rand::thread_rng();

    // Seed the pool with survivors of imaginary raids
    for id in 0..500u64 {
        let faction = FactionId(1 + id % 2);
        let mut record = Record::new(ActorId(id), format!("Raider_{id}"), faction);
        record.age = AgeTracker::from_years(20 + (id % 50) as i64);
        seen.mark(&record, &factions);
        on_actor_despawn(record, &pool, &queue, &mut seen, &factions);
    }

    info!(pending = queue.len(), "intake queue seeded");

    let total_ticks = 5 * DAYS_PER_YEAR * TICKS_PER_DAY;
    let mut dispatched = 0u32;
    let mut captures = 0u32;
    let mut deaths = 0u32;

    let start = std::time::Instant::now();
    for now in 0..total_ticks {
        let report = pool.tick(now, &queue, &settings, &factions, catalog, &mut bridge, &mut rng);
        captures += report.captures;
        if let Some(cycle) = report.cycle {
            deaths += cycle.deaths;
        }

        // One generation request a day
        if now % TICKS_PER_DAY == 0 {
            let faction = FactionId(1 + rng.gen_range(0..2u64));
            let request = GenerationRequest::for_faction(faction);
            if let Some(record) = on_generation_request(
                &mut pool, &request, now, &settings, &factions, &mut bridge, &mut rng,
            ) {
                dispatched += 1;
                // The veteran fights for a while, then comes back
                queue.enqueue(record);
            }
        }
    }
    let elapsed = start.elapsed();

    info!(
        captures,
        dispatched,
        deaths,
        retained = pool.total_retained(),
        "benchmark complete: {:?} total, {:?} per tick",
        elapsed,
        elapsed / total_ticks as u32
    );

    Ok(())
}
