use anyhow::Result;
use events::{EventManager, HandlerKind, Notification, NotificationKind};
use fee_oracle::{BootstrapOutcome, FeeOracle, OracleConfig, SampleMode};
use ledger::{Block, BlockStore, Ledger};
use std::time::Duration;
use tokio::time::timeout;

fn oracle_config() -> OracleConfig {
    OracleConfig {
        min_default: 1_000,
        max_configured: 1_000_000,
        window_size: 10,
        percentile: 50,
        sample_mode: SampleMode::AllObservations,
        bootstrap_limit: 64,
        flush_interval: 1,
        queue_capacity: 100,
    }
}

/// Append a block paying `fees` to the store and announce it
fn commit(store: &BlockStore, events: &EventManager, fees: &[u64]) -> Result<Block> {
    let tip = store.best_block()?.expect("store has genesis");
    let block = Block::child_of(&tip, tip.timestamp + 10, fees.iter().copied());
    store.store(&block)?;
    events.publish(&Notification::block_committed(block.clone()));
    Ok(block)
}

async fn wait_for_ingested(oracle: &FeeOracle, blocks: u64) -> Result<()> {
    timeout(Duration::from_secs(5), async {
        while oracle.stats().blocks_ingested < blocks {
            tokio::task::yield_now().await;
        }
    })
    .await?;
    Ok(())
}

/// Persisted history warms the oracle, live blocks move it, a restart picks up where it left off
#[tokio::test]
async fn test_oracle_follows_persisted_chain() -> Result<()> {
    let data_dir = tempfile::tempdir()?;
    let events = EventManager::new();

    {
        let store = BlockStore::open(data_dir.path().join("blocks"))?;
        store.store(&Block::genesis(1_700_000_000))?;
        for _ in 0..30 {
            commit(&store, &events, &[4_000, 5_000, 6_000])?;
        }
        store.flush()?;
    }

    let store = BlockStore::open(data_dir.path().join("blocks"))?;
    assert_eq!(store.len(), 31);

    let handler = events.handler(HandlerKind::Block);
    let oracle = FeeOracle::new(&store, Some(&*handler), oracle_config())?;

    let report = oracle.bootstrap_report();
    assert_eq!(report.outcome, BootstrapOutcome::Satisfied);
    assert_eq!(report.visited, 10);
    assert_eq!(report.head_height, Some(30));
    assert_eq!(oracle.recommendation(), 5_000);

    // Demand rises: ten blocks replace the whole window
    for _ in 0..10 {
        commit(&store, &events, &[20_000, 21_000, 22_000])?;
    }
    wait_for_ingested(&oracle, 10).await?;
    assert_eq!(oracle.recommendation(), 21_000);

    let stats = oracle.shutdown().await?;
    assert_eq!(stats.blocks_ingested, 10);
    assert_eq!(stats.dropped, 0);
    assert_eq!(handler.listener_count(), 0);
    store.flush()?;

    // A restarted oracle sees the same window through bootstrap alone
    let restarted = FeeOracle::new(&store, Some(&*handler), oracle_config())?;
    assert_eq!(restarted.recommendation(), 21_000);
    restarted.shutdown().await?;

    Ok(())
}

/// Non-block notifications never reach the oracle
#[tokio::test]
async fn test_other_notifications_are_isolated() -> Result<()> {
    let data_dir = tempfile::tempdir()?;
    let store = BlockStore::open(data_dir.path().join("blocks"))?;
    store.store(&Block::genesis(1_700_000_000))?;

    let events = EventManager::new();
    let handler = events.handler(HandlerKind::Block);
    let oracle = FeeOracle::new(&store, Some(&*handler), oracle_config())?;

    events.publish(&Notification::TransactionReceived { fee_rate: 900_000 });
    events.publish(&Notification::ConsensusChanged { height: 1 });
    assert_eq!(
        Notification::ConsensusChanged { height: 1 }.kind(),
        NotificationKind::ConsensusChanged
    );

    commit(&store, &events, &[2_000])?;
    wait_for_ingested(&oracle, 1).await?;

    let stats = oracle.stats();
    assert_eq!(stats.forwarded, 1);
    assert_eq!(oracle.recommendation(), 2_000);

    oracle.shutdown().await?;
    Ok(())
}
