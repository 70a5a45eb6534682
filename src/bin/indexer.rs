//! Entry point: reads environment config, connects the collaborators,
//! resumes from the last committed block, and drives the loop.
//!
//! Chain connectivity itself is mechanical plumbing outside the spec's
//! scope (spec.md §1) — `connect_chain` below is the thin shim a real
//! deployment points at an actual Substrate RPC client; everything this
//! binary does with it goes through the `ChainClient` trait.

use std::process;

use dot20_indexer::chain::ChainClient;
use dot20_indexer::config::Config;
use dot20_indexer::driver::BlockDriver;
use dot20_indexer::filter::TicksModeCache;
use dot20_indexer::store::pg::PgStore;
use dot20_indexer::store::LedgerStore;
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "dot20-indexer")]
struct Opt {
    /// Wipe and recreate the base schema before starting.
    #[structopt(long)]
    wipe: bool,
}

fn main() {
    env_logger::init();
    let opt = Opt::from_args();

    if let Err(e) = run(opt) {
        log::error!("fatal: {}", e);
        process::exit(1);
    }
}

fn run(opt: Opt) -> dot20_indexer::Result<()> {
    let config = Config::from_env()?;
    // env_logger writes to stderr only; rotation/retention are surfaced here
    // for the process supervisor (journald/logrotate) that owns the actual
    // log files, rather than reimplemented in-process.
    log::info!(
        "log rotation every {} day(s), retention {} week(s)",
        config.log_rotation_days,
        config.log_retention_weeks
    );

    let mut store = PgStore::connect(&config.database_url)
        .map_err(dot20_indexer::IndexerError::Storage)?;

    if opt.wipe {
        log::warn!("--wipe passed, dropping all dot-20 tables");
        store.wipe().map_err(dot20_indexer::IndexerError::Storage)?;
    }

    let mut chain = connect_chain(&config)?;

    let start_block = match store.get_indexer_status("dot-20")? {
        Some(status) => status.indexer_height + 1,
        None => config.start_block,
    };
    log::info!("starting at block {}", start_block);

    let mut driver = BlockDriver::new(start_block, config.delay_block);
    let mut ticks_mode = TicksModeCache::new();
    driver.run(&mut chain, &mut store, &mut ticks_mode)
}

fn connect_chain(config: &Config) -> dot20_indexer::Result<impl ChainClient> {
    dot20_indexer::chain::substrate::SubstrateClient::connect(&config.url, &config.chain)
}
