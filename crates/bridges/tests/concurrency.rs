//! Several submitters sharing one deployment.

mod common;

use std::thread;

use alloy_primitives::U256;
use common::{APR_2022, SIGNER, deployment, deposit_dai, token, tranche, units};
use rollup_bridges::{BridgeError, ConversionResult};

const SUBMITTERS: u64 = 8;

#[test]
fn test_distinct_nonces_from_many_threads() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    deployment.register_tranche_pool(APR_2022)?;
    let vault = deployment.config().tranche.vault;
    let dai = token(&deployment, "DAI")?;
    let before = deployment.balance_of(dai, vault);
    let shared = deployment.into_shared();

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (1..=SUBMITTERS)
            .map(|nonce| {
                let shared = &shared;
                scope.spawn(move || {
                    let mut deployment = shared.lock();
                    deposit_dai(&mut deployment, APR_2022, units(10, 18), nonce)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| eyre::eyre!("submitter panicked"))?)
            .collect::<eyre::Result<Vec<_>>>()
    })?;

    assert!(results.iter().all(|result| *result == ConversionResult::pending()));

    let mut deployment = shared.lock();
    assert_eq!(deployment.processor.pending_interactions().count(), SUBMITTERS as usize);
    assert_eq!(
        deployment.balance_of(dai, vault) - before,
        units(10, 18) * U256::from(SUBMITTERS)
    );

    let expiry = tranche(deployment.config(), APR_2022)?.expiry;
    deployment.warp_to(expiry);
    for nonce in 1..=SUBMITTERS {
        deployment.process_async_defi_interaction(SIGNER, nonce)?;
    }
    assert_eq!(deployment.processor.pending_interactions().count(), 0);
    Ok(())
}

#[test]
fn test_duplicate_nonce_races() -> eyre::Result<()> {
    let mut deployment = deployment()?;
    deployment.register_tranche_pool(APR_2022)?;
    let shared = deployment.into_shared();

    let outcomes = thread::scope(|scope| {
        let handles: Vec<_> = (0..SUBMITTERS)
            .map(|_| {
                let shared = &shared;
                scope.spawn(move || {
                    let mut deployment = shared.lock();
                    deposit_dai(&mut deployment, APR_2022, units(1, 18), 42)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().map_err(|_| eyre::eyre!("submitter panicked")))
            .collect::<eyre::Result<Vec<_>>>()
    })?;

    let (accepted, rejected): (Vec<_>, Vec<_>) = outcomes.into_iter().partition(Result::is_ok);
    assert_eq!(accepted.len(), 1);
    assert_eq!(rejected.len(), SUBMITTERS as usize - 1);
    for err in rejected.into_iter().filter_map(Result::err) {
        assert_eq!(
            err.downcast_ref::<BridgeError>(),
            Some(&BridgeError::InteractionAlreadyExists(42))
        );
    }

    let deployment = shared.lock();
    assert_eq!(deployment.processor.pending_interactions().count(), 1);
    assert_eq!(deployment.element()?.interactions().len(), 1);
    Ok(())
}
