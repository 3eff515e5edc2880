//! Consumer-header indexing: the canonical-chain store, the fork store and
//! the per-chain live view, snapshotted per epoch when an epoch ends.

use crate::error::TimestampError;
use crate::state::{CANONICAL_HEADERS, CHAIN_INFO, EPOCH_CHAIN_INFO, FORK_HEADERS};
use crate::types::{ChainInfo, IndexedHeader};
use btcstamp_logging::debug;
use cosmwasm_std::{Order, StdResult, Storage};
use cw_storage_plus::Bound;

/// Records one accepted consumer header. Canonical headers extend the
/// canonical store and become the chain's latest header; fork headers are
/// collected per height and only surface in the chain's fork view.
pub fn handle_header(
    storage: &mut dyn Storage,
    header: &IndexedHeader,
    is_fork: bool,
) -> Result<(), TimestampError> {
    let chain_id = header.chain_id.as_str();
    let mut info = CHAIN_INFO
        .may_load(storage, chain_id)?
        .unwrap_or_else(|| ChainInfo {
            chain_id: chain_id.to_string(),
            latest_header: None,
            latest_forks: Vec::new(),
            timestamped_headers_count: 0,
        });

    if is_fork {
        let mut forks = FORK_HEADERS
            .may_load(storage, (chain_id, header.height))?
            .unwrap_or_default();
        forks.push(header.clone());
        FORK_HEADERS.save(storage, (chain_id, header.height), &forks)?;
        info.latest_forks = forks;
        debug!(
            "fork header at height {} for chain {}",
            header.height, chain_id
        );
    } else {
        CANONICAL_HEADERS.save(storage, (chain_id, header.height), header)?;
        info.latest_header = Some(header.clone());
        info.timestamped_headers_count += 1;
        debug!(
            "canonical header at height {} for chain {}",
            header.height, chain_id
        );
    }

    CHAIN_INFO.save(storage, chain_id, &info)?;
    Ok(())
}

/// The highest canonical header of the chain at or below `height`.
pub fn find_closest_header(
    storage: &dyn Storage,
    chain_id: &str,
    height: u64,
) -> Result<IndexedHeader, TimestampError> {
    let found = CANONICAL_HEADERS
        .prefix(chain_id)
        .range(
            storage,
            None,
            Some(Bound::inclusive(height)),
            Order::Descending,
        )
        .next()
        .transpose()?;
    found
        .map(|(_, header)| header)
        .ok_or_else(|| TimestampError::HeaderNotFound {
            chain_id: chain_id.to_string(),
            height,
        })
}

/// All canonical headers of the chain committed during the given epoch, in
/// ascending height order.
pub fn get_epoch_headers(
    storage: &dyn Storage,
    chain_id: &str,
    epoch: u64,
) -> Result<Vec<IndexedHeader>, TimestampError> {
    let headers = CANONICAL_HEADERS
        .prefix(chain_id)
        .range(storage, None, None, Order::Ascending)
        .collect::<StdResult<Vec<_>>>()?;
    Ok(headers
        .into_iter()
        .map(|(_, header)| header)
        .filter(|header| header.babylon_epoch == epoch)
        .collect())
}

/// Snapshots every known chain's live view into the per-epoch index.
/// Called by the host at the end of each epoch.
pub fn record_epoch_chain_info(
    storage: &mut dyn Storage,
    epoch: u64,
) -> Result<(), TimestampError> {
    let infos = CHAIN_INFO
        .range(storage, None, None, Order::Ascending)
        .collect::<StdResult<Vec<_>>>()?;
    for (chain_id, info) in infos {
        EPOCH_CHAIN_INFO.save(storage, (epoch, &chain_id), &info)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::get_epoch_chain_info;
    use cosmwasm_std::testing::MockStorage;

    fn header(chain_id: &str, height: u64, epoch: u64) -> IndexedHeader {
        IndexedHeader {
            chain_id: chain_id.to_string(),
            height,
            hash: vec![height as u8; 32],
            babylon_epoch: epoch,
            babylon_header_commit_hash: vec![0x22; 32],
            babylon_tx_hash: vec![0x33; 32],
        }
    }

    #[test]
    fn canonical_headers_update_the_live_view() {
        let mut storage = MockStorage::new();
        handle_header(&mut storage, &header("osmo", 5, 1), false).unwrap();
        handle_header(&mut storage, &header("osmo", 6, 1), false).unwrap();

        let info = crate::state::get_chain_info(&storage, "osmo").unwrap();
        assert_eq!(info.latest_header.unwrap().height, 6);
        assert_eq!(info.timestamped_headers_count, 2);
        assert!(info.latest_forks.is_empty());
    }

    #[test]
    fn fork_headers_do_not_enter_the_canonical_store() {
        let mut storage = MockStorage::new();
        handle_header(&mut storage, &header("osmo", 5, 1), false).unwrap();
        let mut fork = header("osmo", 5, 1);
        fork.hash = vec![0xff; 32];
        handle_header(&mut storage, &fork, true).unwrap();

        let info = crate::state::get_chain_info(&storage, "osmo").unwrap();
        assert_eq!(info.latest_forks.len(), 1);
        assert_eq!(info.timestamped_headers_count, 1);
        // the canonical store still holds the original header at 5
        assert_eq!(
            crate::state::get_header(&storage, "osmo", 5).unwrap().hash,
            vec![5u8; 32]
        );
    }

    #[test]
    fn closest_header_search_skips_missing_heights() {
        let mut storage = MockStorage::new();
        handle_header(&mut storage, &header("osmo", 3, 1), false).unwrap();
        handle_header(&mut storage, &header("osmo", 7, 1), false).unwrap();

        assert_eq!(find_closest_header(&storage, "osmo", 7).unwrap().height, 7);
        assert_eq!(find_closest_header(&storage, "osmo", 6).unwrap().height, 3);
        assert!(find_closest_header(&storage, "osmo", 2).is_err());
    }

    #[test]
    fn epoch_headers_filter_by_epoch() {
        let mut storage = MockStorage::new();
        handle_header(&mut storage, &header("osmo", 3, 1), false).unwrap();
        handle_header(&mut storage, &header("osmo", 4, 2), false).unwrap();
        handle_header(&mut storage, &header("osmo", 5, 2), false).unwrap();

        let headers = get_epoch_headers(&storage, "osmo", 2).unwrap();
        assert_eq!(
            headers.iter().map(|h| h.height).collect::<Vec<_>>(),
            vec![4, 5]
        );
    }

    #[test]
    fn epoch_snapshot_freezes_the_live_view() {
        let mut storage = MockStorage::new();
        handle_header(&mut storage, &header("osmo", 5, 1), false).unwrap();
        record_epoch_chain_info(&mut storage, 1).unwrap();

        // later headers do not leak into the old snapshot
        handle_header(&mut storage, &header("osmo", 9, 2), false).unwrap();
        let snapshot = get_epoch_chain_info(&storage, 1, "osmo").unwrap().unwrap();
        assert_eq!(snapshot.latest_header.unwrap().height, 5);
        assert!(get_epoch_chain_info(&storage, 2, "osmo").unwrap().is_none());
    }
}
