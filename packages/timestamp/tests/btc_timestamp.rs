//! End-to-end artifact tests: index a consumer header, finalize its epoch's
//! checkpoint on a mock BTC chain, assemble the BtcTimestamp and verify it,
//! then break each link of the proof chain in turn.

use assert_matches::assert_matches;
use blst::min_sig::{AggregateSignature, SecretKey};
use btcstamp_bitcoin::Network;
use btcstamp_ledger::{self as ledger, Params, StalePolicy, SubmissionKey, TransactionKey};
use btcstamp_merkle::{Ics23Verifier, MerkleError};
use btcstamp_quorum::{signed_msg, BlstVerifier, BLS_DST};
use btcstamp_test_utils::datagen;
use btcstamp_test_utils::mocks::{MockLightClient, RecordingOracle};
use btcstamp_test_utils::multistore::MultiStore;
use btcstamp_timestamp::{
    build_btc_timestamp, epoch_store_key, handle_header, header_store_key, record_epoch,
    record_epoch_chain_info, verify_btc_timestamp, BtcTimestamp, Epoch, IndexedHeader,
    StoreProver, TimestampError, EPOCHS_STORE_KEY, HEADERS_STORE_KEY, VALSETS_STORE_KEY,
};
use btcstamp_wire::{Tag, ADDRESS_LEN, BITMAP_LEN};
use cosmwasm_std::testing::MockStorage;
use cosmwasm_std::to_json_vec;
use tendermint_proto::crypto::ProofOps;

const TAG: Tag = [0x01, 0x02, 0x03];
const CHAIN_ID: &str = "osmo-test-5";
const EPOCH: u64 = 7;
const HEIGHT: u64 = 42;
const K: u64 = 2;
const W: u64 = 5;

fn params() -> Params {
    Params {
        btc_network: Network::Regtest,
        btc_confirmation_depth: K,
        checkpoint_finalization_timeout: W,
        checkpoint_tag: hex::encode(TAG),
        stale_policy: StalePolicy::Retain,
    }
}

struct StoreBackedProver<'a>(&'a MultiStore);

impl StoreProver for StoreBackedProver<'_> {
    fn prove_inclusion(
        &self,
        _root: &[u8],
        store_key: &str,
        key: &[u8],
    ) -> Result<ProofOps, String> {
        self.0.prove(store_key, key)
    }
}

fn submission_key(sub: &datagen::CheckpointSubmission) -> SubmissionKey {
    SubmissionKey {
        keys: [
            TransactionKey {
                index: 1,
                hash: sub.blocks[0].block_hash(),
            },
            TransactionKey {
                index: 1,
                hash: sub.blocks[1].block_hash(),
            },
        ],
    }
}

struct Setup {
    storage: MockStorage,
    btc: MockLightClient,
    multistore: MultiStore,
    keys: Vec<SecretKey>,
    /// Key of the submission expected to win best-submission selection.
    best_key: SubmissionKey,
    ts: BtcTimestamp,
}

impl Setup {
    fn verify(&self, ts: &BtcTimestamp) -> Result<(), TimestampError> {
        verify_btc_timestamp(
            ts,
            TAG,
            Network::Regtest,
            W,
            &self.btc,
            &BlstVerifier,
            &Ics23Verifier,
        )
    }
}

/// Runs the whole pipeline for one header of `CHAIN_ID` at `HEIGHT`,
/// committed in `EPOCH`, and returns the assembled artifact. With
/// `resubmit`, a second reporter lands the same signed checkpoint under a
/// different submitter address in two later blocks, which makes that
/// submission the best one.
fn setup_with_resubmission(resubmit: bool) -> Setup {
    let mut rng = rand::thread_rng();
    let mut storage = MockStorage::new();
    let mut btc = MockLightClient::new();
    let mut oracle = RecordingOracle::new();

    ledger::init(&mut storage, &params()).unwrap();

    // a quorum-signed checkpoint for the epoch, anchored in two mined blocks
    let keys = datagen::gen_bls_keys(&mut rng, 4);
    let val_set = datagen::validator_set(&keys);
    let ckpt = datagen::gen_signed_checkpoint(&mut rng, &keys, &[0, 1, 2], EPOCH);
    let submission = datagen::gen_checkpoint_submission(&mut rng, Network::Regtest, TAG, &ckpt);
    btc.insert_main(&submission.blocks[0].block_hash(), 100);
    btc.insert_main(&submission.blocks[1].block_hash(), 101);

    ledger::insert_submission(&mut storage, &btc, &mut oracle, &submission.proofs, "reporter")
        .unwrap();

    let mut best_key = submission_key(&submission);
    if resubmit {
        let mut resubmitted = ckpt.clone();
        resubmitted.submitter_address = vec![0x99; ADDRESS_LEN];
        let second =
            datagen::gen_checkpoint_submission(&mut rng, Network::Regtest, TAG, &resubmitted);
        btc.insert_main(&second.blocks[0].block_hash(), 102);
        btc.insert_main(&second.blocks[1].block_hash(), 103);
        ledger::insert_submission(&mut storage, &btc, &mut oracle, &second.proofs, "other")
            .unwrap();
        // shallower youngest block, so this one wins selection
        best_key = submission_key(&second);
    }

    btc.advance_tip(W);
    ledger::on_tip_change(&mut storage, &btc, &mut oracle).unwrap();

    // index the consumer header and snapshot the chain view for the epoch
    let header = IndexedHeader {
        chain_id: CHAIN_ID.to_string(),
        height: HEIGHT,
        hash: datagen::gen_random_bytes(&mut rng, 32),
        babylon_epoch: EPOCH,
        babylon_header_commit_hash: datagen::gen_random_bytes(&mut rng, 32),
        babylon_tx_hash: datagen::gen_random_bytes(&mut rng, 32),
    };
    handle_header(&mut storage, &header, false).unwrap();
    record_epoch_chain_info(&mut storage, EPOCH).unwrap();

    // the sealed state the app hash commits to
    let mut epoch_info = Epoch {
        epoch_number: EPOCH,
        sealer_block_hash: ckpt.last_commit_hash.clone(),
        sealer_app_hash: Vec::new(),
        sealer_block_height: 1_000,
    };
    let mut multistore = MultiStore::new();
    multistore.set(
        HEADERS_STORE_KEY,
        header_store_key(CHAIN_ID, HEIGHT),
        to_json_vec(&header).unwrap(),
    );
    multistore.set(
        EPOCHS_STORE_KEY,
        epoch_store_key(EPOCH),
        epoch_info.committed_bytes().unwrap(),
    );
    multistore.set(
        VALSETS_STORE_KEY,
        epoch_store_key(EPOCH),
        to_json_vec(&val_set).unwrap(),
    );
    epoch_info.sealer_app_hash = multistore.app_hash();
    record_epoch(&mut storage, &epoch_info, &val_set).unwrap();

    let ts = build_btc_timestamp(
        &storage,
        &btc,
        &StoreBackedProver(&multistore),
        CHAIN_ID,
        HEIGHT,
    )
    .unwrap();

    Setup {
        storage,
        btc,
        multistore,
        keys,
        best_key,
        ts,
    }
}

fn setup() -> Setup {
    setup_with_resubmission(false)
}

#[test]
fn built_artifact_verifies() {
    let setup = setup();
    let ts = &setup.ts;

    assert_eq!(ts.header.chain_id, CHAIN_ID);
    assert_eq!(ts.epoch_info.epoch_number, EPOCH);
    assert_eq!(ts.raw_checkpoint.epoch, EPOCH);
    assert_eq!(ts.btc_submission_key, setup.best_key);
    assert_eq!(
        ts.btc_submission_key.keys[0], ts.proof_epoch_submitted[0].key,
        "submission key and SPV evidence must agree"
    );
    assert_eq!(
        ts.btc_headers,
        vec![
            ts.proof_epoch_submitted[0].header.clone(),
            ts.proof_epoch_submitted[1].header.clone(),
        ]
    );

    setup.verify(ts).unwrap();
}

#[test]
fn unfinalized_epoch_yields_no_artifact() {
    let mut setup = setup();

    // a header committed after the last finalized epoch
    let header = IndexedHeader {
        chain_id: CHAIN_ID.to_string(),
        height: HEIGHT + 1,
        hash: vec![0x11; 32],
        babylon_epoch: EPOCH + 1,
        babylon_header_commit_hash: vec![0x22; 32],
        babylon_tx_hash: vec![0x33; 32],
    };
    handle_header(&mut setup.storage, &header, false).unwrap();

    let err = build_btc_timestamp(
        &setup.storage,
        &setup.btc,
        &StoreBackedProver(&setup.multistore),
        CHAIN_ID,
        HEIGHT + 1,
    )
    .unwrap_err();
    assert_matches!(err, TimestampError::NotYetFinalized { height, .. } if height == HEIGHT + 1);
}

#[test]
fn swapped_sealed_hash_is_rejected() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.epoch_info.sealer_block_hash = vec![0xab; 32];
    assert_matches!(setup.verify(&ts), Err(TimestampError::SealedHashMismatch));
}

#[test]
fn checkpoint_epoch_must_match_the_sealed_epoch() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.epoch_info.epoch_number = EPOCH + 1;
    assert_matches!(setup.verify(&ts), Err(TimestampError::CheckpointMismatch));
}

#[test]
fn checkpoint_not_anchored_on_btc_is_rejected() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    // a quorum-valid certificate by a different signer subset is still not
    // the checkpoint embedded in the BTC transactions
    let msg = signed_msg(EPOCH, &ts.raw_checkpoint.last_commit_hash);
    let sigs: Vec<_> = setup.keys[1..]
        .iter()
        .map(|key| key.sign(&msg, BLS_DST, &[]))
        .collect();
    let sig_refs: Vec<_> = sigs.iter().collect();
    let agg = AggregateSignature::aggregate(&sig_refs, true).unwrap();
    ts.raw_checkpoint.bls_sig = agg.to_signature().compress().to_vec();
    ts.raw_checkpoint.bitmap = vec![0u8; BITMAP_LEN];
    ts.raw_checkpoint.bitmap[0] = 0b0000_1110;
    assert_matches!(setup.verify(&ts), Err(TimestampError::CheckpointMismatch));
}

#[test]
fn best_submission_by_another_submitter_still_verifies() {
    let setup = setup_with_resubmission(true);
    let ts = &setup.ts;

    // the artifact carries the first submission's checkpoint record but the
    // resubmission's SPV evidence; only the submitter address differs
    assert_eq!(ts.btc_submission_key, setup.best_key);
    assert_ne!(ts.raw_checkpoint.submitter_address, vec![0x99; ADDRESS_LEN]);

    setup.verify(ts).unwrap();
}

#[test]
fn tampered_signature_fails_the_quorum_check() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.raw_checkpoint.bls_sig[0] ^= 0x01;
    assert_matches!(setup.verify(&ts), Err(TimestampError::Quorum(_)));
}

#[test]
fn header_from_another_epoch_is_rejected() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.header.babylon_epoch = EPOCH + 1;
    assert_matches!(
        setup.verify(&ts),
        Err(TimestampError::EpochNumberMismatch {
            header_epoch,
            epoch,
        }) if header_epoch == EPOCH + 1 && epoch == EPOCH
    );
}

#[test]
fn tampered_store_proof_is_rejected() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.proof_cz_header_in_epoch.ops[0].key.push(0x00);
    assert_matches!(
        setup.verify(&ts),
        Err(TimestampError::Merkle(MerkleError::ProofOpKeyMismatch { index: 0 }))
    );

    let mut ts = setup.ts.clone();
    ts.proof_epoch_sealed.proof_epoch_val_set.ops[0].data.pop();
    assert_matches!(setup.verify(&ts), Err(TimestampError::Merkle(_)));
}

#[test]
fn swapped_spv_evidence_is_rejected() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.proof_epoch_submitted.swap(0, 1);
    assert_matches!(
        setup.verify(&ts),
        Err(TimestampError::TxKeyMismatch { index: 0 })
    );
}

#[test]
fn corrupted_tx_branch_is_rejected() {
    let setup = setup();
    let mut ts = setup.ts.clone();
    ts.proof_epoch_submitted[1].proof[0] ^= 0xff;
    assert_matches!(
        setup.verify(&ts),
        Err(TimestampError::TxNotInHeader { index: 1 })
    );
}

#[test]
fn shallow_submission_is_not_final_for_the_verifier() {
    let setup = setup();
    let err = verify_btc_timestamp(
        &setup.ts,
        TAG,
        Network::Regtest,
        W + 10,
        &setup.btc,
        &BlstVerifier,
        &Ics23Verifier,
    )
    .unwrap_err();
    assert_matches!(err, TimestampError::InsufficientDepth);

    // a verifier whose light client never saw the blocks rejects too
    let fresh = MockLightClient::new();
    let err = verify_btc_timestamp(
        &setup.ts,
        TAG,
        Network::Regtest,
        W,
        &fresh,
        &BlstVerifier,
        &Ics23Verifier,
    )
    .unwrap_err();
    assert_matches!(err, TimestampError::InsufficientDepth);
}
