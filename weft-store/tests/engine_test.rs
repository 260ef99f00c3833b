//! Engine integration tests: validation chain, custody transfer
//! revocation, signer revocation cascade, and pruning boundaries.

use std::sync::Arc;

use tempfile::tempdir;

use weft_model::factories::{self, TestCustody, TestSigner};
use weft_model::proto::UserDataType;
use weft_model::{Fid, Message};
use weft_storage::HubDb;
use weft_store::{Engine, EngineOptions, EventBus, HubEvent};

fn engine() -> (tempfile::TempDir, Engine) {
    engine_with(EngineOptions::default())
}

fn engine_with(options: EngineOptions) -> (tempfile::TempDir, Engine) {
    let dir = tempdir().unwrap();
    let db = Arc::new(HubDb::open(dir.path()).unwrap());
    let engine = Engine::with_options(db, EventBus::new(), options);
    (dir, engine)
}

/// Register custody and authorize a delegate in one step.
fn onboard(engine: &Engine, fid: Fid, block: u64) -> (TestCustody, TestSigner) {
    let custody = TestCustody::generate();
    let delegate = TestSigner::generate();
    engine
        .merge_id_registry_event(&factories::register_event(fid, &custody, block))
        .unwrap();
    engine
        .merge_message(&factories::signer_add(fid, &delegate.pubkey, 1, &custody))
        .unwrap();
    (custody, delegate)
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<HubEvent>) -> Vec<HubEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[test]
fn test_message_for_unknown_fid_is_rejected() {
    let (_dir, engine) = engine();
    let signer = TestSigner::generate();
    let msg = factories::cast_add(Fid(1), "hello", 100, &signer);

    let err = engine.merge_message(&msg).unwrap_err();
    assert_eq!(err.code(), "bad_request.validation_failure");
    assert_eq!(err.to_string(), "bad_request.validation_failure: unknown fid");
}

#[test]
fn test_message_from_unauthorized_delegate_is_rejected() {
    let (_dir, engine) = engine();
    let custody = TestCustody::generate();
    engine
        .merge_id_registry_event(&factories::register_event(Fid(1), &custody, 10))
        .unwrap();

    // No SignerAdd for this delegate
    let rogue = TestSigner::generate();
    let err = engine
        .merge_message(&factories::cast_add(Fid(1), "hi", 100, &rogue))
        .unwrap_err();
    assert_eq!(err.code(), "bad_request.validation_failure");
}

#[test]
fn test_signer_message_must_come_from_current_custody() {
    let (_dir, engine) = engine();
    let custody = TestCustody::generate();
    let other = TestCustody::generate();
    let delegate = TestSigner::generate();
    engine
        .merge_id_registry_event(&factories::register_event(Fid(1), &custody, 10))
        .unwrap();

    let err = engine
        .merge_message(&factories::signer_add(Fid(1), &delegate.pubkey, 1, &other))
        .unwrap_err();
    assert_eq!(err.code(), "bad_request.validation_failure");
}

#[test]
fn test_authorized_delegate_can_post() {
    let (_dir, engine) = engine();
    let fid = Fid(1);
    let (_custody, delegate) = onboard(&engine, fid, 10);

    let cast = factories::cast_add(fid, "gm", 100, &delegate);
    engine.merge_message(&cast).unwrap();
    assert_eq!(engine.casts().get_adds_by_fid(fid).unwrap(), vec![cast]);
}

#[test]
fn test_custody_transfer_revokes_previous_custody_messages() {
    // Custody A authorizes S and removes S'; transferring to B revokes
    // both signer messages and the delegate's content transitively.
    let (_dir, engine) = engine();
    let fid = Fid(1);
    let a = TestCustody::generate();
    let b = TestCustody::generate();
    let s = TestSigner::generate();
    let s_prime = TestSigner::generate();

    engine
        .merge_id_registry_event(&factories::register_event(fid, &a, 10))
        .unwrap();
    engine
        .merge_message(&factories::signer_add(fid, &s.pubkey, 1, &a))
        .unwrap();
    engine
        .merge_message(&factories::signer_remove(fid, &s_prime.pubkey, 1, &a))
        .unwrap();
    let cast = factories::cast_add(fid, "posted under A", 100, &s);
    engine.merge_message(&cast).unwrap();

    let mut rx = engine.events().subscribe();
    engine
        .merge_id_registry_event(&factories::transfer_event(fid, &a, &b, 11))
        .unwrap();

    // E2 is current
    assert_eq!(engine.get_custody_event(fid).unwrap().to, b.address.as_bytes());

    // Both signer messages and the delegate's cast are gone
    assert_eq!(engine.signers().message_count(fid).unwrap(), 0);
    assert_eq!(engine.casts().message_count(fid).unwrap(), 0);

    let events = drain(&mut rx);
    let revoked: Vec<&Message> = events
        .iter()
        .filter_map(|e| match e {
            HubEvent::RevokeMessage(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(revoked.len(), 3);
    assert!(revoked.iter().any(|m| **m == cast));
}

#[test]
fn test_signer_remove_revokes_delegate_content() {
    let (_dir, engine) = engine();
    let fid = Fid(1);
    let (custody, delegate) = onboard(&engine, fid, 10);

    let cast = factories::cast_add(fid, "soon gone", 100, &delegate);
    engine.merge_message(&cast).unwrap();
    let amp = factories::amp(
        fid,
        weft_model::MessageType::AmpAdd,
        Fid(2),
        100,
        &delegate,
    );
    engine.merge_message(&amp).unwrap();

    engine
        .merge_message(&factories::signer_remove(fid, &delegate.pubkey, 5, &custody))
        .unwrap();

    // Invariant: nothing signed by the delegate survives
    assert_eq!(engine.casts().message_count(fid).unwrap(), 0);
    assert_eq!(engine.amps().message_count(fid).unwrap(), 0);
    // ...and the delegate can no longer post
    let err = engine
        .merge_message(&factories::cast_add(fid, "rejected", 200, &delegate))
        .unwrap_err();
    assert_eq!(err.code(), "bad_request.validation_failure");
}

#[test]
fn test_prune_drops_earliest_messages() {
    // pruneSizeLimit = 3, five SignerAdds at t+1..t+5: the two earliest
    // are pruned.
    let options = EngineOptions {
        signer_prune_limit: 3,
        ..EngineOptions::default()
    };
    let (_dir, engine) = engine_with(options);
    let fid = Fid(1);
    let custody = TestCustody::generate();
    engine
        .merge_id_registry_event(&factories::register_event(fid, &custody, 10))
        .unwrap();

    let mut rx = engine.events().subscribe();
    let delegates: Vec<TestSigner> = (0..5).map(|_| TestSigner::generate()).collect();
    let mut adds = Vec::new();
    for (i, delegate) in delegates.iter().enumerate() {
        let add = factories::signer_add(fid, &delegate.pubkey, 1 + i as u32, &custody);
        engine.merge_message(&add).unwrap();
        adds.push(add);
    }

    assert_eq!(engine.signers().message_count(fid).unwrap(), 3);
    for (i, delegate) in delegates.iter().enumerate() {
        let lookup = engine
            .signers()
            .get_active_signer(fid, delegate.pubkey.as_bytes());
        if i < 2 {
            assert_eq!(lookup.unwrap_err().code(), "not_found");
        } else {
            assert_eq!(lookup.unwrap(), adds[i]);
        }
    }

    let pruned: Vec<Message> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            HubEvent::PruneMessage(m) => Some(m),
            _ => None,
        })
        .collect();
    assert_eq!(pruned, vec![adds[0].clone(), adds[1].clone()]);
}

#[test]
fn test_merge_outcome_is_order_independent() {
    // The same message multiset, submitted in different orders, converges
    // to the same observable state.
    let fid = Fid(1);
    let custody = TestCustody::generate();
    let delegate = TestSigner::generate();
    let register = factories::register_event(fid, &custody, 10);
    let authorize = factories::signer_add(fid, &delegate.pubkey, 1, &custody);

    let cast = factories::cast_add(fid, "gm", 100, &delegate);
    let target = cast.ts_hash().unwrap();
    let remove = factories::cast_remove(fid, target, 100, &delegate);
    let bio = factories::user_data(fid, UserDataType::Bio, "v1", 50, &delegate);
    let bio2 = factories::user_data(fid, UserDataType::Bio, "v2", 60, &delegate);

    let orders: Vec<Vec<&Message>> = vec![
        vec![&cast, &remove, &bio, &bio2],
        vec![&bio2, &remove, &bio, &cast],
        vec![&remove, &cast, &bio2, &bio],
    ];

    let mut outcomes = Vec::new();
    for order in orders {
        let (_dir, engine) = engine();
        engine.merge_id_registry_event(&register).unwrap();
        engine.merge_message(&authorize).unwrap();
        for msg in order {
            // Losing merges are no-ops, not failures
            engine.merge_message(msg).unwrap();
        }
        outcomes.push((
            engine.casts().get_all_messages_by_fid(fid).unwrap(),
            engine.user_data().get_all_messages_by_fid(fid).unwrap(),
        ));
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[1], outcomes[2]);
    // The equal-timestamp cast conflict resolves to the remove
    assert_eq!(outcomes[0].0, vec![remove]);
    assert_eq!(outcomes[0].1, vec![bio2]);
}

#[test]
fn test_get_message_by_ts_hash_resolves_across_stores() {
    let (_dir, engine) = engine();
    let fid = Fid(1);
    let (_custody, delegate) = onboard(&engine, fid, 10);

    let cast = factories::cast_add(fid, "find me", 100, &delegate);
    engine.merge_message(&cast).unwrap();

    let found = engine
        .get_message_by_ts_hash(&cast.ts_hash().unwrap())
        .unwrap();
    assert_eq!(found, cast);

    let missing = weft_model::TsHash::new(1, &weft_model::Hash([9u8; 16]));
    assert_eq!(
        engine.get_message_by_ts_hash(&missing).unwrap_err().code(),
        "not_found"
    );
}
