//! Check-then-act atomicity and runtime responsiveness under concurrent
//! requests.

use std::sync::Arc;
use std::time::{Duration, Instant};

use clearance::audit::MemoryAuditLog;
use clearance::credential::Pbkdf2Verifier;
use clearance::error::{AccessError, ErrorKind};
use clearance::label::Level;
use clearance::service::AccessService;
use clearance::store::InMemoryStore;

use super::support::{label, register, service};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_of_same_name_admit_one() {
    let (svc, audit) = service();
    for i in 0..16 {
        register(&svc, &format!("user{i}"), Level::Secret, &[]).await;
    }

    let mut handles = Vec::new();
    for i in 0..16 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.create_object(
                &format!("user{i}"),
                "contested",
                &format!("from user{i}"),
                label(Level::Confidential, &[]),
            )
            .await
        }));
    }

    let mut granted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => granted += 1,
            Ok(Err(AccessError::ObjectExists(name))) => {
                assert_eq!(name, "contested");
                rejected += 1;
            }
            Ok(Err(other)) => panic!("unexpected error: {other}"),
            Err(join) => panic!("task panicked: {join}"),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(rejected, 15);
    assert_eq!(svc.counts().await, (16, 1));
    assert_eq!(audit.len(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_registrations_of_same_id_admit_one() {
    let (svc, _audit) = service();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let svc = Arc::clone(&svc);
        handles.push(tokio::spawn(async move {
            svc.register("alice", "pw", label(Level::Secret, &[])).await
        }));
    }

    let mut granted = 0;
    for handle in handles {
        match handle.await {
            Ok(Ok(_)) => granted += 1,
            Ok(Err(err)) => assert_eq!(err.kind(), ErrorKind::AlreadyExists),
            Err(join) => panic!("task panicked: {join}"),
        }
    }
    assert_eq!(granted, 1);
    assert_eq!(svc.counts().await, (1, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn read_racing_delete_sees_whole_object_or_nothing() {
    let (svc, _audit) = service();
    register(&svc, "alice", Level::Secret, &[]).await;
    let created = svc
        .create_object("alice", "o1", "payload", label(Level::Secret, &[]))
        .await;
    assert!(created.is_ok());

    let mut readers = Vec::new();
    for _ in 0..4 {
        let svc = Arc::clone(&svc);
        readers.push(tokio::spawn(async move {
            let mut outcomes = Vec::new();
            for _ in 0..50 {
                outcomes.push(svc.read_object("alice", "o1").await);
                tokio::task::yield_now().await;
            }
            outcomes
        }));
    }
    let deleter = {
        let svc = Arc::clone(&svc);
        tokio::spawn(async move { svc.delete_object("alice", "o1").await })
    };

    match deleter.await {
        Ok(result) => assert!(result.is_ok()),
        Err(join) => panic!("delete task panicked: {join}"),
    }
    for reader in readers {
        let outcomes = match reader.await {
            Ok(outcomes) => outcomes,
            Err(join) => panic!("reader panicked: {join}"),
        };
        let mut deleted_seen = false;
        for outcome in outcomes {
            match outcome {
                Ok(content) => {
                    assert!(!deleted_seen, "object reappeared after delete");
                    assert_eq!(content, "payload");
                }
                Err(AccessError::ObjectNotFound(_)) => deleted_seen = true,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
    assert_eq!(
        svc.read_object("alice", "o1").await,
        Err(AccessError::ObjectNotFound("o1".to_owned()))
    );
}

#[tokio::test(flavor = "current_thread")]
async fn key_derivation_leaves_runtime_responsive() {
    let svc = AccessService::new(
        InMemoryStore::new(),
        Arc::new(Pbkdf2Verifier::new(100_000, 16)),
        Arc::new(MemoryAuditLog::new()),
    );

    let started = Instant::now();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        started.elapsed()
    });

    let registered = svc.register("alice", "pw", label(Level::Secret, &[])).await;
    let register_took = started.elapsed();
    assert!(registered.is_ok());

    let timer_waited = match timer.await {
        Ok(waited) => waited,
        Err(join) => panic!("timer task panicked: {join}"),
    };
    assert!(
        timer_waited < register_took,
        "timer waited {timer_waited:?} while register took {register_took:?}"
    );

    let started = Instant::now();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        started.elapsed()
    });
    let authenticated = svc.authenticate("alice", "pw").await;
    let authenticate_took = started.elapsed();
    assert!(authenticated.is_ok());
    let timer_waited = match timer.await {
        Ok(waited) => waited,
        Err(join) => panic!("timer task panicked: {join}"),
    };
    assert!(
        timer_waited < authenticate_took,
        "timer waited {timer_waited:?} while authenticate took {authenticate_took:?}"
    );
}
