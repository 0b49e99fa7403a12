//! 需要一个真实的 Redis：`REDIS_URL=redis://... cargo test -- --ignored`

mod common;

use common::*;
use redis_record::{Blocking, BlockingRedisStore, Record, RecordStore, RedisStore, Store};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string())
}

fn session(owner: &str) -> Session {
    Session {
        id: uuid::Uuid::new_v4().to_string(),
        owner: owner.to_string(),
        last_seen: chrono::DateTime::from_timestamp(1_700_000_000, 250_000_000)
            .map(|at| at.naive_utc()),
    }
}

#[tokio::test]
#[ignore]
async fn async_store_against_redis() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut store = RedisStore::connect(&redis_url()).await.unwrap();
    let owner = uuid::Uuid::new_v4().to_string();
    let first = session(&owner);
    let second = session(&owner);

    first.save(&mut store).await.unwrap();
    second.save(&mut store).await.unwrap();

    assert_eq!(Session::search(&mut store, first.id.as_str()).await.unwrap(), Some(first.clone()));
    assert_eq!(Session::query().owner(owner.as_str()).count(&mut store).await.unwrap(), 2);

    first.delete(&mut store).await.unwrap();
    second.delete(&mut store).await.unwrap();
    assert!(Session::query().owner(owner.as_str()).all(&mut store).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore]
async fn queue_against_redis_with_and_without_lpos() {
    for native_lpos in [true, false] {
        let mut store = RedisStore::connect(&redis_url())
            .await
            .unwrap()
            .with_native_lpos(native_lpos);
        let room = rand_room();
        let guest = Guest {
            guest_id: Some(i64::from(room)),
            nickname: None,
            room: Some(room),
        };

        guest.save_dedup(&mut store).await.unwrap();
        guest.save_dedup(&mut store).await.unwrap();

        let queue = Guest::query().room(room);
        assert_eq!(queue.members(&mut store).await.unwrap(), [room.to_string()]);
        assert!(queue.contains(&mut store, room).await.unwrap());
        assert_eq!(queue.rotate(&mut store).await.unwrap(), Some(guest.clone()));

        guest.delete(&mut store).await.unwrap();
        assert!(queue.members(&mut store).await.unwrap().is_empty());
    }
}

#[tokio::test]
#[ignore]
async fn scan_enumerates_like_keys() {
    let mut store = RedisStore::connect(&redis_url()).await.unwrap();
    let owner = uuid::Uuid::new_v4().to_string();
    let sessions = (0..3).map(|_| session(&owner)).collect::<Vec<_>>();
    for session in &sessions {
        session.save(&mut store).await.unwrap();
    }

    let pattern = format!("shared::session::by_owner::owner::{owner}");
    assert_eq!(store.scan(&pattern).await.unwrap(), [pattern.clone()]);
    let mut found = Session::all(&mut store).await.unwrap();
    found.retain(|session| session.owner == owner);
    assert_eq!(found.len(), 3);

    let mut scanning = BlockingRedisStore::connect(&redis_url()).unwrap();
    assert_eq!(
        futures::executor::block_on(scanning.scan(&pattern)).unwrap(),
        [pattern.clone()]
    );

    for session in &sessions {
        session.delete(&mut store).await.unwrap();
    }
}

#[test]
#[ignore]
fn blocking_store_against_redis() {
    let store = BlockingRedisStore::connect(&redis_url()).unwrap();
    let mut db = Blocking::new(store);
    let owner = uuid::Uuid::new_v4().to_string();
    let record = session(&owner);

    db.save(&record).unwrap();
    assert_eq!(db.search::<Session>(record.id.as_str()).unwrap(), Some(record.clone()));
    assert_eq!(db.group(&Session::query().owner(owner.as_str())).unwrap(), [record.clone()]);

    db.delete(&record).unwrap();
    assert!(!db.exists::<Session>(record.id.as_str()).unwrap());
}

// 每次运行用不同的队列，避免和残留数据冲突
fn rand_room() -> u32 {
    (uuid::Uuid::new_v4().as_u128() % 1_000_000_000) as u32
}
