//! End-to-end tests over the public store API, running on the in-memory
//! reference engine.

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use tide_engine::{KvEngine, MemEngine};
use tide_store::{BinlogConfig, Config, Reaper, Role, Store, StoreError, TypeTag};

/// Dump an engine's whole keyspace for state comparison.
fn dump(engine: &MemEngine) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut iter = engine.iter().unwrap();
    let mut out = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        out.push((iter.key().to_vec(), iter.value().to_vec()));
        iter.next();
    }
    out
}

fn open_store() -> (Store, MemEngine) {
    let engine = MemEngine::new();
    let store = Store::open(Arc::new(engine.clone()), Config::default()).unwrap();
    (store, engine)
}

fn open_logged_store(dir: &TempDir, max_segment_size: u64) -> (Store, MemEngine) {
    let engine = MemEngine::new();
    let mut cfg = Config::default();
    cfg.binlog = BinlogConfig {
        enabled: true,
        dir: dir.path().to_path_buf(),
        file_prefix: "tide-bin".to_string(),
        max_segment_size,
        max_segment_count: 8,
    };
    let store = Store::open(Arc::new(engine.clone()), cfg).unwrap();
    (store, engine)
}

#[test]
fn test_kv_operations() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    assert_eq!(db.get(b"k").unwrap(), None);
    db.set(b"k", b"v").unwrap();
    assert_eq!(db.get(b"k").unwrap().unwrap().as_ref(), b"v");
    assert!(db.exists(b"k").unwrap());

    assert!(!db.set_nx(b"k", b"other").unwrap());
    assert!(db.set_nx(b"k2", b"v2").unwrap());

    let old = db.get_set(b"k", b"v9").unwrap().unwrap();
    assert_eq!(old.as_ref(), b"v");
    assert_eq!(db.get(b"k").unwrap().unwrap().as_ref(), b"v9");

    db.set(b"n", b"10").unwrap();
    assert_eq!(db.incr_by(b"n", 5).unwrap(), 15);
    assert_eq!(db.incr_by(b"missing", -3).unwrap(), -3);
    assert!(matches!(
        db.incr_by(b"k", 1),
        Err(StoreError::InvalidArgument(_))
    ));

    assert_eq!(db.del(&[b"k", b"k2", b"nope"]).unwrap(), 2);
    assert!(!db.exists(b"k").unwrap());

    let vals = db.mget(&[b"n", b"missing", b"k"]).unwrap();
    assert_eq!(vals[0].as_ref().unwrap().as_ref(), b"10");
    assert_eq!(vals[1].as_ref().unwrap().as_ref(), b"-3");
    assert!(vals[2].is_none());
}

#[test]
fn test_key_and_value_limits() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();
    let cfg = store.config().store.clone();

    let big_key = vec![b'k'; cfg.max_key_size + 1];
    assert!(matches!(
        db.set(&big_key, b"v"),
        Err(StoreError::KeyTooLarge { .. })
    ));

    let big_value = vec![0u8; cfg.max_value_size + 1];
    assert!(matches!(
        db.set(b"k", &big_value),
        Err(StoreError::ValueTooLarge { .. })
    ));
    assert!(!db.exists(b"k").unwrap());
}

#[test]
fn test_hash_end_to_end_meta_collapse() {
    let (store, engine) = open_store();
    let db = store.select(0).unwrap();

    assert!(db.hset(b"a", b"f", b"v").unwrap());
    assert_eq!(db.hlen(b"a").unwrap(), 1);
    assert_eq!(db.hdel(b"a", &[b"f"]).unwrap(), 1);
    assert_eq!(db.hlen(b"a").unwrap(), 0);

    // zero collapses to no entry at all, not a zero-valued one
    assert_eq!(engine.len(), 0);
}

#[test]
fn test_hash_operations() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    db.hmset(b"h", &[(b"f1", b"1"), (b"f2", b"2"), (b"f3", b"3")])
        .unwrap();
    assert_eq!(db.hlen(b"h").unwrap(), 3);
    assert!(!db.hset(b"h", b"f1", b"1x").unwrap());
    assert_eq!(db.hget(b"h", b"f1").unwrap().unwrap().as_ref(), b"1x");

    let all = db.hgetall(b"h").unwrap();
    assert_eq!(all.len(), 3);
    // fields come back in lexical order after their owning key
    let fields: Vec<&[u8]> = all.iter().map(|(f, _)| f.as_ref()).collect();
    assert_eq!(fields, vec![b"f1".as_ref(), b"f2", b"f3"]);

    assert_eq!(db.hkeys(b"h").unwrap().len(), 3);
    assert_eq!(db.hvals(b"h").unwrap().len(), 3);

    let got = db.hmget(b"h", &[b"f2", b"zz"]).unwrap();
    assert_eq!(got[0].as_ref().unwrap().as_ref(), b"2");
    assert!(got[1].is_none());

    db.hset(b"h", b"count", b"7").unwrap();
    assert_eq!(db.hincr_by(b"h", b"count", 3).unwrap(), 10);
    assert_eq!(db.hincr_by(b"h", b"fresh", 2).unwrap(), 2);
    assert_eq!(db.hlen(b"h").unwrap(), 5);

    assert_eq!(db.hclear(b"h").unwrap(), 5);
    assert_eq!(db.hlen(b"h").unwrap(), 0);
}

#[test]
fn test_meta_consistency_after_mixed_mutations() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    for i in 0..20u8 {
        db.hset(b"h", &[i], b"v").unwrap();
    }
    for i in 0..7u8 {
        db.hdel(b"h", &[&[i]]).unwrap();
    }
    db.hmset(b"h", &[(b"x", b"1"), (b"y", b"2")]).unwrap();
    assert_eq!(db.hlen(b"h").unwrap() as usize, db.hgetall(b"h").unwrap().len());

    db.sadd(b"s", &[b"a", b"b", b"c", b"a"]).unwrap();
    db.srem(b"s", &[b"b", b"zz"]).unwrap();
    assert_eq!(db.scard(b"s").unwrap() as usize, db.smembers(b"s").unwrap().len());

    db.zadd(b"z", &[(3, b"c"), (1, b"a"), (2, b"b")]).unwrap();
    db.zrem(b"z", &[b"b"]).unwrap();
    db.zadd(b"z", &[(9, b"a")]).unwrap(); // move, not add
    assert_eq!(
        db.zcard(b"z").unwrap() as usize,
        db.zrange_by_score(b"z", i64::MIN / 2, i64::MAX / 2, 0, None)
            .unwrap()
            .len()
    );

    db.rpush(b"l", &[b"1", b"2", b"3"]).unwrap();
    db.lpop(b"l").unwrap();
    assert_eq!(
        db.llen(b"l").unwrap() as usize,
        db.lrange(b"l", 0, -1).unwrap().len()
    );
}

#[test]
fn test_list_operations() {
    let (store, engine) = open_store();
    let db = store.select(0).unwrap();

    assert_eq!(db.rpush(b"l", &[b"b", b"c"]).unwrap(), 2);
    assert_eq!(db.lpush(b"l", &[b"a"]).unwrap(), 3);

    let range = db.lrange(b"l", 0, -1).unwrap();
    let items: Vec<&[u8]> = range.iter().map(|v| v.as_ref()).collect();
    assert_eq!(items, vec![b"a".as_ref(), b"b", b"c"]);

    assert_eq!(db.lindex(b"l", 0).unwrap().unwrap().as_ref(), b"a");
    assert_eq!(db.lindex(b"l", -1).unwrap().unwrap().as_ref(), b"c");
    assert_eq!(db.lindex(b"l", 5).unwrap(), None);

    assert_eq!(db.lrange(b"l", 1, 1).unwrap().len(), 1);
    assert_eq!(db.lrange(b"l", 2, 1).unwrap().len(), 0);
    assert_eq!(db.lrange(b"l", -2, -1).unwrap().len(), 2);

    assert_eq!(db.lpop(b"l").unwrap().unwrap().as_ref(), b"a");
    assert_eq!(db.rpop(b"l").unwrap().unwrap().as_ref(), b"c");
    assert_eq!(db.lpop(b"l").unwrap().unwrap().as_ref(), b"b");
    assert_eq!(db.lpop(b"l").unwrap(), None);
    assert_eq!(db.llen(b"l").unwrap(), 0);

    // popping the last element removes the meta record too
    assert_eq!(engine.len(), 0);

    // lpush order: each value becomes the new head
    db.lpush(b"l2", &[b"1", b"2", b"3"]).unwrap();
    let range = db.lrange(b"l2", 0, -1).unwrap();
    let items: Vec<&[u8]> = range.iter().map(|v| v.as_ref()).collect();
    assert_eq!(items, vec![b"3".as_ref(), b"2", b"1"]);

    assert_eq!(db.lclear(b"l2").unwrap(), 3);
}

#[test]
fn test_set_operations() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    assert_eq!(db.sadd(b"s", &[b"a", b"b", b"a"]).unwrap(), 2);
    assert!(db.sismember(b"s", b"a").unwrap());
    assert!(!db.sismember(b"s", b"z").unwrap());
    assert_eq!(db.scard(b"s").unwrap(), 2);

    let members = db.smembers(b"s").unwrap();
    let names: Vec<&[u8]> = members.iter().map(|m| m.as_ref()).collect();
    assert_eq!(names, vec![b"a".as_ref(), b"b"]);

    assert_eq!(db.srem(b"s", &[b"a", b"zz"]).unwrap(), 1);
    assert_eq!(db.scard(b"s").unwrap(), 1);
    assert_eq!(db.sclear(b"s").unwrap(), 1);
    assert_eq!(db.scard(b"s").unwrap(), 0);
}

#[test]
fn test_zset_operations() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    assert_eq!(db.zadd(b"z", &[(10, b"a"), (-5, b"b"), (0, b"c")]).unwrap(), 3);
    assert_eq!(db.zscore(b"z", b"b").unwrap(), Some(-5));
    assert_eq!(db.zcard(b"z").unwrap(), 3);

    // ascending score order, negatives first
    let all = db.zrange_by_score(b"z", -100, 100, 0, None).unwrap();
    let members: Vec<&[u8]> = all.iter().map(|(m, _)| m.as_ref()).collect();
    assert_eq!(members, vec![b"b".as_ref(), b"c", b"a"]);

    // moving a member updates both families; the old score vanishes
    db.zadd(b"z", &[(7, b"b")]).unwrap();
    assert_eq!(db.zcard(b"z").unwrap(), 3);
    let all = db.zrange_by_score(b"z", -100, 100, 0, None).unwrap();
    assert_eq!(all[0].0.as_ref(), b"c");
    assert_eq!(db.zcount(b"z", -100, -1).unwrap(), 0);

    assert_eq!(db.zcount(b"z", 7, 10).unwrap(), 2);
    let window = db.zrange_by_score(b"z", -100, 100, 1, Some(1)).unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].0.as_ref(), b"b");

    assert_eq!(db.zincr_by(b"z", b"c", 4).unwrap(), 4);
    assert_eq!(db.zincr_by(b"z", b"new", -2).unwrap(), -2);
    assert_eq!(db.zcard(b"z").unwrap(), 4);

    assert_eq!(db.zrem(b"z", &[b"a", b"nope"]).unwrap(), 1);
    assert_eq!(db.zrem_range_by_score(b"z", -10, 5).unwrap(), 2);
    assert_eq!(db.zcard(b"z").unwrap(), 1);
    assert_eq!(db.zclear(b"z").unwrap(), 1);
}

#[test]
fn test_zset_score_overflow() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    assert!(matches!(
        db.zadd(b"z", &[(i64::MAX, b"m")]),
        Err(StoreError::ScoreOverflow)
    ));
    // a rejected mutation leaves nothing behind
    assert_eq!(db.zcard(b"z").unwrap(), 0);

    db.zadd(b"z", &[(i64::MAX / 2, b"m")]).unwrap();
    assert!(matches!(
        db.zincr_by(b"z", b"m", 1),
        Err(StoreError::ScoreOverflow)
    ));
    assert_eq!(db.zscore(b"z", b"m").unwrap(), Some(i64::MAX / 2));
}

#[test]
fn test_bitmap_operations() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    assert!(!db.set_bit(b"b", 7, true).unwrap());
    assert!(db.get_bit(b"b", 7).unwrap());
    assert!(!db.get_bit(b"b", 8).unwrap());

    // far bit lands in a different segment
    assert!(!db.set_bit(b"b", 100_000, true).unwrap());
    assert!(db.get_bit(b"b", 100_000).unwrap());
    assert_eq!(db.bit_count(b"b").unwrap(), 2);
    assert_eq!(db.bit_high_water(b"b").unwrap(), Some(100_000));

    assert!(db.set_bit(b"b", 7, false).unwrap());
    assert!(!db.get_bit(b"b", 7).unwrap());
    assert_eq!(db.bit_count(b"b").unwrap(), 1);

    assert_eq!(db.bclear(b"b").unwrap(), 2);
    assert_eq!(db.bit_count(b"b").unwrap(), 0);
    assert_eq!(db.bit_high_water(b"b").unwrap(), None);
}

#[test]
fn test_scan_and_rev_scan() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    for name in [b"apple".as_ref(), b"banana", b"berry", b"cherry"] {
        db.set(name, b"x").unwrap();
    }
    db.hset(b"hash1", b"f", b"v").unwrap();

    // kv scan does not see hash keys
    let keys = db.scan(TypeTag::Kv, None, 100, true, None).unwrap();
    let names: Vec<&[u8]> = keys.iter().map(|k| k.as_ref()).collect();
    assert_eq!(names, vec![b"apple".as_ref(), b"banana", b"berry", b"cherry"]);

    // cursor + inclusive flag
    let keys = db.scan(TypeTag::Kv, Some(b"banana"), 100, false, None).unwrap();
    assert_eq!(keys.first().unwrap().as_ref(), b"berry");
    let keys = db.scan(TypeTag::Kv, Some(b"banana"), 2, true, None).unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].as_ref(), b"banana");

    // glob filter
    let keys = db.scan(TypeTag::Kv, None, 100, true, Some(b"b*")).unwrap();
    assert_eq!(keys.len(), 2);

    // reverse
    let keys = db.rev_scan(TypeTag::Kv, None, 100, true, None).unwrap();
    let names: Vec<&[u8]> = keys.iter().map(|k| k.as_ref()).collect();
    assert_eq!(names, vec![b"cherry".as_ref(), b"berry", b"banana", b"apple"]);
    let keys = db.rev_scan(TypeTag::Kv, Some(b"berry"), 100, false, None).unwrap();
    assert_eq!(keys.first().unwrap().as_ref(), b"banana");

    // container scans enumerate container names
    let keys = db.scan(TypeTag::Hash, None, 100, true, None).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].as_ref(), b"hash1");
}

#[test]
fn test_rollback_on_error_leaves_nothing() {
    let (store, engine) = open_store();
    let db = store.select(0).unwrap();
    let max = store.config().store.max_value_size;

    let big = vec![0u8; max + 1];
    let result = db.hmset(b"h", &[(b"ok", b"v"), (b"bad", big.as_slice())]);
    assert!(matches!(result, Err(StoreError::ValueTooLarge { .. })));

    // the batch that staged the first field never committed
    assert_eq!(db.hlen(b"h").unwrap(), 0);
    assert_eq!(engine.len(), 0);
}

#[test]
fn test_expire_ttl_persist_roundtrip() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    db.set(b"k", b"v").unwrap();
    assert!(db.expire(TypeTag::Kv, b"k", 10).unwrap());
    let ttl = db.ttl(TypeTag::Kv, b"k").unwrap();
    assert!(ttl > 0 && ttl <= 10);

    // refresh replaces the old deadline
    assert!(db.expire(TypeTag::Kv, b"k", 100).unwrap());
    let ttl = db.ttl(TypeTag::Kv, b"k").unwrap();
    assert!(ttl > 10 && ttl <= 100);

    assert!(db.persist(TypeTag::Kv, b"k").unwrap());
    assert_eq!(db.ttl(TypeTag::Kv, b"k").unwrap(), -1);
    assert!(!db.persist(TypeTag::Kv, b"k").unwrap());

    // expiring a missing key is a no-op
    assert!(!db.expire(TypeTag::Kv, b"missing", 10).unwrap());
    assert!(!db.expire(TypeTag::Hash, b"k", 10).unwrap());
}

#[test]
fn test_reaper_evicts_due_keys() {
    let (store, engine) = open_store();
    let db = store.select(0).unwrap();

    db.set(b"gone", b"v").unwrap();
    db.hset(b"hgone", b"f", b"v").unwrap();
    db.set(b"stays", b"v").unwrap();

    db.expire_at(TypeTag::Kv, b"gone", 1).unwrap();
    db.expire_at(TypeTag::Hash, b"hgone", 1).unwrap();
    db.expire(TypeTag::Kv, b"stays", 1000).unwrap();

    let evicted = store.reap_tick().unwrap();
    assert_eq!(evicted, 2);

    assert!(!db.exists(b"gone").unwrap());
    assert_eq!(db.hlen(b"hgone").unwrap(), 0);
    assert!(db.exists(b"stays").unwrap());

    // evicted keys vanish from scans and from the expiry index
    assert_eq!(db.scan(TypeTag::Hash, None, 100, true, None).unwrap().len(), 0);
    let keys = db.scan(TypeTag::Kv, None, 100, true, None).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys[0].as_ref(), b"stays");

    // nothing left but the surviving key, its value and expiry entries
    assert_eq!(engine.len(), 3);

    // second tick finds nothing to do
    assert_eq!(store.reap_tick().unwrap(), 0);
}

#[test]
fn test_reaper_respects_refresh_race() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    db.set(b"k", b"v").unwrap();
    db.expire_at(TypeTag::Kv, b"k", 1).unwrap();
    // refreshed before the reaper runs; the old deadline must not fire
    db.expire(TypeTag::Kv, b"k", 1000).unwrap();

    assert_eq!(store.reap_tick().unwrap(), 0);
    assert!(db.exists(b"k").unwrap());
    let ttl = db.ttl(TypeTag::Kv, b"k").unwrap();
    assert!(ttl > 0);
}

#[test]
fn test_follower_never_reaps() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    db.set(b"k", b"v").unwrap();
    db.expire_at(TypeTag::Kv, b"k", 1).unwrap();

    store.set_role(Role::Replica);
    assert_eq!(store.reap_tick().unwrap(), 0);
    assert!(db.exists(b"k").unwrap());
    assert!(matches!(
        db.evict(TypeTag::Kv, b"k"),
        Err(StoreError::ReplicationRole)
    ));

    store.set_role(Role::Primary);
    assert_eq!(store.reap_tick().unwrap(), 1);
    assert!(!db.exists(b"k").unwrap());
}

#[test]
fn test_reaper_thread_lifecycle() -> Result<()> {
    let engine = MemEngine::new();
    let mut cfg = Config::default();
    cfg.reaper.tick_interval_ms = 20;
    let store = Store::open(Arc::new(engine), cfg)?;
    let db = store.select(0)?;

    db.set(b"doomed", b"v")?;
    db.expire_at(TypeTag::Kv, b"doomed", 1)?;

    let reaper = Reaper::start(store.clone());
    // a few ticks are plenty
    std::thread::sleep(std::time::Duration::from_millis(200));
    reaper.stop();

    assert!(!db.exists(b"doomed")?);
    Ok(())
}

#[test]
fn test_multi_db_isolation() {
    let (store, _) = open_store();
    let db0 = store.select(0).unwrap();
    let db1 = store.select(1).unwrap();

    db0.set(b"k", b"zero").unwrap();
    db1.set(b"k", b"one").unwrap();
    assert_eq!(db0.get(b"k").unwrap().unwrap().as_ref(), b"zero");
    assert_eq!(db1.get(b"k").unwrap().unwrap().as_ref(), b"one");

    db0.flush_db().unwrap();
    assert!(db0.get(b"k").unwrap().is_none());
    assert_eq!(db1.get(b"k").unwrap().unwrap().as_ref(), b"one");

    assert!(store.select(200).is_err());
}

#[test]
fn test_flush_type() {
    let (store, _) = open_store();
    let db = store.select(0).unwrap();

    db.set(b"k1", b"v").unwrap();
    db.set(b"k2", b"v").unwrap();
    db.expire(TypeTag::Kv, b"k1", 100).unwrap();
    db.hset(b"h", b"f", b"v").unwrap();

    assert_eq!(db.flush_type(TypeTag::Kv).unwrap(), 2);
    assert!(!db.exists(b"k1").unwrap());
    assert_eq!(db.ttl(TypeTag::Kv, b"k1").unwrap(), -1);
    assert_eq!(db.hlen(b"h").unwrap(), 1);
}

#[test]
fn test_binlog_records_and_replay_converge() {
    let dir = TempDir::new().unwrap();
    let (primary, primary_engine) = open_logged_store(&dir, 1 << 20);
    let db = primary.select(0).unwrap();

    db.set(b"k", b"v1").unwrap();
    db.set(b"k", b"v2").unwrap();
    db.hmset(b"h", &[(b"f1", b"1"), (b"f2", b"2")]).unwrap();
    db.hdel(b"h", &[b"f1"]).unwrap();
    db.rpush(b"l", &[b"a", b"b"]).unwrap();
    db.lpop(b"l").unwrap();
    db.zadd(b"z", &[(5, b"m"), (1, b"n")]).unwrap();
    db.set_bit(b"bits", 9000, true).unwrap();
    db.expire_at(TypeTag::Kv, b"k", 1).unwrap();
    primary.reap_tick().unwrap(); // eviction is logged like a client delete

    // replay the log, in file order, into a fresh store
    let (replica, replica_engine) = open_store();
    replica.set_role(Role::Replica);
    for segment in primary.binlog_segments() {
        replica.replay_segment(dir.path().join(segment)).unwrap();
    }

    let rdb = replica.select(0).unwrap();
    assert!(rdb.get(b"k").unwrap().is_none()); // evicted on the primary
    assert_eq!(rdb.hlen(b"h").unwrap(), 1);
    assert_eq!(rdb.hget(b"h", b"f2").unwrap().unwrap().as_ref(), b"2");
    assert_eq!(rdb.llen(b"l").unwrap(), 1);
    assert_eq!(rdb.lrange(b"l", 0, -1).unwrap()[0].as_ref(), b"b");
    assert_eq!(rdb.zscore(b"z", b"m").unwrap(), Some(5));
    assert!(rdb.get_bit(b"bits", 9000).unwrap());

    // physical convergence: replay produced the primary's exact keyspace
    assert_eq!(dump(&primary_engine), dump(&replica_engine));
}

#[test]
fn test_binlog_rotation_and_status() {
    let dir = TempDir::new().unwrap();
    let (store, _) = open_logged_store(&dir, 64);
    let db = store.select(0).unwrap();

    let (name, _) = store.binlog_status().unwrap();
    assert_eq!(name, "tide-bin.0000001");

    // enough writes to cross the 64-byte cap at least once
    for i in 0..4u8 {
        db.set(format!("key-{}", i).as_bytes(), &[0u8; 64]).unwrap();
    }
    let segments = store.binlog_segments();
    assert!(segments.len() >= 2);

    // index file lists them oldest first
    let index = std::fs::read_to_string(dir.path().join("tide-bin.index")).unwrap();
    let listed: Vec<&str> = index.lines().collect();
    assert_eq!(listed.len(), segments.len());
    assert_eq!(listed[0], "tide-bin.0000001");

    // purge never touches the active segment
    let active = store.binlog_status().unwrap().0;
    store.purge_binlog(100).unwrap();
    let remaining = store.binlog_segments();
    assert_eq!(remaining, vec![active]);
}
