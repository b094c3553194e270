use std::sync::Arc;
use std::thread;

use servid::{
    replica_name, AllocatorConfig, CoordinationStore, IdentityKey, InstanceIdAllocator, MemoryStore, RequestOptions,
    SnowflakeGenerator,
};
use tracing_subscriber::EnvFilter;

const PATH: &str = "/roc/servid/account";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let store = Arc::new(MemoryStore::new());
    store
        .create_dir(PATH, &RequestOptions::default())
        .expect("registration directory");

    // Four replicas boot at once and race for instance ids
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let config = AllocatorConfig::builder().max_retries(4).unwrap().build();
                let allocator = InstanceIdAllocator::with_config(store, config);
                let me = IdentityKey::from_addr(&format!("10.0.0.{i}"), 9000).unwrap();
                let instance_id = allocator.allocate(PATH, &me).unwrap();

                let ids = SnowflakeGenerator::new(i64::from(instance_id)).unwrap();
                let id = ids.generate();
                println!(
                    "{} ({me}) -> id {id} generated at {:?}",
                    replica_name("account", instance_id),
                    ids.datetime_of(id)
                );
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    // A restarted replica gets its old id back
    let allocator = InstanceIdAllocator::new(Arc::clone(&store));
    let me = IdentityKey::from_addr("10.0.0.2", 9000).unwrap();
    println!("10.0.0.2:9000 re-registered as {}", allocator.allocate(PATH, &me).unwrap());

    let ids = SnowflakeGenerator::new(0).unwrap();
    let since = ids.id_floor_for_timestamp(chrono::Utc::now().timestamp_millis() - 60_000);
    println!("ids from the last minute are >= {since}");
}
