//! CLI smoke entry point.
//!
//! # Responsibility
//! - Open the configured storage backend end to end and report what
//!   it contains, to verify `lodgebook_core` wiring locally.

use lodgebook_core::{EntityKind, ObjectStore, Storage, StorageConfig};

fn main() {
    println!("lodgebook status={}", lodgebook_core::status());
    println!("lodgebook version={}", lodgebook_core::core_version());

    let config = match StorageConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(2);
        }
    };

    let mut storage = match Storage::open(&config) {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("storage error: {err}");
            std::process::exit(1);
        }
    };

    for kind in EntityKind::ALL {
        println!("{kind} count={}", storage.all(kind).len());
    }

    if let Err(err) = storage.close() {
        eprintln!("close error: {err}");
        std::process::exit(1);
    }
}
