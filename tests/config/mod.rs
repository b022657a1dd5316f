// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use zvec_client::native::MemoryEngine;
use zvec_client::{Client, ClientConfig, CollectionOptions, EngineMode, ZvecError};

use crate::common::{collection_path, Article};

#[test]
fn test_collection_options_defaults() {
    let options = CollectionOptions::default();
    assert_eq!(options.segment_max_docs, 1_000_000);
    assert_eq!(options.index_build_parallel, 0);
    assert!(options.auto_flush);
    assert!(options.is_valid());

    let native = options.to_native().unwrap();
    assert_eq!(native.segment_max_docs, 1_000_000);
    assert_eq!(native.auto_flush, 1);
}

#[test]
fn test_out_of_range_options_are_rejected() {
    let zero = CollectionOptions {
        segment_max_docs: 0,
        ..CollectionOptions::default()
    };
    assert!(!zero.is_valid());
    assert!(matches!(zero.to_native(), Err(ZvecError::InvalidArgument { .. })));

    let huge = CollectionOptions {
        index_build_parallel: u32::MAX,
        ..CollectionOptions::default()
    };
    assert!(huge.to_native().is_err());

    let config = ClientConfig {
        collection: zero,
        ..ClientConfig::memory()
    };
    assert!(Client::from_config(&config).is_err());
}

#[test]
fn test_config_constructors() {
    let memory = ClientConfig::memory();
    assert_eq!(memory.engine, EngineMode::Memory);
    assert_eq!(memory.library_path, None);

    let native = ClientConfig::native("/opt/zvec/libzvec_c.so");
    assert_eq!(native.engine, EngineMode::Native);
    assert_eq!(native.library_path, Some(PathBuf::from("/opt/zvec/libzvec_c.so")));
    assert_eq!(ClientConfig::default().engine, EngineMode::Native);
}

#[test]
fn test_engine_mode_parsing() {
    assert_eq!("memory".parse::<EngineMode>().unwrap(), EngineMode::Memory);
    assert_eq!(" Native ".parse::<EngineMode>().unwrap(), EngineMode::Native);
    assert!("gpu".parse::<EngineMode>().is_err());
}

#[test]
fn test_config_serde_round_trip() {
    let json = r#"{
        "engine": "memory",
        "library_path": null,
        "collection": { "segment_max_docs": 5000, "index_build_parallel": 4, "auto_flush": false }
    }"#;
    let config: ClientConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.engine, EngineMode::Memory);
    assert_eq!(config.collection.segment_max_docs, 5000);
    assert!(!config.collection.auto_flush);

    let encoded = serde_json::to_string(&config).unwrap();
    let decoded: ClientConfig = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, config);
}

#[test]
fn test_options_reach_the_engine() {
    let dir = TempDir::new().unwrap();
    let engine = Arc::new(MemoryEngine::new());
    let options = CollectionOptions {
        segment_max_docs: 10_000,
        index_build_parallel: 2,
        auto_flush: false,
    };
    let client = Client::with_engine(engine.clone(), options);
    assert_eq!(client.options(), &options);

    let path = collection_path(&dir, "tuned");
    let _articles = client.create_collection::<Article>(&path).unwrap();
    let stored = engine.collection_options(&path).unwrap();
    assert_eq!(stored.segment_max_docs, 10_000);
    assert_eq!(stored.index_build_parallel, 2);
    assert_eq!(stored.auto_flush, 0);
}

#[test]
fn test_memory_config_builds_client() {
    let client = Client::from_config(&ClientConfig::memory()).unwrap();
    assert_eq!(client.version(), "0.2.0-memory");
    assert!(client.registry().is_empty());
}
