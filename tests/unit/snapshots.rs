use manet_analysis::config::AnalysisConfig;
use manet_analysis::logging::create_discard_logger;
use manet_analysis::routing::loader::TableLoader;
use manet_analysis::routing::*;
use manet_analysis::tests::common::*;
use manet_analysis::AnalysisErrorKind;

//**** Snapshots loaded from table dumps ****

#[test]
fn test_load_is_deterministic() {
    let loader = TableLoader::new(create_discard_logger());
    let first = loader.load(AODV_TABLES, 2.0, 3).unwrap();
    let second = loader.load(AODV_TABLES, 2.0, 3).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_in_search_and_down_rows_are_never_routes() {
    let loader = TableLoader::new(create_discard_logger());
    let snapshot = loader.load(AODV_TABLES, 2.0, 3).unwrap();
    for node in snapshot.nodes() {
        for (dest, _) in snapshot.table(node).into_iter().flatten() {
            //Node 2's route to node 0 is the only searching one in the dump
            assert!(!(node == 2 && *dest == 0));
        }
    }
    assert_eq!(snapshot.get_route(2, 0), None);
    assert_eq!(snapshot.get_route(0, 2), Some(vec![0, 1, 2]));
}

#[test]
fn test_every_dialect_rebuilds_the_chain() {
    let loader = TableLoader::new(create_discard_logger());
    for (text, dialect) in &[
        (AODV_TABLES, Dialect::AODV),
        (OLSR_TABLES, Dialect::OLSR),
        (DSDV_TABLES, Dialect::DSDV),
    ] {
        let time = if *dialect == Dialect::AODV { 2.0 } else { 1.0 };
        let snapshot = loader.load(text, time, 3).unwrap();
        assert_eq!(snapshot.dialect, *dialect);
        assert_eq!(snapshot.node_count(), 3);
        assert_eq!(snapshot.get_route(0, 2), Some(vec![0, 1, 2]));
    }
}

#[test]
fn test_loader_from_config() {
    let config = AnalysisConfig::from_toml(
        "node_subnet = \"10.1.1.0/24\"\n[policies.aodv]\naccepted_statuses = []\nexcluded_statuses = [\"DOWN\"]\n",
    )
    .unwrap();
    let loader = TableLoader::from_config(&config, create_discard_logger()).unwrap();
    let snapshot = loader.load(AODV_TABLES, 2.0, 3).unwrap();
    assert_eq!(snapshot.get_route(2, 0), Some(vec![2, 1, 0]));
}

#[test]
fn test_missing_and_desynchronized_blocks() {
    let loader = TableLoader::new(create_discard_logger());
    match loader.load(OLSR_TABLES, 3.0, 3).unwrap_err().kind {
        AnalysisErrorKind::SnapshotNotFound(_) => {}
        other => panic!("Unexpected error kind: {:?}", other),
    }
    match loader.load(AODV_TABLES, 1.0, 5).unwrap_err().kind {
        AnalysisErrorKind::Desynchronized(_) => {}
        other => panic!("Unexpected error kind: {:?}", other),
    }
    assert_eq!(loader.timestamps(AODV_TABLES), vec![1.0, 2.0]);
}
