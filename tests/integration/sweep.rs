use super::super::*;
use manet_analysis::logging::*;
use manet_analysis::sweep::SweepResults;
use manet_analysis::tests::common::*;
use std::fs;

fn sweep_file(fixture: &str, averages: usize) -> String {
    format!(
        r#"name = "cli_sweep"
command = ["sh", "-c", "cp {{fixture}} manet-routing-compare.flowmon && echo {{protocol_name}} {{nSinks}} {{seed}} >> runs.txt"]
protocols = ["OLSR", "AODV"]
moving_param = "nSinks"
moving_values = [1, 2]
averages = {}

[base_params]
fixture = "{}"
"#,
        averages, fixture
    )
}

#[test]
fn sweep_runs_every_point() {
    let data = setup("sweep_runs_every_point", false);
    let fixture = write_test_file(&data.work_dir, "fixture.flowmon", FLOWMON_XML);
    let spec = write_test_file(&data.work_dir, "sweep.toml", &sweep_file(&fixture, 2));
    let log_file = format!("{}/sweep.log", &data.work_dir);

    assert_cli::Assert::command(&[&get_cli_path()])
        .with_args(&["--log_file", &log_file, "sweep", "--spec", &spec, "--dir", &data.work_dir])
        .succeeds()
        .stdout()
        .contains("cli_sweep_results.json")
        .unwrap();

    let runs = fs::read_to_string(format!("{}/runs.txt", &data.work_dir)).unwrap();
    let runs: Vec<&str> = runs.lines().collect();
    assert_eq!(
        runs,
        vec![
            "OLSR 1 23",
            "OLSR 1 1234145",
            "OLSR 2 23",
            "OLSR 2 1234145",
            "AODV 1 23",
            "AODV 1 1234145",
            "AODV 2 23",
            "AODV 2 1234145",
        ]
    );

    let results: SweepResults = serde_json::from_str(
        &fs::read_to_string(format!("{}/cli_sweep_results.json", &data.work_dir)).unwrap(),
    )
    .unwrap();
    assert_eq!(results.points.len(), 4);
    assert_eq!(results.moving_param, "nSinks");
    let overhead = &results.points[3].metrics["control_overhead"];
    assert!((overhead.mean - 0.14).abs() < 1e-12);
    assert_eq!(overhead.samples, 2);

    let records = get_log_records_from_file(&log_file).unwrap();
    let run_records = records.iter().filter(|r| r.msg == "Run finished").count();
    assert_eq!(run_records, 8);
    let rec = find_record_by_msg("Run finished", &records).expect("No run record");
    assert_eq!(rec.run, Some(0));
    assert_eq!(rec.dialect, Some(String::from("OLSR")));

    teardown(data);
}

#[test]
fn sweep_simulator_failure() {
    let data = setup("sweep_simulator_failure", false);
    let spec = write_test_file(
        &data.work_dir,
        "sweep.toml",
        &sweep_file("/nonexistent/fixture.flowmon", 1),
    );
    let log_file = format!("{}/sweep.log", &data.work_dir);

    assert_cli::Assert::command(&[&get_cli_path()])
        .with_args(&["--log_file", &log_file, "sweep", "--spec", &spec, "--dir", &data.work_dir])
        .fails_with(2)
        .stderr()
        .contains("Simulator exited with")
        .unwrap();

    teardown(data);
}
