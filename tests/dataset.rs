use std::fs;
use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use tempfile::{tempdir, TempDir};

use slmrnd_data::data::model::{SamplingMethod, Sets};
use slmrnd_data::report::read_v_export;
use slmrnd_data::{DataError, DatasetOptions, ScenarioDataset, ScenarioFiles};

const V_HEADER: &str = "OriginID;DestinationID;Total_TruckingDuration\n";

fn small_sets() -> Sets {
    Sets {
        demand_nodes: 6,
        pods: 3,
        max_open_pods: 2,
    }
}

fn options() -> DatasetOptions {
    DatasetOptions {
        sets: small_sets(),
        ..DatasetOptions::default()
    }
}

struct Fixture {
    dir: TempDir,
    files: ScenarioFiles,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
            files: ScenarioFiles::default(),
        }
    }

    fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn scenario(&mut self, s: u32, nodes: &str, v0: &str, v: &str) -> &mut Self {
        let n = self.write(&format!("nodes_{s}.csv"), nodes);
        let a = self.write(&format!("v0_{s}.csv"), v0);
        let b = self.write(&format!("v_{s}.csv"), v);
        self.files.insert(s, n, a, b);
        self
    }
}

/// Areas 10/20/30 for PODs 1..3, demand 5/15/0.
fn two_scenarios() -> Fixture {
    let mut fx = Fixture::new();
    fx.scenario(
        2,
        "Name;Area;Demand\nA;10;5\nB;20;15\nC;30;0\n",
        "OriginID;DestinationID;Total_TruckingDuration\n0;1;0\n0;2;100\n0;5;200\n",
        &format!("{V_HEADER}1;1;10\n1;2;20\n2;3;30\n4;1;40\n3;7;50\n"),
    );
    fx.scenario(
        1,
        "Name;Area;Demand\nA;1;1\nB;1;1\nC;1;1\nD;1;1\n",
        "OriginID;DestinationID;Total_TruckingDuration\n0;3;7\n",
        &format!("{V_HEADER}2;6;1,5\n3;6;3,5\n"),
    );
    fx
}

#[test]
fn scenarios_are_sorted_with_uniform_probability() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    assert_eq!(data.scenarios(), &[1, 2]);
    assert_eq!(data.probability(1), Some(0.5));
    assert_eq!(data.probability(2), Some(0.5));
    assert_eq!(data.method(), SamplingMethod::Lhs);
}

#[test]
fn max_supply_is_sum_of_scenario_demands() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    for &s in data.scenarios() {
        let sum: f64 = data.scenario_demands(s).map(|(_, d)| d).sum();
        assert_relative_eq!(data.max_supply()[&s], sum);
    }
    assert_eq!(data.max_supply()[&1], 4.0);
    assert_eq!(data.max_supply()[&2], 20.0);
    assert_eq!(data.demand(2, 2), Some(15.0));
    assert_eq!(data.demand(1, 4), Some(1.0));
    assert_eq!(data.demand(2, 4), None);
}

#[test]
fn capacities_come_from_the_first_scenario_areas() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    // scenario 1 is first: four equal areas, three of them PODs
    let k = data.capacities();
    assert_eq!(k.len(), 3);
    assert_eq!(k[&1], 0.0);
    assert_relative_eq!(k[&2], 20.0 / 3.0);
    assert_relative_eq!(k[&3], 20.0 / 3.0);
    assert_eq!(data.nodes().len(), 4);
    assert_eq!(data.calculate_capacity_upper_bound().unwrap(), *k);
}

#[test]
fn concrete_capacity_example() {
    let mut fx = Fixture::new();
    fx.scenario(
        1,
        "Area;Demand\n10;5\n20;15\n30;0\n",
        "DestinationID;Total_TruckingDuration\n1;1\n",
        V_HEADER,
    );
    let data = ScenarioDataset::load(&fx.files).unwrap();
    assert_eq!(data.max_supply()[&1], 20.0);
    assert_eq!(data.capacity(1), Some(0.0));
    assert_relative_eq!(data.capacity(2).unwrap(), 20.0 / 60.0 * 20.0);
    assert_relative_eq!(data.capacity(3).unwrap(), 10.0);
}

#[test]
fn v0_has_one_entry_per_pod() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    for &s in data.scenarios() {
        assert_eq!(data.v0(s).unwrap().len(), 3);
    }
    let v0 = data.v0(2).unwrap();
    assert_eq!(v0.get(1), Some(0.0));
    assert_relative_eq!(v0.get(2).unwrap(), 0.5);
    // POD 3 absent from the file, POD 5 outside J
    assert_eq!(v0.get(3), Some(0.0));
    assert_eq!(v0.get(5), None);
    // single-row file: constant column
    assert_eq!(data.v0(1).unwrap().get(3), Some(0.0));
}

#[test]
fn v_only_holds_pairs_inside_the_sets() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    let sets = *data.sets();
    for matrix in data.v_all().values() {
        for (pod, node, _) in matrix.entries() {
            assert!(sets.is_pod(pod));
            assert!(sets.is_demand_node(node));
        }
    }
    let v2 = data.v(2).unwrap();
    assert_eq!(v2.len(), 3);
    assert_relative_eq!(v2.get(1, 1).unwrap(), 0.0);
    assert_relative_eq!(v2.get(1, 2).unwrap(), 0.25);
    assert_relative_eq!(v2.get(2, 3).unwrap(), 0.5);
    assert_eq!(v2.get(3, 7), None);

    let v1 = data.v(1).unwrap();
    assert_relative_eq!(v1.get(2, 6).unwrap(), 0.0);
    assert_relative_eq!(v1.get(3, 6).unwrap(), 1.0);
}

#[test]
fn zero_pod_area_fails_initialization() {
    let mut fx = Fixture::new();
    fx.scenario(
        1,
        "Area;Demand\n0;5\n;3\n",
        "DestinationID;Total_TruckingDuration\n1;1\n",
        V_HEADER,
    );
    let err = ScenarioDataset::load_with(&fx.files, options()).unwrap_err();
    assert!(matches!(err, DataError::ZeroPodArea { .. }));
}

#[test]
fn missing_v_path_is_reported() {
    let mut fx = two_scenarios();
    fx.files.v.remove(&2);
    let err = ScenarioDataset::load_with(&fx.files, options()).unwrap_err();
    assert!(matches!(
        err,
        DataError::MissingScenarioFile { kind: "v", scenario: 2 }
    ));
}

#[test]
fn no_scenarios_is_an_error() {
    let err = ScenarioDataset::load(&ScenarioFiles::default()).unwrap_err();
    assert!(matches!(err, DataError::NoScenarios));
}

#[test]
fn tau_is_computed_lazily_and_cached() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    assert_eq!(data.tau_if_computed(), None);
    let tau = data.tau();
    assert!((0.0..=1.0).contains(&tau));
    assert_eq!(data.tau_if_computed(), Some(tau));
    assert_eq!(data.tau(), tau);
}

#[test]
fn cached_tau_matches_default_range_search() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    let range = slmrnd_data::data::coverage::default_tau_range();
    let searched = data.find_optimal_tau(0.5, &range).unwrap();
    assert_eq!(data.tau(), searched);
}

#[test]
fn export_round_trips_every_v_entry() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    let out = fx.dir.path().join("v_export.csv");
    data.export_v_dict(&out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("Scenario;DestinationID;OriginID;Accessibility_Score\n"));

    let rows = read_v_export(&out).unwrap();
    let expected: usize = data.v_all().values().map(|m| m.len()).sum();
    assert_eq!(rows.len(), expected);
    for row in rows {
        let stored = data.v(row.scenario).unwrap().get(row.origin, row.destination);
        assert_eq!(stored, Some(row.score));
    }
}

#[test]
fn export_without_v_entries_still_has_header() {
    let mut fx = Fixture::new();
    fx.scenario(
        1,
        "Name;Area;Demand\nA;1;1\nB;1;1\nC;1;1\n",
        "OriginID;DestinationID;Total_TruckingDuration\n0;1;5\n",
        &format!("{V_HEADER}99;1;10\n99;2;20\n"),
    );
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    assert!(data.v(1).unwrap().is_empty());

    let out = fx.dir.path().join("v_export.csv");
    data.export_v_dict(&out).unwrap();
    assert_eq!(
        read(&out),
        "Scenario;DestinationID;OriginID;Accessibility_Score\n"
    );
    assert!(read_v_export(&out).unwrap().is_empty());
}

#[test]
fn structure_dumps_list_each_pod() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();

    let v0_path = fx.dir.path().join("v0.txt");
    data.check_v0_structure(2, &v0_path).unwrap();
    assert_eq!(
        read(&v0_path),
        "Scenario 2:\n1 -> 0.0\n2 -> 0.5\n3 -> 0.0\n"
    );

    let v_path = fx.dir.path().join("v.txt");
    data.check_v_structure(2, &v_path).unwrap();
    assert_eq!(
        read(&v_path),
        "Scenario 2:\n1 -> {1: 0.0, 2: 0.25}\n2 -> {3: 0.5}\n"
    );

    data.check_v_structure(9, &v_path).unwrap();
    assert_eq!(read(&v_path), "Scenario 9 not found in the v matrix.\n");
    data.check_v0_structure(9, &v0_path).unwrap();
    assert_eq!(read(&v0_path), "Scenario 9 not found in the v0 matrix.\n");
}

#[test]
fn demand_listing_includes_all_capacities() {
    let fx = two_scenarios();
    let data = ScenarioDataset::load_with(&fx.files, options()).unwrap();
    let mut out = Vec::new();
    data.write_demands_and_capacities(2, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("Demands for Scenario 2:\nNode ID: 1, Demand: 5\n"));
    assert!(!text.contains("Node ID: 4"));
    assert!(text.contains("\nCapacities for Scenario 2:\nPOD ID: 1, Capacity: 0\n"));
    assert_eq!(text.matches("POD ID:").count(), 3);
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}
