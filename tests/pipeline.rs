use std::collections::HashSet;
use std::fs;
use std::path::Path;

use student_profile_engine::{
    load_dataset, AnalysisError, Dimension, DimensionScores, PipelineConfig, ProfileEngine,
    Strategy, StudentType, ID_COLUMN, TYPE_COLUMN,
};

/// Twelve students in four clearly separated groups, plus one fully missing row
fn cohort_csv() -> String {
    let mut csv = String::from(
        "CNTSTUID,CNT,PVMATH,PVREAD,PVSCIE,ST307Q07JA,ST307Q08JA,ST297Q01JA,ST297Q02JA,ST326Q01JA\n",
    );
    // (knowledge, cognition item, anxiety item, behavior item)
    let groups = [(650, 4, 1, 4), (640, 2, 4, 2), (420, 3, 1, 4), (380, 1, 2, 1)];
    for (g, (k, c, a, b)) in groups.iter().enumerate() {
        for m in 0..3 {
            let id = 34400000 + g * 10 + m;
            let pv = k + m * 2;
            csv.push_str(&format!("{id},CHN,{pv},{pv},{pv},{c},{c},{a},{a},{b}\n"));
        }
    }
    csv.push_str("34400099,CHN,99,,999,1,1,1,1,1\n");
    csv
}

fn write_input(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_threshold_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "students.csv", &cohort_csv());
    let output = dir.path().join("student_profiles.csv");

    let run = ProfileEngine::new(Strategy::Threshold)
        .run_to_file(&input, &output)
        .unwrap();
    assert_eq!(run.dropped_missing_scores, 1);
    assert_eq!(run.profiles.len(), 12);

    let written = load_dataset(&output).unwrap();
    assert_eq!(written.len(), 12);
    for dim in Dimension::ALL {
        assert!(written.has_column(dim.column_name()));
    }
    assert!(written.has_column(TYPE_COLUMN));
    assert!(written.has_column(ID_COLUMN));
    // raw columns are carried through
    assert!(written.has_column("CNT"));

    let scores = DimensionScores::from_dataset(&written);
    for dim in Dimension::ALL {
        for v in scores.get(dim).unwrap().iter().flatten() {
            assert!((0.0..=1.0).contains(v));
        }
    }
}

#[test]
fn test_threshold_reruns_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "students.csv", &cohort_csv());
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    let engine = ProfileEngine::new(Strategy::Threshold);
    engine.run_to_file(&input, &first).unwrap();
    engine.run_to_file(&input, &second).unwrap();

    assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[test]
fn test_cluster_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "students.csv", &cohort_csv());
    let output = dir.path().join("student_profiles.json");

    let run = ProfileEngine::new(Strategy::Cluster)
        .run_to_file(&input, &output)
        .unwrap();

    let types = run.student_types();
    assert_eq!(types.len(), 12);
    assert!(types.iter().all(|t| *t != StudentType::Unclassified));
    let distinct: HashSet<StudentType> = types.iter().copied().collect();
    assert_eq!(distinct.len(), 4);

    // the high-anxiety high-knowledge group is the second block of three
    assert!(types[3..6].iter().all(|t| *t == StudentType::HighPressure));
    assert!(types[0..3].iter().all(|t| *t == StudentType::Excellent));
    assert!(types[9..12].iter().all(|t| *t == StudentType::Warning));

    let written = load_dataset(&output).unwrap();
    assert_eq!(written.len(), 12);
}

#[test]
fn test_cluster_seed_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_input(dir.path(), "students.csv", &cohort_csv());

    let mut config = PipelineConfig::default();
    config.clustering.seed = 7;
    let engine = ProfileEngine::with_config(config, Strategy::Cluster);
    let first = engine.run_file(&input).unwrap();
    let second = engine.run_file(&input).unwrap();
    assert_eq!(first.student_types(), second.student_types());
}

#[test]
fn test_sentinels_and_cognition_floor() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "CNTSTUID,PVMATH,ST307Q07JA,ST297Q01JA,ST326Q01JA\n\
               1,400,97,99,3\n\
               2,600,4,2,5\n";
    let input = write_input(dir.path(), "students.csv", csv);

    let run = ProfileEngine::new(Strategy::Threshold).run_file(&input).unwrap();
    let scores = DimensionScores::from_dataset(&run.profiles);

    // 97 is the only cognition answer of student 1
    assert_eq!(scores.value(0, Dimension::Cognition), Some(0.0));
    // 99 on the only anxiety item leaves affect missing rather than scoring it
    assert_eq!(scores.value(0, Dimension::Affect), None);
    assert_eq!(scores.value(1, Dimension::Affect), Some(0.5));
    assert_eq!(scores.value(0, Dimension::Knowledge), Some(0.0));
    assert_eq!(scores.value(1, Dimension::Knowledge), Some(1.0));
}

#[test]
fn test_description_row_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "CNTSTUID,PVMATH,ST307Q07JA\n\
               Student ID,Plausible value in mathematics,Persistence\n\
               1,400,2\n\
               2,600,3\n";
    let input = write_input(dir.path(), "students.csv", csv);

    let run = ProfileEngine::new(Strategy::Threshold).run_file(&input).unwrap();
    assert_eq!(run.profiles.len(), 2);
    assert_eq!(
        run.profiles.numeric_column(ID_COLUMN).unwrap(),
        vec![Some(1.0), Some(2.0)]
    );
}

#[test]
fn test_missing_input_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("student_profiles.csv");

    let result = ProfileEngine::new(Strategy::Threshold)
        .run_to_file(&dir.path().join("nope.csv"), &output);
    assert!(matches!(result, Err(AnalysisError::LoadFailure(_))));
    assert!(!output.exists());
}

#[test]
fn test_too_small_cohort_for_clustering() {
    let dir = tempfile::tempdir().unwrap();
    let csv = "CNTSTUID,PVMATH,ST297Q01JA\n1,400,1\n2,500,2\n3,600,3\n";
    let input = write_input(dir.path(), "students.csv", csv);
    let output = dir.path().join("out.csv");

    let result = ProfileEngine::new(Strategy::Cluster).run_to_file(&input, &output);
    assert!(matches!(result, Err(AnalysisError::ModelError(_))));
    assert!(!output.exists());
}
