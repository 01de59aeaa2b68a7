use std::path::{Path, PathBuf};

use dataset_editor::allocate::Split;
use dataset_editor::config::DiscoverConfig;
use dataset_editor::error::EditorError;
use dataset_editor::file_store::{DryRunStore, FsStore};
use dataset_editor::partition::{run_separate, Mode, SeparateOptions};

fn temp_root(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "dataset_editor_{tag}_{}_{nanos}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

const SESSIONS: [&str; 5] = [
    "20230101_090000",
    "20230102_090000",
    "20230103_090000",
    "20230104_090000",
    "20230105_090000",
];

fn write_sessions(dir: &Path, per_session: usize) {
    std::fs::create_dir_all(dir).unwrap();
    for key in SESSIONS {
        for i in 0..per_session {
            std::fs::write(dir.join(format!("cam_{key}_{i:04}.jpg")), b"img").unwrap();
        }
    }
}

fn names_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn opts(dataset_dir: &Path, output_dir: &Path) -> SeparateOptions {
    SeparateOptions {
        dataset_dir: dataset_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        ratio: 0.4,
        want_val: true,
        random: false,
        seed: Some(7),
    }
}

#[test]
fn temporal_split_keeps_sessions_whole() -> anyhow::Result<()> {
    let root = temp_root("temporal");
    let data = root.join("data");
    let out = root.join("out");
    write_sessions(&data, 10);

    let report = run_separate(&opts(&data, &out), &DiscoverConfig::default(), &mut FsStore)?;
    assert_eq!(report.mode, Mode::Temporal);
    assert_eq!(report.counts[&Split::Train], 30);
    assert_eq!(report.counts[&Split::Test], 10);
    assert_eq!(report.counts[&Split::Val], 10);
    assert!(report.notes.is_empty());

    let mut all = Vec::new();
    for split in Split::ALL {
        let names = names_in(&out.join(split.dir_name()));
        let keys: std::collections::BTreeSet<String> =
            names.iter().map(|n| n[4..19].to_string()).collect();
        for k in &keys {
            let whole = names.iter().filter(|n| n.contains(k.as_str())).count();
            assert_eq!(whole, 10, "session {k} split across {split}");
        }
        all.extend(names);
    }
    all.sort();
    assert_eq!(all, names_in(&data));

    let train = names_in(&out.join("train"));
    assert!(train.iter().any(|n| n.contains(SESSIONS[0])));
    assert!(train.iter().any(|n| n.contains(SESSIONS[4])));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn not_val_leaves_no_val_dir() -> anyhow::Result<()> {
    let root = temp_root("not_val");
    let data = root.join("data");
    let out = root.join("out");
    write_sessions(&data, 10);

    let mut o = opts(&data, &out);
    o.want_val = false;
    let report = run_separate(&o, &DiscoverConfig::default(), &mut FsStore)?;
    assert_eq!(report.counts[&Split::Train], 30);
    assert_eq!(report.counts[&Split::Test], 20);
    assert_eq!(report.counts[&Split::Val], 0);
    assert!(!out.join("val").exists());

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn random_split_counts() -> anyhow::Result<()> {
    let root = temp_root("random");
    let data = root.join("data");
    let out = root.join("out");
    std::fs::create_dir_all(&data)?;
    for i in 0..100 {
        std::fs::write(data.join(format!("img{i:03}.png")), b"x")?;
    }

    let mut o = opts(&data, &out);
    o.random = true;
    let report = run_separate(&o, &DiscoverConfig::default(), &mut FsStore)?;
    assert_eq!(report.mode, Mode::Random);
    assert!(report.tables.is_empty());
    assert_eq!(names_in(&out.join("train")).len(), 60);
    assert_eq!(names_in(&out.join("test")).len(), 20);
    assert_eq!(names_in(&out.join("val")).len(), 20);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn annotations_win_when_more_numerous() -> anyhow::Result<()> {
    let root = temp_root("anns");
    let data = root.join("data");
    let out = root.join("out");
    std::fs::create_dir_all(&data)?;
    for key in SESSIONS {
        for i in 0..4 {
            std::fs::write(data.join(format!("cam_{key}_{i:04}.xml")), b"<a/>")?;
        }
    }
    std::fs::write(data.join("cover.jpg"), b"img")?;

    let mut o = opts(&data, &out);
    o.want_val = false;
    let report = run_separate(&o, &DiscoverConfig::default(), &mut FsStore)?;
    let total: usize = report.counts.values().sum();
    assert_eq!(total, 20);
    assert!(names_in(&out.join("train")).iter().all(|n| n.ends_with(".xml")));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn invalid_name_fails_before_writing() {
    let root = temp_root("invalid");
    let data = root.join("data");
    let out = root.join("out");
    write_sessions(&data, 3);
    std::fs::write(data.join("cam_20231301_090000_0000.jpg"), b"img").unwrap();

    let err = run_separate(&opts(&data, &out), &DiscoverConfig::default(), &mut FsStore)
        .unwrap_err();
    match err {
        EditorError::InvalidDataset { stem, .. } => {
            assert_eq!(stem, "cam_20231301_090000_0000")
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(!out.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn directory_without_dataset_files_is_insufficient() {
    let root = temp_root("no_files");
    let data = root.join("data");
    let out = root.join("out");
    std::fs::create_dir_all(&data).unwrap();
    std::fs::write(data.join("notes.txt"), b"not an image").unwrap();

    let err = run_separate(&opts(&data, &out), &DiscoverConfig::default(), &mut FsStore)
        .unwrap_err();
    assert!(matches!(err, EditorError::InsufficientData(_)));
    assert!(!out.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn bad_time_token_is_rejected() {
    let root = temp_root("bad_time");
    let data = root.join("data");
    let out = root.join("out");
    write_sessions(&data, 3);
    std::fs::write(data.join("cam_20230101_250000_0000.jpg"), b"img").unwrap();

    let err = run_separate(&opts(&data, &out), &DiscoverConfig::default(), &mut FsStore)
        .unwrap_err();
    assert!(matches!(err, EditorError::InvalidDataset { .. }));
    assert!(!out.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn two_sessions_are_not_enough() {
    let root = temp_root("two_sessions");
    let data = root.join("data");
    let out = root.join("out");
    std::fs::create_dir_all(&data).unwrap();
    for key in &SESSIONS[..2] {
        std::fs::write(data.join(format!("cam_{key}_0000.jpg")), b"img").unwrap();
    }

    let err = run_separate(&opts(&data, &out), &DiscoverConfig::default(), &mut FsStore)
        .unwrap_err();
    assert!(matches!(err, EditorError::InsufficientData(_)));
    assert!(!out.exists());

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn bad_ratio_and_missing_dirs_are_configuration_errors() {
    let root = temp_root("config_errors");
    let data = root.join("data");
    write_sessions(&data, 2);

    let mut o = opts(&data, &root.join("out"));
    o.ratio = 1.0;
    let err = run_separate(&o, &DiscoverConfig::default(), &mut FsStore).unwrap_err();
    assert!(matches!(err, EditorError::Configuration(_)));

    let o = opts(&root.join("missing"), &root.join("out"));
    let err = run_separate(&o, &DiscoverConfig::default(), &mut FsStore).unwrap_err();
    assert!(matches!(err, EditorError::Configuration(_)));

    let o = opts(&data, &root.join("no_parent").join("out"));
    let err = run_separate(&o, &DiscoverConfig::default(), &mut FsStore).unwrap_err();
    assert!(matches!(err, EditorError::Configuration(_)));

    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn dry_run_plans_copies_without_writing() -> anyhow::Result<()> {
    let root = temp_root("dry_run");
    let data = root.join("data");
    let out = root.join("out");
    write_sessions(&data, 10);

    let mut store = DryRunStore::new();
    let report = run_separate(&opts(&data, &out), &DiscoverConfig::default(), &mut store)?;
    let copies = store.count(|op| matches!(op, dataset_editor::file_store::StoreOp::Copy { .. }));
    assert_eq!(copies, 50);
    assert_eq!(report.counts.values().sum::<usize>(), 50);
    assert!(!out.exists());

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}
