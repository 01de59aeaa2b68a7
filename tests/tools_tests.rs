use std::path::{Path, PathBuf};

use dataset_editor::error::EditorError;
use dataset_editor::file_store::{DryRunStore, FsStore, StoreOp};
use dataset_editor::tools::chunk::{run_chunk, ChunkOptions};
use dataset_editor::tools::dirdiff::{run_diff_copy, run_intersection, DiffMode};
use dataset_editor::tools::extract_latest::{run_extract_latest, ExtractLatestOptions};
use dataset_editor::tools::numbering::{
    run_numbering, run_repair, LinkMode, NumberingOptions, RenameRecord, RepairOptions,
};
use dataset_editor::tools::reorganize::{
    run_break_nest, run_for_rsync, run_group, run_move_into, BreakNestOptions,
};
use dataset_editor::tools::thin::{run_choice, run_delete, run_reduce};

fn temp_root(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "dataset_editor_tools_{tag}_{}_{nanos}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn touch(dir: &Path, names: &[&str]) {
    std::fs::create_dir_all(dir).unwrap();
    for n in names {
        std::fs::write(dir.join(n), n.as_bytes()).unwrap();
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

fn numbering_opts(img_dir: &Path, out_dir: &Path, mode: LinkMode) -> NumberingOptions {
    NumberingOptions {
        img_dir: img_dir.to_path_buf(),
        out_dir: out_dir.to_path_buf(),
        mode,
        prefix: String::new(),
        shuffle: false,
        seed: None,
        width: 5,
        map_file: "numbering2org.json".to_string(),
        image_extensions: vec!["jpg".to_string(), "png".to_string()],
    }
}

#[test]
fn numbering_then_repair_restores_names() -> anyhow::Result<()> {
    let root = temp_root("numbering");
    let imgs = root.join("imgs");
    touch(&imgs, &["b.jpg", "a.JPG", "c.png", "notes.txt"]);
    let out = root.join("out");

    let res = run_numbering(&numbering_opts(&imgs, &out, LinkMode::Copy), &mut FsStore)?;
    assert_eq!(
        names_in(&res.numbered_dir),
        vec!["00001.JPG", "00002.jpg", "00003.png"]
    );
    let record = RenameRecord::load(&res.record_path)?;
    assert_eq!(record.entries["00001.JPG"], "a.JPG");
    assert_eq!(record.entries["00003.png"], "c.png");
    assert_eq!(std::fs::read(res.numbered_dir.join("00002.jpg"))?, b"b.jpg");

    let rep = run_repair(
        &RepairOptions {
            img_dir: res.numbered_dir.clone(),
            record: res.record_path.clone(),
        },
        &mut FsStore,
    )?;
    assert_eq!(rep.save_dir, out.join("org_imgs"));
    assert_eq!(rep.restored, 3);
    assert_eq!(names_in(&rep.save_dir), vec!["a.JPG", "b.jpg", "c.png"]);
    assert_eq!(std::fs::read(rep.save_dir.join("c.png"))?, b"c.png");

    let again = run_repair(
        &RepairOptions {
            img_dir: res.numbered_dir,
            record: res.record_path,
        },
        &mut FsStore,
    );
    assert!(matches!(again, Err(EditorError::Configuration(_))));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[cfg(unix)]
#[test]
fn numbering_relative_links_resolve() -> anyhow::Result<()> {
    let root = temp_root("numbering_rel");
    let imgs = root.join("imgs");
    touch(&imgs, &["x.jpg", "y.jpg"]);
    let out = root.join("out");

    let mut opts = numbering_opts(&imgs, &out, LinkMode::Relative);
    opts.prefix = "site".to_string();
    let res = run_numbering(&opts, &mut FsStore)?;
    let link = res.numbered_dir.join("site_00001.jpg");
    assert!(std::fs::symlink_metadata(&link)?.file_type().is_symlink());
    assert!(std::fs::read_link(&link)?.is_relative());
    assert_eq!(std::fs::read(&link)?, b"x.jpg");

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn repair_rejects_path_like_record_entries() -> anyhow::Result<()> {
    let root = temp_root("repair_bad_record");
    let imgs = root.join("imgs");
    touch(&imgs, &["00001.jpg"]);
    let record = root.join("map.json");
    std::fs::write(&record, br#"{"00001.jpg": "../escape.jpg"}"#)?;

    let res = run_repair(
        &RepairOptions {
            img_dir: imgs,
            record,
        },
        &mut FsStore,
    );
    assert!(matches!(res, Err(EditorError::Configuration(_))));
    assert!(!root.join("org_imgs").exists());

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[cfg(unix)]
#[test]
fn chunk_groups_files_into_numbered_datasets() -> anyhow::Result<()> {
    let root = temp_root("chunk");
    let files = root.join("files");
    touch(&files, &["f1.jpg", "f2.jpg", "f10.jpg", "f3.jpg", "f4.jpg"]);
    let out = root.join("out");

    let chunks = run_chunk(
        &ChunkOptions {
            file_dir: files,
            size: 2,
            output: out.clone(),
        },
        &mut FsStore,
    )?;
    assert_eq!(chunks.len(), 3);
    let first = out.join("datasets/dataset_00001_00002/imgs_00001_00002");
    assert_eq!(names_in(&first), vec!["f1.jpg", "f2.jpg"]);
    let last = out.join("datasets/dataset_00005_00006/imgs_00005_00006");
    assert_eq!(names_in(&last), vec!["f10.jpg"]);
    assert_eq!(std::fs::read(last.join("f10.jpg"))?, b"f10.jpg");

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn extract_latest_collects_and_skips() -> anyhow::Result<()> {
    let root = temp_root("ext_latest");
    let datasets = root.join("datasets");
    touch(&datasets.join("dataset_1/anns/latest"), &["a.xml", "b.xml"]);
    touch(&datasets.join("dataset_2/ann_v2/latest"), &["b.xml", "c.xml"]);
    std::fs::create_dir_all(datasets.join("dataset_3/imgs"))?;
    std::fs::create_dir_all(datasets.join("other"))?;
    let out = root.join("out");
    std::fs::create_dir_all(&out)?;

    let res = run_extract_latest(
        &ExtractLatestOptions {
            datasets_dir: datasets.clone(),
            out_dir: out.clone(),
        },
        &mut FsStore,
    )?;
    assert_eq!(res.copied, 4);
    assert_eq!(res.skipped, vec![datasets.join("dataset_3")]);
    assert_eq!(names_in(&out.join("anns")), vec!["a.xml", "b.xml", "c.xml"]);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn thinning_tools() -> anyhow::Result<()> {
    let root = temp_root("thin");
    let imgs = root.join("imgs");
    touch(
        &imgs,
        &["s_00001.jpg", "s_00002.jpg", "s_00003.jpg", "s_00004.jpg", "s_00005.jpg"],
    );

    let reduced = run_reduce(&imgs, 2, &mut FsStore)?;
    assert_eq!(reduced.out_dir, root.join("imgs_reduced"));
    assert_eq!(
        names_in(&reduced.out_dir),
        vec!["s_00001.jpg", "s_00003.jpg", "s_00005.jpg"]
    );

    let chosen = run_choice(&imgs, 2, Some(3), &mut FsStore)?;
    assert_eq!(chosen.out_dir, root.join("imgs_random_2"));
    assert_eq!(names_in(&chosen.out_dir).len(), 2);
    assert!(run_choice(&imgs, 2, Some(3), &mut FsStore).is_err());
    assert!(run_choice(&imgs, 6, Some(3), &mut FsStore).is_err());

    let kept = run_delete(&imgs, 2, 4, &mut FsStore)?;
    assert_eq!(names_in(&kept.out_dir), vec!["s_00001.jpg", "s_00005.jpg"]);

    assert!(matches!(
        run_reduce(&imgs, 1, &mut FsStore),
        Err(EditorError::Configuration(_))
    ));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn intersection_and_diff_copy() -> anyhow::Result<()> {
    let root = temp_root("dirdiff");
    let d1 = root.join("run1/imgs");
    let d2 = root.join("run2/anns");
    touch(&d1, &["a.jpg", "b.jpg", "c.jpg"]);
    touch(&d2, &["b.jpg", "c.jpg", "d.jpg"]);

    let dst = root.join("common");
    let res = run_intersection(&d1, &d2, Some(&dst), &mut FsStore)?;
    assert_eq!(res.common, 2);
    assert_eq!(names_in(&dst), vec!["b.jpg", "c.jpg"]);
    assert!(run_intersection(&d1, &d2, Some(&dst), &mut FsStore).is_err());

    let out = root.join("diff");
    std::fs::create_dir_all(&out)?;
    let res = run_diff_copy(&d1, &d2, DiffMode::Both, &out, &mut FsStore)?;
    assert_eq!((res.only_dir1, res.only_dir2, res.copied), (1, 1, 2));
    assert_eq!(names_in(&out.join("run1_imgs")), vec!["a.jpg"]);
    assert_eq!(names_in(&out.join("run2_anns")), vec!["d.jpg"]);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn break_nest_flattens_files_and_copies_deep_dirs() -> anyhow::Result<()> {
    let root = temp_root("break_nest");
    let target = root.join("nested");
    touch(&target, &["top.txt"]);
    touch(&target.join("a"), &["a1.txt"]);
    touch(&target.join("a/deep"), &["d1.txt"]);
    touch(&target.join("a/deep/deeper"), &["x.txt"]);

    let res = run_break_nest(
        &BreakNestOptions {
            target_dir: target.clone(),
            num_nest: 1,
            save_dir: None,
        },
        &mut FsStore,
    )?;
    assert_eq!(res.save_dir, root.join("nested_break-nest"));
    assert_eq!(res.files, 2);
    assert_eq!(res.trees, 1);
    assert_eq!(names_in(&res.save_dir), vec!["a1.txt", "deep", "top.txt"]);
    assert_eq!(
        std::fs::read(res.save_dir.join("deep/deeper/x.txt"))?,
        b"x.txt"
    );

    let bad = run_break_nest(
        &BreakNestOptions {
            target_dir: target,
            num_nest: 0,
            save_dir: None,
        },
        &mut FsStore,
    );
    assert!(matches!(bad, Err(EditorError::Configuration(_))));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn group_prints_plan_until_confirmed() -> anyhow::Result<()> {
    let root = temp_root("group");
    let dir = root.join("imgs");
    touch(&dir, &["siteA_cam1_001.jpg", "siteA_cam1_002.jpg", "siteB_cam2_001.jpg"]);

    let plan = run_group(&dir, false, &mut FsStore)?;
    assert!(!plan.applied);
    assert_eq!(plan.groups.len(), 2);
    assert_eq!(names_in(&dir).len(), 3);

    let res = run_group(&dir, true, &mut FsStore)?;
    assert!(res.applied);
    assert_eq!(names_in(&dir), vec!["siteA_cam1", "siteB_cam2"]);
    assert_eq!(
        names_in(&dir.join("siteA_cam1")),
        vec!["siteA_cam1_001.jpg", "siteA_cam1_002.jpg"]
    );

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn group_refuses_a_name_taken_by_a_file() -> anyhow::Result<()> {
    let root = temp_root("group_clash");
    let dir = root.join("imgs");
    touch(&dir, &["a", "a_b_1.jpg", "b.jpg"]);

    let res = run_group(&dir, true, &mut FsStore);
    assert!(matches!(res, Err(EditorError::Configuration(_))));
    assert_eq!(names_in(&dir), vec!["a", "a_b_1.jpg", "b.jpg"]);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn move_into_collects_all_entries() -> anyhow::Result<()> {
    let root = temp_root("move_into");
    let dir = root.join("ds");
    touch(&dir, &["a.jpg", "b.xml"]);
    std::fs::create_dir_all(dir.join("sub"))?;

    let moved = run_move_into(&dir, "v1", &mut FsStore)?;
    assert_eq!(moved, 3);
    assert_eq!(names_in(&dir), vec!["v1"]);
    assert_eq!(names_in(&dir.join("v1")), vec!["a.jpg", "b.xml", "sub"]);

    assert!(run_move_into(&dir, "../up", &mut FsStore).is_err());

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn for_rsync_plans_links_for_keywords() -> anyhow::Result<()> {
    let root = temp_root("for_rsync");
    let src = root.join("project");
    touch(&src, &["db.sqlite3", "README.txt", "raw.bin", ".train_cache"]);
    std::fs::create_dir_all(src.join("train"))?;
    std::fs::create_dir_all(src.join("val"))?;

    let mut store = DryRunStore::new();
    let res = run_for_rsync(&src, &mut store)?;
    assert_eq!(res.linked, 4);
    assert_eq!(res.out_dir, src.join("for_rsync/project"));
    let hits: Vec<&str> = res
        .keywords
        .iter()
        .filter(|(_, hit)| *hit)
        .map(|(k, _)| k.as_str())
        .collect();
    assert_eq!(hits, vec![".sqlite3", "README.txt", "train", "val"]);
    assert_eq!(store.count(|op| matches!(op, StoreOp::Symlink { .. })), 4);
    assert!(!src.join("for_rsync").exists());

    let empty = root.join("empty");
    touch(&empty, &["raw.bin"]);
    assert!(matches!(
        run_for_rsync(&empty, &mut FsStore),
        Err(EditorError::InsufficientData(_))
    ));

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}
