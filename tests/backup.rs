use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};
use treebak::{Backup, BackupRequest, Event, Mode, OutcomeCounters, run};
use walkdir::WalkDir;
use zip::ZipArchive;

/// Relative path -> file content (`None` for directories).
type Snapshot = BTreeMap<String, Option<Vec<u8>>>;

fn snapshot(root: &Path) -> Snapshot {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            let content = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
            (rel, content)
        })
        .collect()
}

fn archive_snapshot(path: &Path, base: &str) -> Snapshot {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut out = Snapshot::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let name = file.name().to_string();
        let rel = name
            .strip_prefix(base)
            .unwrap()
            .trim_start_matches('/')
            .trim_end_matches('/')
            .to_string();
        let content = if file.is_dir() {
            None
        } else {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf).unwrap();
            Some(buf)
        };
        out.insert(rel, content);
    }
    out
}

/// `root/a.txt` (5 bytes) and `root/sub/b.txt` (2000 bytes).
fn scenario_tree(dir: &Path) -> PathBuf {
    let root = dir.join("root");
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a.txt"), b"hello").unwrap();
    fs::write(root.join("sub/b.txt"), vec![b'b'; 2000]).unwrap();
    root
}

/// A deterministic but irregular tree: nested dirs, empty dirs, empty files.
fn generated_tree(dir: &Path, seed: u64) -> PathBuf {
    let root = dir.join("generated");
    fs::create_dir_all(&root).unwrap();
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        state >> 33
    };
    let mut dirs = vec![root.clone()];
    for i in 0..40 {
        let parent = dirs[(next() as usize) % dirs.len()].clone();
        if next() % 4 == 0 {
            let d = parent.join(format!("dir{i}"));
            fs::create_dir(&d).unwrap();
            dirs.push(d);
        } else {
            let len = (next() % 5000) as usize;
            let content: Vec<u8> = (0..len).map(|_| next() as u8).collect();
            fs::write(parent.join(format!("file{i}.bin")), content).unwrap();
        }
    }
    root
}

fn count_files(snapshot: &Snapshot) -> (u64, u64) {
    snapshot
        .values()
        .flatten()
        .fold((0, 0), |(n, bytes), c| (n + 1, bytes + c.len() as u64))
}

#[test]
fn test_copy_scenario() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let root = scenario_tree(src.path());

    let summary = run(BackupRequest::new(&root, dest.path(), Mode::Copy), |_| {}).unwrap();

    assert_eq!(fs::read(dest.path().join("root/a.txt")).unwrap(), b"hello");
    assert_eq!(
        fs::read(dest.path().join("root/sub/b.txt")).unwrap(),
        vec![b'b'; 2000]
    );
    assert_eq!(
        summary,
        OutcomeCounters {
            files_processed: 2,
            bytes_processed: 2005,
            error_count: 0,
        }
    );
}

#[test]
fn test_archive_scenario() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let root = scenario_tree(src.path());

    let summary = run(BackupRequest::new(&root, dest.path(), Mode::Archive), |_| {}).unwrap();

    let mut archive = ZipArchive::new(File::open(dest.path().join("root.zip")).unwrap()).unwrap();
    let mut a = String::new();
    archive
        .by_name("root/a.txt")
        .unwrap()
        .read_to_string(&mut a)
        .unwrap();
    assert_eq!(a, "hello");
    assert_eq!(archive.by_name("root/sub/b.txt").unwrap().size(), 2000);
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.error_count, 0);
}

#[test]
fn test_copy_round_trip_generated_trees() {
    for seed in [1, 7, 42] {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let root = generated_tree(src.path(), seed);

        let summary = run(BackupRequest::new(&root, dest.path(), Mode::Copy), |_| {}).unwrap();

        let expected = snapshot(&root);
        assert_eq!(snapshot(&dest.path().join("generated")), expected);
        let (files, bytes) = count_files(&expected);
        assert_eq!(summary.files_processed, files);
        assert_eq!(summary.bytes_processed, bytes);
        assert_eq!(summary.error_count, 0);
    }
}

#[test]
fn test_archive_round_trip_generated_trees() {
    for seed in [3, 11] {
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let root = generated_tree(src.path(), seed);

        let summary =
            run(BackupRequest::new(&root, dest.path(), Mode::Archive), |_| {}).unwrap();

        let expected = snapshot(&root);
        let actual = archive_snapshot(&dest.path().join("generated.zip"), "generated");
        assert_eq!(actual, expected);
        assert_eq!(summary.files_processed, count_files(&expected).0);
    }
}

#[test]
fn test_copy_twice_is_idempotent() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let root = scenario_tree(src.path());
    let request = BackupRequest::new(&root, dest.path(), Mode::Copy);

    run(request.clone(), |_| {}).unwrap();
    fs::write(root.join("a.txt"), b"changed").unwrap();
    let summary = run(request, |_| {}).unwrap();

    assert_eq!(snapshot(&dest.path().join("root")), snapshot(&root));
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.bytes_processed, 2007);
}

#[test]
fn test_copy_onto_itself_is_noop() {
    let src = tempdir().unwrap();
    let root = scenario_tree(src.path());
    let before = snapshot(&root);

    let mut unchanged = 0;
    let summary = run(BackupRequest::new(&root, src.path(), Mode::Copy), |event| {
        if let Event::Materialized { materialized, .. } = event {
            if matches!(
                materialized.kind,
                treebak::materialize::MaterializedKind::Unchanged { .. }
            ) {
                unchanged += 1;
            }
        }
    })
    .unwrap();

    assert_eq!(unchanged, 2);
    assert_eq!(snapshot(&root), before);
    assert_eq!(summary.files_processed, 2);
    assert_eq!(summary.bytes_processed, 2005);
    assert_eq!(summary.error_count, 0);
}

#[test]
fn test_name_override() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let root = scenario_tree(src.path());

    let copy = BackupRequest::new(&root, dest.path(), Mode::Copy).with_name(Some("monday".into()));
    run(copy, |_| {}).unwrap();
    assert!(dest.path().join("monday/root/sub/b.txt").is_file());

    let archive =
        BackupRequest::new(&root, dest.path(), Mode::Archive).with_name(Some("weekly".into()));
    run(archive, |_| {}).unwrap();
    let archived = archive_snapshot(&dest.path().join("weekly.zip"), "root");
    assert_eq!(archived, snapshot(&root));
}

#[test]
fn test_archive_destination_is_created() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let root = scenario_tree(src.path());
    let nested = dest.path().join("not/yet/there");

    run(BackupRequest::new(&root, &nested, Mode::Archive), |_| {}).unwrap();
    assert!(nested.join("root.zip").is_file());
}

#[test]
fn test_missing_source_is_fatal() {
    let dest = tempdir().unwrap();
    let mut backup = Backup::new(BackupRequest::new(
        dest.path().join("nothing-here"),
        dest.path(),
        Mode::Copy,
    ));
    let err = backup.execute(|_| {}).unwrap_err();
    assert!(err.is_fatal());
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    fn mkfifo(path: &Path) {
        let c_path = CString::new(path.as_os_str().as_bytes()).unwrap();
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o644) };
        assert_eq!(rc, 0, "mkfifo failed");
    }

    fn tree_with_fifo() -> (TempDir, PathBuf) {
        let src = tempdir().unwrap();
        let root = scenario_tree(src.path());
        mkfifo(&root.join("pipe"));
        (src, root)
    }

    #[test]
    fn test_fifo_is_per_entry_error_in_copy_mode() {
        let (_src, root) = tree_with_fifo();
        let dest = tempdir().unwrap();

        let mut failed = vec![];
        let summary = run(BackupRequest::new(&root, dest.path(), Mode::Copy), |event| {
            if let Event::Failed { path, error, .. } = event {
                assert!(!error.is_fatal());
                failed.push(path.to_path_buf());
            }
        })
        .unwrap();

        assert_eq!(failed, vec![root.join("pipe")]);
        assert!(!dest.path().join("root/pipe").exists());
        assert_eq!(summary.files_processed, 2);
        assert_eq!(summary.bytes_processed, 2005);
        assert_eq!(summary.error_count, 1);
    }

    #[test]
    fn test_fifo_is_per_entry_error_in_archive_mode() {
        let (_src, root) = tree_with_fifo();
        let dest = tempdir().unwrap();

        let summary = run(BackupRequest::new(&root, dest.path(), Mode::Archive), |_| {}).unwrap();

        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.files_processed, 2);
        let archive = ZipArchive::new(File::open(dest.path().join("root.zip")).unwrap()).unwrap();
        assert!(archive.file_names().all(|n| n != "root/pipe"));
        assert_eq!(archive.len(), 4);
    }

    #[test]
    fn test_archive_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let src = tempdir().unwrap();
        let dest = tempdir().unwrap();
        let root = scenario_tree(src.path());
        fs::set_permissions(root.join("a.txt"), fs::Permissions::from_mode(0o640)).unwrap();

        run(BackupRequest::new(&root, dest.path(), Mode::Archive), |_| {}).unwrap();

        let mut archive = ZipArchive::new(File::open(dest.path().join("root.zip")).unwrap()).unwrap();
        let mode = archive.by_name("root/a.txt").unwrap().unix_mode().unwrap();
        assert_eq!(mode & 0o777, 0o640);
    }
}
