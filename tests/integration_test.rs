//! Integration tests for waymark

use serde_json::json;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use waymark::error::ConfigError;
use waymark::{Config, DataKind, ExitMode, Logger, ReadMode, Record};

fn write_data(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn append_data(path: &Path, contents: &str) {
    let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}

mod config_tests {
    use super::*;

    #[test]
    fn test_config_file_with_env_expansion() {
        let dir = TempDir::new().unwrap();
        // SAFETY: variable name is unique to this test.
        unsafe { std::env::set_var("WAYMARK_IT_LOG_DIR", dir.path()) };

        let config_path = write_data(
            &dir,
            "waymark.yaml",
            "log_dir: ${WAYMARK_IT_LOG_DIR}\nprefix: ${WAYMARK_IT_PREFIX:-nightly}\ndata_kind: flat\n",
        );

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.log_dir, dir.path().to_path_buf());
        assert_eq!(config.prefix, "nightly");

        let logger = Logger::new(config).unwrap();
        assert_eq!(logger.data_kind(), DataKind::Flat);
        assert_eq!(
            logger.log_paths().success,
            dir.path().join("nightly_success.log")
        );
    }

    /// Scenario E: unsupported kind fails before any file is created.
    #[test]
    fn test_unsupported_kind_is_fatal_and_creates_nothing() {
        let dir = TempDir::new().unwrap();

        let err = Logger::new(Config::new(dir.path(), "demo", "xml")).err().unwrap();

        assert!(matches!(err, ConfigError::UnsupportedDataKind { .. }));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

mod reader_tests {
    use super::*;

    /// Scenario A: whole file in one batch, then nothing.
    #[test]
    fn test_integer_lines_read_once() {
        let dir = TempDir::new().unwrap();
        let data = write_data(&dir, "data.dat", "5\n12\n7\n");
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "integer")).unwrap();
        logger.set_max_read(10);

        let first = logger.read_data_file(&data, ReadMode::Line);
        assert_eq!(
            first,
            vec![Record::Integer(5), Record::Integer(12), Record::Integer(7)]
        );
        assert_eq!(logger.offset(&data), fs::metadata(&data).unwrap().len());

        assert!(logger.read_data_file(&data, ReadMode::Line).is_empty());
    }

    /// Scenario B: records split by tiny chunks come back whole, once.
    #[test]
    fn test_flat_length_mode_split_records() {
        let dir = TempDir::new().unwrap();
        let data = write_data(&dir, "people.csv", "1,alice,admin\n2,bob,user\n3,carol,user\n");
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "flat")).unwrap();
        logger.set_read_length(5);
        logger.set_max_read(2);

        let mut records = Vec::new();
        let mut last_offset = 0;
        loop {
            let batch = logger.read_data_file(&data, ReadMode::Length);
            let offset = logger.offset(&data);
            assert!(offset >= last_offset);
            last_offset = offset;
            if batch.is_empty() {
                break;
            }
            records.extend(batch);
        }

        assert_eq!(
            records,
            vec![
                Record::Flat(vec!["1".into(), "alice".into(), "admin".into()]),
                Record::Flat(vec!["2".into(), "bob".into(), "user".into()]),
                Record::Flat(vec!["3".into(), "carol".into(), "user".into()]),
            ]
        );
        assert!(last_offset <= fs::metadata(&data).unwrap().len());
    }

    #[test]
    fn test_unterminated_tail_waits_for_delimiter() {
        let dir = TempDir::new().unwrap();
        let data = write_data(&dir, "events.json", "{\"id\":1}\n{\"id\":");
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "structured")).unwrap();
        logger.set_read_length(4);

        let first = logger.read_data_file(&data, ReadMode::Length);
        assert_eq!(first, vec![Record::Structured(json!({"id": 1}))]);
        assert!(logger.read_data_file(&data, ReadMode::Length).is_empty());

        append_data(&data, "2}\n");

        let second = logger.read_data_file(&data, ReadMode::Length);
        assert_eq!(second, vec![Record::Structured(json!({"id": 2}))]);
    }

    #[test]
    fn test_malformed_lines_are_filtered() {
        let dir = TempDir::new().unwrap();
        let data = write_data(&dir, "events.json", "{\"id\":1}\nnot json\n\n{\"id\":2}\n");
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "json")).unwrap();

        let batch = logger.read_data_file(&data, ReadMode::Line);
        assert_eq!(
            batch,
            vec![
                Record::Structured(json!({"id": 1})),
                Record::Structured(json!({"id": 2})),
            ]
        );
    }

    #[test]
    fn test_missing_data_file_ends_loop() {
        let dir = TempDir::new().unwrap();
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "int")).unwrap();

        assert!(logger.read_data_file(dir.path().join("absent.dat"), ReadMode::Line).is_empty());
    }
}

mod checkpoint_tests {
    use super::*;

    /// Scenario C: falsy records are not logged.
    #[test]
    fn test_zero_and_empty_records_not_logged() {
        let dir = TempDir::new().unwrap();
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "int")).unwrap();

        assert!(!logger.record_success(&Record::Integer(0)).unwrap());
        assert!(!logger.record_success(&Record::Structured(json!(null))).unwrap());

        assert_eq!(logger.count(), 0);
        assert_eq!(logger.success_count(), 0);
        assert!(!logger.log_paths().success.exists());
    }

    /// Scenario D: the exit log holds only the latest checkpoint.
    #[test]
    fn test_exit_checkpoint_overwrite() {
        let dir = TempDir::new().unwrap();
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "int")).unwrap();

        logger.record_exit(&Record::Integer(42), ExitMode::Marker).unwrap();
        assert_eq!(logger.last_exit_data().unwrap(), Some("42".to_string()));

        logger.record_exit(&Record::Integer(99), ExitMode::Marker).unwrap();
        assert_eq!(logger.last_exit_data().unwrap(), Some("99".to_string()));
        assert_eq!(logger.last_exit_record().unwrap(), Some(Record::Integer(99)));

        let contents = fs::read_to_string(&logger.log_paths().exit).unwrap();
        assert!(!contents.contains("42"));
    }

    #[test]
    fn test_success_and_failure_logs_are_append_only() {
        let dir = TempDir::new().unwrap();
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "int")).unwrap();

        for id in 1..=6 {
            let record = Record::Integer(id);
            if id % 2 == 0 {
                logger.record_success(&record).unwrap();
            } else {
                logger.record_failure(&record).unwrap();
            }
        }

        assert_eq!(
            fs::read_to_string(&logger.log_paths().success).unwrap(),
            "2\n4\n6\n"
        );
        assert_eq!(
            fs::read_to_string(&logger.log_paths().failure).unwrap(),
            "1\n3\n5\n"
        );
        assert_eq!(logger.count(), 6);
        assert_eq!(logger.failure_count(), 3);
    }

    #[test]
    fn test_failure_log_replay() {
        let dir = TempDir::new().unwrap();
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "int")).unwrap();
        logger.set_max_read(2);

        for id in [11, 13, 15] {
            logger.record_failure(&Record::Integer(id)).unwrap();
        }

        let mut replay = Vec::new();
        loop {
            let batch = logger.read_failure_file();
            if batch.is_empty() {
                break;
            }
            replay.extend(batch);
        }
        assert_eq!(
            replay,
            vec![Record::Integer(11), Record::Integer(13), Record::Integer(15)]
        );
    }
}

mod summary_tests {
    use super::*;

    #[test]
    fn test_summary_displayed_once() {
        let dir = TempDir::new().unwrap();
        let mut logger = Logger::new(Config::new(dir.path(), "demo", "int")).unwrap();
        logger.record_success(&Record::Integer(2)).unwrap();

        let mut out = Vec::new();
        let shown: Vec<bool> = (0..4)
            .map(|_| logger.display_summary_to(&mut out, Some("nightly")).unwrap())
            .collect();

        assert_eq!(shown, vec![true, false, false, false]);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches("nightly summary").count(), 1);
        assert!(text.contains(" success num "));
    }
}
