//! Property tests for the metadata ledger.
//!
//! Generates random sequences of valid records interleaved with corrupt
//! lines, writes them straight into the backing file, and checks that:
//! - Reading the ledger **never panics**.
//! - Exactly the valid records come back, **in file order** — corruption of
//!   one line never hides its neighbors.
//! - Records appended through the API round-trip byte-exactly.
//!
//! Run with: `cargo test --test ledger_fuzz`

use proptest::prelude::*;
use tempfile::TempDir;
use tokio::runtime::Runtime;

use filedrop::ledger::{FileRecord, Ledger};

#[derive(Clone, Debug)]
enum Line {
    Valid(FileRecord),
    Corrupt(String),
}

fn record_strategy() -> impl Strategy<Value = FileRecord> {
    (
        // Filenames with spaces, unicode and quotes; serde escapes them.
        ".{0,40}",
        "[0-9a-f]{64}",
        any::<u64>(),
        prop_oneof![
            Just("text/plain".to_string()),
            Just("application/octet-stream".to_string()),
            Just("image/png".to_string()),
            ".{0,20}",
        ],
    )
        .prop_map(|(filename, cid, size, content_type)| FileRecord {
            filename,
            cid,
            size,
            content_type,
        })
}

fn corrupt_line_strategy() -> impl Strategy<Value = String> {
    // Single-line garbage. The leading '!' keeps it from accidentally
    // parsing as JSON no matter what follows.
    "[ -~]{0,60}".prop_map(|s| format!("!{s}"))
}

fn line_strategy() -> impl Strategy<Value = Line> {
    prop_oneof![
        3 => record_strategy().prop_map(Line::Valid),
        1 => corrupt_line_strategy().prop_map(Line::Corrupt),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn tolerant_read_yields_exactly_the_valid_lines(lines in prop::collection::vec(line_strategy(), 0..30)) {
        let rt = Runtime::new().expect("runtime");
        rt.block_on(async {
            let dir = TempDir::new().expect("tempdir");
            let path = dir.path().join("ledger.jsonl");

            let mut contents = String::new();
            let mut expected = Vec::new();
            for line in &lines {
                match line {
                    Line::Valid(record) => {
                        contents.push_str(&serde_json::to_string(record).expect("serialize"));
                        expected.push(record.clone());
                    }
                    Line::Corrupt(garbage) => contents.push_str(garbage),
                }
                contents.push('\n');
            }
            tokio::fs::write(&path, contents).await.expect("write");

            let ledger = Ledger::new(&path);
            let got = ledger.list_all().await.expect("list");
            prop_assert_eq!(got, expected);
            Ok(())
        })?;
    }

    #[test]
    fn appended_records_round_trip(records in prop::collection::vec(record_strategy(), 0..20)) {
        let rt = Runtime::new().expect("runtime");
        rt.block_on(async {
            let dir = TempDir::new().expect("tempdir");
            let ledger = Ledger::new(dir.path().join("ledger.jsonl"));
            ledger.reset().await.expect("reset");

            for record in &records {
                ledger.append(record).await.expect("append");
            }

            let got = ledger.list_all().await.expect("list");
            prop_assert_eq!(got, records);
            Ok(())
        })?;
    }
}
