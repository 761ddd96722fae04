#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};

/// The clock every fixture under `tests/fixtures/expected` was generated with.
pub const FIXED_NOW: &str = "2024-01-01T00:00:00+00:00";

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Copy a fixture into `dir` so a test can rewrite it in place.
pub fn copy_fixture(name: &str, dir: &Path) -> PathBuf {
    let dest = dir.join(name);
    std::fs::copy(Path::new("tests/fixtures").join(name), &dest).unwrap();
    dest
}
