use fallwatch_config::{load_trace_csv, parse_trace};
use std::fs;
use tempfile::tempdir;

#[test]
fn parses_valid_trace() {
    let csv = "t_ms,ax,ay,az,gx,gy,gz\n0,0.0,0.0,1.0,0.1,0.2,0.3\n10, 0.01, 0.0, 0.98, 0.0, 0.0, 0.0\n";
    let rows = parse_trace(csv.as_bytes()).expect("valid trace");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1].t_ms, 10);
    assert!((rows[1].az - 0.98).abs() < 1e-6);
}

#[test]
fn rejects_wrong_headers() {
    let csv = "time,ax,ay,az,gx,gy,gz\n0,0,0,1,0,0,0\n";
    let err = parse_trace(csv.as_bytes()).expect_err("bad header");
    assert!(format!("{err}").contains("trace CSV must have headers"));
}

#[test]
fn rejects_backwards_timestamps() {
    let csv = "t_ms,ax,ay,az,gx,gy,gz\n20,0,0,1,0,0,0\n10,0,0,1,0,0,0\n";
    let err = parse_trace(csv.as_bytes()).expect_err("time went backwards");
    assert!(format!("{err}").contains("non-decreasing"));
}

#[test]
fn rejects_malformed_row_with_line_number() {
    let csv = "t_ms,ax,ay,az,gx,gy,gz\n0,0,0,1,0,0,0\n10,abc,0,1,0,0,0\n";
    let err = parse_trace(csv.as_bytes()).expect_err("non-numeric");
    assert!(format!("{err}").contains("row 3"));
}

#[test]
fn rejects_empty_trace() {
    let err = parse_trace("t_ms,ax,ay,az,gx,gy,gz\n".as_bytes()).expect_err("empty");
    assert!(format!("{err}").contains("no samples"));
}

#[test]
fn loads_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    fs::write(&path, "t_ms,ax,ay,az,gx,gy,gz\n0,0,0,1,0,0,0\n").unwrap();
    let rows = load_trace_csv(&path).expect("load");
    assert_eq!(rows.len(), 1);
}
