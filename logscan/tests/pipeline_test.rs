use anyhow::Result;
use logscan::comm::{CoordinatorLinks, WorkerLink};
use logscan::{partition_for, scan_serial, scan_threads, ScanConfig};
use std::fs::File;
use std::io::Write;
use std::net::TcpListener;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::thread;
use tempfile::tempdir;

fn write_lines(dir: &tempfile::TempDir, name: &str, lines: &[&str]) -> Result<PathBuf> {
    let path = dir.path().join(name);
    let mut file = File::create(&path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(path)
}

fn config_for(path: &Path, keyword: &str, threads: usize) -> ScanConfig {
    ScanConfig {
        keyword: keyword.to_string(),
        path: path.to_path_buf(),
        thread_count: NonZeroUsize::new(threads).unwrap(),
        ..Default::default()
    }
}

#[test]
fn test_error_scenario_counts_three_lines() -> Result<()> {
    let dir = tempdir()?;
    let path = write_lines(
        &dir,
        "app.log",
        &[
            "error: disk full",
            "ok",
            "error: timeout",
            "ok",
            "error: disk full",
        ],
    )?;

    let serial = scan_serial(&config_for(&path, "error", 1))?;
    assert_eq!(serial.matching_lines, 3);
    assert_eq!(serial.lines_scanned, 5);

    let threaded = scan_threads(&config_for(&path, "error", 2))?;
    assert_eq!(threaded.matching_lines, 3);
    Ok(())
}

#[test]
fn test_variants_agree_on_generated_file() -> Result<()> {
    let dir = tempdir()?;
    let lines: Vec<String> = (0..2000)
        .map(|i| {
            if i % 11 == 0 {
                format!("req {i} failed with error code {}", i % 5)
            } else {
                format!("req {i} served")
            }
        })
        .collect();
    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    let path = write_lines(&dir, "big.log", &refs)?;

    let serial = scan_serial(&config_for(&path, "error", 1))?;
    for threads in [1, 2, 8] {
        let threaded = scan_threads(&config_for(&path, "error", threads))?;
        assert_eq!(
            threaded.matching_lines, serial.matching_lines,
            "thread count {threads} changed the result"
        );
    }
    Ok(())
}

#[test]
fn test_empty_keyword_counts_nothing_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let path = write_lines(&dir, "app.log", &["anything", "", "at all"])?;

    let report = scan_threads(&config_for(&path, "", 4))?;
    assert_eq!(report.matching_lines, 0);
    assert_eq!(report.lines_scanned, 3);
    Ok(())
}

/// Drives the full coordinator/worker exchange over loopback sockets with
/// in-process threads standing in for the worker processes.
#[test]
fn test_distribution_round_trip_is_byte_identical() -> Result<()> {
    let world_size = 3;
    let lines: Vec<String> = vec![
        "error: disk full".to_string(),
        "plain line".to_string(),
        "tabs\tand \"quotes\" survive".to_string(),
        String::new(),
        "ümläute und emoji \u{1F980}".to_string(),
        "trailing spaces   ".to_string(),
        "error again".to_string(),
    ];
    let nlines = lines.len();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?.to_string();

    let mut handles = Vec::new();
    for rank in 1..world_size {
        let addr = addr.clone();
        handles.push(thread::spawn(move || -> Result<(usize, Vec<String>)> {
            let mut link = WorkerLink::connect(&addr, rank)?;
            let nlines = link.recv_line_count()? as usize;
            let share = partition_for(nlines, world_size, rank);
            let received = link.recv_shard(share.count)?;
            let count = received.iter().filter(|l| l.contains("error")).count() as u64;
            link.send_count(count)?;
            Ok((rank, received))
        }));
    }

    let mut links = CoordinatorLinks::accept(&listener, world_size)?;
    links.broadcast_line_count(nlines as u64)?;
    for rank in 1..world_size {
        let share = partition_for(nlines, world_size, rank);
        links.send_shard(rank, &lines[share.range()])?;
    }

    let own = partition_for(nlines, world_size, 0);
    let own_count = lines[own.range()]
        .iter()
        .filter(|l| l.contains("error"))
        .count() as u64;
    let total = links.reduce_counts(own_count)?;
    assert_eq!(total, 2);

    for handle in handles {
        let (rank, received) = handle.join().unwrap()?;
        let share = partition_for(nlines, world_size, rank);
        assert_eq!(
            received,
            &lines[share.range()],
            "rank {rank} must receive its shard byte for byte"
        );
    }
    Ok(())
}

/// A single multi-megabyte line, well under the frame cap, must reach the
/// worker intact.
#[test]
fn test_large_line_survives_distribution() -> Result<()> {
    let world_size = 2;
    let big = format!(
        "{}error{}",
        "x".repeat(1024 * 1024),
        "y".repeat(1024 * 1024)
    );
    let lines = vec!["ok".to_string(), big.clone()];
    let nlines = lines.len();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?.to_string();

    let handle = thread::spawn(move || -> Result<Vec<String>> {
        let mut link = WorkerLink::connect(&addr, 1)?;
        let nlines = link.recv_line_count()? as usize;
        let share = partition_for(nlines, world_size, 1);
        let received = link.recv_shard(share.count)?;
        let count = received.iter().filter(|l| l.contains("error")).count() as u64;
        link.send_count(count)?;
        Ok(received)
    });

    let mut links = CoordinatorLinks::accept(&listener, world_size)?;
    links.broadcast_line_count(nlines as u64)?;
    let share = partition_for(nlines, world_size, 1);
    links.send_shard(1, &lines[share.range()])?;

    let own = partition_for(nlines, world_size, 0);
    let own_count = lines[own.range()]
        .iter()
        .filter(|l| l.contains("error"))
        .count() as u64;
    let total = links.reduce_counts(own_count)?;
    assert_eq!(total, 1);

    let received = handle.join().unwrap()?;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0], big);
    Ok(())
}

/// With no lines at all, the broadcast and the count reduction still run;
/// only per-line traffic is skipped.
#[test]
fn test_empty_run_still_reduces() -> Result<()> {
    let world_size = 3;
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?.to_string();

    let mut handles = Vec::new();
    for rank in 1..world_size {
        let addr = addr.clone();
        handles.push(thread::spawn(move || -> Result<()> {
            let mut link = WorkerLink::connect(&addr, rank)?;
            let nlines = link.recv_line_count()? as usize;
            assert_eq!(nlines, 0);
            let share = partition_for(nlines, world_size, rank);
            assert!(share.is_empty());
            let received = link.recv_shard(share.count)?;
            assert!(received.is_empty());
            link.send_count(0)?;
            Ok(())
        }));
    }

    let mut links = CoordinatorLinks::accept(&listener, world_size)?;
    links.broadcast_line_count(0)?;
    let total = links.reduce_counts(0)?;
    assert_eq!(total, 0);

    for handle in handles {
        handle.join().unwrap()?;
    }
    Ok(())
}
