use criterion::{black_box, criterion_group, criterion_main, Criterion};
use logscan::{scan_serial, scan_threads, ScanConfig};
use std::fs::File;
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tempfile::tempdir;

fn create_log_file(dir: &tempfile::TempDir, line_count: usize) -> std::io::Result<PathBuf> {
    let path = dir.path().join("bench.log");
    let mut file = File::create(&path)?;
    for i in 0..line_count {
        if i % 9 == 0 {
            writeln!(file, "req {i} failed: error while flushing buffers")?;
        } else {
            writeln!(file, "req {i} completed in {}ms, nothing to report", i % 40)?;
        }
    }
    Ok(path)
}

fn config_for(path: &PathBuf, threads: usize) -> ScanConfig {
    ScanConfig {
        keyword: "error".to_string(),
        path: path.clone(),
        thread_count: NonZeroUsize::new(threads).unwrap(),
        ..Default::default()
    }
}

fn bench_serial_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = create_log_file(&dir, 50_000).unwrap();

    let mut group = c.benchmark_group("Serial Scan");
    group.sample_size(10);

    let config = config_for(&path, 1);
    group.bench_function("serial_50k_lines", |b| {
        b.iter(|| {
            scan_serial(black_box(&config)).unwrap();
        });
    });

    group.finish();
}

fn bench_threaded_scan(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let path = create_log_file(&dir, 50_000).unwrap();

    let mut group = c.benchmark_group("Threaded Scan");
    group.sample_size(10);

    for threads in [1, 2, 4, 8] {
        let config = config_for(&path, threads);
        group.bench_function(format!("threads_{threads}"), |b| {
            b.iter(|| {
                scan_threads(black_box(&config)).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_serial_scan, bench_threaded_scan);
criterion_main!(benches);
