//! 工具函数性能基准测试

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use linkrelay::utils::url_validator::{extract_urls, normalize_and_validate};
use linkrelay::utils::{format_file_size, generate_random_code, is_valid_short_code, sanitize_filename};

// ============== generate_random_code 基准测试 ==============

fn bench_generate_random_code(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils/generate_random_code");

    for length in [6, 7, 8, 12] {
        group.bench_with_input(BenchmarkId::new("length", length), &length, |b, &length| {
            b.iter(|| {
                let code = generate_random_code(length);
                assert_eq!(code.len(), length);
            });
        });
    }

    group.bench_function("generate_and_check", |b| {
        b.iter(|| {
            let code = generate_random_code(6);
            assert!(is_valid_short_code(&code));
        });
    });

    group.finish();
}

// ============== format_file_size 基准测试 ==============

fn bench_format_file_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils/format_file_size");

    for (label, size) in [
        ("bytes", 512u64),
        ("megabytes", 5 * 1024 * 1024),
        ("gigabytes", 4 * 1024 * 1024 * 1024),
    ] {
        group.bench_with_input(BenchmarkId::new("size", label), &size, |b, &size| {
            b.iter(|| format_file_size(size));
        });
    }

    group.finish();
}

// ============== URL / 文件名处理基准测试 ==============

fn bench_input_handling(c: &mut Criterion) {
    let mut group = c.benchmark_group("utils/input");

    group.bench_function("normalize_bare_domain", |b| {
        b.iter(|| {
            assert!(normalize_and_validate("example.com/a/b").is_ok());
        });
    });

    let text = "see https://docs.example.com/start and http://git.example.com/repo, thanks";
    group.bench_function("extract_urls", |b| {
        b.iter(|| {
            assert_eq!(extract_urls(text).len(), 2);
        });
    });

    group.bench_function("sanitize_filename", |b| {
        b.iter(|| sanitize_filename("../../Quarterly report (final) v2.pdf"));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_generate_random_code,
    bench_format_file_size,
    bench_input_handling
);
criterion_main!(benches);
