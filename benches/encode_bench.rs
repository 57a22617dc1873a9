use costmerge_sheet::{encode_with_options, record, CellValue, EncodeOptions, ExportFormat, Record};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn build_rows(size: usize) -> Vec<Record> {
    (0..size)
        .map(|i| {
            record([
                ("子订单编号", CellValue::String(format!("SO{i:08}"))),
                ("商家编码", CellValue::String(format!("M{:04}", i % 500))),
                ("商品名称", CellValue::String(format!("Widget, size {}", i % 7))),
                ("商品金额", CellValue::Float((i as f64) * 1.5)),
                ("成本", if i % 4 == 0 { CellValue::Null } else { CellValue::Int(i as i64) }),
            ])
        })
        .collect()
}

fn bench_csv(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_csv");

    for size in [1_000, 10_000, 50_000].iter() {
        let rows = build_rows(*size);
        let options = EncodeOptions::default();

        group.bench_with_input(BenchmarkId::new("rows", size), size, |b, _| {
            b.iter(|| encode_with_options(black_box(&rows), ExportFormat::Csv, &options))
        });
    }

    group.finish();
}

fn bench_xlsx(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_xlsx");
    group.sample_size(10);

    for size in [1_000, 10_000].iter() {
        let rows = build_rows(*size);
        let options = EncodeOptions::default();

        group.bench_with_input(BenchmarkId::new("rows", size), size, |b, _| {
            b.iter(|| encode_with_options(black_box(&rows), ExportFormat::Xlsx, &options))
        });
    }

    group.finish();
}

fn bench_batch_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("csv_batch_size");
    let rows = build_rows(20_000);

    for batch_size in [100, 2_000, 20_000].iter() {
        let options = EncodeOptions::default().with_batch_size(*batch_size);

        group.bench_with_input(BenchmarkId::new("batch", batch_size), batch_size, |b, _| {
            b.iter(|| encode_with_options(black_box(&rows), ExportFormat::Csv, &options))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_csv, bench_xlsx, bench_batch_sizes);
criterion_main!(benches);
