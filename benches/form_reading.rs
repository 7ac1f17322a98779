use criterion::{black_box, criterion_group, criterion_main, Criterion};
use optic_form_reader::color::luminance_image;
use optic_form_reader::{AnswerKey, BatchProcessor, FormDecoder, Group, MarkClassifier, Region, Sheet};

#[path = "../tests/common/mod.rs"]
mod common;

fn benchmark_form_reading(c: &mut Criterion) {
    let template = common::template();
    let scan = common::scan(&template, &common::Marks::default());
    let decoder = FormDecoder::default();
    let layout = decoder
        .analyze_template(&template)
        .expect("synthetic template");

    c.bench_function("analyze_template", |b| {
        b.iter(|| decoder.analyze_template(black_box(&template)))
    });

    c.bench_function("read_scan", |b| {
        b.iter(|| decoder.read(&layout, black_box(&scan)))
    });

    let gray = luminance_image(&scan);
    let classifier = MarkClassifier::new();
    c.bench_function("classify_answers", |b| {
        b.iter(|| classifier.classify(black_box(&gray), layout.grid(Region::Answers)))
    });

    let key = AnswerKey::new()
        .with_group(Group::A, "ABCDEEDCBAAAABCDEABC")
        .expect("valid key");
    let sheets: Vec<Sheet> = (0..8)
        .map(|i| Sheet::new(format!("scan_{}.png", i), scan.clone()))
        .collect();
    let processor = BatchProcessor::default();
    c.bench_function("batch_8_sheets", |b| {
        b.iter(|| processor.run(&template, black_box(&sheets), &key))
    });
}

criterion_group!(benches, benchmark_form_reading);
criterion_main!(benches);
