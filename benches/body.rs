// benches/body.rs
use criterion::{criterion_group, criterion_main, Criterion, black_box};

use elab_bridge::body::{extract_fields, write_results, ResultsPatch};

fn load_sample() -> String {
    std::fs::read_to_string("tests/fixtures/hemograma.html")
        .expect("read tests/fixtures/hemograma.html")
}

/// The fixture's table repeated, to get a body the size of a full panel.
fn large_sample(doc: &str, copies: usize) -> String {
    let start = doc.find("<tr>").expect("fixture has rows");
    let end = doc.rfind("</tbody>").expect("fixture has tbody");
    let rows = &doc[start..end];
    let mut out = String::from(&doc[..start]);
    for _ in 0..copies {
        out.push_str(rows);
    }
    out.push_str(&doc[end..]);
    out
}

fn bench_body(c: &mut Criterion) {
    let doc = load_sample();
    let big = large_sample(&doc, 40);
    let patch: ResultsPatch = [("Hemácias", "4.8"), ("hemoglobina", "14,2"), ("Plaquetas", "250000")]
        .into_iter()
        .collect();

    c.bench_function("fields_template", |b| {
        b.iter(|| black_box(extract_fields(black_box(&doc)).fields().len()))
    });

    c.bench_function("fields_large", |b| {
        b.iter(|| black_box(extract_fields(black_box(&big)).fields().len()))
    });

    c.bench_function("results_template", |b| {
        b.iter(|| black_box(write_results(black_box(&doc), black_box(&patch)).body().len()))
    });

    c.bench_function("results_large", |b| {
        b.iter(|| black_box(write_results(black_box(&big), black_box(&patch)).body().len()))
    });
}

criterion_group!(benches, bench_body);
criterion_main!(benches);
