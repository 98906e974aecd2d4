//! Benchmarks da conversão do relatório para e-mail.
//!
//! Testa performance de:
//! - Markdown → HTML (fragmento)
//! - HTML → texto puro (html2text)
//! - Montagem completa da mensagem
//!
//! Executar: `cargo bench --bench render_bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use deep_research_mailer::notifier::compose_message;
use deep_research_mailer::notifier::markdown::{html_to_text, render_markdown};

/// Gera um relatório com `sections` seções no formato que o writer produz
fn generate_report(sections: usize) -> String {
    let mut report = String::from("# Research Report\n\n");
    for i in 0..sections {
        report.push_str(&format!(
            "## Section {i}\n\n\
             This paragraph discusses **finding {i}** with *emphasis*, `inline code` \
             and a [source](https://example.com/{i}).\n\
             It continues on a second line.\n\n\
             - First point about topic {i}\n\
             - Second point about topic {i}\n\
             1. Ordered step\n\
             2. Another step\n\n\
             > A quoted remark.\n\n\
             | Metric | Value |\n|---|---|\n| rate | {i}% |\n\n"
        ));
    }
    report
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Markdown → HTML
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_render_markdown(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_markdown");

    for sections in [1, 10, 50].iter() {
        let report = generate_report(*sections);
        group.throughput(Throughput::Bytes(report.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(sections), &report, |b, report| {
            b.iter(|| black_box(render_markdown(report)))
        });
    }

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: HTML → texto
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_html_to_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("html_to_text");

    for sections in [1, 10].iter() {
        let html = render_markdown(&generate_report(*sections));
        group.bench_with_input(BenchmarkId::from_parameter(sections), &html, |b, html| {
            b.iter(|| black_box(html_to_text(html)))
        });
    }

    group.finish();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// BENCHMARK: Mensagem completa
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn bench_compose_message(c: &mut Criterion) {
    let report = generate_report(10);

    c.bench_function("compose_message_10_sections", |b| {
        b.iter(|| {
            black_box(compose_message(
                "reports@example.com",
                "reader@example.com",
                &report,
                "benchmark query",
            ))
        })
    });
}

criterion_group!(
    benches,
    bench_render_markdown,
    bench_html_to_text,
    bench_compose_message
);
criterion_main!(benches);
