//! Benchmarks for the in-memory pipeline stages
//!
//! - enrich: code graph to enriched graph
//! - impact: backward traversal from one seed over the enriched graph
//!
//! Run with: cargo bench --bench pipeline_bench

use blastmap::graph::{Call, CodeGraph, FileAnalysis, FunctionAnalysis};
use blastmap::impact::{traverse, Direction, TraversalOptions};
use blastmap::ingest::Language;
use blastmap::enrich;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const FUNCTIONS_PER_FILE: usize = 20;

fn function(file: &str, index: usize, calls: Vec<Call>) -> FunctionAnalysis {
    let name = format!("fn_{}", index);
    FunctionAnalysis {
        node_id: format!("{}#{}", file, index),
        file: file.to_string(),
        name: name.clone(),
        scope: name,
        params: vec![],
        return_type: None,
        lines: 3,
        start_line: index * 4 + 1,
        end_line: index * 4 + 3,
        function_hash: String::new(),
        signature_hash: String::new(),
        calls,
        class_name: None,
        full_text: String::new(),
    }
}

fn call(function: usize, file: &str) -> Call {
    Call {
        node_id: format!("{}@{}", file, function),
        function: format!("fn_{}", function),
        file: file.to_string(),
        caller: None,
        caller_type: None,
        line: 1,
    }
}

/// `files` files whose functions call the next function in the same file
/// and the same-numbered function in the next file.
fn synthetic_graph(files: usize) -> CodeGraph {
    let mut graph = CodeGraph::new();
    let path = |i: usize| format!("/bench/src/file_{}.ts", i);
    for i in 0..files {
        let file = path(i);
        let mut keys = Vec::new();
        for j in 0..FUNCTIONS_PER_FILE {
            let mut calls = Vec::new();
            if j + 1 < FUNCTIONS_PER_FILE {
                calls.push(call(j + 1, &file));
            }
            if i + 1 < files {
                calls.push(call(j, &path(i + 1)));
            }
            let f = function(&file, j, calls);
            keys.push(f.key());
            graph.functions.insert(f.key(), f);
        }
        graph.files.insert(
            file.clone(),
            FileAnalysis {
                path: file.trim_start_matches("/bench/").to_string(),
                absolute_path: file.clone(),
                language: Language::TypeScript,
                imports: vec![],
                functions: keys,
                types: vec![],
                top_level_calls: vec![],
            },
        );
    }
    graph
}

fn benchmark_enrich(c: &mut Criterion) {
    let mut group = c.benchmark_group("enrich");
    for files in [10usize, 100] {
        let graph = synthetic_graph(files);
        group.throughput(Throughput::Elements((files * FUNCTIONS_PER_FILE) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(files), &graph, |b, graph| {
            b.iter(|| black_box(enrich(black_box(graph))))
        });
    }
    group.finish();
}

fn benchmark_impact(c: &mut Criterion) {
    let mut group = c.benchmark_group("impact_backward");
    for files in [10usize, 100] {
        let enriched = enrich(&synthetic_graph(files));
        let seed = vec![format!(
            "/bench/src/file_{}.ts::fn_{}",
            files - 1,
            FUNCTIONS_PER_FILE - 1
        )];
        let options = TraversalOptions::new(Direction::Backward);
        group.bench_with_input(BenchmarkId::from_parameter(files), &enriched, |b, graph| {
            b.iter(|| black_box(traverse(black_box(graph), &seed, &options)))
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_enrich, benchmark_impact);
criterion_main!(benches);
