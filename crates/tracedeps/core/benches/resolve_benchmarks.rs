// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Resolution benchmarks over synthetic layered builds
//!
//! Each layer's outputs are produced from the previous layer's outputs,
//! which mimics compile, archive and link stages of a large build.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tracedeps_common::{ExecutionRecord, TraceIndex, TraceIndexBuilder};
use tracedeps_core::{CommandExclusion, ResolveOptions, resolve, resolve_each};

fn layered_build(layers: usize, width: usize) -> TraceIndex {
    let mut builder = TraceIndexBuilder::new().with_command_patterns(vec!["*objcopy*".into(), "cc *f0*".into()]);
    let mut pid = 1u64;
    for layer in 0..layers {
        for i in 0..width {
            let inputs: Vec<String> = (0..4).map(|k| format!("l{layer}/f{}", (i + k) % width)).collect();
            builder.add_execution(
                ExecutionRecord::new(pid, "/usr/bin/cc")
                    .with_argv(["cc".to_string(), "-o".to_string(), format!("l{}/f{i}", layer + 1)])
                    .with_reads(inputs)
                    .with_writes([format!("l{}/f{i}", layer + 1)]),
            );
            pid += 1;
        }
    }
    let top: Vec<String> = (0..width).map(|i| format!("l{layers}/f{i}")).collect();
    builder.add_execution(
        ExecutionRecord::new(pid, "/usr/bin/ld")
            .with_argv(["ld", "-o", "image"])
            .with_reads(top)
            .with_writes(["image"]),
    );
    builder.add_module("image");
    builder.build().expect("Synthetic trace should build")
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");
    for width in [16usize, 128, 512] {
        let index = layered_build(6, width);
        group.throughput(Throughput::Elements((6 * width) as u64));
        group.bench_with_input(BenchmarkId::new("plain", width), &index, |b, index| {
            b.iter(|| resolve(index, &["image"], black_box(&ResolveOptions::default())).unwrap())
        });

        let globs = ResolveOptions::default().with_exclude_commands(CommandExclusion::Patterns(vec!["cc *f0*".into()]));
        group.bench_with_input(BenchmarkId::new("glob_commands", width), &index, |b, index| {
            b.iter(|| resolve(index, &["image"], black_box(&globs)).unwrap())
        });

        let bits = ResolveOptions::default().with_exclude_commands(CommandExclusion::Precomputed(vec![1]));
        group.bench_with_input(BenchmarkId::new("precomputed_commands", width), &index, |b, index| {
            b.iter(|| resolve(index, &["image"], black_box(&bits)).unwrap())
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let index = layered_build(6, 128);
    let roots: Vec<String> = (0..128).map(|i| format!("l6/f{i}")).collect();
    c.bench_function("resolve_each_128_roots", |b| {
        b.iter(|| resolve_each(&index, black_box(&roots[..]), &ResolveOptions::default(), None))
    });
}

criterion_group!(benches, bench_resolve, bench_batch);
criterion_main!(benches);
