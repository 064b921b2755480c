use criterion::{Criterion, black_box, criterion_group, criterion_main};

use minipy::runtime::BufferedContext;
use minipy::{interpreter, lexer, parser};

fn arithmetic_workload() -> String {
    let mut source = String::from("total = 0\n");
    for i in 1..=300 {
        source.push_str(&format!("total = total + {i} * 3 - total / 2\n"));
    }
    source.push_str("print total\n");
    source
}

fn class_workload() -> String {
    let mut source = String::from(
        "class Counter:\n  def __init__(self):\n    self.count = 0\n  def bump(self, by):\n    self.count = self.count + by\n    return self.count\n\nc = Counter()\n",
    );
    for i in 1..=200 {
        source.push_str(&format!("c.bump({i})\n"));
    }
    source.push_str("print c.count\n");
    source
}

fn workloads() -> Vec<(&'static str, String)> {
    vec![
        ("arithmetic", arithmetic_workload()),
        ("classes", class_workload()),
    ]
}

fn bench_frontend(c: &mut Criterion) {
    for (label, source) in workloads() {
        c.bench_function(&format!("tokenize_{label}"), |b| {
            b.iter(|| {
                let tokens = lexer::tokenize(black_box(&source)).expect("tokenize");
                black_box(tokens);
            })
        });

        c.bench_function(&format!("parse_{label}"), |b| {
            b.iter(|| {
                let lexer = lexer::Lexer::new(black_box(&source)).expect("lexer");
                let program = parser::parse_program(lexer).expect("parse");
                black_box(program);
            })
        });
    }
}

fn bench_pipeline(c: &mut Criterion) {
    for (label, source) in workloads() {
        c.bench_function(&format!("run_{label}"), |b| {
            b.iter(|| {
                let mut context = BufferedContext::new();
                interpreter::run(black_box(&source), &mut context).expect("run");
                black_box(context.output());
            })
        });
    }
}

criterion_group!(benches, bench_frontend, bench_pipeline);
criterion_main!(benches);
