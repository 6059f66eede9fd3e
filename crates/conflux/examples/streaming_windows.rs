//! Windowed aggregation over an unbounded source.
//!
//! The source is an endless tick generator, so mode detection picks
//! streaming; the local engine drains it up to a cap so the demo
//! terminates. Note the checkpointing warning logged during translation
//! when checkpointing is left disabled.
//!
//! Run with: `cargo run --example streaming_windows`

use conflux::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let per_minute = WindowingStrategy::fixed(Duration::from_secs(60));

    let mut graph = PipelineGraph::new();

    let ticks = graph.add_node(
        "ticks",
        TransformKind::Source {
            factory: Arc::new(|| {
                Box::new((0i64..).map(|i| {
                    let sensor = if i % 2 == 0 { b"even" } else { b"odd " };
                    Element::keyed(sensor.to_vec(), i.to_string().into_bytes(), i * 1_000)
                }))
            }),
        },
    )?;

    let windowed = graph.add_node(
        "per_minute",
        TransformKind::WindowInto {
            strategy: per_minute,
        },
    )?;

    let grouped = graph.add_node("per_sensor", TransformKind::GroupByKey)?;

    let print = graph.add_node(
        "print",
        TransformKind::Sink {
            writer: Arc::new(|pane: &[Element]| {
                for group in pane {
                    let sensor = group
                        .key
                        .as_deref()
                        .map(|k| String::from_utf8_lossy(k).into_owned())
                        .unwrap_or_default();
                    println!("sensor {sensor}: pane closing at {}", group.timestamp);
                }
                Ok(())
            }),
            windowed: true,
            num_shards: Some(1),
        },
    )?;

    graph.add_edge(ticks, windowed, CollectionSpec::unbounded())?;
    graph.add_edge(
        windowed,
        grouped,
        CollectionSpec::unbounded().with_windowing(per_minute),
    )?;
    graph.add_edge(
        grouped,
        print,
        CollectionSpec::unbounded().with_windowing(per_minute),
    )?;
    graph.finalize()?;

    let options = PipelineOptions::default().with_parallelism(1);
    let runner = PipelineRunner::new(LocalEngine::with_unbounded_cap(300));

    let translation = runner.translate(&graph, &options)?;
    for diag in &translation.diagnostics {
        eprintln!("{diag}");
    }

    let result = runner.run(&graph, &options).await?;
    assert!(result.is_success());
    Ok(())
}
