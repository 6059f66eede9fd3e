//! Classic wordcount over a bounded in-memory source.
//!
//! Run with: `cargo run --example batch_wordcount`

use conflux::prelude::*;

const LINES: &[&str] = &[
    "the quick brown fox",
    "jumps over the lazy dog",
    "the dog barks",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut graph = PipelineGraph::new();

    let lines = graph.add_node(
        "lines",
        TransformKind::Source {
            factory: Arc::new(|| {
                Box::new(LINES.iter().enumerate().map(|(i, line)| {
                    Element::new(line.as_bytes().to_vec(), (i as i64) * 1_000)
                }))
            }),
        },
    )?;

    // Split lines into words, keyed by the word itself.
    let words = graph.add_node(
        "split",
        TransformKind::ParDo {
            func: Arc::new(|e: Element| {
                let line = String::from_utf8_lossy(&e.value).into_owned();
                Ok(line
                    .split_whitespace()
                    .map(|w| Element::keyed(w.as_bytes().to_vec(), vec![1u8], e.timestamp))
                    .collect())
            }),
        },
    )?;

    let counts = graph.add_node("count", TransformKind::GroupByKey)?;

    let print = graph.add_node(
        "print",
        TransformKind::Sink {
            writer: Arc::new(|pane: &[Element]| {
                for group in pane {
                    let word = group
                        .key
                        .as_deref()
                        .map(|k| String::from_utf8_lossy(k).into_owned())
                        .unwrap_or_default();
                    println!("{word}: {}", group.value.len());
                }
                Ok(())
            }),
            windowed: false,
            num_shards: None,
        },
    )?;

    graph.add_edge(lines, words, CollectionSpec::bounded())?;
    graph.add_edge(words, counts, CollectionSpec::bounded())?;
    graph.add_edge(counts, print, CollectionSpec::bounded())?;
    graph.finalize()?;

    let runner = PipelineRunner::new(LocalEngine::new());
    let result = runner.run(&graph, &PipelineOptions::default()).await?;
    assert!(result.is_success());
    Ok(())
}
