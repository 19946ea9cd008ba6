use std::{sync::Arc, time::Duration};

use clausemap::{
    Diagnostics,
    telemetry::{
        CsvSink,
        FlushOutcome,
        HttpSink,
        TelemetryBuffer,
        TelemetryConfig,
    },
};

fn buffer_with_dead_primary(log: &std::path::Path) -> TelemetryBuffer {
    let primary =
        HttpSink::new("http://127.0.0.1:9/append", Duration::from_millis(500))
            .expect("client builds");
    TelemetryBuffer::new(
        TelemetryConfig::default(),
        Some(Box::new(primary)),
        Box::new(CsvSink::new(log)),
        Arc::new(Diagnostics::new()),
    )
}

#[test]
fn dead_primary_switches_to_local_log() -> Result<(), Box<dyn std::error::Error>>
{
    let tempdir = tempfile::tempdir()?;
    let log = tempdir.path().join("query_log.csv");
    let buffer = buffer_with_dead_primary(&log);
    assert!(buffer.stats().primary_active);

    buffer.record_query("scope 3", "en", "ESRS", 92, "Emissions > Scope 3");
    buffer.record_query("agua", "es", "GRI", 70, "Water");
    assert_eq!(buffer.flush(), FlushOutcome::Fallback(2));

    let stats = buffer.stats();
    assert!(!stats.primary_active);
    assert_eq!(stats.fallback_flushes, 1);
    assert_eq!(stats.primary_flushes, 0);

    buffer.record_query("board, ethics", "en", "", 0, "");
    assert_eq!(buffer.shutdown(), FlushOutcome::Fallback(1));

    let content = std::fs::read_to_string(&log)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].contains(",scope 3,en,ESRS,92,"));
    assert!(lines[2].contains(",agua,es,GRI,70,Water"));
    assert!(lines[3].contains(",board; ethics,en,,0,"));
    Ok(())
}

#[test]
fn records_are_written_at_most_once() -> Result<(), Box<dyn std::error::Error>> {
    let tempdir = tempfile::tempdir()?;
    let log = tempdir.path().join("query_log.csv");
    let buffer = TelemetryBuffer::new(
        TelemetryConfig::default(),
        None,
        Box::new(CsvSink::new(&log)),
        Arc::new(Diagnostics::new()),
    );

    for i in 0..10 {
        buffer.record_query(&format!("query {i}"), "en", "ISO", 50, "");
        buffer.flush();
    }
    buffer.shutdown();
    drop(buffer);

    let content = std::fs::read_to_string(&log)?;
    for i in 0..10 {
        assert_eq!(content.matches(&format!(",query {i},")).count(), 1);
    }
    Ok(())
}
