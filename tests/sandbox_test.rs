// SPDX-License-Identifier: MIT
// Sandbox bridge tests. Tests that need a real `node` binary probe for it
// first and pass trivially when it is absent.

use std::sync::Arc;
use std::time::Duration;

use codedeck::console::{ConsoleLog, LogRecord, Severity};
use codedeck::ipc::event::EventBroadcaster;
use codedeck::sandbox::{runtime_available, ExecutionSandbox};

fn fixture() -> (ExecutionSandbox, Arc<ConsoleLog>, Arc<EventBroadcaster>) {
    (
        ExecutionSandbox::new("node"),
        Arc::new(ConsoleLog::new(1024)),
        Arc::new(EventBroadcaster::new()),
    )
}

/// Poll the console log until `min_records` arrive or the deadline passes.
async fn wait_for_records(console: &ConsoleLog, min_records: usize) -> Vec<LogRecord> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let snapshot = console.snapshot();
        if snapshot.len() >= min_records || tokio::time::Instant::now() >= deadline {
            return snapshot;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn log_then_error_arrive_in_order_with_severities() {
    if !runtime_available("node").await {
        eprintln!("skipping: node not on PATH");
        return;
    }
    let (sandbox, console, broadcaster) = fixture();
    sandbox
        .run(
            "console.log(\"a\");\nconsole.error(\"b\");",
            Arc::clone(&console),
            broadcaster,
        )
        .await
        .unwrap();

    let records = wait_for_records(&console, 2).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].severity, Severity::Log);
    assert_eq!(records[0].args, vec!["a"]);
    assert_eq!(records[1].severity, Severity::Error);
    assert_eq!(records[1].args, vec!["b"]);
    assert!(records[0].seq < records[1].seq);
}

#[tokio::test]
async fn synchronous_throw_becomes_an_error_record() {
    if !runtime_available("node").await {
        eprintln!("skipping: node not on PATH");
        return;
    }
    let (sandbox, console, broadcaster) = fixture();
    sandbox
        .run("throw new Error(\"boom\");", Arc::clone(&console), broadcaster)
        .await
        .unwrap();

    let records = wait_for_records(&console, 1).await;
    assert!(!records.is_empty());
    assert_eq!(records[0].severity, Severity::Error);
    assert!(records[0].args.join(" ").contains("boom"));
}

#[tokio::test]
async fn non_console_stdout_output_is_ignored() {
    if !runtime_available("node").await {
        eprintln!("skipping: node not on PATH");
        return;
    }
    let (sandbox, console, broadcaster) = fixture();
    sandbox
        .run(
            "process.stdout.write(\"garbage\\n\");\nconsole.log(\"ok\");",
            Arc::clone(&console),
            broadcaster,
        )
        .await
        .unwrap();

    let records = wait_for_records(&console, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].args, vec!["ok"]);
}

#[tokio::test]
async fn non_string_arguments_are_stringified() {
    if !runtime_available("node").await {
        eprintln!("skipping: node not on PATH");
        return;
    }
    let (sandbox, console, broadcaster) = fixture();
    sandbox
        .run(
            "console.log(1 + 1, { a: 1 });",
            Arc::clone(&console),
            broadcaster,
        )
        .await
        .unwrap();

    let records = wait_for_records(&console, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].args, vec!["2", "{\"a\":1}"]);
}

#[tokio::test]
async fn new_run_supersedes_the_previous_one() {
    if !runtime_available("node").await {
        eprintln!("skipping: node not on PATH");
        return;
    }
    let (sandbox, console, broadcaster) = fixture();

    // First run would log forever; the second run kills it.
    let first = sandbox
        .run(
            "setInterval(() => console.log(\"tick\"), 50);",
            Arc::clone(&console),
            Arc::clone(&broadcaster),
        )
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let second = sandbox
        .run("console.log(\"fresh\");", Arc::clone(&console), broadcaster)
        .await
        .unwrap();
    assert_ne!(first.run_id, second.run_id);

    // Wait for the fresh record, then confirm the old run stopped ticking.
    let _ = wait_for_records(&console, 1).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    let count_after_kill = console.snapshot().len();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let final_count = console.snapshot().len();
    assert_eq!(count_after_kill, final_count, "superseded run must stop producing records");

    let fresh: Vec<_> = console
        .snapshot()
        .into_iter()
        .filter(|r| r.run_id == second.run_id)
        .collect();
    assert_eq!(fresh.len(), 1);
    assert_eq!(fresh[0].args, vec!["fresh"]);

    sandbox.stop().await;
    assert!(!sandbox.is_running().await);
}
