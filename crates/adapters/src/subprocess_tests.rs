use super::*;

#[tokio::test]
async fn spawns_and_reads_stdout() {
    let argv = vec![
        "sh".to_string(),
        "-c".to_string(),
        "echo hello; echo world".to_string(),
    ];
    let mut extractor = spawn_extractor(&argv).expect("spawn");
    assert!(extractor.pid > 0);

    let mut lines = extractor.stdout_lines().expect("stdout");
    let mut collected = Vec::new();
    while let Some(line) = lines.next_line().await.expect("read line") {
        collected.push(line);
    }
    assert_eq!(collected, vec!["hello".to_string(), "world".to_string()]);

    let status = extractor.child.wait().await.expect("wait");
    assert!(status.success());
}

#[tokio::test]
async fn nonzero_exit_is_reported_by_wait() {
    let argv = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
    let mut extractor = spawn_extractor(&argv).expect("spawn");
    let status = extractor.child.wait().await.expect("wait");
    assert_eq!(status.code(), Some(7));
}

#[cfg(unix)]
#[tokio::test]
async fn terminate_group_stops_a_sleeping_process() {
    let argv = vec!["sleep".to_string(), "30".to_string()];
    let mut extractor = spawn_extractor(&argv).expect("spawn");

    terminate_group(extractor.pid).expect("signal");
    let status = tokio::time::timeout(std::time::Duration::from_secs(5), extractor.child.wait())
        .await
        .expect("process exited before timeout")
        .expect("wait");

    assert!(!status.success());
}
