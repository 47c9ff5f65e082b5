use super::*;

#[test]
fn classifies_downloading_tick() {
    let parser = ProgressParser::new();
    let line = r#"{"status":"downloading","downloaded_bytes":50,"total_bytes":100,"speed":1234.5,"eta":10}"#;
    match parser.classify(line) {
        ProgressEvent::Downloading {
            downloaded_bytes,
            total_bytes,
            speed_bytes_per_sec,
            eta_seconds,
        } => {
            assert_eq!(downloaded_bytes, Some(50));
            assert_eq!(total_bytes, Some(100));
            assert_eq!(speed_bytes_per_sec, Some(1234.5));
            assert_eq!(eta_seconds, Some(10));
        }
        other => panic!("expected Downloading, got {other:?}"),
    }
}

#[test]
fn falls_back_to_total_bytes_estimate() {
    let parser = ProgressParser::new();
    let line = r#"{"status":"downloading","downloaded_bytes":10,"total_bytes_estimate":200}"#;
    let event = parser.classify(line);
    assert_eq!(event.percent(), Some(5.0));
}

#[test]
fn classifies_finished_tick() {
    let parser = ProgressParser::new();
    assert_eq!(
        parser.classify(r#"{"status":"finished"}"#),
        ProgressEvent::Finished
    );
}

#[test]
fn classifies_item_info() {
    let parser = ProgressParser::new();
    let line = r#"{"_type":"video","title":"My Song","playlist_title":"My Mix","playlist_index":2,"n_entries":5}"#;
    match parser.classify(line) {
        ProgressEvent::ItemInfo {
            title,
            playlist_title,
            playlist_index,
            playlist_count,
            ..
        } => {
            assert_eq!(title.as_deref(), Some("My Song"));
            assert_eq!(playlist_title.as_deref(), Some("My Mix"));
            assert_eq!(playlist_index, Some(2));
            assert_eq!(playlist_count, Some(5));
        }
        other => panic!("expected ItemInfo, got {other:?}"),
    }
}

#[test]
fn classifies_postprocessing_banners() {
    let parser = ProgressParser::new();
    assert_eq!(
        parser.classify("[ExtractAudio] Destination: foo.mp3"),
        ProgressEvent::Processing
    );
    assert_eq!(
        parser.classify("[Merger] Merging formats into \"foo.mp4\""),
        ProgressEvent::Processing
    );
    assert_eq!(
        parser.classify("[Fixup0] Fixing file"),
        ProgressEvent::Processing
    );
}

#[test]
fn anything_else_is_a_log_line() {
    let parser = ProgressParser::new();
    assert_eq!(
        parser.classify("[youtube] abc123: Downloading webpage"),
        ProgressEvent::LogLine
    );
    assert_eq!(parser.classify("not json {{"), ProgressEvent::LogLine);
}

#[test]
fn percent_is_none_without_a_total() {
    let parser = ProgressParser::new();
    let event = parser.classify(r#"{"status":"downloading","downloaded_bytes":10}"#);
    assert_eq!(event.percent(), None);
}
