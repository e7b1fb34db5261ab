//! Whole-pipeline tests without network or model weights.
//!
//! A scripted [`CompletionBackend`] stands in for the inference server and a
//! table-driven [`Embedder`] stands in for SciBERT, so every stage from
//! loading to the final keyword line runs for real.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use edgequake_keywords::pipeline::keywords::case_insensitive_cmp;
use edgequake_keywords::{
    extract_keywords, extract_keywords_sync, extract_keywords_with, CompletionBackend, Embedder, ExtractionConfig,
    ExtractionProgressCallback, ImageUnit, KeywordError, RELEVANCE_THRESHOLD,
};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Call {
    model: String,
    prompt: String,
    image_mime: Option<&'static str>,
}

/// Returns queued answers in order and records every request.
struct ScriptedBackend {
    answers: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedBackend {
    fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(|a| Ok(a.into())).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            answers: Mutex::new(VecDeque::from([Err(message.to_string())])),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        model: &str,
        prompt: &str,
        image: Option<&ImageUnit>,
    ) -> Result<String, KeywordError> {
        self.calls.lock().unwrap().push(Call {
            model: model.to_string(),
            prompt: prompt.to_string(),
            image_mime: image.map(|i| i.mime_type),
        });
        match self.answers.lock().unwrap().pop_front() {
            Some(Ok(answer)) => Ok(answer),
            Some(Err(message)) => Err(KeywordError::InferenceFailed {
                model: model.to_string(),
                message,
            }),
            None => panic!("backend called more often than scripted"),
        }
    }
}

/// Fixed 2-d vectors: x is "mathematics", y is "computer science". Unknown
/// phrases point away from both.
struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    seen: Mutex<Vec<String>>,
}

impl TableEmbedder {
    fn new(entries: &[(&str, [f32; 2])]) -> Self {
        let mut table: HashMap<String, Vec<f32>> = HashMap::new();
        table.insert("mathematics".into(), vec![1.0, 0.0]);
        table.insert("computer science".into(), vec![0.0, 1.0]);
        for (phrase, v) in entries {
            table.insert(phrase.to_string(), v.to_vec());
        }
        Self {
            table,
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl Embedder for TableEmbedder {
    fn embed(&self, phrase: &str) -> Result<Vec<f32>, KeywordError> {
        self.seen.lock().unwrap().push(phrase.to_string());
        Ok(self
            .table
            .get(phrase)
            .cloned()
            .unwrap_or_else(|| vec![-1.0, -1.0]))
    }
}

fn cs_embedder() -> TableEmbedder {
    TableEmbedder::new(&[
        ("algorithm", [0.3, 1.0]),
        ("binary search tree", [0.2, 0.9]),
        ("graph", [0.7, 0.7]),
        ("Graph", [0.7, 0.7]),
        ("tree", [0.1, 1.0]),
        ("matrix", [1.0, 0.2]),
        ("exam", [-0.5, 0.3]),
    ])
}

/// Route library logs through the test harness so `--nocapture` shows them.
fn init_logs() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn write_temp(suffix: &str, bytes: &[u8]) -> tempfile::NamedTempFile {
    init_logs();
    let mut file = tempfile::Builder::new()
        .suffix(suffix)
        .tempfile()
        .expect("create temp file");
    file.write_all(bytes).expect("write temp file");
    file
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn text_file_yields_sorted_filtered_line() {
    let file = write_temp(
        ".txt",
        b"binary search trees are used in computer science",
    );
    let backend = ScriptedBackend::new(["binary search tree, computer science, algorithm"]);
    let embedder = cs_embedder();

    let output = extract_keywords_with(
        file.path(),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .expect("extraction should succeed");

    assert_eq!(
        output.keyword_line(),
        "algorithm, binary search tree, computer science"
    );

    let calls = backend.calls();
    assert_eq!(calls.len(), 1, "one chunk, one call");
    assert_eq!(calls[0].model, "phi3:14b");
    assert!(calls[0]
        .prompt
        .starts_with("binary search trees are used in computer science"));
    assert!(calls[0].image_mime.is_none());

    assert_eq!(output.stats.input_kind, "text");
    assert_eq!(output.stats.units, 1);
    assert_eq!(output.stats.model_calls, 1);
    assert_eq!(output.stats.candidate_count, 3);
    assert_eq!(output.stats.kept_count, 3);
}

#[tokio::test]
async fn image_file_makes_single_image_model_call() {
    let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
    png.extend_from_slice(&[0u8; 32]);
    let file = write_temp(".jpg", &png);

    let backend = ScriptedBackend::new(["matrix, exam"]);
    let embedder = cs_embedder();

    let output = extract_keywords_with(
        file.path(),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .expect("extraction should succeed");

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].model, "llava:13b");
    // Detected from the bytes, not the extension.
    assert_eq!(calls[0].image_mime, Some("image/png"));
    assert!(calls[0].prompt.contains("**Image Content (Base64):**"));
    assert!(calls[0].prompt.contains("iVBORw0KGgo"), "payload not in prompt");

    assert_eq!(output.keywords, vec!["matrix"]);
    assert_eq!(output.stats.input_kind, "image");
}

#[tokio::test]
async fn answers_are_merged_and_deduplicated_across_chunks() {
    let file = write_temp(".md", b"graph theory notes\n\nsearch tree notes");
    let config = ExtractionConfig::builder()
        .chunk_size(20)
        .chunk_overlap(0)
        .build()
        .unwrap();
    let backend = ScriptedBackend::new(["graph, tree", "tree, Graph, graph"]);
    let embedder = cs_embedder();

    let output = extract_keywords_with(file.path(), &backend, &embedder, &config)
        .await
        .expect("extraction should succeed");

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].prompt.starts_with("graph theory notes"));
    assert!(calls[1].prompt.starts_with("search tree notes"));

    assert_eq!(output.keywords, vec!["Graph", "graph", "tree"]);
    assert_eq!(output.stats.candidate_count, 3);

    // Each distinct candidate is embedded once, after the two references.
    let seen = embedder.seen();
    assert_eq!(&seen[..2], &["mathematics", "computer science"]);
    assert_eq!(seen.len(), 2 + 3);
}

#[tokio::test]
async fn output_invariants_hold() {
    let file = write_temp(".txt", b"lecture on algorithms and matrices");
    let backend = ScriptedBackend::new([
        "matrix, exam, algorithm, Graph, graph, algorithm, lunch break, tree",
    ]);
    let embedder = cs_embedder();

    let output = extract_keywords_with(
        file.path(),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    let kw = &output.keywords;
    let mut sorted = kw.clone();
    sorted.sort_by(|a, b| case_insensitive_cmp(a, b));
    assert_eq!(kw, &sorted, "keywords are not case-insensitively sorted");

    let mut dedup = kw.clone();
    dedup.dedup();
    assert_eq!(kw.len(), dedup.len(), "duplicate keywords in output");

    for scored in &output.candidates {
        assert_eq!(scored.kept, kw.contains(&scored.keyword));
        if scored.kept {
            assert!(scored.best() >= RELEVANCE_THRESHOLD, "{scored:?}");
        } else {
            assert!(scored.best() < RELEVANCE_THRESHOLD, "{scored:?}");
        }
    }
    assert!(!kw.contains(&"exam".to_string()));
    assert!(!kw.contains(&"lunch break".to_string()));
    assert!(!output.keyword_line().ends_with(", "));
}

#[tokio::test]
async fn empty_document_needs_no_backend_or_model() {
    let file = write_temp(".txt", b"\n\n   \n\n");

    // Default config: no backend, no base URL, embedding model never loaded.
    let output = extract_keywords(file.path(), &ExtractionConfig::default())
        .await
        .expect("empty input is not an error");

    assert_eq!(output.keyword_line(), "");
    assert_eq!(output.stats.units, 0);
    assert_eq!(output.stats.model_calls, 0);
}

#[test]
fn sync_wrapper_runs_on_its_own_runtime() {
    let file = write_temp(".txt", b"\n\n   \n\n");

    let output = extract_keywords_sync(file.path(), &ExtractionConfig::default())
        .expect("empty input is not an error");

    assert_eq!(output.keyword_line(), "");
    assert_eq!(output.stats.units, 0);
    assert_eq!(output.stats.input_kind, "text");
}

#[test]
fn sync_wrapper_reports_missing_file() {
    let err = extract_keywords_sync("/no/such/dir/notes.txt", &ExtractionConfig::default())
        .err()
        .expect("should fail");
    assert!(matches!(err, KeywordError::FileNotFound { .. }), "got: {err:?}");
}

#[tokio::test]
async fn blank_model_answers_skip_the_filter() {
    let file = write_temp(".txt", b"some text");
    let backend = ScriptedBackend::new(["   "]);
    let embedder = cs_embedder();

    let output = extract_keywords_with(
        file.path(),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap();

    assert!(output.keywords.is_empty());
    assert!(embedder.seen().is_empty(), "embedder should not be used");
}

// ── Failures ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_file_fails_before_any_call() {
    let backend = ScriptedBackend::new(Vec::<String>::new());
    let embedder = cs_embedder();

    let err = extract_keywords_with(
        Path::new("/no/such/dir/notes.txt"),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, KeywordError::FileNotFound { .. }), "got: {err}");
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn corrupt_image_is_rejected() {
    let file = write_temp(".jpg", b"definitely not a jpeg");
    let backend = ScriptedBackend::new(Vec::<String>::new());
    let embedder = cs_embedder();

    let err = extract_keywords_with(
        file.path(),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, KeywordError::CorruptDocument { format: "image", .. }),
        "got: {err}"
    );
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn corrupt_word_document_is_rejected() {
    let file = write_temp(".docx", b"PK but not really a zip");
    let backend = ScriptedBackend::new(Vec::<String>::new());
    let embedder = cs_embedder();

    let err = extract_keywords_with(
        file.path(),
        &backend,
        &embedder,
        &ExtractionConfig::default(),
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, KeywordError::CorruptDocument { .. }),
        "got: {err}"
    );
}

#[tokio::test]
async fn missing_backend_configuration_is_reported() {
    let file = write_temp(".txt", b"eigenvalues and eigenvectors");

    let err = extract_keywords(file.path(), &ExtractionConfig::default())
        .await
        .unwrap_err();

    assert!(
        matches!(err, KeywordError::BackendNotConfigured { .. }),
        "got: {err}"
    );
    assert!(err.to_string().contains("ngrok_ollama_server"));
}

#[tokio::test]
async fn backend_failure_ends_the_run() {
    let file = write_temp(".txt", b"first chunk\n\nsecond chunk");
    let config = ExtractionConfig::builder()
        .chunk_size(12)
        .chunk_overlap(0)
        .build()
        .unwrap();
    let backend = ScriptedBackend::failing("HTTP 502: bad gateway");
    let embedder = cs_embedder();

    let err = extract_keywords_with(file.path(), &backend, &embedder, &config)
        .await
        .unwrap_err();

    assert!(
        matches!(err, KeywordError::InferenceFailed { ref model, .. } if model == "phi3:14b"),
        "got: {err}"
    );
    assert_eq!(backend.calls().len(), 1, "no call after the first failure");
    assert!(embedder.seen().is_empty());
}

#[tokio::test]
async fn configured_backend_is_used_by_default_entry_point() {
    // With a pre-built backend, extract_keywords gets past resolution and
    // reaches the embedding stage; pointing it at an empty model directory
    // makes that stage fail without a download.
    let file = write_temp(".txt", b"graphs");
    let model_dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(ScriptedBackend::new(["graph"]));
    let config = ExtractionConfig::builder()
        .backend(backend.clone())
        .embedding_model_dir(model_dir.path())
        .build()
        .unwrap();

    let err = extract_keywords(file.path(), &config).await.unwrap_err();

    assert_eq!(backend.calls().len(), 1);
    assert!(
        matches!(err, KeywordError::EmbeddingModelLoad { .. }),
        "got: {err}"
    );
}

// ── Progress events ──────────────────────────────────────────────────────────

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl ExtractionProgressCallback for EventLog {
    fn on_extraction_start(&self, total_units: usize) {
        self.0.lock().unwrap().push(format!("start {total_units}"));
    }
    fn on_unit_start(&self, unit: usize, total_units: usize) {
        self.0.lock().unwrap().push(format!("unit {unit}/{total_units}"));
    }
    fn on_unit_complete(&self, unit: usize, _total_units: usize, keywords: usize) {
        self.0.lock().unwrap().push(format!("done {unit}: {keywords}"));
    }
    fn on_filter_start(&self, candidates: usize) {
        self.0.lock().unwrap().push(format!("filter {candidates}"));
    }
    fn on_extraction_complete(&self, kept: usize, candidates: usize) {
        self.0.lock().unwrap().push(format!("complete {kept}/{candidates}"));
    }
}

#[tokio::test]
async fn progress_events_arrive_in_order() {
    let file = write_temp(".txt", b"first chunk\n\nsecond chunk");
    let log = Arc::new(EventLog::default());
    let config = ExtractionConfig::builder()
        .chunk_size(12)
        .chunk_overlap(0)
        .progress_callback(log.clone())
        .build()
        .unwrap();
    let backend = ScriptedBackend::new(["graph, exam", "graph"]);
    let embedder = cs_embedder();

    extract_keywords_with(file.path(), &backend, &embedder, &config)
        .await
        .unwrap();

    assert_eq!(
        log.0.lock().unwrap().as_slice(),
        &[
            "start 2",
            "unit 1/2",
            "done 1: 2",
            "unit 2/2",
            "done 2: 1",
            "filter 2",
            "complete 1/2",
        ]
    );
}
