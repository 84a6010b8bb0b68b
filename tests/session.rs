//! Session-level integration tests.
//!
//! OCR and rasterisation are replaced by stubs, so these run anywhere
//! without tesseract or pdfium. The cloud translator is exercised against
//! an in-process HTTP stub bound to 127.0.0.1 that counts connections.

use async_trait::async_trait;
use polybiblioglot::translate::{FreeTierBackend, FreeTierProvider, IbmCloudProvider};
use polybiblioglot::{
    convert, ApiErrorPolicy, Credentials, DocumentExtractor, EngineError, LanguageCode, OcrEngine,
    PageExtractor, PageRasterizer, PageText, PipelineConfig, PolyglotError, ProviderRegistry,
    SessionState,
    TranslationMethod, TranslationProvider, TranslationRequest,
};
use polybiblioglot::{ActionGates, ConversionSession};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_test::{assert_err, assert_ok};

// ── Stub engines ─────────────────────────────────────────────────────────────

/// Renders one blank image per page; page n is n pixels wide.
struct StubRasterizer {
    pages: usize,
}

impl PageRasterizer for StubRasterizer {
    fn rasterize(&self, _path: &Path) -> Result<Vec<DynamicImage>, PolyglotError> {
        Ok((1..=self.pages)
            .map(|w| DynamicImage::new_rgb8(w as u32, 1))
            .collect())
    }
}

/// Returns `texts[n - 1]` for page n, and `texts[0]` for image files.
struct StubOcr {
    texts: Vec<&'static str>,
}

impl OcrEngine for StubOcr {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn recognize_image(&self, image: &DynamicImage) -> Result<String, EngineError> {
        self.texts
            .get(image.width() as usize - 1)
            .map(|s| s.to_string())
            .ok_or_else(|| EngineError::new("stub", "no text for page"))
    }

    fn recognize_path(&self, _path: &Path) -> Result<String, EngineError> {
        Ok(self.texts[0].to_string())
    }
}

/// Returns the next batch of pages on every call; a rescan that reads differently.
struct Rescans(Mutex<Vec<Vec<&'static str>>>);

#[async_trait]
impl PageExtractor for Rescans {
    async fn extract(&self, _path: &Path) -> Result<PageText, PolyglotError> {
        let mut batches = self.0.lock().unwrap();
        let pages = if batches.is_empty() { Vec::new() } else { batches.remove(0) };
        Ok(PageText::new(pages.into_iter().map(str::to_string).collect()))
    }
}

/// Free-tier provider stand-in that always answers `reply`.
struct FixedProvider {
    reply: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl TranslationProvider for FixedProvider {
    fn method(&self) -> TranslationMethod {
        TranslationMethod::Translator
    }

    async fn translate(&self, _request: &TranslationRequest) -> Result<String, PolyglotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
}

/// Records what the free-tier provider actually submits.
#[derive(Default)]
struct CapturingBackend {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl FreeTierBackend for CapturingBackend {
    async fn translate(
        &self,
        text: &str,
        _source: &LanguageCode,
        _destination: &LanguageCode,
    ) -> Result<String, PolyglotError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(format!("translated {} chars", text.chars().count()))
    }
}

// ── Stub HTTP server ─────────────────────────────────────────────────────────

struct StubServer {
    url: String,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

/// Answer every request with `status` and `body`, then close.
async fn spawn_stub_server(status: u16, body: &'static str) -> StubServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));

    let conn_count = Arc::clone(&connections);
    let seen = Arc::clone(&requests);
    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            conn_count.fetch_add(1, Ordering::SeqCst);
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let request = read_request(&mut sock).await;
                seen.lock().unwrap().push(request);
                let reason = match status {
                    200 => "OK",
                    401 => "Unauthorized",
                    500 => "Internal Server Error",
                    _ => "Status",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = sock.write_all(response.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    StubServer {
        url: format!("http://{addr}/v3/translate?version=2018-05-01"),
        connections,
        requests,
    }
}

/// Read headers plus a Content-Length body.
async fn read_request(sock: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = sock.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(head_end) = text.find("\r\n\r\n") {
            let content_length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Route library logs through the test harness. `RUST_LOG=debug` to see them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Fixture {
    _dir: tempfile::TempDir,
    dir: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_path_buf();
        Self { _dir: dir, dir: path }
    }

    fn pdf(&self, name: &str) -> PathBuf {
        let p = self.dir.join(name);
        std::fs::write(&p, b"%PDF-1.4\n%stub\n").unwrap();
        p
    }

    fn image(&self, name: &str) -> PathBuf {
        let p = self.dir.join(name);
        std::fs::write(&p, b"stub image bytes").unwrap();
        p
    }
}

fn extractor(pages: usize, texts: Vec<&'static str>) -> Arc<DocumentExtractor> {
    Arc::new(DocumentExtractor::new(
        Arc::new(StubRasterizer { pages }),
        Arc::new(StubOcr { texts }),
    ))
}

fn config(policy: ApiErrorPolicy) -> PipelineConfig {
    PipelineConfig::builder()
        .api_error_policy(policy)
        .api_timeout_secs(5)
        .build()
        .unwrap()
}

fn registry(free: Arc<dyn TranslationProvider>, ibm_url: Option<&str>) -> Arc<ProviderRegistry> {
    let mut r = ProviderRegistry::new(TranslationMethod::Translator, Duration::from_secs(5));
    r.register(free);
    if let Some(url) = ibm_url {
        r.register(Arc::new(
            IbmCloudProvider::new(url, Duration::from_secs(5)).unwrap(),
        ));
    }
    Arc::new(r)
}

fn hallo() -> Arc<FixedProvider> {
    Arc::new(FixedProvider {
        reply: "Hallo",
        calls: AtomicUsize::new(0),
    })
}

fn code(c: &str) -> LanguageCode {
    LanguageCode::new(c).unwrap()
}

/// A session with `report.pdf` (two pages, "Hello" / "World") converted.
async fn converted_session(
    fx: &Fixture,
    policy: ApiErrorPolicy,
    ibm_url: Option<&str>,
) -> ConversionSession {
    init_tracing();
    let mut session = ConversionSession::with_components(
        config(policy),
        extractor(2, vec!["Hello", "World"]),
        registry(hallo(), ibm_url),
    );
    session.select(convert::select_document(fx.pdf("report.pdf")).unwrap());
    assert_ok!(session.convert().await);
    session
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_image_yields_one_page() {
    let fx = Fixture::new();
    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor(0, vec!["Guten Tag"]),
        registry(hallo(), None),
    );
    session.select(convert::select_document(fx.image("brief.JPEG")).unwrap());

    let pages = convert::convert(&mut session).await.unwrap();
    assert_eq!(pages.pages(), ["Guten Tag".to_string()]);
    assert_eq!(session.state(), SessionState::Converted);
}

#[tokio::test]
async fn multi_page_pdf_keeps_page_order() {
    init_tracing();
    let fx = Fixture::new();
    let texts = vec!["eins", "zwei", "drei", "vier", "fünf"];
    let extractor = Arc::new(
        DocumentExtractor::new(
            Arc::new(StubRasterizer { pages: 5 }),
            Arc::new(StubOcr { texts: texts.clone() }),
        )
        .with_concurrency(3),
    );
    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor,
        registry(hallo(), None),
    );
    session.select(convert::select_document(fx.pdf("book.pdf")).unwrap());

    let pages = convert::convert(&mut session).await.unwrap();
    assert_eq!(pages.into_pages(), texts);
}

#[tokio::test]
async fn report_pdf_converts_with_separator() {
    let fx = Fixture::new();
    let session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;

    assert_eq!(session.state(), SessionState::Converted);
    assert_eq!(
        session.pages().unwrap().pages(),
        ["Hello".to_string(), "World".to_string()]
    );
    assert_eq!(session.text(), Some("Hello - - - - - \nWorld - - - - - \n"));
    assert_eq!(
        session.gates(),
        ActionGates {
            convert: true,
            translate: true,
            save_text: true,
            save_translation: false,
        }
    );
}

#[tokio::test]
async fn unsupported_extension_leaves_session_selected() {
    let fx = Fixture::new();
    let path = fx.dir.join("notes.txt");
    std::fs::write(&path, "plain text").unwrap();

    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor(1, vec!["never"]),
        registry(hallo(), None),
    );
    session.select(convert::select_document(&path).unwrap());

    let err = assert_err!(session.convert().await);
    assert!(matches!(err, PolyglotError::UnsupportedFileType { .. }));
    assert!(err.is_recoverable());
    assert_eq!(session.state(), SessionState::Selected);
    assert!(session.pages().is_none());
}

#[tokio::test]
async fn missing_file_is_reported() {
    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor(1, vec!["never"]),
        registry(hallo(), None),
    );
    session.select(convert::select_document("/no/such/dir/scan.png").unwrap());
    assert!(matches!(
        session.convert().await,
        Err(PolyglotError::FileNotFound { .. })
    ));
    assert_eq!(session.state(), SessionState::Selected);
}

// ── Translation ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn translate_before_convert_is_rejected() {
    let fx = Fixture::new();
    let provider = hallo();
    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor(2, vec!["Hello", "World"]),
        registry(provider.clone(), None),
    );
    session.select(convert::select_document(fx.pdf("report.pdf")).unwrap());

    let err = convert::translate(&mut session, "German", "French", None, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PolyglotError::InvalidState { action: "translate", state: "selected" }
    ));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    assert!(!session.gates().translate);
}

#[tokio::test]
async fn free_provider_translation_moves_to_translated() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;

    let text = convert::translate(&mut session, "German", "French", Some("translator"), None)
        .await
        .unwrap();
    assert_eq!(text, "Hallo");
    assert_eq!(session.state(), SessionState::Translated);

    let t = session.translation().unwrap();
    assert_eq!(t.text, "Hallo");
    assert_eq!(t.source.as_str(), "de");
    assert_eq!(t.destination.as_str(), "fr");
    assert_eq!(t.method, TranslationMethod::Translator);
    assert!(!t.degraded);
    assert!(session.gates().save_translation);
}

#[tokio::test]
async fn free_tier_submits_only_first_499_chars() {
    let fx = Fixture::new();
    let backend = Arc::new(CapturingBackend::default());
    let long_page: &'static str = Box::leak("Wort ".repeat(300).into_boxed_str());

    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor(1, vec![long_page]),
        registry(Arc::new(FreeTierProvider::new(backend.clone())), None),
    );
    session.select(convert::select_document(fx.pdf("long.pdf")).unwrap());
    session.convert().await.unwrap();
    assert!(session.text().unwrap().chars().count() > 499);

    convert::translate(&mut session, "German", "English", None, None)
        .await
        .unwrap();

    let sent = backend.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chars().count(), 499);
    assert!(session.text().unwrap().starts_with(sent[0].as_str()));
}

#[tokio::test]
async fn ibm_without_token_fails_before_any_request() {
    let fx = Fixture::new();
    let server = spawn_stub_server(200, r#"{"translations":[]}"#).await;
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, Some(&server.url)).await;

    let err = convert::translate(&mut session, "German", "French", Some("ibm"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PolyglotError::AuthenticationError { .. }), "got {err:?}");
    assert_eq!(session.state(), SessionState::Converted);
    assert!(session.translation().is_none());
    assert_eq!(server.connections.load(Ordering::SeqCst), 0);

    // A blank token counts as missing.
    let err = convert::translate(&mut session, "German", "French", Some("ibm"), Some("   "))
        .await
        .unwrap_err();
    assert!(matches!(err, PolyglotError::AuthenticationError { .. }));
    assert_eq!(server.connections.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ibm_success_concatenates_segments() {
    let fx = Fixture::new();
    let server = spawn_stub_server(
        200,
        r#"{"translations":[{"translation":"Bonjour"},{"translation":"le monde"}],"word_count":2}"#,
    )
    .await;
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, Some(&server.url)).await;

    let text = convert::translate(&mut session, "English", "French", Some("ibm"), Some("s3cr3t"))
        .await
        .unwrap();
    assert_eq!(text, "Bonjour\nle monde\n");
    assert_eq!(session.state(), SessionState::Translated);

    let requests = server.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert!(req.starts_with("POST /v3/translate?version=2018-05-01"), "got: {req}");
    assert!(req.to_lowercase().contains("content-type: application/json"));
    assert!(req.contains("YXBpa2V5OnMzY3IzdA=="), "basic auth apikey:<token> missing");
    assert!(req.contains(r#""model_id":"en-fr""#), "got: {req}");
    assert!(req.contains(r#""text":["Hello - - - - - \nWorld - - - - - \n"]"#), "got: {req}");
}

#[tokio::test]
async fn ibm_error_body_is_kept_when_degrading() {
    let fx = Fixture::new();
    let server = spawn_stub_server(500, "quota exceeded").await;
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, Some(&server.url)).await;

    let text = convert::translate(&mut session, "German", "French", Some("ibm"), Some("tok"))
        .await
        .unwrap();
    assert_eq!(text, "quota exceeded");
    assert_eq!(session.state(), SessionState::Translated);
    let t = session.translation().unwrap();
    assert!(t.degraded);
    assert_eq!(t.text, "quota exceeded");
    assert_eq!(server.connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ibm_error_is_returned_under_fail_policy() {
    let fx = Fixture::new();
    let server = spawn_stub_server(500, "quota exceeded").await;
    let mut session = converted_session(&fx, ApiErrorPolicy::Fail, Some(&server.url)).await;

    let err = convert::translate(&mut session, "German", "French", Some("ibm"), Some("tok"))
        .await
        .unwrap_err();
    match &err {
        PolyglotError::ApiError { status, body, .. } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "quota exceeded");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "quota exceeded");
    assert_eq!(session.state(), SessionState::Converted);
    assert!(session.translation().is_none());
}

#[tokio::test]
async fn unknown_method_and_language_are_rejected_without_transition() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;

    let err = convert::translate(&mut session, "German", "French", Some("deepl"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, PolyglotError::InvalidTranslationMethod { .. }));

    // Recognised identifier, but nothing registered for it.
    let err = convert::translate(&mut session, "German", "French", Some("ibm"), Some("tok"))
        .await
        .unwrap_err();
    assert!(matches!(err, PolyglotError::InvalidTranslationMethod { .. }));

    let err = convert::translate(&mut session, "Klingon", "French", None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, PolyglotError::UnknownLanguage { .. }));

    assert_eq!(session.state(), SessionState::Converted);
    assert!(session.in_flight().is_none());
}

#[tokio::test]
async fn blank_method_uses_the_default_provider() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;

    let text = convert::translate(&mut session, "German", "French", Some(""), None)
        .await
        .unwrap();
    assert_eq!(text, "Hallo");
    assert_eq!(
        session.translation().unwrap().method,
        TranslationMethod::Translator
    );
}

#[tokio::test]
async fn translated_session_gates() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;
    convert::translate(&mut session, "German", "French", None, None)
        .await
        .unwrap();

    assert_eq!(session.state(), SessionState::Translated);
    assert_eq!(
        session.gates(),
        ActionGates {
            convert: false,
            translate: true,
            save_text: true,
            save_translation: true,
        }
    );
    assert!(matches!(
        session.begin_convert(),
        Err(PolyglotError::InvalidState { action: "convert", state: "translated" })
    ));
    assert!(session.in_flight().is_none());
}

#[tokio::test]
async fn reconversion_replaces_text() {
    let fx = Fixture::new();
    let extractor = Arc::new(Rescans(Mutex::new(vec![
        vec!["Erste Fassung"],
        vec!["Zweite", "Fassung"],
    ])));
    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor,
        registry(hallo(), None),
    );
    session.select(convert::select_document(fx.pdf("draft.pdf")).unwrap());

    convert::convert(&mut session).await.unwrap();
    assert_eq!(session.text(), Some("Erste Fassung - - - - - \n"));

    let pages = convert::convert(&mut session).await.unwrap();
    assert_eq!(pages.len(), 2);
    assert_eq!(session.state(), SessionState::Converted);
    assert_eq!(
        session.text(),
        Some("Zweite - - - - - \nFassung - - - - - \n")
    );
}

// ── Jobs and re-selection ────────────────────────────────────────────────────

#[tokio::test]
async fn jobs_run_on_spawned_tasks() {
    let fx = Fixture::new();
    let mut session = ConversionSession::with_components(
        config(ApiErrorPolicy::Degrade),
        extractor(2, vec!["Hello", "World"]),
        registry(hallo(), None),
    );
    session.select(convert::select_document(fx.pdf("report.pdf")).unwrap());

    let job = session.begin_convert().unwrap();
    assert!(!session.gates().convert);
    let outcome = tokio::spawn(job.run()).await.unwrap();
    session.finish_convert(outcome).unwrap();

    let job = session
        .begin_translate(code("de"), code("fr"), None, Credentials::none())
        .unwrap();
    assert!(!session.gates().translate);
    assert!(matches!(
        session.begin_convert(),
        Err(PolyglotError::Busy { running: "translate", .. })
    ));
    let outcome = tokio::spawn(job.run()).await.unwrap();
    assert_eq!(session.finish_translate(outcome).unwrap().text, "Hallo");
    assert_eq!(session.state(), SessionState::Translated);
}

#[tokio::test]
async fn selecting_again_clears_results_and_discards_late_translation() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;
    let job = session
        .begin_translate(code("de"), code("fr"), None, Credentials::none())
        .unwrap();

    session.select(convert::select_document(fx.image("other.png")).unwrap());
    assert_eq!(session.state(), SessionState::Selected);
    assert!(session.text().is_none());

    let outcome = job.run().await;
    assert!(matches!(
        session.finish_translate(outcome),
        Err(PolyglotError::StaleResult { action: "translate" })
    ));
    assert!(session.translation().is_none());
    assert_eq!(session.state(), SessionState::Selected);
}

#[tokio::test]
async fn retranslation_replaces_previous_result() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;
    convert::translate(&mut session, "German", "French", None, None)
        .await
        .unwrap();
    convert::translate(&mut session, "German", "Spanish", None, None)
        .await
        .unwrap();
    assert_eq!(session.translation().unwrap().destination.as_str(), "es");
    assert_eq!(session.state(), SessionState::Translated);
}

// ── Saving ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_text_and_translation() {
    let fx = Fixture::new();
    let mut session = converted_session(&fx, ApiErrorPolicy::Degrade, None).await;

    let out = fx.dir.join("out/report.txt");
    let translated = fx.dir.join("out/report.fr.txt");

    assert!(matches!(
        convert::save_translation(&session, &translated),
        Err(PolyglotError::InvalidState { .. })
    ));

    convert::save_text(&session, &out).unwrap();
    assert_eq!(
        std::fs::read_to_string(&out).unwrap(),
        "Hello - - - - - \nWorld - - - - - \n"
    );

    convert::translate(&mut session, "German", "French", None, None)
        .await
        .unwrap();
    convert::save_translation(&session, &translated).unwrap();
    assert_eq!(std::fs::read_to_string(&translated).unwrap(), "Hallo");
}
