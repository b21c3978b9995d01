//! End-to-end runs through the bundled sinks and the worker thread.

use std::io::Read;
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use labelbatch_core::{Item, LabelFont, RasterImage, Renderer, Symbology};
use labelbatch_print_client::{
    BatchPrintOptions, BatchWorker, CancelToken, DestRect, DirectorySink, Orchestrator, Phase,
    PrintError, PrintSink, PrinterConfig, RunOutcome, ZplTcpSink,
};
use labelbatch_profile::LabelLayout;

fn orchestrator() -> Arc<Orchestrator<Renderer>> {
    Arc::new(Orchestrator::new(Renderer::new(LabelFont::none())))
}

fn label_options() -> BatchPrintOptions {
    let mut options = BatchPrintOptions::default();
    options.label = LabelLayout::two_by_one_inch();
    options
}

// ── Mock printer server ─────────────────────────────────────────────────

/// Accepts one connection and returns everything received until EOF.
struct MockPrinterServer {
    addr: SocketAddr,
    handle: Option<thread::JoinHandle<Vec<u8>>>,
}

impl MockPrinterServer {
    fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream
                .set_read_timeout(Some(Duration::from_secs(5)))
                .unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                }
            }
            received
        });
        Self {
            addr,
            handle: Some(handle),
        }
    }

    fn received_data(mut self) -> Vec<u8> {
        self.handle.take().unwrap().join().unwrap()
    }
}

fn fast_config() -> PrinterConfig {
    let mut cfg = PrinterConfig::default();
    cfg.timeouts.connect = Duration::from_secs(2);
    cfg.timeouts.write = Duration::from_secs(2);
    cfg
}

// ── Directory sink ──────────────────────────────────────────────────────

#[test]
fn directory_sink_writes_one_png_per_copy() {
    let tmp = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(tmp.path());
    let items = vec![
        Item::new("ABC123", Symbology::Code128).with_quantity(2),
        Item::new("HELLO", Symbology::QrCode),
    ];
    let options = label_options().with_printer("shelf");

    let result = orchestrator()
        .run(&mut sink, &items, &options, |_| {}, &CancelToken::new())
        .unwrap();
    assert!(result.is_success());
    assert_eq!(result.pages_printed, 3);

    let doc = tmp.path().join("shelf").join("doc-001");
    for n in 1..=3 {
        let page = image::open(doc.join(format!("page-{n:04}.png"))).unwrap();
        assert_eq!((page.width(), page.height()), (192, 96));
    }
    assert!(!doc.join("page-0004.png").exists());
    assert_eq!(sink.list_printers().unwrap(), vec!["shelf".to_string()]);
}

// ── ZPL over TCP ────────────────────────────────────────────────────────

#[test]
fn zpl_sink_sends_one_label_per_page() {
    let server = MockPrinterServer::start();
    let mut sink = ZplTcpSink::new(server.addr.to_string(), 203).with_config(fast_config());
    let items = vec![Item::new("590123412345", Symbology::Ean13).with_quantity(2)];

    let result = orchestrator()
        .run(&mut sink, &items, &label_options(), |_| {}, &CancelToken::new())
        .unwrap();
    assert!(result.is_success(), "{result:?}");
    assert_eq!(result.pages_printed, 2);

    let data = String::from_utf8(server.received_data()).unwrap();
    assert_eq!(data.matches("^XA").count(), 2);
    assert_eq!(data.matches("^XZ").count(), 2);
    assert!(data.starts_with("^XA^PW406^LL203^FO0,0^GFA,"));
}

#[test]
fn zpl_sink_refused_connection_aborts_run() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let mut sink = ZplTcpSink::new(addr.to_string(), 203).with_config(fast_config());
    let items = vec![Item::new("A1", Symbology::Code128)];

    let result = orchestrator()
        .run(&mut sink, &items, &label_options(), |_| {}, &CancelToken::new())
        .unwrap();
    assert_eq!(result.outcome, RunOutcome::AbortedOnError);
    assert_eq!(result.printed_count, 0);
    assert!(result.document_error.is_some());
}

// ── Worker ──────────────────────────────────────────────────────────────

#[test]
fn worker_reports_progress_and_result() {
    let tmp = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(tmp.path());
    let items = vec![
        Item::new("A1", Symbology::Code128),
        Item::new("CODE39", Symbology::Code39),
    ];

    let worker = BatchWorker::spawn(orchestrator(), sink, items, label_options()).unwrap();
    let reports: Vec<_> = worker.progress().iter().collect();
    let result = worker.join().unwrap();

    assert_eq!(result.printed_count, 2);
    assert_eq!(reports.len(), 5);
    assert_eq!(reports.last().unwrap().phase, Phase::Printing);
    assert_eq!(result.last_progress.as_ref(), reports.last());
}

/// Signals when it enters the first page, then blocks until released.
struct GateSink {
    entered: Sender<()>,
    gate: Receiver<()>,
    pages: usize,
}

impl GateSink {
    /// The sink plus (entered, release) ends for the test.
    fn new() -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Self {
            entered: entered_tx,
            gate: release_rx,
            pages: 0,
        };
        (sink, entered_rx, release_tx)
    }
}

impl PrintSink for GateSink {
    type Handle = ();

    fn list_printers(&self) -> Result<Vec<String>, PrintError> {
        Ok(Vec::new())
    }

    fn begin_document(&mut self, _: &str) -> Result<(), PrintError> {
        Ok(())
    }

    fn draw_page(&mut self, _: &mut (), _: &RasterImage, _: DestRect) -> Result<(), PrintError> {
        if self.pages == 0 {
            let _ = self.entered.send(());
            let _ = self.gate.recv_timeout(Duration::from_secs(5));
        }
        self.pages += 1;
        Ok(())
    }

    fn end_document(&mut self, _: ()) -> Result<(), PrintError> {
        Ok(())
    }
}

#[test]
fn worker_can_be_cancelled() {
    let (sink, entered, release) = GateSink::new();
    let items = vec![
        Item::new("A1", Symbology::Code128),
        Item::new("B2", Symbology::Code128),
        Item::new("C3", Symbology::Code128),
    ];

    let worker = BatchWorker::spawn(orchestrator(), sink, items, label_options()).unwrap();
    // Cancel while the first page is held inside the sink.
    entered.recv_timeout(Duration::from_secs(5)).unwrap();
    worker.cancel();
    release.send(()).unwrap();
    let result = worker.join().unwrap();

    assert_eq!(result.outcome, RunOutcome::Cancelled);
    assert_eq!(result.pages_printed, 1);
    assert_eq!(result.printed_count, 1);
}

#[test]
fn second_worker_on_busy_orchestrator_is_rejected() {
    let (sink, entered, release) = GateSink::new();
    let orch = orchestrator();
    let items = vec![Item::new("A1", Symbology::Code128)];

    let first = BatchWorker::spawn(
        Arc::clone(&orch),
        sink,
        items.clone(),
        label_options(),
    )
    .unwrap();
    entered.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(orch.is_running());

    let tmp = tempfile::tempdir().unwrap();
    let second = BatchWorker::spawn(
        Arc::clone(&orch),
        DirectorySink::new(tmp.path()),
        items,
        label_options(),
    )
    .unwrap();
    assert_eq!(
        second.join().map(|_| ()),
        Err(labelbatch_print_client::BatchError::AlreadyRunning)
    );

    release.send(()).unwrap();
    assert!(first.join().unwrap().is_success());
}
