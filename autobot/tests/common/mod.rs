#![allow(dead_code)]

use autobot::browser::keys;
use autobot::browser_script::{AnchorPredicate, AnchorSnapshot, CLICK_MATCHING_ANCHOR, SET_VALUE_BY_ID};
use autobot::config::Timings;
use autobot::{
    AutomationError, BrowserEngine, ElementRef, EngineConfig, NativeInput, NativeKey, RetryBudget,
    Selector,
};
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Ordered record of everything the fakes were asked to do
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// Config with the production landmarks and near-zero waits
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryBudget::new(3, Duration::from_millis(1)),
        timings: Timings {
            element_timeout: Duration::from_millis(30),
            frame_timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(5),
            selection_settle: Duration::ZERO,
            date_settle: Duration::ZERO,
            dialog_open_settle: Duration::ZERO,
            keystroke_interval: Duration::ZERO,
            dialog_settle: Duration::ZERO,
            focus_settle: Duration::ZERO,
            upload_settle: Duration::ZERO,
        },
        ..EngineConfig::default()
    }
}

struct BrowserState {
    /// Selectors that never match anything
    absent: HashSet<Selector>,
    /// Selectors that only match once the visualization frame is entered
    frame_only: HashSet<Selector>,
    anchors: Vec<AnchorSnapshot>,
    /// Case ids whose record page has no inclusion controls
    missing_records: HashSet<String>,
    /// Anchor scans that report "nothing found" before the page behaves
    anchor_misses_remaining: u32,
    current_case: Option<String>,
    in_frame: bool,
    fail_quit: bool,
    fail_navigate: bool,
    /// Cancelled as soon as the first search is submitted
    cancel_on_search: Option<CancellationToken>,
}

/// In-memory stand-in for a WebDriver session on the SEI pages
#[derive(Clone)]
pub struct FakeBrowser {
    state: Arc<Mutex<BrowserState>>,
    pub journal: Journal,
}

impl FakeBrowser {
    pub fn new(journal: Journal) -> Self {
        let anchors = vec![
            AnchorSnapshot {
                href: "controlador.php?acao=documento_escolher_tipo&id_procedimento=7".into(),
                text: String::new(),
                class_name: String::new(),
                icon_srcs: vec!["svg/documento_incluir.svg".into()],
            },
            AnchorSnapshot {
                href: "controlador.php?acao=documento_receber&id_serie=-1".into(),
                text: " Externo ".into(),
                class_name: "ancoraOpcao".into(),
                icon_srcs: vec![],
            },
        ];
        Self {
            state: Arc::new(Mutex::new(BrowserState {
                absent: HashSet::new(),
                frame_only: [
                    Selector::Id("selSerie".into()),
                    Selector::Id("lblArquivo".into()),
                ]
                .into_iter()
                .collect(),
                anchors,
                missing_records: HashSet::new(),
                anchor_misses_remaining: 0,
                current_case: None,
                in_frame: false,
                fail_quit: false,
                fail_navigate: false,
                cancel_on_search: None,
            })),
            journal,
        }
    }

    pub fn without(self, selector: Selector) -> Self {
        self.state.lock().unwrap().absent.insert(selector);
        self
    }

    /// A page rendered without the visualization frame, its form at the top level
    pub fn frameless(self) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.absent.insert(Selector::frame("ifrVisualizacao"));
            state.frame_only.clear();
        }
        self
    }

    pub fn without_record(self, case_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .missing_records
            .insert(case_id.to_string());
        self
    }

    pub fn with_anchor_misses(self, misses: u32) -> Self {
        self.state.lock().unwrap().anchor_misses_remaining = misses;
        self
    }

    pub fn failing_quit(self) -> Self {
        self.state.lock().unwrap().fail_quit = true;
        self
    }

    pub fn failing_navigate(self) -> Self {
        self.state.lock().unwrap().fail_navigate = true;
        self
    }

    /// Simulates an interrupt arriving while the first file is underway
    pub fn cancelling_on_search(self, token: CancellationToken) -> Self {
        self.state.lock().unwrap().cancel_on_search = Some(token);
        self
    }

    pub fn in_frame(&self) -> bool {
        self.state.lock().unwrap().in_frame
    }

    fn click_anchor(&self, args: &[Value]) -> Value {
        let predicate = args
            .first()
            .and_then(AnchorPredicate::from_value)
            .unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if state.anchor_misses_remaining > 0 {
            state.anchor_misses_remaining -= 1;
            self.journal.push("anchor:miss");
            return Value::Bool(false);
        }
        if let Some(case) = &state.current_case {
            if state.missing_records.contains(case) {
                self.journal.push("anchor:miss");
                return Value::Bool(false);
            }
        }
        match state.anchors.iter().find(|a| predicate.matches(a)) {
            Some(anchor) => {
                self.journal.push(format!("anchor:{}", anchor.href));
                Value::Bool(true)
            }
            None => {
                self.journal.push("anchor:miss");
                Value::Bool(false)
            }
        }
    }
}

#[async_trait::async_trait]
impl BrowserEngine for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), AutomationError> {
        if self.state.lock().unwrap().fail_navigate {
            return Err(AutomationError::PlatformError("connection refused".into()));
        }
        self.journal.push(format!("navigate:{url}"));
        Ok(())
    }

    async fn find_elements(&self, selector: &Selector) -> Result<Vec<ElementRef>, AutomationError> {
        let state = self.state.lock().unwrap();
        if state.absent.contains(selector) || (state.frame_only.contains(selector) && !state.in_frame) {
            return Ok(vec![]);
        }
        Ok(vec![ElementRef(selector.to_string())])
    }

    async fn click(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.journal.push(format!("click:{}", element.id()));
        Ok(())
    }

    async fn clear(&self, element: &ElementRef) -> Result<(), AutomationError> {
        self.journal.push(format!("clear:{}", element.id()));
        Ok(())
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<(), AutomationError> {
        if element.id() == "#txtPesquisaRapida" {
            let case = text.trim_end_matches(keys::ENTER).to_string();
            self.journal.push(format!("search:{case}"));
            let mut state = self.state.lock().unwrap();
            if let Some(token) = state.cancel_on_search.take() {
                token.cancel();
            }
            state.current_case = Some(case);
        } else {
            self.journal.push(format!("keys:{}:{}", element.id(), text));
        }
        Ok(())
    }

    async fn is_interactable(&self, _element: &ElementRef) -> Result<bool, AutomationError> {
        Ok(true)
    }

    async fn execute_script(
        &self,
        script: &str,
        args: Vec<Value>,
    ) -> Result<Value, AutomationError> {
        if script == CLICK_MATCHING_ANCHOR {
            return Ok(self.click_anchor(&args));
        }
        if script == SET_VALUE_BY_ID {
            let id = args.first().and_then(Value::as_str).unwrap_or_default();
            let value = args.get(1).and_then(Value::as_str).unwrap_or_default();
            self.journal.push(format!("set:{id}={value}"));
            return Ok(Value::Bool(true));
        }
        Err(AutomationError::Internal("unexpected script".into()))
    }

    async fn switch_to_frame(&self, frame: &ElementRef) -> Result<(), AutomationError> {
        self.state.lock().unwrap().in_frame = true;
        self.journal.push(format!("frame:{}", frame.id()));
        Ok(())
    }

    async fn switch_to_default(&self) -> Result<(), AutomationError> {
        self.state.lock().unwrap().in_frame = false;
        self.journal.push("frame:top");
        Ok(())
    }

    async fn quit(&self) -> Result<(), AutomationError> {
        self.journal.push("quit");
        if self.state.lock().unwrap().fail_quit {
            return Err(AutomationError::PlatformError("driver went away".into()));
        }
        Ok(())
    }
}

struct InputState {
    /// Answers for successive focus probes; `true` once exhausted
    active_window: VecDeque<bool>,
    typing_failures: u32,
    /// Contents of the focused filename field
    field: String,
    /// Whether the next typed character replaces the whole field
    selected: bool,
    /// Field contents at each Enter press
    confirmed: Vec<String>,
}

/// Records keystrokes instead of sending them, and models the text field
/// of the native dialog they land in
#[derive(Clone)]
pub struct FakeInput {
    journal: Journal,
    state: Arc<Mutex<InputState>>,
}

/// Characters that reach the field before a failing typing pass gives up
pub const PARTIAL_CHARS: usize = 5;

impl FakeInput {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            state: Arc::new(Mutex::new(InputState {
                active_window: VecDeque::new(),
                typing_failures: 0,
                field: String::new(),
                selected: false,
                confirmed: Vec::new(),
            })),
        }
    }

    pub fn with_window_probes(self, probes: &[bool]) -> Self {
        self.state.lock().unwrap().active_window = probes.iter().copied().collect();
        self
    }

    /// The next `failures` typing passes stop after [`PARTIAL_CHARS`] characters
    pub fn with_typing_failures(self, failures: u32) -> Self {
        self.state.lock().unwrap().typing_failures = failures;
        self
    }

    pub fn field(&self) -> String {
        self.state.lock().unwrap().field.clone()
    }

    pub fn confirmed(&self) -> Vec<String> {
        self.state.lock().unwrap().confirmed.clone()
    }
}

#[async_trait::async_trait]
impl NativeInput for FakeInput {
    async fn type_text(&self, text: &str, _interval: Duration) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        if std::mem::take(&mut state.selected) {
            state.field.clear();
        }
        if state.typing_failures > 0 {
            state.typing_failures -= 1;
            let partial: String = text.chars().take(PARTIAL_CHARS).collect();
            state.field.push_str(&partial);
            self.journal.push("type:failed");
            return Err(AutomationError::PlatformError("keystroke dropped".into()));
        }
        state.field.push_str(text);
        self.journal.push(format!("type:{text}"));
        Ok(())
    }

    fn has_active_window(&self) -> bool {
        let active = self
            .state
            .lock()
            .unwrap()
            .active_window
            .pop_front()
            .unwrap_or(true);
        self.journal.push(format!("window:{active}"));
        active
    }

    async fn press_key(&self, key: NativeKey) -> Result<(), AutomationError> {
        let mut state = self.state.lock().unwrap();
        match key {
            NativeKey::SelectAll => state.selected = true,
            NativeKey::Enter => {
                let field = state.field.clone();
                state.confirmed.push(field);
            }
            NativeKey::Tab => {}
        }
        self.journal.push(format!("key:{key}"));
        Ok(())
    }
}

/// In-memory sink for log output produced while a test runs
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route log events of the current thread into a buffer until the guard drops
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
