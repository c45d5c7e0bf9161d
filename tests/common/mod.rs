//! Scripted portal double for lookup tests
//!
//! Every page opened for an attempt takes the next [`AttemptScript`] from the
//! queue (or the fallback once the queue is empty). Probe pages, the first
//! `probe_pages_per_scope` pages of each scope, take no script. An
//! unreachable portal fails every navigation. Counters record what was opened, closed or dropped so tests can
//! check that nothing leaks.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use veta_scrape::browser::WaitCondition;
use veta_scrape::error::LookupError;
use veta_scrape::portal::{PortalDriver, PortalPage, PortalScope};

#[allow(dead_code)]
pub const KNOWN_INVALID: [&str; 24] = veta_scrape::utils::constants::KNOWN_INVALID_CODES;

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum AttemptScript {
    /// Navigation errors out immediately
    NavigationFails,
    /// Navigation never settles
    NavigationHangs,
    /// REINFO form that answers with this results table
    Table(String),
    /// REINFO form whose results table never yields HTML
    MissingResults,
    /// SUNAT form that lands on this results page
    SunatPage(String),
    /// Answer from the per-RUC registry using whatever RUC was typed
    Answer,
}

/// What the double answers for one RUC on either portal
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct PortalAnswer {
    pub reinfo_table: Option<String>,
    pub sunat_page: String,
}

#[derive(Default)]
pub struct MockState {
    pub reachable: AtomicBool,
    pub probe_pages_per_scope: usize,
    scripts: Mutex<VecDeque<AttemptScript>>,
    fallback: Mutex<Option<AttemptScript>>,
    answers: Mutex<HashMap<String, PortalAnswer>>,

    pub scopes_opened: AtomicUsize,
    pub scopes_closed: AtomicUsize,
    pub scopes_dropped: AtomicUsize,
    pub probe_pages: AtomicUsize,
    pub attempt_pages: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub pages_dropped: AtomicUsize,

    pub navigations: Mutex<Vec<WaitCondition>>,
    pub filled: Mutex<Vec<String>>,
    /// Child frame the portal serves its form in, if any
    form_frame: Mutex<Option<String>>,
    /// `(document, selector)` of every element wait and fill
    element_calls: Mutex<Vec<(String, String)>>,
}

/// Name recorded for element calls made outside any child frame
#[allow(dead_code)]
pub const MAIN_DOCUMENT: &str = "document";

#[derive(Clone)]
pub struct MockPortal {
    pub state: Arc<MockState>,
}

#[allow(dead_code)]
impl MockPortal {
    fn with_probe_pages(probe_pages_per_scope: usize) -> Self {
        let state = MockState {
            reachable: AtomicBool::new(true),
            probe_pages_per_scope,
            ..MockState::default()
        };
        Self {
            state: Arc::new(state),
        }
    }

    /// Double for REINFO: one probe page per scope
    pub fn reinfo() -> Self {
        Self::with_probe_pages(1)
    }

    /// Every page takes a script, including any probe page
    pub fn new() -> Self {
        Self::with_probe_pages(0)
    }

    pub fn unreachable(self) -> Self {
        self.state.reachable.store(false, Ordering::SeqCst);
        self
    }

    pub fn script(self, scripts: impl IntoIterator<Item = AttemptScript>) -> Self {
        self.state.scripts.lock().unwrap().extend(scripts);
        self
    }

    pub fn fallback(self, script: AttemptScript) -> Self {
        *self.state.fallback.lock().unwrap() = Some(script);
        self
    }

    /// Serve the form inside a child frame with this name
    pub fn with_form_frame(self, name: &str) -> Self {
        *self.state.form_frame.lock().unwrap() = Some(name.to_string());
        self
    }

    pub fn answer(self, ruc: &str, answer: PortalAnswer) -> Self {
        self.state.answers.lock().unwrap().insert(ruc.to_string(), answer);
        self
    }

    /// Page outside any scope, for driving helpers directly
    pub fn page(&self, script: AttemptScript) -> MockPage {
        self.state.attempt_pages.fetch_add(1, Ordering::SeqCst);
        MockPage::new(Arc::clone(&self.state), PageRole::Attempt(script))
    }

    fn next_script(&self) -> AttemptScript {
        if let Some(script) = self.state.scripts.lock().unwrap().pop_front() {
            return script;
        }
        self.state
            .fallback
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(AttemptScript::NavigationFails)
    }

    pub fn count(&self, counter: impl Fn(&MockState) -> &AtomicUsize) -> usize {
        counter(&self.state).load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<WaitCondition> {
        self.state.navigations.lock().unwrap().clone()
    }

    pub fn filled(&self) -> Vec<String> {
        self.state.filled.lock().unwrap().clone()
    }

    pub fn element_calls(&self) -> Vec<(String, String)> {
        self.state.element_calls.lock().unwrap().clone()
    }

    /// Every page was either closed or dropped
    pub fn all_pages_released(&self) -> bool {
        let opened = self.count(|s| &s.probe_pages) + self.count(|s| &s.attempt_pages);
        let released = self.count(|s| &s.pages_closed) + self.count(|s| &s.pages_dropped);
        opened == released
    }

    /// Every scope was either closed or dropped
    pub fn all_scopes_released(&self) -> bool {
        self.count(|s| &s.scopes_opened)
            == self.count(|s| &s.scopes_closed) + self.count(|s| &s.scopes_dropped)
    }
}

#[async_trait]
impl PortalDriver for MockPortal {
    type Scope = MockScope;

    async fn open_scope(&self) -> Result<MockScope> {
        self.state.scopes_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockScope {
            portal: self.clone(),
            pages: AtomicUsize::new(0),
            closed: false,
        })
    }
}

pub struct MockScope {
    portal: MockPortal,
    pages: AtomicUsize,
    closed: bool,
}

#[async_trait]
impl PortalScope for MockScope {
    type Page = MockPage;

    async fn new_page(&self) -> Result<MockPage> {
        let index = self.pages.fetch_add(1, Ordering::SeqCst);
        let state = Arc::clone(&self.portal.state);
        let role = if index < state.probe_pages_per_scope {
            state.probe_pages.fetch_add(1, Ordering::SeqCst);
            PageRole::Probe
        } else {
            state.attempt_pages.fetch_add(1, Ordering::SeqCst);
            PageRole::Attempt(self.portal.next_script())
        };
        Ok(MockPage::new(state, role))
    }

    async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.portal.state.scopes_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockScope {
    fn drop(&mut self) {
        if !self.closed {
            self.portal.state.scopes_dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

enum PageRole {
    Probe,
    Attempt(AttemptScript),
}

pub struct MockPage {
    state: Arc<MockState>,
    role: PageRole,
    typed: Mutex<Option<String>>,
    /// Focused child frame, `None` for the main document
    frame: Option<String>,
    closed: bool,
}

impl MockPage {
    fn new(state: Arc<MockState>, role: PageRole) -> Self {
        Self {
            state,
            role,
            typed: Mutex::new(None),
            frame: None,
            closed: false,
        }
    }

    fn record_element_call(&self, selector: &str) {
        let document = self.frame.clone().unwrap_or_else(|| MAIN_DOCUMENT.to_string());
        self.state
            .element_calls
            .lock()
            .unwrap()
            .push((document, selector.to_string()));
    }

    fn answer(&self) -> PortalAnswer {
        let typed = self.typed.lock().unwrap().clone().unwrap_or_default();
        self.state
            .answers
            .lock()
            .unwrap()
            .get(&typed)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl PortalPage for MockPage {
    async fn navigate(&mut self, url: &str, condition: WaitCondition) -> Result<()> {
        self.state.navigations.lock().unwrap().push(condition);
        if !self.state.reachable.load(Ordering::SeqCst) {
            return Err(LookupError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".to_string(),
            }
            .into());
        }
        match &self.role {
            PageRole::Probe => Ok(()),
            PageRole::Attempt(AttemptScript::NavigationFails) => Err(LookupError::Navigation {
                url: url.to_string(),
                message: "net::ERR_TIMED_OUT".to_string(),
            }
            .into()),
            PageRole::Attempt(AttemptScript::NavigationHangs) => {
                std::future::pending::<()>().await;
                Ok(())
            }
            PageRole::Attempt(_) => Ok(()),
        }
    }

    async fn wait_for_load_state(&self, _condition: WaitCondition) -> Result<()> {
        Ok(())
    }

    async fn focus_frame(&mut self, name: Option<&str>) -> Result<bool> {
        let Some(name) = name else {
            self.frame = None;
            return Ok(true);
        };
        let exists = self.state.form_frame.lock().unwrap().as_deref() == Some(name);
        self.frame = exists.then(|| name.to_string());
        Ok(exists)
    }

    async fn wait_for_element(&self, selector: &str) -> Result<()> {
        self.record_element_call(selector);
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        self.record_element_call(selector);
        self.state.filled.lock().unwrap().push(value.to_string());
        *self.typed.lock().unwrap() = Some(value.to_string());
        Ok(())
    }

    async fn click_trigger(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    async fn wait_for_url(&self, suffix: &str) -> Result<String> {
        Ok(format!("https://e-consultaruc.sunat.gob.pe/cl-ti-itmrconsruc/{suffix}"))
    }

    async fn element_html(&self, _selector: &str) -> Result<Option<String>> {
        match &self.role {
            PageRole::Attempt(AttemptScript::Table(html)) => Ok(Some(html.clone())),
            PageRole::Attempt(AttemptScript::Answer) => Ok(self.answer().reinfo_table),
            _ => Ok(None),
        }
    }

    async fn document_html(&self) -> Result<String> {
        match &self.role {
            PageRole::Attempt(AttemptScript::SunatPage(html) | AttemptScript::Table(html)) => {
                Ok(html.clone())
            }
            PageRole::Attempt(AttemptScript::Answer) => Ok(self.answer().sunat_page),
            _ => Err(anyhow!("no document loaded")),
        }
    }

    async fn close(mut self) -> Result<()> {
        self.closed = true;
        self.state.pages_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for MockPage {
    fn drop(&mut self) {
        if !self.closed {
            self.state.pages_dropped.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// REINFO results table with a two-level header
#[allow(dead_code)]
pub fn reinfo_table(codes: &[&str]) -> String {
    let rows: String = codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            format!(
                "<tr><td>{}</td><td>20606564016</td><td>{code}</td><td>DERECHO {i}</td><td>VIGENTE</td></tr>",
                i + 1
            )
        })
        .collect();
    format!(
        r#"<table id="stdregistro">
  <thead>
    <tr><th rowspan="2">N°</th><th rowspan="2">RUC</th><th colspan="2">DERECHO MINERO</th><th rowspan="2">ESTADO</th></tr>
    <tr><th>Código Único</th><th>Nombre</th></tr>
  </thead>
  <tbody>{rows}</tbody>
</table>"#
    )
}

/// Results table REINFO shows for an unregistered RUC
#[allow(dead_code)]
pub fn reinfo_empty_table() -> String {
    r#"<table id="stdregistro"><tr><th>Mensaje</th></tr><tr><td>No se encontraron registros</td></tr></table>"#
        .to_string()
}

/// SUNAT results page with the given activity lines
#[allow(dead_code)]
pub fn sunat_page(activities: &[&str]) -> String {
    let cells: String = activities
        .iter()
        .map(|activity| format!("<tr><td>{activity}</td></tr>"))
        .collect();
    format!(
        r#"<html><body><div class="panel panel-primary">
  <table class="table"><tr><td>Actividad(es) Económica(s):</td></tr>{cells}</table>
</div></body></html>"#
    )
}
