//! Scripted in-memory page for exercising platform procedures without a
//! browser.

use async_trait::async_trait;
use castflow_browser::{
    BrowserError, BrowserLauncher, LaunchRequest, LoadState, PageSession, Result, Target,
    WaitState,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One call the procedure made against the page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCall {
    Goto(String),
    WaitFor(String, WaitState),
    Count(String),
    Click(Target),
    Fill(Target, String),
    Type(Option<Target>, String),
    Press(Option<Target>, String),
    Check(Target),
    SetInputFiles(Target, Vec<PathBuf>),
    FileChooser(Target, Vec<PathBuf>),
    DispatchEvent(Target, String),
    GetAttribute(Target, String),
    InnerText(Target),
    IsVisible(Target),
    ScrollIntoView(Target),
    Evaluate(String, Value),
    Close,
}

#[derive(Debug, Clone)]
struct MockElement {
    texts: Vec<String>,
    visible: bool,
    attributes: HashMap<(usize, String), String>,
    /// Scripted answers to `count`, consumed one per call; the last repeats.
    counts: VecDeque<usize>,
    rejects_files: HashSet<usize>,
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            texts: Vec::new(),
            visible: true,
            attributes: HashMap::new(),
            counts: VecDeque::new(),
            rejects_files: HashSet::new(),
        }
    }
}

impl MockElement {
    fn current(&self) -> usize {
        self.counts.front().copied().unwrap_or(self.texts.len())
    }

    /// Matches addressable by index, whatever the count script says now.
    fn addressable(&self) -> usize {
        self.texts.len().max(self.current())
    }

    fn advance(&mut self) -> usize {
        let current = self.current();
        if self.counts.len() > 1 {
            self.counts.pop_front();
        }
        current
    }
}

#[derive(Debug, Default)]
struct MockState {
    elements: HashMap<String, MockElement>,
    calls: Vec<PageCall>,
    closed: bool,
}

/// A page whose DOM is a map from selector to matches.
///
/// Selectors are matched verbatim, including scoped selectors built by
/// [`Target::within`]. Unknown selectors have no matches, so waiting on
/// them times out at once. Clones share state, which lets a test keep a
/// handle after handing the page to a launcher.
#[derive(Debug, Clone, Default)]
pub struct MockPage {
    state: Arc<Mutex<MockState>>,
}

impl MockPage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_element(self, selector: &str, edit: impl FnOnce(&mut MockElement)) -> Self {
        {
            let mut state = self.lock();
            edit(state.elements.entry(selector.to_string()).or_default());
        }
        self
    }

    /// One visible match with empty text.
    pub fn element(self, selector: &str) -> Self {
        self.elements(selector, &[""])
    }

    /// One match per entry, carrying that text.
    pub fn elements(self, selector: &str, texts: &[&str]) -> Self {
        self.with_element(selector, |element| {
            element.texts = texts.iter().map(|text| text.to_string()).collect();
        })
    }

    pub fn attribute(self, selector: &str, nth: usize, name: &str, value: &str) -> Self {
        self.with_element(selector, |element| {
            element
                .attributes
                .insert((nth, name.to_string()), value.to_string());
        })
    }

    /// Script successive `count` answers, e.g. a spinner that goes away on
    /// the third poll: `&[1, 1, 0]`.
    pub fn count_sequence(self, selector: &str, counts: &[usize]) -> Self {
        self.with_element(selector, |element| {
            element.counts = counts.iter().copied().collect();
            if element.texts.len() < counts.iter().copied().max().unwrap_or(0) {
                element.texts.resize(counts.iter().copied().max().unwrap_or(0), String::new());
            }
        })
    }

    pub fn hidden(self, selector: &str) -> Self {
        self.with_element(selector, |element| element.visible = false)
    }

    /// Make `set_input_files` fail on one match.
    pub fn rejecting_files(self, selector: &str, nth: usize) -> Self {
        self.with_element(selector, |element| {
            element.rejects_files.insert(nth);
        })
    }

    pub fn calls(&self) -> Vec<PageCall> {
        self.lock().calls.clone()
    }

    pub fn count_calls(&self, selector: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, PageCall::Count(counted) if counted == selector))
            .count()
    }

    pub fn clicks(&self, selector: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, PageCall::Click(target) if target.selector == selector))
            .count()
    }

    /// Last text filled into the first match of `selector`.
    pub fn filled(&self, selector: &str) -> Option<String> {
        self.calls().into_iter().rev().find_map(|call| match call {
            PageCall::Fill(target, text) if target.selector == selector => Some(text),
            _ => None,
        })
    }

    pub fn typed(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PageCall::Type(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn attached_files(&self) -> Vec<PathBuf> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PageCall::SetInputFiles(_, files) | PageCall::FileChooser(_, files) => {
                    Some(files)
                }
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn was_closed(&self) -> bool {
        self.lock().closed
    }

    /// Live clones of this page, the launcher's own copy included.
    pub fn handles(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    fn record(&self, call: PageCall) -> MutexGuard<'_, MockState> {
        let mut state = self.lock();
        state.calls.push(call);
        state
    }

    fn missing(action: &str, selector: &str) -> BrowserError {
        BrowserError::Timeout {
            action: format!("{action} {selector}"),
            timeout_ms: 0,
        }
    }

    /// Fail like Playwright's auto-wait would when the target has no match.
    fn resolve<'s>(
        state: &'s mut MockState,
        action: &str,
        target: &Target,
    ) -> Result<&'s mut MockElement> {
        match state.elements.get_mut(&target.selector) {
            Some(element) if target.nth < element.addressable() => Ok(element),
            _ => Err(Self::missing(action, &target.selector)),
        }
    }
}

#[async_trait]
impl PageSession for MockPage {
    async fn goto(&self, url: &str, _wait_until: LoadState, _timeout: Duration) -> Result<()> {
        self.record(PageCall::Goto(url.to_string()));
        Ok(())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        state: WaitState,
        _timeout: Duration,
    ) -> Result<()> {
        let page = self.record(PageCall::WaitFor(selector.to_string(), state));
        let shown = page
            .elements
            .get(selector)
            .is_some_and(|element| element.visible && element.current() > 0);
        let reached = match state {
            WaitState::Visible | WaitState::Attached => shown,
            WaitState::Hidden | WaitState::Detached => !shown,
        };
        if reached {
            Ok(())
        } else {
            Err(Self::missing("wait_for_selector", selector))
        }
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        let mut page = self.record(PageCall::Count(selector.to_string()));
        Ok(page
            .elements
            .get_mut(selector)
            .map(MockElement::advance)
            .unwrap_or(0))
    }

    async fn click(&self, target: &Target) -> Result<()> {
        let mut page = self.record(PageCall::Click(target.clone()));
        Self::resolve(&mut page, "click", target)?;
        Ok(())
    }

    async fn fill(&self, target: &Target, text: &str) -> Result<()> {
        let mut page = self.record(PageCall::Fill(target.clone(), text.to_string()));
        let element = Self::resolve(&mut page, "fill", target)?;
        if let Some(slot) = element.texts.get_mut(target.nth) {
            *slot = text.to_string();
        }
        Ok(())
    }

    async fn type_text(&self, target: Option<&Target>, text: &str, _delay: Duration) -> Result<()> {
        let mut page = self.record(PageCall::Type(target.cloned(), text.to_string()));
        if let Some(target) = target {
            Self::resolve(&mut page, "type", target)?;
        }
        Ok(())
    }

    async fn press(&self, target: Option<&Target>, key: &str) -> Result<()> {
        let mut page = self.record(PageCall::Press(target.cloned(), key.to_string()));
        if let Some(target) = target {
            Self::resolve(&mut page, "press", target)?;
        }
        Ok(())
    }

    async fn check(&self, target: &Target) -> Result<()> {
        let mut page = self.record(PageCall::Check(target.clone()));
        Self::resolve(&mut page, "check", target)?;
        Ok(())
    }

    async fn set_input_files(&self, target: &Target, files: &[PathBuf]) -> Result<()> {
        let mut page = self.record(PageCall::SetInputFiles(target.clone(), files.to_vec()));
        let element = Self::resolve(&mut page, "set_input_files", target)?;
        if element.rejects_files.contains(&target.nth) {
            return Err(BrowserError::Driver {
                action: "set_input_files".to_string(),
                message: "Element is not an <input type=\"file\">".to_string(),
            });
        }
        Ok(())
    }

    async fn set_files_via_chooser(&self, trigger: &Target, files: &[PathBuf]) -> Result<()> {
        let mut page = self.record(PageCall::FileChooser(trigger.clone(), files.to_vec()));
        Self::resolve(&mut page, "set_files_via_chooser", trigger)?;
        Ok(())
    }

    async fn dispatch_event(&self, target: &Target, event: &str) -> Result<()> {
        let mut page = self.record(PageCall::DispatchEvent(target.clone(), event.to_string()));
        Self::resolve(&mut page, "dispatch_event", target)?;
        Ok(())
    }

    async fn get_attribute(&self, target: &Target, name: &str) -> Result<Option<String>> {
        let mut page = self.record(PageCall::GetAttribute(target.clone(), name.to_string()));
        let element = Self::resolve(&mut page, "get_attribute", target)?;
        Ok(element
            .attributes
            .get(&(target.nth, name.to_string()))
            .cloned())
    }

    async fn inner_text(&self, target: &Target) -> Result<String> {
        let mut page = self.record(PageCall::InnerText(target.clone()));
        let element = Self::resolve(&mut page, "inner_text", target)?;
        Ok(element.texts.get(target.nth).cloned().unwrap_or_default())
    }

    async fn is_visible(&self, target: &Target) -> Result<bool> {
        let page = self.record(PageCall::IsVisible(target.clone()));
        Ok(page
            .elements
            .get(&target.selector)
            .is_some_and(|element| element.visible && target.nth < element.addressable()))
    }

    async fn scroll_into_view(&self, target: &Target) -> Result<()> {
        let mut page = self.record(PageCall::ScrollIntoView(target.clone()));
        Self::resolve(&mut page, "scroll_into_view", target)?;
        Ok(())
    }

    async fn evaluate(&self, function: &str, arg: Value) -> Result<Value> {
        self.record(PageCall::Evaluate(function.to_string(), arg));
        Ok(Value::Null)
    }

    async fn close(&self) -> Result<()> {
        let mut page = self.record(PageCall::Close);
        page.closed = true;
        Ok(())
    }
}

/// Hands out clones of one [`MockPage`] and remembers each launch request.
#[derive(Debug, Default)]
pub struct MockLauncher {
    page: MockPage,
    requests: Mutex<Vec<LaunchRequest>>,
    unavailable: Option<String>,
}

impl MockLauncher {
    pub fn new(page: MockPage) -> Self {
        Self {
            page,
            requests: Mutex::new(Vec::new()),
            unavailable: None,
        }
    }

    /// A launcher whose runtime is missing.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            unavailable: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn page(&self) -> &MockPage {
        &self.page
    }

    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<Box<dyn PageSession>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        match &self.unavailable {
            Some(reason) => Err(BrowserError::RuntimeUnavailable(reason.clone())),
            None => Ok(Box::new(self.page.clone())),
        }
    }
}
