use super::matching::MatchContext;
use super::parser::parse_cached;
use super::*;

use std::time::Instant;

mod affected;
mod configuration;
mod scheduler;
mod timing;

pub use affected::AffectedElement;
pub use configuration::{BeforeStyleApplied, Configuration, StyleTarget};
pub use timing::{RuleTimings, TimingStats};

use affected::{
    MAX_STYLE_PROTECTION_COUNT, ProtectionObserver, element_selector_path, revert_style,
    set_style_to_element,
};
use scheduler::{EventTracker, ThrottleWrapper, only_attribute_mutations};
use timing::RuleState;

/// Attributes whose change may alter which elements match.
const OBSERVED_ATTRIBUTES: [&str; 2] = ["id", "class"];

/// Outcome of [`ExtendedCss::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub ok: bool,
    pub error: Option<String>,
}

/// Applies extended CSS rules to a live document and keeps them applied.
///
/// The engine is driven from the outside: [`apply`](Self::apply) runs a pass
/// right away and [`pump`](Self::pump) delivers pending document changes,
/// which protects styled elements and schedules throttled re-apply passes.
pub struct ExtendedCss<D: HostDocument> {
    document: D,
    rules: Vec<RuleState<D::Node>>,
    debug: bool,
    before_style_applied: Option<BeforeStyleApplied<D::Node>>,
    affected: Vec<AffectedElement<D::Node>>,
    removals: HashMap<String, usize>,
    scheduler: ThrottleWrapper,
    event_tracker: EventTracker,
    text_content: Option<TextContentGetter<D>>,
    is_dom_observed: bool,
    waiting_for_ready: bool,
    timings_printed: bool,
    next_observer_id: u64,
}

impl<D: HostDocument> fmt::Debug for ExtendedCss<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedCss")
            .field("rules", &self.rules.len())
            .field("debug", &self.debug)
            .field("affected", &self.affected.len())
            .field("is_dom_observed", &self.is_dom_observed)
            .finish()
    }
}

impl<D: HostDocument> ExtendedCss<D> {
    pub fn new(document: D, configuration: Configuration<D::Node>) -> Result<Self> {
        let rules = configuration.parse_rules()?;
        let debug = configuration.debug
            || rules
                .iter()
                .any(|rule| rule.debug == Some(DebugMode::Global));
        Ok(Self {
            document,
            rules: rules.into_iter().map(RuleState::new).collect(),
            debug,
            before_style_applied: configuration.before_style_applied,
            affected: Vec::new(),
            removals: HashMap::new(),
            scheduler: ThrottleWrapper::default(),
            event_tracker: EventTracker::default(),
            text_content: None,
            is_dom_observed: false,
            waiting_for_ready: false,
            timings_printed: false,
            next_observer_id: 0,
        })
    }

    /// Captures the document's native text accessor. Call before page scripts run.
    pub fn init(&mut self) {
        self.text_content = Some(self.document.native_text_content_getter());
    }

    /// Runs an apply pass now; if the document is still loading, one more
    /// pass runs when it becomes ready.
    pub fn apply(&mut self) -> Result<()> {
        self.apply_rules()?;
        if !self.document.is_ready() {
            self.waiting_for_ready = true;
        }
        Ok(())
    }

    /// Delivers pending document changes and runs whatever they trigger.
    ///
    /// Returns the number of apply passes that ran.
    pub fn pump(&mut self) -> Result<usize> {
        let records = self.document.take_mutations();
        if !records.is_empty() {
            self.protect_styles(&records);
            self.discard_own_mutations();
            self.observe_mutations(&records);
        }

        let mut passes = 0;
        let now_ms = self.document.now_ms();
        if self.scheduler.take_due(now_ms) {
            log::debug!("[scheduler] throttled pass at {now_ms}ms");
            self.apply_rules()?;
            passes += 1;
        }
        if self.waiting_for_ready && self.document.is_ready() {
            self.waiting_for_ready = false;
            self.apply_rules()?;
            passes += 1;
        }
        Ok(passes)
    }

    /// Deadline of the scheduled throttled pass, if one is pending.
    pub fn pending_pass_at(&self) -> Option<u64> {
        self.scheduler.pending_deadline()
    }

    /// Stops observing the document and restores every affected element's style.
    pub fn dispose(&mut self) {
        self.disconnect_document();
        self.scheduler.cancel();
        self.waiting_for_ready = false;
        for mut affected in std::mem::take(&mut self.affected) {
            revert_style(&mut self.document, &mut affected);
        }
        self.discard_own_mutations();
    }

    pub fn affected_elements(&self) -> &[AffectedElement<D::Node>] {
        &self.affected
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    pub fn into_document(mut self) -> D {
        self.dispose();
        self.document
    }

    /// Timing statistics of the rules applied in debug mode.
    pub fn timings_report(&self) -> Vec<RuleTimings<D::Node>> {
        self.rules.iter().filter_map(RuleState::timings).collect()
    }

    /// Selects elements by an extended selector, reusing cached ASTs.
    pub fn query(document: &D, selector: &str, timed: bool) -> Result<Vec<D::Node>> {
        let start = Instant::now();
        let result = parse_cached(selector)
            .and_then(|ast| MatchContext::page_visible(document).select(&ast));
        if timed {
            log::info!(
                "[ExtendedCss] Elapsed: {} μs.",
                start.elapsed().as_micros()
            );
        }
        result
    }

    /// Checks that `selector` parses and selects without errors.
    ///
    /// A trailing `:remove()` is accepted.
    pub fn validate(document: &D, selector: &str) -> Validation {
        let checked = parse_remove_selector(selector)
            .and_then(|parsed| Self::query(document, &parsed.selector, false));
        match checked {
            Ok(_) => Validation {
                ok: true,
                error: None,
            },
            Err(err) => Validation {
                ok: false,
                error: Some(format!("Error: Invalid selector: '{selector}' -- {err}")),
            },
        }
    }

    fn match_context(&self) -> MatchContext<'_, D> {
        let text_content = self.text_content.unwrap_or(D::text_content);
        MatchContext::new(&self.document, text_content)
    }

    fn observe_document(&mut self) {
        if self.is_dom_observed {
            return;
        }
        self.is_dom_observed = true;
        self.event_tracker.start_tracking(self.document.now_ms());
    }

    fn disconnect_document(&mut self) {
        if !self.is_dom_observed {
            return;
        }
        self.is_dom_observed = false;
        self.event_tracker.stop_tracking();
    }

    /// Drops the records of the engine's own writes, made while the relevant
    /// observers were disconnected.
    fn discard_own_mutations(&mut self) {
        let own = self.document.take_mutations();
        if !own.is_empty() {
            log::debug!("[observer] skipped {} own mutation(s)", own.len());
        }
    }

    fn protect_styles(&mut self, records: &[MutationRecord<D::Node>]) {
        let mut targets: Vec<D::Node> = Vec::new();
        for record in records {
            if record.attribute_name() == Some("style") && !targets.contains(&record.target) {
                targets.push(record.target);
            }
        }
        for target in targets {
            let Some(affected) = self
                .affected
                .iter_mut()
                .find(|affected| affected.node == target)
            else {
                continue;
            };
            if let Some(observer) = affected.protection.as_mut() {
                observer.protect(&mut self.document, target);
            }
        }
    }

    fn observe_mutations(&mut self, records: &[MutationRecord<D::Node>]) {
        if !self.is_dom_observed {
            return;
        }
        let observed: Vec<&MutationRecord<D::Node>> = records
            .iter()
            .filter(|record| match record.attribute_name() {
                Some(name) => OBSERVED_ATTRIBUTES.contains(&name),
                None => true,
            })
            .collect();
        if observed.is_empty() {
            return;
        }

        let now_ms = self.document.now_ms();
        let last_event = self.document.last_input_event();
        if self
            .event_tracker
            .is_ignored_event_type(last_event.as_ref(), now_ms)
            && only_attribute_mutations(&observed)
        {
            log::debug!("[observer] ignored attribute changes after hover");
            return;
        }
        self.scheduler.run(now_ms);
    }

    fn apply_rules(&mut self) -> Result<()> {
        self.disconnect_document();

        let mut selected = HashSet::new();
        for index in 0..self.rules.len() {
            let nodes = self.apply_rule(index)?;
            let state = &mut self.rules[index];
            if state.rule.debug.is_some() {
                state.matched_elements = nodes.clone();
            }
            selected.extend(nodes);
        }

        let mut index = self.affected.len();
        while index > 0 {
            index -= 1;
            if !selected.contains(&self.affected[index].node) {
                let mut affected = self.affected.remove(index);
                revert_style(&mut self.document, &mut affected);
            } else if !self.affected[index].removed && self.affected[index].protection.is_none() {
                let id = self.next_observer_id;
                self.next_observer_id += 1;
                let affected = &mut self.affected[index];
                affected.protection = Some(ProtectionObserver::new(id, &affected.rules));
            }
        }

        self.discard_own_mutations();
        self.observe_document();
        self.print_timing_info();
        Ok(())
    }

    fn apply_rule(&mut self, index: usize) -> Result<Vec<D::Node>> {
        let is_debugging = self.rules[index].rule.debug.is_some() || self.debug;
        let start = is_debugging.then(Instant::now);

        let nodes = match self.match_context().select(&self.rules[index].rule.ast) {
            Ok(nodes) => nodes,
            Err(err) => {
                if self.debug {
                    log::error!("{err}");
                }
                Vec::new()
            }
        };

        for &node in &nodes {
            let rule = &self.rules[index].rule;
            let position = match self.affected.iter().position(|affected| affected.node == node) {
                Some(position) => {
                    let affected = &mut self.affected[position];
                    if !affected.rules.contains(rule) {
                        affected.rules.push(rule.clone());
                    }
                    position
                }
                None => {
                    let original_style = self.document.style_text(node);
                    self.affected
                        .push(AffectedElement::new(node, rule.clone(), original_style));
                    self.affected.len() - 1
                }
            };
            self.apply_style(position)?;
        }

        if let Some(start) = start {
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            self.rules[index].record_timing(elapsed_ms);
        }
        Ok(nodes)
    }

    fn apply_style(&mut self, position: usize) -> Result<()> {
        let affected = &self.affected[position];
        if affected.protection.is_some() {
            return Ok(());
        }

        let mut target = StyleTarget {
            node: affected.node,
            rules: affected.rules.clone(),
        };
        if let Some(hook) = self.before_style_applied.as_mut() {
            target = hook(target).ok_or_else(|| {
                Error::Configuration(
                    "Callback 'beforeStyleApplied' should return IAffectedElement".into(),
                )
            })?;
        }

        for rule in &target.rules {
            match &rule.style {
                Some(style) if style.is_remove() => {
                    self.remove_element(position);
                    return Ok(());
                }
                Some(style) => set_style_to_element(&mut self.document, target.node, style),
                None if rule.debug.is_none() => {
                    return Err(Error::StyleParse(format!(
                        "No style declaration in rule for selector: '{}'",
                        rule.selector
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    fn remove_element(&mut self, position: usize) {
        let affected = &mut self.affected[position];
        affected.removed = true;
        let node = affected.node;

        let path = element_selector_path(&self.document, node);
        let removals = self.removals.get(&path).copied().unwrap_or(0);
        if removals > MAX_STYLE_PROTECTION_COUNT {
            log::error!("ExtendedCss: infinite loop protection for selector: '{path}'");
            return;
        }
        if self.document.parent_element(node).is_some() && self.document.remove_element(node) {
            self.removals.insert(path, removals + 1);
        }
    }

    fn print_timing_info(&mut self) {
        if self.timings_printed {
            return;
        }
        self.timings_printed = true;
        let report = self.timings_report();
        if report.is_empty() {
            return;
        }
        log::info!("[ExtendedCss] Timings in milliseconds:\n{report:#?}");
    }
}
