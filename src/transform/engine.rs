use std::collections::BTreeMap;

use thiserror::Error;

use crate::document::GrammarDocument;
use crate::grammar::validate::{validate_layer_order, validate_rules, ValidationError};
use crate::grammar::{HostGraph, Match, ProcedureError, Rule, TypeSet};
use crate::transform::events::{Event, EventListener, Subscribers, SubscriptionId};
use crate::transform::options::TransformationOptions;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no host graph was configured for the transformation")]
    MissingHostGraph,
    #[error("no transformation options were configured")]
    MissingOptions,
    #[error("the grammar's rules are invalid: {0}")]
    InvalidRules(#[from] ValidationError),
    #[error("stopped after {limit} rule applications; the rule set may not terminate")]
    StepLimitExceeded { limit: usize },
    #[error("rule {rule:?} failed at step {step}: {source}")]
    Procedure {
        rule: String,
        step: usize,
        source: ProcedureError,
    },
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformationSummary {
    /// Rule applications in total.
    pub steps: usize,
    /// Passes over the layer sequence. Always 1 unless layers loop.
    pub passes: usize,
    /// Applications per rule name.
    pub applications: BTreeMap<String, usize>,
}

/// A layered transformation over one host graph.
///
/// Rules are grouped by layer. Each layer runs until none of its rules applies, then the
/// next layer starts. Within a layer the first enabled rule in document order that has
/// a match is applied, at its first match (see [`Rule::first_match`]), so runs over equal
/// inputs make the same choices.
///
/// The engine borrows the graph mutably for its whole lifetime and `transform` consumes
/// it, so configuration can't change during a run and a run can't be started twice.
pub struct LayeredTransformation<'a> {
    rules: &'a [Rule],
    types: Option<&'a TypeSet>,
    host: Option<&'a mut HostGraph>,
    options: Option<TransformationOptions>,
    subscribers: Subscribers<'a>,
}

impl<'a> LayeredTransformation<'a> {
    pub fn new(rules: &'a [Rule]) -> Self {
        Self {
            rules,
            types: None,
            host: None,
            options: None,
            subscribers: Subscribers::default(),
        }
    }

    /// Configure the engine with a document's rules, types, host graph and options.
    pub fn for_document(document: &'a mut GrammarDocument) -> Self {
        let GrammarDocument {
            rules,
            types,
            graph,
            options,
            ..
        } = document;
        let rules: &'a Vec<Rule> = rules;
        let types: &'a TypeSet = types;
        let options = options.clone();
        Self::new(rules)
            .with_types(types)
            .with_host_graph(graph)
            .with_options(options)
    }

    pub fn with_host_graph(mut self, graph: &'a mut HostGraph) -> Self {
        self.host = Some(graph);
        self
    }

    pub fn with_options(mut self, options: TransformationOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Declared types the rules are checked against before the run.
    pub fn with_types(mut self, types: &'a TypeSet) -> Self {
        self.types = Some(types);
        self
    }

    pub fn subscribe<L: EventListener + 'a>(&mut self, listener: L) -> SubscriptionId {
        self.subscribers.subscribe(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Run the transformation to completion, rewriting the host graph in place.
    pub fn transform(mut self) -> Result<TransformationSummary, EngineError> {
        let graph = self.host.take().ok_or(EngineError::MissingHostGraph)?;
        let options = self.options.take().ok_or(EngineError::MissingOptions)?;
        let no_types = TypeSet::default();
        validate_rules(self.rules, self.types.unwrap_or(&no_types))?;
        if let Some(order) = &options.layer_order {
            validate_layer_order(order)?;
        }

        let layers = options.layer_sequence(self.rules);
        let mut run = Run {
            rules: self.rules,
            graph,
            options: &options,
            subscribers: &mut self.subscribers,
            summary: TransformationSummary::default(),
        };
        run.execute(&layers)?;
        Ok(run.summary)
    }
}

/// State of a run in progress.
struct Run<'r, 'a> {
    rules: &'a [Rule],
    graph: &'r mut HostGraph,
    options: &'r TransformationOptions,
    subscribers: &'r mut Subscribers<'a>,
    summary: TransformationSummary,
}

impl<'r, 'a> Run<'r, 'a> {
    fn emit(&mut self, event: Event) {
        self.subscribers.notify(&event);
    }

    fn execute(&mut self, layers: &[u32]) -> Result<(), EngineError> {
        log::info!(
            "Running {} rules over {} layers on a graph of {} nodes, {} listeners",
            self.rules.len(),
            layers.len(),
            self.graph.order(),
            self.subscribers.len()
        );
        if self.subscribers.is_empty() {
            log::debug!("Nobody is listening to this run");
        }
        self.emit(Event::Started {
            layers: layers.to_vec(),
        });

        loop {
            self.summary.passes += 1;
            let mut applied_in_pass = 0;
            for layer in layers {
                self.emit(Event::LayerEntered { layer: *layer });
                let applications = self.exhaust_layer(*layer)?;
                self.emit(Event::LayerFinished {
                    layer: *layer,
                    applications,
                });
                applied_in_pass += applications;
            }
            if !self.options.loop_over_layers || applied_in_pass == 0 {
                break;
            }
            log::debug!(
                "Pass {} applied {} rules, starting over from the first layer",
                self.summary.passes,
                applied_in_pass
            );
        }

        self.emit(Event::Finished {
            steps: self.summary.steps,
        });
        Ok(())
    }

    /// Apply rules of one layer until none of them matches. Returns how many were applied.
    fn exhaust_layer(&mut self, layer: u32) -> Result<usize, EngineError> {
        let rules = self.rules;
        let mut applications = 0;
        loop {
            let graph: &HostGraph = &*self.graph;
            let check_dangling = self.options.check_dangling;
            let next = rules
                .iter()
                .filter(|rule| rule.enabled && rule.layer == layer)
                .find_map(|rule| {
                    rule.first_match(graph, check_dangling)
                        .map(|found| (rule, found))
                });
            let (rule, found) = match next {
                Some(next) => next,
                None => return Ok(applications),
            };

            if let Some(limit) = self.options.max_steps {
                if self.summary.steps >= limit {
                    self.emit(Event::Aborted {
                        reason: format!("step limit of {} reached", limit),
                    });
                    return Err(EngineError::StepLimitExceeded { limit });
                }
            }
            self.apply(rule, found)?;
            applications += 1;
        }
    }

    fn apply(&mut self, rule: &Rule, mut found: Match) -> Result<(), EngineError> {
        let step = self.summary.steps + 1;
        let nodes = found.nodes.clone();
        for proc in &rule.to {
            if let Err(source) = proc.apply(self.graph, &mut found) {
                log::error!("Rule {} failed at step {}: {}", rule.name, step, source);
                self.emit(Event::Aborted {
                    reason: format!("rule {} failed: {}", rule.name, source),
                });
                return Err(EngineError::Procedure {
                    rule: rule.name.clone(),
                    step,
                    source,
                });
            }
        }

        self.summary.steps = step;
        *self
            .summary
            .applications
            .entry(rule.name.clone())
            .or_insert(0) += 1;
        self.emit(Event::RuleApplied {
            rule: rule.name.clone(),
            layer: rule.layer,
            step,
            nodes,
        });
        Ok(())
    }
}
