//! The process interpreter
//!
//! `Engine` walks a validated process one user input at a time: it invokes
//! the current activity's callback, reclaims the kb/ctx the callback
//! returns, and moves the traversal position according to the activity
//! kind. Gateways push resumption points onto a stack and track their
//! selected children until they are satisfied.
//!
//! One engine instance drives one session on one logical thread; callers
//! running several sessions use one instance per session, or serialize
//! access themselves.

use std::collections::HashMap;
use std::mem;

use super::activity::{Activity, ActivityId, ActivityKind};
use super::callback::{CallbackResolver, verify_callbacks};
use super::context::{self, Context, Data, KnowledgeBase};
use super::error::{EngineError, Result};
use super::process::Process;
use super::response::{Reply, Response};
use crate::nlu::NluAdapter;

/// Hook invoked with the knowledge base whenever traversal reaches an End
/// activity
pub type SaveHook = Box<dyn FnMut(&KnowledgeBase) -> anyhow::Result<()> + Send>;

/// A save hook that keeps the knowledge base wherever it already is
pub fn noop_save_hook() -> SaveHook {
    Box::new(|_kb| Ok(()))
}

/// Drives one dialogue session over a validated process
pub struct Engine {
    process: Process,
    kb: KnowledgeBase,
    ctx: Context,
    current: usize,
    callbacks: Box<dyn CallbackResolver + Send>,
    nlu: Box<dyn NluAdapter + Send>,
    on_save: SaveHook,
    stack: Vec<Option<ActivityId>>,
    done: HashMap<ActivityId, Vec<ActivityId>>,
}

impl Engine {
    /// Create an engine positioned on the process entry activity
    ///
    /// The initial context's completed-set entry is reset to empty, and
    /// every non-End activity is verified to resolve to a callback before
    /// any input is accepted.
    pub fn new(
        process: Process,
        kb: KnowledgeBase,
        initial_context: Context,
        callbacks: impl CallbackResolver + Send + 'static,
        nlu: impl NluAdapter + Send + 'static,
        on_save: SaveHook,
    ) -> Result<Self> {
        verify_callbacks(&process, &callbacks)?;

        let mut ctx = initial_context;
        context::reset_completed(&mut ctx);

        let first_id = process.first().id.clone();
        let current = process
            .position(&first_id)
            .ok_or(EngineError::UnknownActivity(first_id))?;

        Ok(Self {
            process,
            kb,
            ctx,
            current,
            callbacks: Box::new(callbacks),
            nlu: Box::new(nlu),
            on_save,
            stack: Vec::new(),
            done: HashMap::new(),
        })
    }

    /// Take textual input, translate it through the NLU adapter, and
    /// handle it as data
    pub fn handle_text_input(&mut self, text: &str) -> Result<Reply> {
        let data = self.nlu.parse(text.trim_end())?;
        self.handle_data_input(&data)
    }

    /// Take data input and run one step of the process
    ///
    /// Invokes the current activity's callback and forwards its utterance
    /// and payload to the caller. A callback that reports completion moves
    /// the position; one that does not leaves the position unchanged so the
    /// user is re-prompted. Invalid user input is data, not a fault: errors
    /// surface only for construction defects, misbehaving gateway
    /// callbacks, or a defective graph.
    pub fn handle_data_input(&mut self, data: &Data) -> Result<Reply> {
        let current = self.current_activity().clone();
        match &current.kind {
            // A terminal activity keeps answering with its default
            // utterance and never moves.
            ActivityKind::End => {
                let mut response = Response::new(KnowledgeBase::new(), Context::new(), true);
                response.add_utterance(&self.kb, current.id.as_str(), "");
                Ok(response.into_reply())
            }

            ActivityKind::Xor { .. } => {
                let mut response = self.run_callback(data)?;
                if response.complete {
                    // The gateway's own successor becomes the resumption
                    // point; it may be None.
                    self.stack.push(current.next_id.clone());
                    let choice =
                        response
                            .choice
                            .clone()
                            .ok_or_else(|| EngineError::MissingChoice {
                                gateway: current.id.clone(),
                            })?;
                    self.enter_choice(&current.id, choice, &mut response)?;
                }
                Ok(response.into_reply())
            }

            ActivityKind::Or { .. } | ActivityKind::Parallel { .. } => {
                let mut response = self.run_callback(data)?;
                if response.complete {
                    match response.choice.clone() {
                        None => {
                            // No further choice: forget this gateway's
                            // bookkeeping and proceed past it.
                            self.done.remove(&current.id);
                            context::clear_completed(&mut self.ctx, &current.id);
                            self.go_next(&mut response)?;
                        }
                        Some(choice) => {
                            self.stack.push(Some(current.id.clone()));

                            let selected = self.done.entry(current.id.clone()).or_default();
                            if !selected.contains(&choice) {
                                selected.push(choice.clone());
                            }

                            let satisfied = match &current.kind {
                                ActivityKind::Parallel { choices } => {
                                    choices.iter().all(|declared| selected.contains(declared))
                                }
                                // An Or is satisfied by its first recorded
                                // choice.
                                _ => true,
                            };
                            if satisfied {
                                context::mark_completed(&mut self.ctx, &current.id);
                            } else {
                                context::clear_completed(&mut self.ctx, &current.id);
                            }

                            self.enter_choice(&current.id, choice, &mut response)?;
                        }
                    }
                }
                Ok(response.into_reply())
            }

            ActivityKind::Start | ActivityKind::Task => {
                let mut response = self.run_callback(data)?;
                if response.complete {
                    self.go_next(&mut response)?;
                }
                Ok(response.into_reply())
            }
        }
    }

    /// The activity the engine is currently positioned on
    pub fn current_activity(&self) -> &Activity {
        &self.process.activities()[self.current]
    }

    /// The process this engine runs
    pub fn process(&self) -> &Process {
        &self.process
    }

    /// Read access to the knowledge base
    pub fn kb(&self) -> &KnowledgeBase {
        &self.kb
    }

    /// Read access to the session context
    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    /// Run the current activity's callback and reclaim the kb/ctx it
    /// returns
    fn run_callback(&mut self, data: &Data) -> Result<Response> {
        let id = self.current_activity().id.clone();
        let callback = self.callbacks.resolve(&id)?;
        let kb = mem::take(&mut self.kb);
        let ctx = mem::take(&mut self.ctx);
        let mut response = callback(data, kb, ctx);
        self.kb = mem::take(&mut response.kb);
        self.ctx = mem::take(&mut response.ctx);
        Ok(response)
    }

    /// Advance past the current activity: its successor when declared,
    /// otherwise the nearest resumption point on the stack
    fn go_next(&mut self, response: &mut Response) -> Result<()> {
        let current = self.current_activity();
        let current_id = current.id.clone();
        let target = match current.next_id.clone() {
            Some(id) => id,
            // None entries mean "no resumption point, pop again".
            None => loop {
                match self.stack.pop() {
                    Some(Some(id)) => break id,
                    Some(None) => continue,
                    None => {
                        return Err(EngineError::StackUnderflow {
                            activity: current_id,
                        });
                    }
                }
            },
        };

        tracing::debug!(from = %current_id, to = %target, "advancing");
        let index = self
            .process
            .position(&target)
            .ok_or(EngineError::UnknownActivity(target.clone()))?;
        self.current = index;
        response.add_utterance(&self.kb, target.as_str(), "");
        self.save_if_end()
    }

    /// Move into the child a gateway callback selected
    fn enter_choice(
        &mut self,
        gateway: &ActivityId,
        choice: ActivityId,
        response: &mut Response,
    ) -> Result<()> {
        let index =
            self.process
                .position(&choice)
                .ok_or_else(|| EngineError::UnknownChoice {
                    gateway: gateway.clone(),
                    choice: choice.clone(),
                })?;

        tracing::debug!(gateway = %gateway, choice = %choice, "entering gateway choice");
        self.current = index;
        response.add_utterance(&self.kb, choice.as_str(), "");
        self.save_if_end()
    }

    /// Fire the save hook when traversal has reached an End activity
    fn save_if_end(&mut self) -> Result<()> {
        if matches!(self.current_activity().kind, ActivityKind::End) {
            tracing::debug!("process complete, saving knowledge base");
            (self.on_save)(&self.kb).map_err(EngineError::Save)?;
        }
        Ok(())
    }
}
