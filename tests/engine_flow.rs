//! End-to-end traversal scenarios for the interpreter
//!
//! Each test builds a small process, registers callbacks, and drives the
//! engine through the public API, asserting on replies, position, and the
//! completed-set.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use colloquy::engine::{
    CallbackRegistry, Context, Data, Engine, EngineError, KnowledgeBase, Process, Response,
    SaveHook, context, noop_save_hook,
};
use colloquy::nlu::NoNlu;
use serde_json::{Value, json};

fn process(json: &str) -> Process {
    serde_json::from_str(json).expect("test process must be valid")
}

fn data(value: Value) -> Data {
    value.as_object().expect("test data must be an object").clone()
}

fn kb(value: Value) -> KnowledgeBase {
    value.as_object().expect("test kb must be an object").clone()
}

fn counting_hook() -> (Arc<AtomicUsize>, SaveHook) {
    let saves = Arc::new(AtomicUsize::new(0));
    let counter = saves.clone();
    let hook: SaveHook = Box::new(move |_kb| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    (saves, hook)
}

/// start -> echo -> end, with a completing start callback.
fn echo_engine(saves_hook: SaveHook) -> Engine {
    let process = process(
        r#"{
            "first_activity_id": "start",
            "activities": [
                {"id": "start", "next_id": "echo", "kind": "start"},
                {"id": "echo", "next_id": "end", "kind": "task"},
                {"id": "end", "kind": "end"}
            ]
        }"#,
    );

    let registry = CallbackRegistry::new()
        .with("start", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("echo", |data, kb, ctx| {
            match data.get("echo").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Response::new(kb, ctx, true)
                    .with_utterance(format!("Echoed: {text}")),
                _ => Response::new(kb, ctx, false).with_utterance("Nothing to echo"),
            }
        });

    Engine::new(
        process,
        kb(json!({"echo": "Echo prompt", "end": "Bye"})),
        Context::new(),
        registry,
        NoNlu::new(vec!["echo".to_string()]),
        saves_hook,
    )
    .unwrap()
}

#[test]
fn linear_process_runs_to_end() {
    let (saves, hook) = counting_hook();
    let mut engine = echo_engine(hook);

    // The start callback completes at once, so the first reply carries the
    // echo activity's default utterance.
    let reply = engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(reply.utterance, "Echo prompt");
    assert_eq!(engine.current_activity().id.as_str(), "echo");
    assert_eq!(saves.load(Ordering::SeqCst), 0);

    let reply = engine.handle_data_input(&data(json!({"echo": "hi"}))).unwrap();
    assert_eq!(reply.utterance, "Echoed: hi\nBye");
    assert_eq!(engine.current_activity().id.as_str(), "end");
    assert_eq!(saves.load(Ordering::SeqCst), 1);
}

#[test]
fn end_is_idempotent() {
    let (saves, hook) = counting_hook();
    let mut engine = echo_engine(hook);
    engine.handle_data_input(&Data::new()).unwrap();
    engine.handle_data_input(&data(json!({"echo": "hi"}))).unwrap();

    for _ in 0..3 {
        let reply = engine.handle_data_input(&data(json!({"echo": "again"}))).unwrap();
        assert_eq!(reply.utterance, "Bye");
        assert!(reply.payload.is_empty());
        assert_eq!(engine.current_activity().id.as_str(), "end");
    }
    // The save hook fired once, when the end was first reached.
    assert_eq!(saves.load(Ordering::SeqCst), 1);
}

#[test]
fn incomplete_callback_reprompts_but_keeps_state_changes() {
    let process = process(
        r#"{
            "first_activity_id": "ask",
            "activities": [
                {"id": "ask", "next_id": "end", "kind": "task"},
                {"id": "end", "kind": "end"}
            ]
        }"#,
    );

    let registry = CallbackRegistry::new().with("ask", |data, mut kb, ctx| {
        let attempts = kb.get("attempts").and_then(Value::as_u64).unwrap_or(0);
        kb.insert("attempts".to_string(), json!(attempts + 1));
        match data.get("answer") {
            Some(_) => Response::new(kb, ctx, true),
            None => Response::new(kb, ctx, false).with_utterance("Answer, please"),
        }
    });

    let mut engine = Engine::new(
        process,
        KnowledgeBase::new(),
        Context::new(),
        registry,
        NoNlu::new(vec!["answer".to_string()]),
        noop_save_hook(),
    )
    .unwrap();

    let reply = engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(reply.utterance, "Answer, please");
    assert_eq!(engine.current_activity().id.as_str(), "ask");
    // The kb update survives even though the activity did not complete.
    assert_eq!(engine.kb()["attempts"], json!(1));

    engine.handle_data_input(&data(json!({"answer": "42"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "end");
    assert_eq!(engine.kb()["attempts"], json!(2));
}

fn xor_process() -> Process {
    process(
        r#"{
            "first_activity_id": "start",
            "activities": [
                {"id": "start", "next_id": "pick", "kind": "start"},
                {"id": "pick", "next_id": "after", "kind": "xor", "choices": ["a", "b"]},
                {"id": "a", "kind": "task"},
                {"id": "b", "kind": "task"},
                {"id": "after", "next_id": "end", "kind": "task"},
                {"id": "end", "kind": "end"}
            ]
        }"#,
    )
}

fn xor_registry() -> CallbackRegistry {
    CallbackRegistry::new()
        .with("start", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("pick", |data, kb, ctx| {
            match data.get("choice").and_then(Value::as_str) {
                Some(choice @ ("a" | "b")) => {
                    Response::new(kb, ctx, true).with_choice(choice)
                }
                _ => Response::new(kb, ctx, false).with_utterance("Pick a or b"),
            }
        })
        .with("a", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("b", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("after", |_data, kb, ctx| Response::new(kb, ctx, true))
}

#[test]
fn xor_enters_exactly_the_chosen_child_and_resumes_after() {
    let mut engine = Engine::new(
        xor_process(),
        kb(json!({"a": "In A", "after": "Afterwards", "end": "Bye"})),
        Context::new(),
        xor_registry(),
        NoNlu::new(vec!["choice".to_string()]),
        noop_save_hook(),
    )
    .unwrap();

    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "pick");

    // An invalid choice re-prompts without moving.
    let reply = engine.handle_data_input(&data(json!({"choice": "zzz"}))).unwrap();
    assert_eq!(reply.utterance, "Pick a or b");
    assert_eq!(engine.current_activity().id.as_str(), "pick");

    let reply = engine.handle_data_input(&data(json!({"choice": "a"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "a");
    assert_eq!(reply.utterance, "In A");

    // The chosen branch has no successor, so completion resumes at the
    // gateway's own next activity through the stack.
    let reply = engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "after");
    assert_eq!(reply.utterance, "Afterwards");

    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "end");
}

#[test]
fn xor_completion_without_choice_is_a_fault() {
    let registry = CallbackRegistry::new()
        .with("start", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("pick", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("a", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("b", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("after", |_data, kb, ctx| Response::new(kb, ctx, true));

    let mut engine = Engine::new(
        xor_process(),
        KnowledgeBase::new(),
        Context::new(),
        registry,
        NoNlu::new(vec![]),
        noop_save_hook(),
    )
    .unwrap();

    engine.handle_data_input(&Data::new()).unwrap();
    let err = engine.handle_data_input(&Data::new()).unwrap_err();
    assert!(matches!(err, EngineError::MissingChoice { .. }), "{err}");
}

#[test]
fn xor_unknown_choice_is_a_fault() {
    let registry = CallbackRegistry::new()
        .with("start", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("pick", |_data, kb, ctx| {
            Response::new(kb, ctx, true).with_choice("ghost")
        })
        .with("a", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("b", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("after", |_data, kb, ctx| Response::new(kb, ctx, true));

    let mut engine = Engine::new(
        xor_process(),
        KnowledgeBase::new(),
        Context::new(),
        registry,
        NoNlu::new(vec![]),
        noop_save_hook(),
    )
    .unwrap();

    engine.handle_data_input(&Data::new()).unwrap();
    let err = engine.handle_data_input(&Data::new()).unwrap_err();
    assert!(matches!(err, EngineError::UnknownChoice { .. }), "{err}");
}

fn branching_process(kind: &str) -> Process {
    process(&format!(
        r#"{{
            "first_activity_id": "start",
            "activities": [
                {{"id": "start", "next_id": "gate", "kind": "start"}},
                {{"id": "gate", "next_id": "fin", "kind": "{kind}", "choices": ["e", "f"]}},
                {{"id": "e", "kind": "task"}},
                {{"id": "f", "kind": "task"}},
                {{"id": "fin", "next_id": "end", "kind": "task"}},
                {{"id": "end", "kind": "end"}}
            ]
        }}"#
    ))
}

fn branching_registry() -> CallbackRegistry {
    CallbackRegistry::new()
        .with("start", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("gate", |data, kb, ctx| {
            match data.get("pick").and_then(Value::as_str) {
                Some(choice @ ("e" | "f")) => {
                    Response::new(kb, ctx, true).with_choice(choice)
                }
                Some("done") => Response::new(kb, ctx, true),
                _ => Response::new(kb, ctx, false).with_utterance("Pick e, f or done"),
            }
        })
        .with("e", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("f", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("fin", |_data, kb, ctx| Response::new(kb, ctx, true))
}

fn branching_engine(kind: &str) -> Engine {
    let mut engine = Engine::new(
        branching_process(kind),
        KnowledgeBase::new(),
        Context::new(),
        branching_registry(),
        NoNlu::new(vec!["pick".to_string()]),
        noop_save_hook(),
    )
    .unwrap();
    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "gate");
    engine
}

fn gate_completed(engine: &Engine) -> bool {
    context::completed_gateways(engine.ctx())
        .iter()
        .any(|id| id.as_str() == "gate")
}

#[test]
fn or_gateway_is_complete_after_first_choice_and_resumes_at_itself() {
    let mut engine = branching_engine("or");

    engine.handle_data_input(&data(json!({"pick": "e"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "e");
    // Sticky: one choice is enough for an inclusive gateway.
    assert!(gate_completed(&engine));

    // The branch has no successor: completion returns to the gateway, not
    // to its next activity.
    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "gate");

    // Further choices may still be taken.
    engine.handle_data_input(&data(json!({"pick": "f"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "f");
    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "gate");
    assert!(gate_completed(&engine));

    // A null choice clears the bookkeeping and proceeds past the gateway.
    engine.handle_data_input(&data(json!({"pick": "done"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "fin");
    assert!(!gate_completed(&engine));
}

#[test]
fn parallel_gateway_completes_only_when_every_choice_was_selected() {
    let mut engine = branching_engine("parallel");

    engine.handle_data_input(&data(json!({"pick": "e"}))).unwrap();
    assert!(!gate_completed(&engine));
    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "gate");

    // Re-selecting the same choice records nothing new.
    engine.handle_data_input(&data(json!({"pick": "e"}))).unwrap();
    assert!(!gate_completed(&engine));
    engine.handle_data_input(&Data::new()).unwrap();

    engine.handle_data_input(&data(json!({"pick": "f"}))).unwrap();
    assert!(gate_completed(&engine));
    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "gate");

    engine.handle_data_input(&data(json!({"pick": "done"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "fin");
    assert!(!gate_completed(&engine));
}

#[test]
fn parallel_gateway_completes_in_either_order() {
    let mut engine = branching_engine("parallel");

    for pick in ["f", "e"] {
        engine.handle_data_input(&data(json!({"pick": pick}))).unwrap();
        engine.handle_data_input(&Data::new()).unwrap();
        assert_eq!(engine.current_activity().id.as_str(), "gate");
    }
    assert!(gate_completed(&engine));
}

#[test]
fn nested_gateways_skip_null_resumption_entries() {
    // An exclusive gateway with no successor nested inside an inclusive
    // one: leaving the inner branch must skip the inner gateway's null
    // resumption entry and land back on the outer gateway.
    let process = process(
        r#"{
            "first_activity_id": "outer",
            "activities": [
                {"id": "outer", "next_id": "fin", "kind": "or", "choices": ["inner"]},
                {"id": "inner", "kind": "xor", "choices": ["leaf"]},
                {"id": "leaf", "kind": "task"},
                {"id": "fin", "next_id": "end", "kind": "task"},
                {"id": "end", "kind": "end"}
            ]
        }"#,
    );

    let registry = CallbackRegistry::new()
        .with("outer", |data, kb, ctx| {
            match data.get("pick").and_then(Value::as_str) {
                Some("inner") => Response::new(kb, ctx, true).with_choice("inner"),
                Some("done") => Response::new(kb, ctx, true),
                _ => Response::new(kb, ctx, false),
            }
        })
        .with("inner", |_data, kb, ctx| {
            Response::new(kb, ctx, true).with_choice("leaf")
        })
        .with("leaf", |_data, kb, ctx| Response::new(kb, ctx, true))
        .with("fin", |_data, kb, ctx| Response::new(kb, ctx, true));

    let mut engine = Engine::new(
        process,
        KnowledgeBase::new(),
        Context::new(),
        registry,
        NoNlu::new(vec!["pick".to_string()]),
        noop_save_hook(),
    )
    .unwrap();

    engine.handle_data_input(&data(json!({"pick": "inner"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "inner");

    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "leaf");

    // leaf -> (pop None pushed by inner) -> (pop outer) -> outer.
    engine.handle_data_input(&Data::new()).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "outer");

    engine.handle_data_input(&data(json!({"pick": "done"}))).unwrap();
    assert_eq!(engine.current_activity().id.as_str(), "fin");
}

#[test]
fn advancing_with_no_successor_and_empty_stack_is_fatal() {
    let process = process(
        r#"{
            "first_activity_id": "lone",
            "activities": [{"id": "lone", "kind": "task"}]
        }"#,
    );

    let registry =
        CallbackRegistry::new().with("lone", |_data, kb, ctx| Response::new(kb, ctx, true));

    let mut engine = Engine::new(
        process,
        KnowledgeBase::new(),
        Context::new(),
        registry,
        NoNlu::new(vec![]),
        noop_save_hook(),
    )
    .unwrap();

    let err = engine.handle_data_input(&Data::new()).unwrap_err();
    assert!(matches!(err, EngineError::StackUnderflow { .. }), "{err}");
}

#[test]
fn text_input_is_trimmed_and_parsed_through_the_adapter() {
    let (_saves, hook) = counting_hook();
    let mut engine = echo_engine(hook);
    engine.handle_data_input(&Data::new()).unwrap();

    let reply = engine.handle_text_input("hello  \n").unwrap();
    assert_eq!(reply.utterance, "Echoed: hello\nBye");
}
