use act_runtime::module::{ActionDef, ActorDef, Item, Module, SendStmt, ShowStmt, SpawnStmt};
use act_runtime::{
    ActorTemplate, Environment, ExitReason, HandlerError, Message, Pid, RunReport, RuntimeConfig,
    RuntimeError, Scheduler, Token,
};
use std::sync::Arc;
use std::time::Duration;

// --- Module builders ---

fn tok(text: &str) -> Token {
    if text == "@" || text == "=" {
        Token::symbol(text)
    } else if text.chars().all(|c| c.is_ascii_digit()) {
        Token::lit(text)
    } else if text.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Token::ident(text)
    } else {
        Token::op(text)
    }
}

fn toks(src: &str) -> Vec<Token> {
    src.split_whitespace().map(tok).collect()
}

fn action(message: &str, params: &str, body: &str, reply: Option<&str>) -> ActionDef {
    ActionDef {
        message: message.into(),
        params: params.split_whitespace().map(String::from).collect(),
        body: toks(body),
        reply_param: reply.map(String::from),
    }
}

fn actor(name: &str, state: &str, actions: Vec<ActionDef>) -> Item {
    Item::ActorDef(ActorDef {
        name: name.into(),
        initial_state: tok(state),
        actions,
    })
}

fn spawn(name: &str, scope: &str) -> Item {
    Item::Spawn(SpawnStmt {
        name: name.into(),
        scope: toks(scope),
    })
}

fn send(target: &str, message: &str, args: &str) -> Item {
    Item::Send(SendStmt {
        target: tok(target),
        message: message.into(),
        args: toks(args),
    })
}

fn show(target: &str) -> Item {
    Item::Show(ShowStmt {
        target: tok(target),
    })
}

fn counter() -> Item {
    actor(
        "counter",
        "0",
        vec![
            action("inc", "n", "n +=", None),
            action("dec", "n", "n -=", None),
        ],
    )
}

async fn run(items: Vec<Item>) -> Result<RunReport, RuntimeError> {
    Environment::new(Module::new(items), RuntimeConfig::default())
        .exec()
        .await
}

// --- Scenarios ---

#[tokio::test]
async fn test_counter_increment() {
    let report = run(vec![counter(), spawn("c1", "counter"), send("c1", "inc", "5")])
        .await
        .unwrap();

    let c1 = report.process("c1").unwrap();
    assert_eq!(c1.state, 5);
    assert_eq!(c1.reason, ExitReason::Handled);
    assert_eq!(c1.template, "counter");
    assert!(report.replies.is_empty());
}

#[tokio::test]
async fn test_reply_falls_back_to_root() {
    let report = run(vec![
        actor(
            "multiplier",
            "0",
            vec![action("compute", "a b", "a b * =", Some("a"))],
        ),
        spawn("worker", "multiplier"),
        send("worker", "compute", "3 4"),
    ])
    .await
    .unwrap();

    let worker = report.process("worker").unwrap();
    assert_eq!(worker.state, 12);
    assert_eq!(
        report.replies,
        vec![Message::new(
            "compute",
            vec![worker.pid.as_value(), Pid::ROOT.as_value(), 12]
        )]
    );
}

#[tokio::test]
async fn test_reply_to_explicit_root() {
    let report = run(vec![
        actor("doubler", "21", vec![action("go", "", "2 *=", Some("@"))]),
        spawn("d", "doubler"),
        send("d", "go", ""),
    ])
    .await
    .unwrap();

    let d = report.process("d").unwrap();
    assert_eq!(report.replies[0].args, vec![d.pid.as_value(), 1, 42]);
}

#[tokio::test]
async fn test_reply_to_live_process() {
    let report = run(vec![
        actor(
            "multiplier",
            "0",
            vec![action("compute", "r a b", "a b * =", Some("r"))],
        ),
        actor("sink", "0", vec![action("compute", "from to s", "s =", None)]),
        spawn("e", "sink"),
        spawn("worker", "multiplier"),
        send("worker", "compute", "e 3 4"),
        // returns only once the worker has finished, so the reply is already queued
        show("worker"),
    ])
    .await
    .unwrap();

    let e = report.process("e").unwrap();
    assert_eq!(e.state, 12);
    assert_eq!(e.reason, ExitReason::Handled);
    assert!(report.replies.is_empty());
}

#[tokio::test]
async fn test_unknown_message_is_ignored() {
    let report = run(vec![
        counter(),
        spawn("c1", "counter 7"),
        spawn("c2", "counter"),
        send("c1", "reset", ""),
        send("c2", "inc", "1"),
    ])
    .await
    .unwrap();

    let c1 = report.process("c1").unwrap();
    assert_eq!(c1.state, 7);
    assert_eq!(c1.reason, ExitReason::Unhandled);
    assert_eq!(report.process("c2").unwrap().state, 1);
    assert!(report.replies.is_empty());
}

#[tokio::test]
async fn test_overrides_are_independent() {
    let report = run(vec![
        counter(),
        spawn("a", "counter 10"),
        spawn("b", "counter 100"),
        send("a", "inc", "1"),
        send("b", "inc", "1"),
    ])
    .await
    .unwrap();

    assert_eq!(report.process("a").unwrap().state, 11);
    assert_eq!(report.process("b").unwrap().state, 101);
}

#[tokio::test]
async fn test_no_messages_keeps_initial_state() {
    let report = run(vec![counter(), spawn("plain", "counter"), spawn("custom", "counter 42")])
        .await
        .unwrap();

    let plain = report.process("plain").unwrap();
    assert_eq!(plain.state, 0);
    assert_eq!(plain.reason, ExitReason::Idle);
    assert_eq!(report.process("custom").unwrap().state, 42);
}

#[tokio::test]
async fn test_add_then_subtract_restores_state() {
    let report = run(vec![
        counter(),
        spawn("up", "counter 9"),
        send("up", "inc", "4"),
        show("up"),
        spawn("down", "counter 13"),
        send("down", "dec", "4"),
    ])
    .await
    .unwrap();

    assert_eq!(report.shows[0].state, 13);
    assert_eq!(report.process("down").unwrap().state, 9);
}

#[tokio::test]
async fn test_arity_mismatch_leaves_state() {
    let report = run(vec![
        counter(),
        spawn("c1", "counter 3"),
        send("c1", "inc", "1 2"),
    ])
    .await
    .unwrap();

    let c1 = report.process("c1").unwrap();
    assert_eq!(c1.state, 3);
    let expected = HandlerError::ArityMismatch {
        message: "inc".into(),
        expected: 1,
        got: 2,
    };
    assert_eq!(c1.reason, ExitReason::Failed(expected.to_string()));
}

#[tokio::test]
async fn test_eval_error_is_local_to_one_process() {
    let report = run(vec![
        actor(
            "broken",
            "5",
            vec![
                action("underflow", "", "+", None),
                action("divide", "", "0 %=", None),
            ],
        ),
        counter(),
        spawn("b1", "broken"),
        spawn("b2", "broken"),
        spawn("ok", "counter"),
        send("b1", "underflow", ""),
        send("b2", "divide", ""),
        send("ok", "inc", "2"),
    ])
    .await
    .unwrap();

    for name in ["b1", "b2"] {
        let exit = report.process(name).unwrap();
        assert_eq!(exit.state, 5);
        assert!(matches!(exit.reason, ExitReason::Failed(_)));
    }
    assert_eq!(report.process("ok").unwrap().state, 2);
}

#[tokio::test]
async fn test_show_reports_through_the_process() {
    let report = run(vec![
        counter(),
        spawn("c1", "counter 3"),
        show("c1"),
        send("c1", "inc", "4"),
        show("c1"),
        show("@"),
    ])
    .await
    .unwrap();

    let lines: Vec<String> = report.shows.iter().map(|s| s.to_string()).collect();
    assert_eq!(lines, vec!["c1(3)", "c1(7)", "@(0)"]);
}

#[tokio::test]
async fn test_send_by_pid() {
    let report = run(vec![counter(), spawn("c1", "counter"), send("2", "inc", "8")])
        .await
        .unwrap();
    assert_eq!(report.process_by_pid(Pid::new(2)).unwrap().state, 8);
}

#[tokio::test]
async fn test_root_pid_as_argument() {
    let report = run(vec![counter(), spawn("c1", "counter"), send("c1", "inc", "@")])
        .await
        .unwrap();
    assert_eq!(report.process("c1").unwrap().state, 1);
}

#[tokio::test]
async fn test_pids_increase_per_spawn() {
    let report = run(vec![
        counter(),
        spawn("a", "counter"),
        spawn("b", "counter"),
        spawn("c", "counter"),
    ])
    .await
    .unwrap();

    let pids: Vec<u64> = report.processes.iter().map(|p| p.pid.get()).collect();
    assert_eq!(pids, vec![2, 3, 4]);
}

// --- Structural errors ---

#[tokio::test]
async fn test_duplicate_actor_name() {
    let err = run(vec![counter(), counter()]).await.unwrap_err();
    assert_eq!(err, RuntimeError::DuplicateActorName("counter".into()));
}

#[tokio::test]
async fn test_invalid_initial_state() {
    let err = run(vec![actor("bad", "zero", vec![])]).await.unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidInitialState { .. }));

    let err = run(vec![counter(), spawn("c", "counter many")])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        RuntimeError::InvalidInitialState {
            actor: "counter".into(),
            value: "many".into()
        }
    );
}

#[tokio::test]
async fn test_spawn_undefined_actor() {
    let err = run(vec![spawn("x", "ghost")]).await.unwrap_err();
    assert_eq!(err, RuntimeError::UndefinedActor("ghost".into()));

    let err = run(vec![spawn("x", "")]).await.unwrap_err();
    assert_eq!(err, RuntimeError::EmptySpawnScope("x".into()));
}

#[tokio::test]
async fn test_send_to_unknown_process() {
    let err = run(vec![counter(), send("nobody", "inc", "1")])
        .await
        .unwrap_err();
    assert_eq!(err, RuntimeError::ProcessNotFound("nobody".into()));
}

#[tokio::test]
async fn test_send_after_process_finished_fails() {
    let err = run(vec![
        counter(),
        spawn("c1", "counter"),
        send("c1", "inc", "1"),
        show("c1"),
        send("c1", "inc", "2"),
    ])
    .await
    .unwrap_err();
    assert_eq!(err, RuntimeError::ProcessNotFound("c1".into()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_send_is_always_refused() {
    for _ in 0..200 {
        let err = run(vec![
            counter(),
            spawn("c1", "counter"),
            send("c1", "inc", "1"),
            send("c1", "inc", "2"),
        ])
        .await
        .unwrap_err();
        assert_eq!(err, RuntimeError::ProcessNotFound("c1".into()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_second_send_by_pid_is_refused() {
    for _ in 0..50 {
        let err = run(vec![
            counter(),
            spawn("c1", "counter"),
            send("2", "inc", "1"),
            send("2", "inc", "2"),
        ])
        .await
        .unwrap_err();
        assert_eq!(err, RuntimeError::ProcessNotFound("2".into()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_claimed_process_is_not_an_argument() {
    for _ in 0..50 {
        let err = run(vec![
            counter(),
            spawn("c1", "counter"),
            spawn("c2", "counter"),
            send("c1", "inc", "1"),
            send("c2", "inc", "c1"),
        ])
        .await
        .unwrap_err();
        assert_eq!(err, RuntimeError::ProcessNotFound("c1".into()));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reply_during_shutdown_reaches_live_target() {
    for _ in 0..200 {
        // No `show` after the send: the reply races the final join.
        let report = run(vec![
            actor(
                "multiplier",
                "0",
                vec![action("compute", "r a b", "a b * =", Some("r"))],
            ),
            actor("sink", "0", vec![action("compute", "from to s", "s =", None)]),
            spawn("e", "sink"),
            spawn("worker", "multiplier"),
            send("worker", "compute", "e 3 4"),
        ])
        .await
        .unwrap();

        let e = report.process("e").unwrap();
        assert_eq!(e.state, 12);
        assert_eq!(e.reason, ExitReason::Handled);
        assert!(report.replies.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reply_to_claimed_target_falls_back_to_root() {
    for _ in 0..50 {
        let report = run(vec![
            actor(
                "multiplier",
                "0",
                vec![action("compute", "r a b", "a b * =", Some("r"))],
            ),
            counter(),
            spawn("e", "counter"),
            spawn("worker", "multiplier"),
            send("worker", "compute", "e 3 4"),
            send("e", "inc", "1"),
        ])
        .await;

        // Either the program's own send or the reply claims `e` first; the other is
        // never dropped.
        match report {
            Ok(report) => {
                let e = report.process("e").unwrap();
                assert_eq!(e.state, 1);
                let worker = report.process("worker").unwrap();
                assert_eq!(
                    report.replies,
                    vec![Message::new(
                        "compute",
                        vec![worker.pid.as_value(), Pid::ROOT.as_value(), 12]
                    )]
                );
            }
            Err(err) => assert_eq!(err, RuntimeError::ProcessNotFound("e".into())),
        }
    }
}

// --- Scheduler ---

#[tokio::test]
async fn test_idle_timeout_ends_process() {
    let config = RuntimeConfig::default().with_idle_timeout(Some(Duration::from_millis(10)));
    let scheduler = Scheduler::new(config);
    scheduler.start_root_process().await.unwrap();

    let template = ActorTemplate::from_def(&ActorDef {
        name: "counter".into(),
        initial_state: Token::lit("4"),
        actions: vec![],
    })
    .unwrap();
    let pid = scheduler
        .start_process("sleepy", Arc::new(template), 4)
        .ready()
        .await
        .unwrap();

    while scheduler.is_live(pid) {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let exit = scheduler.exit_record(pid).unwrap();
    assert_eq!(exit.reason, ExitReason::Idle);
    assert_eq!(exit.state, 4);

    let report = scheduler.join_all().await.unwrap();
    assert_eq!(report.processes.len(), 1);
}
