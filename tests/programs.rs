use std::{fs, rc::Rc};
use pretty_assertions::assert_eq;
use funclang::{AllocPolicy, Config, Engine, Value};

fn eval(engine: &mut Engine, code: &str) -> String {
    engine.execute(code).expect("syntax error").to_string()
}

#[test]
fn globals_persist_between_executions() {
    let mut engine = Engine::default();
    assert_eq!(eval(&mut engine, "(define sq (lambda (x) (* x x)))"), "");
    assert_eq!(eval(&mut engine, "(sq 7)"), "49");
    assert!(matches!(engine.global("sq"), Some(Value::Closure(_))));
    assert!(engine.global("nope").is_none());
}

#[test]
fn syntax_errors_are_returned() {
    let mut engine = Engine::default();
    let errors = engine.execute("(+ 1 2))").unwrap_err();
    assert!(!errors.is_empty());
    let errors = engine.execute("(define x (define y 1)) x").unwrap_err();
    assert!(!errors.is_empty());
}

#[test]
fn runtime_errors_are_values() {
    let mut engine = Engine::default();
    match engine.execute("(car 5)") {
        Ok(Value::Error(msg)) => assert_eq!(msg, "Argument not a pair in expression (car 5)"),
        other => panic!("unexpected result: {:?}", other.map(|v| v.to_string())),
    }
}

#[test]
fn list_library() {
    let code = "
        ; classic list helpers
        (define map (lambda (f l)
            (if (null? l) (list) (cons (f (car l)) (map f (cdr l))))))
        (define foldl (lambda (f acc l)
            (if (null? l) acc (foldl f (f acc (car l)) (cdr l)))))
        (define range (lambda (lo hi)
            (if (> lo hi) (list) (cons lo (range (+ lo 1) hi)))))
        (list
            (map (lambda (x) (* x x)) (range 1 5))
            (foldl (lambda (a b) (+ a b)) 0 (range 1 100)))
    ";
    assert_eq!(eval(&mut Engine::default(), code), "((1 4 9 16 25) 5050)");
}

#[test]
fn counter_with_references() {
    let code = "
        (define make-counter (lambda ((start = 0))
            (let ((cell (ref start)))
                (lambda () (set! cell (+ (deref cell) 1))))))
        (define c (make-counter))
        (define d (make-counter 10))
        (define a (c))
        (define b (c))
        (list (c) (d))
    ";
    assert_eq!(eval(&mut Engine::default(), code), "(3 11)");
}

#[test]
fn matrix_trace() {
    let code = "
        (define m (array 3 3))
        (define fill (lambda (i)
            (if (> i 3) m
                (let ((_ (assign m i i i))) (fill (+ i 1))))))
        (define filled (fill 1))
        (+ (index m 1 1) (index m 2 2) (index m 3 3) (index m 1 3))
    ";
    assert_eq!(eval(&mut Engine::default(), code), "6");
}

#[test]
fn read_and_require_use_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.fl"), "(define double (lambda (x) (* 2 x))) (double 21)").unwrap();
    fs::write(dir.path().join("note.txt"), "hello").unwrap();

    let mut engine = Engine::new(Config::default().with_base_dir(dir.path()));
    assert_eq!(eval(&mut engine, "(read \"note.txt\")"), "hello");
    assert_eq!(eval(&mut engine, "(require \"lib.fl\")"), "42");
    assert_eq!(eval(&mut engine, "(double 5)"), "10");
    assert_eq!(eval(&mut engine, "(eval (read \"lib.fl\"))"), "42");
}

#[test]
fn require_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = Engine::new(Config::default().with_base_dir(dir.path()));
    let out = eval(&mut engine, "(require \"nope.fl\")");
    assert!(out.starts_with("Could not read file '"), "{}", out);
    assert!(out.contains("nope.fl"), "{}", out);
}

#[test]
fn require_reports_syntax_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.fl"), "(+ 1 2))").unwrap();
    let mut engine = Engine::new(Config::default().with_base_dir(dir.path()));
    let out = eval(&mut engine, "(require \"bad.fl\")");
    assert!(out.starts_with("Syntax error in evaluated code: "), "{}", out);
}

#[test]
fn exhausting_the_heap_is_an_error() {
    let code = "
        (define alloc (lambda (n) (if (= n 0) 0 (let ((r (ref n))) (alloc (- n 1))))))
        (alloc 65537)
    ";
    assert_eq!(eval(&mut Engine::default(), code), "<Error: Out of memory>");
}

#[test]
fn freed_slots_are_reused_only_when_configured() {
    let code = "
        (define churn (lambda (n)
            (if (= n 0) 0 (let ((_ (free (ref n)))) (churn (- n 1))))))
        (churn 10)
    ";
    let config = Config::default().with_heap_capacity(4);
    assert_eq!(eval(&mut Engine::new(config.clone()), code), "<Error: Out of memory>");

    let mut engine = Engine::new(config.with_alloc_policy(AllocPolicy::ReuseFreed));
    assert_eq!(eval(&mut engine, code), "0");
    assert_eq!(engine.interpreter().heap().borrow().stats().live, 0);
}

#[test]
fn arrays_outlive_their_engine() {
    let mut engine = Engine::default();
    let array = engine
        .execute("(define a (array 2 2)) (define r (ref a)) (assign a 2 1 7)")
        .unwrap();
    let heap = Rc::downgrade(engine.interpreter().heap());
    drop(engine);

    assert_eq!(array.to_string(), "[[0 0]\n[7 0]]");
    assert!(heap.upgrade().is_some());
    drop(array);
    assert!(heap.upgrade().is_none());
}

#[test]
fn long_lists_survive_teardown() {
    let mut engine = Engine::default();
    let code = "
        (define range (lambda (lo hi) (if (> lo hi) (list) (cons lo (range (+ lo 1) hi)))))
        (define l (range 1 60000))
        (= l (range 1 60000))
    ";
    assert_eq!(eval(&mut engine, code), "#t");
    drop(engine);
}
