//! End-to-end evaluator tests: programs built through the node arena and
//! executed against a fresh runtime.

use tally_runtime::{
    BinOp, Date, ErrorKind, Money, Runtime, RuntimeOptions, TriggerEvent, UnOp, Value,
};

fn runtime() -> Runtime {
    Runtime::new(RuntimeOptions::default())
}

#[test]
fn test_arithmetic_expression() {
    let mut rt = runtime();
    // (2 + 3) * 4
    let two = rt.ast_mut().number(2.0);
    let three = rt.ast_mut().number(3.0);
    let sum = rt.ast_mut().binary(BinOp::Add, two, three);
    let four = rt.ast_mut().number(4.0);
    let product = rt.ast_mut().binary(BinOp::Mul, sum, four);
    let result = rt.execute(product).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(20.0));
}

#[test]
fn test_money_arithmetic_program() {
    let mut rt = runtime();
    // @"$123.45" + @"$10.00" + 1.5
    let a = rt.ast_mut().money(Money::from_units(123, 45, "USD"));
    let b = rt.ast_mut().money(Money::from_units(10, 0, "USD"));
    let ab = rt.ast_mut().binary(BinOp::Add, a, b);
    let n = rt.ast_mut().number(1.5);
    let total = rt.ast_mut().binary(BinOp::Add, ab, n);
    let result = rt.execute(total).unwrap();
    match rt.store().get(result) {
        Value::Money(m) => {
            assert_eq!(m.amount, 1_349_500);
            assert_eq!(m.currency, "USD");
        }
        other => panic!("expected money, got {:?}", other),
    }
}

#[test]
fn test_date_arithmetic_scenarios() {
    // Month boundary.
    let d = Date::new(2024, 3, 30).unwrap();
    assert_eq!(d.add_days(3), Date::new(2024, 4, 2).unwrap());
    // Leap year.
    let d = Date::new(2024, 2, 28).unwrap();
    assert_eq!(d.add_days(1), Date::new(2024, 2, 29).unwrap());
    assert_eq!(d.add_days(2), Date::new(2024, 3, 1).unwrap());
}

#[test]
fn test_variable_declaration_and_assignment() {
    let mut rt = runtime();
    // { var x = 1; x = x + 2; x }
    let one = rt.ast_mut().number(1.0);
    let decl = rt.ast_mut().var_decl("x", Some(one));
    let x1 = rt.ast_mut().ident("x");
    let two = rt.ast_mut().number(2.0);
    let sum = rt.ast_mut().binary(BinOp::Add, x1, two);
    let x2 = rt.ast_mut().ident("x");
    let assign = rt.ast_mut().assign(x2, sum);
    let x3 = rt.ast_mut().ident("x");
    let block = rt.ast_mut().block(vec![decl, assign, x3]);
    let result = rt.execute(block).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(3.0));
}

#[test]
fn test_assignment_to_undefined_name_defines_it() {
    let mut rt = runtime();
    // x = 7  (no declaration)
    let x = rt.ast_mut().ident("x");
    let seven = rt.ast_mut().number(7.0);
    let assign = rt.ast_mut().assign(x, seven);
    rt.execute(assign).unwrap();
    let x = rt.lookup("x").expect("x defined by assignment");
    assert_eq!(rt.store().get(x), &Value::Number(7.0));
}

#[test]
fn test_block_value_and_empty_block() {
    let mut rt = runtime();
    let a = rt.ast_mut().number(1.0);
    let b = rt.ast_mut().number(2.0);
    let block = rt.ast_mut().block(vec![a, b]);
    let result = rt.execute(block).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(2.0));

    let empty = rt.ast_mut().block(vec![]);
    let result = rt.execute(empty).unwrap();
    assert_eq!(rt.store().get(result), &Value::Nil);
}

#[test]
fn test_if_else_branches() {
    let mut rt = runtime();
    let t = rt.ast_mut().boolean(true);
    let one = rt.ast_mut().number(1.0);
    let two = rt.ast_mut().number(2.0);
    let picked = rt.ast_mut().if_else(t, one, Some(two));
    let result = rt.execute(picked).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(1.0));

    // Missing else evaluates to nil.
    let f = rt.ast_mut().boolean(false);
    let one = rt.ast_mut().number(1.0);
    let picked = rt.ast_mut().if_else(f, one, None);
    let result = rt.execute(picked).unwrap();
    assert_eq!(rt.store().get(result), &Value::Nil);
}

#[test]
fn test_non_boolean_condition_is_type_mismatch() {
    let mut rt = runtime();
    let n = rt.ast_mut().number(1.0);
    let body = rt.ast_mut().nil();
    let bad = rt.ast_mut().if_else(n, body, None);
    let err = rt.execute(bad).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn test_while_loop_counts_down() {
    let mut rt = runtime();
    // var n = 5; while (n > 0) { n = n - 1 }; n
    let five = rt.ast_mut().number(5.0);
    let decl = rt.ast_mut().var_decl("n", Some(five));
    let n1 = rt.ast_mut().ident("n");
    let zero = rt.ast_mut().number(0.0);
    let cond = rt.ast_mut().binary(BinOp::Gt, n1, zero);
    let n2 = rt.ast_mut().ident("n");
    let one = rt.ast_mut().number(1.0);
    let less = rt.ast_mut().binary(BinOp::Sub, n2, one);
    let n3 = rt.ast_mut().ident("n");
    let step = rt.ast_mut().assign(n3, less);
    let body = rt.ast_mut().block(vec![step]);
    let while_loop = rt.ast_mut().while_loop(cond, body);
    let n4 = rt.ast_mut().ident("n");
    let program = rt.ast_mut().block(vec![decl, while_loop, n4]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(0.0));
}

#[test]
fn test_function_definition_call_and_return() {
    let mut rt = runtime();
    // function add(a, b) { return a + b }; add(2, 3)
    let a = rt.ast_mut().ident("a");
    let b = rt.ast_mut().ident("b");
    let sum = rt.ast_mut().binary(BinOp::Add, a, b);
    let ret = rt.ast_mut().ret(Some(sum));
    let body = rt.ast_mut().block(vec![ret]);
    let def = rt
        .ast_mut()
        .function_def("add", vec!["a".into(), "b".into()], body);

    let callee = rt.ast_mut().ident("add");
    let two = rt.ast_mut().number(2.0);
    let three = rt.ast_mut().number(3.0);
    let call = rt.ast_mut().call(callee, vec![two, three]);
    let program = rt.ast_mut().block(vec![def, call]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(5.0));
}

#[test]
fn test_function_body_value_without_return() {
    let mut rt = runtime();
    // function f() { 42 }; f()
    let n = rt.ast_mut().number(42.0);
    let body = rt.ast_mut().block(vec![n]);
    let def = rt.ast_mut().function_def("f", vec![], body);
    let callee = rt.ast_mut().ident("f");
    let call = rt.ast_mut().call(callee, vec![]);
    let program = rt.ast_mut().block(vec![def, call]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(42.0));
}

#[test]
fn test_closure_captures_defining_scope() {
    let mut rt = runtime();
    // var base = 10; function bump(n) { return base + n }; bump(5)
    let ten = rt.ast_mut().number(10.0);
    let decl = rt.ast_mut().var_decl("base", Some(ten));
    let base = rt.ast_mut().ident("base");
    let n = rt.ast_mut().ident("n");
    let sum = rt.ast_mut().binary(BinOp::Add, base, n);
    let ret = rt.ast_mut().ret(Some(sum));
    let body = rt.ast_mut().block(vec![ret]);
    let def = rt.ast_mut().function_def("bump", vec!["n".into()], body);
    let callee = rt.ast_mut().ident("bump");
    let five = rt.ast_mut().number(5.0);
    let call = rt.ast_mut().call(callee, vec![five]);
    let program = rt.ast_mut().block(vec![decl, def, call]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(15.0));
}

#[test]
fn test_call_errors() {
    let mut rt = runtime();
    // Arity mismatch.
    let body = rt.ast_mut().nil();
    let def = rt.ast_mut().function_def("one", vec!["a".into()], body);
    rt.execute(def).unwrap();
    let callee = rt.ast_mut().ident("one");
    let call = rt.ast_mut().call(callee, vec![]);
    let err = rt.execute(call).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ArgumentMismatch);

    // Calling a non-function.
    let n = rt.ast_mut().number(3.0);
    let call = rt.ast_mut().call(n, vec![]);
    let err = rt.execute(call).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidCallTarget);
}

#[test]
fn test_undefined_name_error() {
    let mut rt = runtime();
    let ghost = rt.ast_mut().ident("ghost");
    let err = rt.execute(ghost).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UndefinedName);
}

#[test]
fn test_division_by_zero_surfaces() {
    let mut rt = runtime();
    let one = rt.ast_mut().number(1.0);
    let zero = rt.ast_mut().number(0.0);
    let div = rt.ast_mut().binary(BinOp::Div, one, zero);
    let err = rt.execute(div).unwrap_err();
    assert_eq!(err.kind, ErrorKind::DivisionByZero);
}

#[test]
fn test_list_literal_index_read_and_write() {
    let mut rt = runtime();
    // var items = [10, 20, 30]; items[1] = 25; items[1]
    let a = rt.ast_mut().number(10.0);
    let b = rt.ast_mut().number(20.0);
    let c = rt.ast_mut().number(30.0);
    let lit = rt.ast_mut().list(vec![a, b, c]);
    let decl = rt.ast_mut().var_decl("items", Some(lit));

    let items1 = rt.ast_mut().ident("items");
    let one1 = rt.ast_mut().number(1.0);
    let target = rt.ast_mut().index(items1, one1);
    let new = rt.ast_mut().number(25.0);
    let write = rt.ast_mut().assign(target, new);

    let items2 = rt.ast_mut().ident("items");
    let one2 = rt.ast_mut().number(1.0);
    let read = rt.ast_mut().index(items2, one2);

    let program = rt.ast_mut().block(vec![decl, write, read]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(25.0));
}

#[test]
fn test_index_out_of_range() {
    let mut rt = runtime();
    let a = rt.ast_mut().number(1.0);
    let lit = rt.ast_mut().list(vec![a]);
    let nine = rt.ast_mut().number(9.0);
    let read = rt.ast_mut().index(lit, nine);
    let err = rt.execute(read).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexOutOfRange);
}

#[test]
fn test_negative_and_fractional_indexes_are_out_of_range() {
    let mut rt = runtime();
    let a = rt.ast_mut().number(1.0);
    let lit = rt.ast_mut().list(vec![a]);
    let minus_one = rt.ast_mut().number(-1.0);
    let read = rt.ast_mut().index(lit, minus_one);
    let err = rt.execute(read).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexOutOfRange);

    let b = rt.ast_mut().number(1.0);
    let lit = rt.ast_mut().list(vec![b]);
    let half = rt.ast_mut().number(0.5);
    let read = rt.ast_mut().index(lit, half);
    let err = rt.execute(read).unwrap_err();
    assert_eq!(err.kind, ErrorKind::IndexOutOfRange);
}

#[test]
fn test_non_number_index_is_type_mismatch() {
    let mut rt = runtime();
    let a = rt.ast_mut().number(1.0);
    let lit = rt.ast_mut().list(vec![a]);
    let key = rt.ast_mut().text("first");
    let read = rt.ast_mut().index(lit, key);
    let err = rt.execute(read).unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeMismatch);
}

#[test]
fn test_text_index_yields_single_character() {
    let mut rt = runtime();
    let t = rt.ast_mut().text("abc");
    let one = rt.ast_mut().number(1.0);
    let read = rt.ast_mut().index(t, one);
    let result = rt.execute(read).unwrap();
    assert_eq!(rt.store().get(result), &Value::Text("b".into()));
}

#[test]
fn test_record_literal_and_member_access() {
    let mut rt = runtime();
    // var order = { total: 99, open: true }; order.total
    let total = rt.ast_mut().number(99.0);
    let open = rt.ast_mut().boolean(true);
    let lit = rt
        .ast_mut()
        .record(vec!["total".into(), "open".into()], vec![total, open]);
    let decl = rt.ast_mut().var_decl("order", Some(lit));
    let order = rt.ast_mut().ident("order");
    let read = rt.ast_mut().member(order, "total");
    let program = rt.ast_mut().block(vec![decl, read]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(99.0));
}

#[test]
fn test_record_inheritance_and_deep_copy_independence() {
    let mut rt = runtime();

    // Record P with name = "Generic Person"; record E with parent P.
    let generic = rt.store_mut().text("Generic Person").unwrap();
    let p = rt.store_mut().record(None).unwrap();
    match rt.store_mut().get_mut(p) {
        Value::Record(data) => {
            data.set("name", generic);
        }
        _ => unreachable!(),
    }
    let job = rt.store_mut().text("Engineer").unwrap();
    let e = rt.store_mut().record(Some(p)).unwrap();
    match rt.store_mut().get_mut(e) {
        Value::Record(data) => {
            data.set("job", job);
        }
        _ => unreachable!(),
    }
    rt.define("p", p).unwrap();
    rt.define("e", e).unwrap();

    // E.name resolves through the parent.
    let e_ident = rt.ast_mut().ident("e");
    let e_name = rt.ast_mut().member(e_ident, "name");
    let result = rt.execute(e_name).unwrap();
    assert_eq!(rt.store().get(result), &Value::Text("Generic Person".into()));

    // Deep-copy E, then change P.name.
    let e_copy = rt.store_mut().deep_copy(e).unwrap();
    rt.define("e2", e_copy).unwrap();
    let p_ident = rt.ast_mut().ident("p");
    let p_name = rt.ast_mut().member(p_ident, "name");
    let changed = rt.ast_mut().text("Changed");
    let write = rt.ast_mut().assign(p_name, changed);
    rt.execute(write).unwrap();

    // The original inherits the change; the copy does not.
    let e_ident = rt.ast_mut().ident("e");
    let e_name = rt.ast_mut().member(e_ident, "name");
    let result = rt.execute(e_name).unwrap();
    assert_eq!(rt.store().get(result), &Value::Text("Changed".into()));

    let e2_ident = rt.ast_mut().ident("e2");
    let e2_name = rt.ast_mut().member(e2_ident, "name");
    let result = rt.execute(e2_name).unwrap();
    assert_eq!(rt.store().get(result), &Value::Text("Generic Person".into()));
}

#[test]
fn test_member_write_stays_local_to_child() {
    let mut rt = runtime();
    let name = rt.store_mut().text("parent-name").unwrap();
    let p = rt.store_mut().record(None).unwrap();
    match rt.store_mut().get_mut(p) {
        Value::Record(data) => {
            data.set("name", name);
        }
        _ => unreachable!(),
    }
    let child = rt.store_mut().record(Some(p)).unwrap();
    rt.define("child", child).unwrap();

    // child.name = "own" writes the child, not the parent.
    let c = rt.ast_mut().ident("child");
    let target = rt.ast_mut().member(c, "name");
    let own = rt.ast_mut().text("own");
    let write = rt.ast_mut().assign(target, own);
    rt.execute(write).unwrap();

    assert_eq!(
        rt.store().get(rt.store().record_lookup(p, "name").unwrap()),
        &Value::Text("parent-name".into())
    );
    assert_eq!(
        rt.store().get(rt.store().record_lookup(child, "name").unwrap()),
        &Value::Text("own".into())
    );
}

#[test]
fn test_for_in_iterates_list() {
    let mut rt = runtime();
    // var sum = 0; for item in [1, 2, 3] { sum = sum + item }; sum
    let zero = rt.ast_mut().number(0.0);
    let decl = rt.ast_mut().var_decl("sum", Some(zero));
    let a = rt.ast_mut().number(1.0);
    let b = rt.ast_mut().number(2.0);
    let c = rt.ast_mut().number(3.0);
    let list = rt.ast_mut().list(vec![a, b, c]);
    let sum1 = rt.ast_mut().ident("sum");
    let item = rt.ast_mut().ident("item");
    let add = rt.ast_mut().binary(BinOp::Add, sum1, item);
    let sum2 = rt.ast_mut().ident("sum");
    let step = rt.ast_mut().assign(sum2, add);
    let body = rt.ast_mut().block(vec![step]);
    let for_in = rt.ast_mut().push(
        tally_runtime::Node::ForIn {
            name: "item".into(),
            iterable: list,
            body,
        },
        tally_runtime::SourcePos::synthetic(),
    );
    let sum3 = rt.ast_mut().ident("sum");
    let program = rt.ast_mut().block(vec![decl, for_in, sum3]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(6.0));
}

#[test]
fn test_for_loop_with_init_condition_update() {
    let mut rt = runtime();
    // var total = 0; for (var i = 0; i < 4; i = i + 1) { total = total + i }; total
    let zero = rt.ast_mut().number(0.0);
    let total_decl = rt.ast_mut().var_decl("total", Some(zero));

    let zero2 = rt.ast_mut().number(0.0);
    let init = rt.ast_mut().var_decl("i", Some(zero2));
    let i1 = rt.ast_mut().ident("i");
    let four = rt.ast_mut().number(4.0);
    let cond = rt.ast_mut().binary(BinOp::Lt, i1, four);
    let i2 = rt.ast_mut().ident("i");
    let one = rt.ast_mut().number(1.0);
    let plus = rt.ast_mut().binary(BinOp::Add, i2, one);
    let i3 = rt.ast_mut().ident("i");
    let update = rt.ast_mut().assign(i3, plus);

    let t1 = rt.ast_mut().ident("total");
    let i4 = rt.ast_mut().ident("i");
    let add = rt.ast_mut().binary(BinOp::Add, t1, i4);
    let t2 = rt.ast_mut().ident("total");
    let step = rt.ast_mut().assign(t2, add);
    let body = rt.ast_mut().block(vec![step]);

    let for_loop = rt.ast_mut().push(
        tally_runtime::Node::For {
            init: Some(init),
            condition: Some(cond),
            update: Some(update),
            body,
        },
        tally_runtime::SourcePos::synthetic(),
    );
    let t3 = rt.ast_mut().ident("total");
    let program = rt.ast_mut().block(vec![total_decl, for_loop, t3]);
    let result = rt.execute(program).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(6.0));
}

#[test]
fn test_short_circuit_evaluation() {
    let mut rt = runtime();
    // false and (1 / 0 == 1) - the division never runs.
    let f = rt.ast_mut().boolean(false);
    let one = rt.ast_mut().number(1.0);
    let zero = rt.ast_mut().number(0.0);
    let div = rt.ast_mut().binary(BinOp::Div, one, zero);
    let one2 = rt.ast_mut().number(1.0);
    let eq = rt.ast_mut().binary(BinOp::Eq, div, one2);
    let and = rt.ast_mut().binary(BinOp::And, f, eq);
    let result = rt.execute(and).unwrap();
    assert_eq!(rt.store().get(result), &Value::Boolean(false));
}

#[test]
fn test_unary_operators() {
    let mut rt = runtime();
    let five = rt.ast_mut().number(5.0);
    let neg = rt.ast_mut().unary(UnOp::Neg, five);
    let result = rt.execute(neg).unwrap();
    assert_eq!(rt.store().get(result), &Value::Number(-5.0));

    let t = rt.ast_mut().boolean(true);
    let not = rt.ast_mut().unary(UnOp::Not, t);
    let result = rt.execute(not).unwrap();
    assert_eq!(rt.store().get(result), &Value::Boolean(false));
}

#[test]
fn test_comparisons_across_kinds() {
    let mut rt = runtime();
    // 2 < $3.00 on the shared real axis.
    let two = rt.ast_mut().number(2.0);
    let money = rt.ast_mut().money(Money::from_units(3, 0, "USD"));
    let lt = rt.ast_mut().binary(BinOp::Lt, two, money);
    let result = rt.execute(lt).unwrap();
    assert_eq!(rt.store().get(result), &Value::Boolean(true));
}

#[test]
fn test_invalid_assignment_target() {
    let mut rt = runtime();
    let one = rt.ast_mut().number(1.0);
    let two = rt.ast_mut().number(2.0);
    let sum = rt.ast_mut().binary(BinOp::Add, one, two);
    let nine = rt.ast_mut().number(9.0);
    let bad = rt.ast_mut().assign(sum, nine);
    let err = rt.execute(bad).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidAssignmentTarget);
}

#[test]
fn test_trigger_and_constraint_values_are_first_class() {
    let mut rt = runtime();
    let cond = rt.ast_mut().boolean(true);
    let action = rt.ast_mut().nil();
    let trigger = rt
        .store_mut()
        .trigger("t", TriggerEvent::DataChanged, cond, action)
        .unwrap();
    assert_eq!(rt.display(trigger), "<trigger t>");

    let constraint = rt.store_mut().constraint("c", cond, None).unwrap();
    assert_eq!(rt.display(constraint), "<constraint c>");
}
