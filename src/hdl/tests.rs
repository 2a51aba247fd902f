use super::primitive::{FP_ACTIVATION_RELU, FP_ADDER, FP_MULTIPLY_BY_POWER_OF_2, FP_SUM};
use super::*;
use crate::error::ErrorKind;
use crate::float::FloatFormat;

fn params() -> Vec<(String, ParamValue)> {
    FloatFormat::BINARY16.base_params()
}

fn adder2() -> (Module, SignalId, SignalId, SignalId) {
    let mut m = Module::new("adder2").unwrap();
    let a = m.add_input("a", 16, None).unwrap();
    let b = m.add_input("b", 16, None).unwrap();
    let y = m.add_output("y", 16, None).unwrap();
    let sum = m.add_signal(16, Some("sum"), None);
    m.add_instance(
        &FP_ADDER,
        vec![
            ("argumenta", a.into()),
            ("argumentb", b.into()),
            ("out", sum.into()),
        ],
        params(),
    )
    .unwrap();
    m.add_assignment(y, sum.into()).unwrap();
    (m, a, b, y)
}

// ─── Rendering ─────────────────────────────────────────────────────

#[test]
fn test_render_adder() {
    let (m, ..) = adder2();
    insta::assert_snapshot!(m.render(), @r"
    module adder2(a, b, y);
        input [15:0] a;
        input [15:0] b;
        output [15:0] y;
        wire [15:0] w_0_sum;
        fp_adder #(.floatsize(16), .exponentsize(5)) inst_0_fp_adder(
            .argumenta(a),
            .argumentb(b),
            .out(w_0_sum)
        );
        assign y = w_0_sum;
    endmodule
    ");
}

#[test]
fn test_render_declarations_and_expressions() {
    let mut m = Module::new("decls").unwrap();
    let bus = m.add_input("bus", 16, Some(3)).unwrap();
    let flag = m.add_output("flag", 1, None).unwrap();
    let packed = m.add_signal(16, Some("packed"), Some(2));
    let x = m.add_signal(16, None, None);
    m.add_assignment(x, Expression::index(bus, 2)).unwrap();
    m.add_assignment(
        packed,
        Expression::Concat(vec![x.into(), Literal::padded_hex(0x3c00, 4).into()]),
    )
    .unwrap();
    m.add_assignment(flag, Literal::decimal(1).into()).unwrap();

    let text = m.render();
    assert!(text.contains("    input [15:0] bus [3];\n"));
    assert!(text.contains("    output flag;\n"));
    assert!(text.contains("    wire [15:0] w_0_packed [2];\n"));
    assert!(text.contains("    wire [15:0] w_1;\n"));
    assert!(text.contains("    assign w_1 = bus[2];\n"));
    assert!(text.contains("    assign w_0_packed = '{w_1, 'h3c00};\n"));
    assert!(text.contains("    assign flag = 'd1;\n"));
    assert!(text.ends_with("endmodule\n"));
}

#[test]
fn test_render_invalid_banner() {
    let (m, ..) = adder2();
    let text = m.render_invalid("lowering failed\nsecond line");
    assert!(text.starts_with(
        "// INVALID: lowering failed\n// INVALID: second line\nmodule adder2("
    ));
}

#[test]
fn test_render_is_deterministic() {
    let (m, ..) = adder2();
    assert_eq!(m.render(), m.render());
}

// ─── Construction rules ────────────────────────────────────────────

#[test]
fn test_generated_names_are_unique() {
    let mut m = Module::new("names").unwrap();
    m.add_input("w_1", 16, None).unwrap();
    let a = m.add_signal(16, None, None);
    let b = m.add_signal(16, None, None);
    assert_eq!(m.signal(a).unwrap().name, "w_0");
    // w_1 is taken by the input port
    assert_eq!(m.signal(b).unwrap().name, "w_2");
}

#[test]
fn test_instance_names_skip_declared_ports() {
    let mut m = Module::new("names").unwrap();
    let x = m.add_input("inst_0_fp_activation_relu", 16, None).unwrap();
    let y = m.add_output("y", 16, None).unwrap();
    let relu = m
        .add_instance(
            &FP_ACTIVATION_RELU,
            vec![("argumenta", x.into()), ("out", y.into())],
            params(),
        )
        .unwrap();
    assert_eq!(m.instance(relu).unwrap().name, "inst_1_fp_activation_relu");
    assert!(m.check().is_ok());

    let text = m.render();
    assert!(text.contains("input [15:0] inst_0_fp_activation_relu;"));
    assert!(text.contains(") inst_1_fp_activation_relu("));
    assert!(!text.contains(") inst_0_fp_activation_relu("));
}

#[test]
fn test_duplicate_and_invalid_identifiers() {
    let mut m = Module::new("dups").unwrap();
    m.add_input("x", 16, None).unwrap();
    assert!(matches!(
        m.add_output("x", 16, None),
        Err(Error::DuplicateIdentifier(_))
    ));
    assert!(matches!(
        m.add_input("2bad", 16, None),
        Err(Error::InvalidIdentifier(_))
    ));
    assert!(Module::new("has space").is_err());
}

#[test]
fn test_foreign_signal_rejected_without_mutation() {
    let mut m1 = Module::new("first").unwrap();
    let mut m2 = Module::new("second").unwrap();
    let foreign = m1.add_signal(16, None, None);
    let local = m2.add_signal(16, None, None);

    let err = m2
        .add_instance(
            &FP_ACTIVATION_RELU,
            vec![("argumenta", foreign.into()), ("out", local.into())],
            params(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GenerationInvariant);
    assert!(m2.instances().is_empty());

    let err = m2.add_assignment(local, foreign.into()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GenerationInvariant);
    assert!(m2.assignments().is_empty());
    assert!(m2.signal(foreign).is_none());
}

#[test]
fn test_port_contract_enforced() {
    let mut m = Module::new("ports").unwrap();
    let a = m.add_input("a", 16, None).unwrap();
    let out = m.add_signal(16, None, None);

    let missing = m.add_instance(
        &FP_ADDER,
        vec![("argumenta", a.into()), ("out", out.into())],
        params(),
    );
    assert!(matches!(missing, Err(Error::PortMismatch { .. })));

    let unknown = m.add_instance(
        &FP_ACTIVATION_RELU,
        vec![("argumenta", a.into()), ("out", out.into()), ("carry", a.into())],
        params(),
    );
    assert!(matches!(unknown, Err(Error::PortMismatch { .. })));

    let literal_out = m.add_instance(
        &FP_ACTIVATION_RELU,
        vec![("argumenta", a.into()), ("out", Literal::hex(0).into())],
        params(),
    );
    assert!(matches!(literal_out, Err(Error::PortMismatch { .. })));

    let mut bad_params = params();
    bad_params.push(("power".to_string(), ParamValue::Int(1)));
    let bad = m.add_instance(
        &FP_ACTIVATION_RELU,
        vec![("argumenta", a.into()), ("out", out.into())],
        bad_params,
    );
    assert!(matches!(bad, Err(Error::PortMismatch { .. })));
    assert!(m.instances().is_empty());
}

// ─── Structural check ──────────────────────────────────────────────

#[test]
fn test_check_accepts_well_formed_module() {
    let (m, ..) = adder2();
    assert!(m.check().is_ok());
}

#[test]
fn test_check_reports_undriven_and_multiply_driven() {
    let mut m = Module::new("broken").unwrap();
    let a = m.add_input("a", 16, None).unwrap();
    let y = m.add_output("y", 16, None).unwrap();
    let floating = m.add_signal(16, Some("floating"), None);
    m.add_assignment(y, a.into()).unwrap();
    m.add_assignment(y, floating.into()).unwrap();
    m.add_assignment(a, Literal::hex(0).into()).unwrap();

    let errors = m.check().unwrap_err();
    let text: Vec<String> = errors.iter().map(|d| d.message.clone()).collect();
    assert!(text.iter().any(|t| t.contains("input 'a' is driven")));
    assert!(text.iter().any(|t| t.contains("'y' has 2 drivers")));
    assert!(text.iter().any(|t| t.contains("'w_0_floating' is never driven")));
    assert!(errors.iter().all(|d| d.is_error()));
}

#[test]
fn test_check_detects_loop() {
    let mut m = Module::new("looped").unwrap();
    let x = m.add_signal(16, None, None);
    let y = m.add_signal(16, None, None);
    m.add_instance(
        &FP_ACTIVATION_RELU,
        vec![("argumenta", x.into()), ("out", y.into())],
        params(),
    )
    .unwrap();
    m.add_assignment(x, y.into()).unwrap();
    let errors = m.check().unwrap_err();
    assert!(errors[0].message.contains("combinational loop"));
}

// ─── Simulation ────────────────────────────────────────────────────

#[test]
fn test_simulate_adder() {
    let (m, a, b, y) = adder2();
    let state = NetlistSim::new(&m, FloatFormat::BINARY16)
        .run(&[(a, Value::Scalar(1.5)), (b, Value::Scalar(-4.0))])
        .unwrap();
    assert_eq!(state.scalar(y), Some(-2.5));
}

#[test]
fn test_simulate_shift_and_sum() {
    let mut m = Module::new("shifts").unwrap();
    let a = m.add_input("a", 16, None).unwrap();
    let y = m.add_output("y", 16, None).unwrap();
    let half = m.add_signal(16, None, None);
    let neg = m.add_signal(16, None, None);
    let bus = m.add_signal(16, None, Some(3));
    let sum = m.add_signal(16, None, None);

    let mut shift = |out: SignalId, power: i64, negate: i64| {
        let mut p = params();
        p.push(("power".to_string(), ParamValue::Int(power)));
        p.push(("negate".to_string(), ParamValue::Int(negate)));
        m.add_instance(
            &FP_MULTIPLY_BY_POWER_OF_2,
            vec![("argumenta", a.into()), ("out", out.into())],
            p,
        )
        .unwrap();
    };
    shift(half, -1, 0);
    shift(neg, 2, 1);

    m.add_assignment(
        bus,
        Expression::Concat(vec![
            half.into(),
            neg.into(),
            FloatFormat::BINARY16.literal(0.25).into(),
        ]),
    )
    .unwrap();
    let mut p = params();
    p.push(("inputcount".to_string(), ParamValue::Int(3)));
    m.add_instance(
        &FP_SUM,
        vec![("argument_array", bus.into()), ("out", sum.into())],
        p,
    )
    .unwrap();
    m.add_assignment(y, sum.into()).unwrap();
    assert!(m.check().is_ok());

    let state = NetlistSim::new(&m, FloatFormat::BINARY16)
        .run(&[(a, Value::Scalar(2.0))])
        .unwrap();
    // 2/2 - 2*4 + 0.25
    assert_eq!(state.scalar(y), Some(-6.75));
    assert_eq!(state.get(bus), Some(&Value::Array(vec![1.0, -8.0, 0.25])));
}

#[test]
fn test_simulate_requires_every_input() {
    let (m, a, _, _) = adder2();
    let err = NetlistSim::new(&m, FloatFormat::BINARY16)
        .run(&[(a, Value::Scalar(1.0))])
        .unwrap_err();
    assert!(matches!(err, Error::Simulation(_)));
}

#[test]
fn test_simulate_rejects_uncatalogued_primitives() {
    static HALF_ADDER: Primitive = Primitive {
        name: "fp_adder",
        ports: &[
            ("argumenta", PortDirection::Input),
            ("out", PortDirection::Output),
        ],
        params: &["floatsize", "exponentsize"],
    };
    static DIVIDER: Primitive = Primitive {
        name: "fp_divider",
        ports: &[
            ("argumenta", PortDirection::Input),
            ("out", PortDirection::Output),
        ],
        params: &[],
    };

    for (prim, p) in [(&HALF_ADDER, params()), (&DIVIDER, Vec::new())] {
        let mut m = Module::new("custom").unwrap();
        let a = m.add_input("a", 16, None).unwrap();
        let y = m.add_output("y", 16, None).unwrap();
        m.add_instance(prim, vec![("argumenta", a.into()), ("out", y.into())], p)
            .unwrap();
        assert!(m.check().is_ok());

        let err = NetlistSim::new(&m, FloatFormat::BINARY16)
            .run(&[(a, Value::Scalar(1.0))])
            .unwrap_err();
        assert!(err.to_string().contains("no simulation model"), "{}", err);
    }
}
