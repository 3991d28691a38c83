use approx::assert_abs_diff_eq;
use scalargrad::{Tape, TapeTerm};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct Neuron<'a> {
    x1: TapeTerm<'a>,
    x2: TapeTerm<'a>,
    w1: TapeTerm<'a>,
    w2: TapeTerm<'a>,
    b: TapeTerm<'a>,
    n: TapeTerm<'a>,
    o: TapeTerm<'a>,
}

fn build_neuron(tape: &Tape) -> Neuron {
    let x1 = tape.term("x1", 2.);
    let x2 = tape.term("x2", 0.);
    let w1 = tape.term("w1", -3.);
    let w2 = tape.term("w2", 1.);
    let b = tape.term("b", 6.8813735870195432);
    let x1w1 = (x1 * w1).named("x1*w1");
    let x2w2 = (x2 * w2).named("x2*w2");
    let x1w1x2w2 = (x1w1 + x2w2).named("x1*w1 + x2*w2");
    let n = (x1w1x2w2 + b).named("n");
    let o = n.tanh().named("o");
    Neuron {
        x1,
        x2,
        w1,
        w2,
        b,
        n,
        o,
    }
}

#[test]
fn tanh_neuron_gradients() {
    init_logger();
    let tape = Tape::new();
    let Neuron {
        x1,
        x2,
        w1,
        w2,
        b,
        n,
        o,
    } = build_neuron(&tape);

    assert_abs_diff_eq!(o.data(), 0.7071, epsilon = 1e-4);
    o.backprop();
    assert_eq!(o.grad(), 1.);
    assert_abs_diff_eq!(n.grad(), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(b.grad(), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(x1.grad(), -1.5, epsilon = 1e-4);
    assert_abs_diff_eq!(w1.grad(), 1.0, epsilon = 1e-4);
    assert_abs_diff_eq!(x2.grad(), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(w2.grad(), 0.0, epsilon = 1e-4);
}

#[test]
fn neuron_via_exp() {
    // tanh(n) = (e^2n - 1) / (e^2n + 1), built from primitives
    let tape = Tape::new();
    let Neuron { x1, w1, n, .. } = build_neuron(&tape);
    let two = tape.constant(2.);
    let one = tape.constant(1.);
    let e = (two * n).exp();
    let o = (e - one) / (e + one);

    assert_abs_diff_eq!(o.data(), n.data().tanh(), epsilon = 1e-12);
    o.backprop();
    assert_abs_diff_eq!(n.grad(), 0.5, epsilon = 1e-4);
    assert_abs_diff_eq!(x1.grad(), -1.5, epsilon = 1e-4);
    assert_abs_diff_eq!(w1.grad(), 1.0, epsilon = 1e-4);
}

#[test]
fn backprop_twice_accumulates() {
    init_logger();
    let tape = Tape::new();
    let a = tape.term("a", 2.);
    let b = tape.term("b", -4.);
    let c = a * b;

    c.backprop();
    assert_eq!((a.grad(), b.grad()), (-4., 2.));

    c.backprop();
    assert_eq!(c.grad(), 1.);
    assert_eq!((a.grad(), b.grad()), (-8., 4.));

    c.zero_grad();
    assert_eq!((a.grad(), b.grad(), c.grad()), (0., 0., 0.));
    c.backprop();
    assert_eq!((a.grad(), b.grad()), (-4., 2.));
}

#[test]
fn reset_restores_deep_graph() {
    let tape = Tape::new();
    let Neuron { x1, w1, n, o, .. } = build_neuron(&tape);

    o.backprop();
    let first = (x1.grad(), w1.grad(), n.grad());
    o.backprop();
    assert_ne!((x1.grad(), w1.grad(), n.grad()), first);

    o.zero_grad();
    for term in o.topo_sort() {
        assert_eq!(term.grad(), 0., "{term:?} not cleared");
    }
    o.backprop();
    assert_eq!((x1.grad(), w1.grad(), n.grad()), first);
}

#[test]
fn neuron_diagram() {
    let tape = Tape::new();
    let Neuron { o, .. } = build_neuron(&tape);
    o.backprop();
    let dot = o.dot_builder().to_string();
    let lines: Vec<_> = dot.lines().collect();

    assert_eq!(lines.first(), Some(&"digraph {"));
    assert_eq!(lines.get(1), Some(&"\trankdir=LR"));
    assert_eq!(lines.last(), Some(&"}"));
    assert!(dot.contains("[label=\"o | data 0.7071 | grad 1.0000\", shape=record]"));
    assert!(dot.contains("[label=\"x1 | data 2.0000 | grad -1.5000\", shape=record]"));
    assert!(dot.contains("[label=\"w1 | data -3.0000 | grad 1.0000\", shape=record]"));
    // 10 value records, 5 operators, 5 op->value edges, 9 operand edges
    assert_eq!(lines.iter().filter(|l| l.contains("shape=record")).count(), 10);
    assert_eq!(
        lines
            .iter()
            .filter(|l| l.contains("_op\" [label="))
            .count(),
        5
    );
    assert_eq!(lines.iter().filter(|l| l.contains(" -> ")).count(), 14);
}
