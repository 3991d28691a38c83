//! A single tanh neuron. Prints the graph in graphviz format, e.g.
//! `cargo run --example neuron | dot -Tsvg > neuron.svg`

use scalargrad::Tape;

fn main() {
    env_logger::init();

    let tape = Tape::new();
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
    o.backprop();

    eprintln!("o = {o}");
    eprintln!("x1: {}, w1: {}", x1.grad(), w1.grad());
    eprintln!("x2: {}, w2: {}", x2.grad(), w2.grad());
    o.dot(&mut std::io::stdout()).unwrap();
}
